// Raw frame cache keyed by frame index

use std::collections::{HashMap, VecDeque};
use std::fs;
use std::path::PathBuf;

/// Nearest frame for `timestamp`, clamped to the clip when its length is known.
pub fn frame_index(timestamp: f64, fps: f64, total_frames: Option<u64>) -> u64 {
    if !timestamp.is_finite() || !fps.is_finite() || timestamp <= 0.0 || fps <= 0.0 {
        return 0;
    }

    let index = (timestamp * fps).round() as u64;
    match total_frames {
        Some(total) if total > 0 => index.min(total - 1),
        _ => index,
    }
}

/// Bounded cache of extracted frame images. Evicts in insertion order and deletes evicted files.
#[derive(Debug)]
pub struct FrameCache {
    capacity: usize,
    order: VecDeque<u64>,
    frames: HashMap<u64, PathBuf>,
}

impl FrameCache {
    pub fn new(capacity: usize) -> Self {
        Self {
            capacity: capacity.max(1),
            order: VecDeque::new(),
            frames: HashMap::new(),
        }
    }

    pub fn get(&self, index: u64) -> Option<PathBuf> {
        self.frames.get(&index).filter(|p| p.exists()).cloned()
    }

    pub fn insert(&mut self, index: u64, path: PathBuf) {
        if let Some(existing) = self.frames.insert(index, path.clone()) {
            if existing != path {
                let _ = fs::remove_file(existing);
            }
            return;
        }

        self.order.push_back(index);
        while self.order.len() > self.capacity {
            if let Some(oldest) = self.order.pop_front() {
                if let Some(evicted) = self.frames.remove(&oldest) {
                    let _ = fs::remove_file(evicted);
                }
            }
        }
    }

    pub fn clear(&mut self) {
        for (_, path) in self.frames.drain() {
            let _ = fs::remove_file(path);
        }
        self.order.clear();
    }

    pub fn len(&self) -> usize {
        self.frames.len()
    }

    pub fn is_empty(&self) -> bool {
        self.frames.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_nearby_timestamps_share_index() {
        assert_eq!(frame_index(1.0, 29.97, None), 30);
        assert_eq!(frame_index(1.01, 29.97, None), 30);
        assert_eq!(frame_index(-2.0, 25.0, None), 0);
        assert_eq!(frame_index(120.0, 25.0, Some(1000)), 999);
        assert_eq!(frame_index(f64::NAN, 25.0, None), 0);
    }

    #[test]
    fn test_eviction_removes_oldest_file() {
        let dir = tempfile::tempdir().unwrap();
        let mut cache = FrameCache::new(2);
        for index in 0..3u64 {
            let path = dir.path().join(format!("f{}.png", index));
            fs::write(&path, b"png").unwrap();
            cache.insert(index, path);
        }

        assert_eq!(cache.len(), 2);
        assert!(cache.get(0).is_none());
        assert!(!dir.path().join("f0.png").exists());
        assert_eq!(cache.get(2), Some(dir.path().join("f2.png")));
    }

    #[test]
    fn test_deleted_file_is_a_miss() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("f7.png");
        fs::write(&path, b"png").unwrap();
        let mut cache = FrameCache::new(4);
        cache.insert(7, path.clone());

        fs::remove_file(&path).unwrap();
        assert!(cache.get(7).is_none());

        cache.clear();
        assert!(cache.is_empty());
    }
}
