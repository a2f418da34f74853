// Loads filter schemas from bundled and user directories
use crate::error::Result;
use log::{debug, warn};
use std::collections::BTreeMap;
use std::fs;
use std::path::Path;

use super::filter_schema::FilterSchema;

#[derive(Debug, Default)]
pub struct FilterRegistry {
    filters: BTreeMap<String, FilterSchema>,
}

impl FilterRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Loads every `*.json` in `dir` (or `dir/core` when present).
    /// Schemas that fail to parse are skipped. Later loads override earlier ids.
    pub fn load_from_directory(&mut self, dir: &Path) -> Result<usize> {
        if !dir.exists() {
            return Ok(0);
        }

        let core_dir = dir.join("core");
        let search_dir = if core_dir.is_dir() { core_dir } else { dir.to_path_buf() };

        let mut loaded = 0;
        for entry in fs::read_dir(&search_dir)? {
            let path = entry?.path();
            if path.extension().map_or(false, |e| e == "json") {
                match Self::read_schema(&path) {
                    Ok(schema) => {
                        debug!("[FilterRegistry] Loaded {} from {:?}", schema.id, path);
                        self.register(schema);
                        loaded += 1;
                    }
                    Err(e) => warn!("[FilterRegistry] Skipping {:?}: {}", path, e),
                }
            }
        }

        Ok(loaded)
    }

    fn read_schema(path: &Path) -> Result<FilterSchema> {
        let content = fs::read_to_string(path)?;
        Ok(serde_json::from_str(&content)?)
    }

    pub fn register(&mut self, schema: FilterSchema) {
        self.filters.insert(schema.id.clone(), schema);
    }

    pub fn get(&self, id: &str) -> Option<&FilterSchema> {
        self.filters.get(id)
    }

    pub fn len(&self) -> usize {
        self.filters.len()
    }

    pub fn is_empty(&self) -> bool {
        self.filters.is_empty()
    }

    /// Sorted by `order`, ties broken by id.
    pub fn ordered_filters(&self) -> Vec<&FilterSchema> {
        let mut filters: Vec<_> = self.filters.values().collect();
        filters.sort_by(|a, b| a.order.cmp(&b.order).then_with(|| a.id.cmp(&b.id)));
        filters
    }
}
