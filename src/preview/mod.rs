// Interactive single-frame previews
pub mod cache;
pub mod debounce;
pub mod generator;
pub mod live;
pub mod slot;

pub use cache::{frame_index, FrameCache};
pub use debounce::{PreviewDebouncer, DEFAULT_DEBOUNCE};
pub use generator::{PreviewGenerator, PreviewRequest, ProcessedFrame, RawFrame, Thumbnail};
pub use live::{LivePreview, PreviewUpdate};
pub use slot::{RequestGuard, RequestSlot};
