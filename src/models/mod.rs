// Data models (structs)
pub mod chroma_fix;
pub mod color_correction;
pub mod crop_resize;
pub mod deband;
pub mod deblock;
pub mod dehalo;
pub mod deinterlace;
pub mod dependencies;
pub mod dynamic;
pub mod filter_registry;
pub mod filter_schema;
pub mod noise_reduction;
pub mod pipeline;
pub mod progress;
pub mod settings;
pub mod sharpen;
pub mod video_job;

pub use chroma_fix::*;
pub use color_correction::*;
pub use crop_resize::*;
pub use deband::*;
pub use deblock::*;
pub use dehalo::*;
pub use deinterlace::*;
pub use dependencies::*;
pub use dynamic::{DynamicParameters, DynamicRecord, ParamChoice, ParamReader, ParamValue};
pub use filter_registry::*;
pub use filter_schema::*;
pub use noise_reduction::*;
pub use pipeline::*;
pub use progress::*;
pub use settings::*;
pub use sharpen::*;
pub use video_job::*;
