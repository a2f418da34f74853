// Command handlers over AppState - one file per domain
pub mod dependencies;
pub mod filters;
pub mod jobs;
pub mod preview;
pub mod settings;
