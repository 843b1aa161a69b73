pub mod format;
pub mod schema;

pub use format::ConfigFormat;
pub use schema::{ConfigError, EmitterConfig, EmitterSettings, FailurePolicy};
