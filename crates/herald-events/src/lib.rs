mod emitter;
mod error;
mod listener;

pub use emitter::EventEmitter;
pub use error::EmitterError;
pub use herald_config::{EmitterConfig, EmitterSettings, FailurePolicy};
pub use listener::{Listener, ListenerResult};
