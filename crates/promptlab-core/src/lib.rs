pub mod client;
pub mod error;
pub mod message;

/// Prelude module for convenient imports.
pub mod prelude {
    pub use crate::client::{CallOptions, ChatClient, ChatResult, TokenUsage};
    pub use crate::error::{ConfigError, LabError, ModelError, Result};
    pub use crate::message::Message;
}
