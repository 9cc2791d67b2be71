pub mod catalog;
pub mod openai;

pub use catalog::{is_known_model, AVAILABLE_MODELS};
pub use openai::OpenAIClient;
