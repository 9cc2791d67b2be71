use std::time::Duration;

use promptlab_core::client::{CallOptions, ChatClient};
use promptlab_core::error::Result;
use promptlab_core::message::Message;

/// Sampling temperature for prompt execution. Non-zero so responses
/// under evaluation show natural diversity.
pub const GENERATION_TEMPERATURE: f64 = 0.7;

/// Issues one completion per (prompt, example) pair. Stateless:
/// request in, response text out.
pub struct PromptRunner<'a> {
    client: &'a dyn ChatClient,
    timeout: Option<Duration>,
}

impl<'a> PromptRunner<'a> {
    pub fn new(client: &'a dyn ChatClient) -> Self {
        Self {
            client,
            timeout: None,
        }
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    /// Run a prompt against one example input: the prompt text goes in
    /// verbatim as the system message, the stringified input as the
    /// user message. Transport failures propagate to the caller, which
    /// decides the continuation policy.
    pub async fn run(&self, prompt_text: &str, model: &str, example_input: &str) -> Result<String> {
        let messages = [Message::system(prompt_text), Message::user(example_input)];

        let mut options = CallOptions::default().with_temperature(GENERATION_TEMPERATURE);
        if let Some(timeout) = self.timeout {
            options = options.with_timeout(timeout);
        }

        let result = self.client.complete(model, &messages, &options).await?;
        Ok(result.content)
    }
}
