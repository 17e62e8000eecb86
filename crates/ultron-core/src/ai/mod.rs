pub mod gemini;

pub use gemini::{parse_reply, GeminiClient, ParsedReply};

use async_trait::async_trait;

use crate::context::OutgoingRequest;
use crate::error::CompletionError;

/// Reply substituted when the backend answers with an unexpected shape
pub const UNRECOGNIZED_REPLY: &str = "Sorry, I couldn't understand that.";

/// Reply substituted when the backend could not be reached or decoded
pub fn contact_failure_message(backend_name: &str) -> String {
    format!("Error contacting {}.", backend_name)
}

/// A generation backend that answers one assembled request with one reply
#[async_trait]
pub trait Completer: Send + Sync {
    /// Name shown to the user in failure messages
    fn backend_name(&self) -> &str;

    async fn complete(&self, request: &OutgoingRequest) -> Result<String, CompletionError>;
}
