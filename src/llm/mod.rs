//! Conversational completion contract consumed by the command dispatcher.

pub mod api;

pub use api::ApiCompletion;

use crate::error::Result;
use crate::pipeline::messages::Turn;
use async_trait::async_trait;

/// Stateless text completion: the caller supplies the whole context.
#[async_trait]
pub trait Completion: Send + Sync {
    /// Produce a reply to the last turn of `context`, at most `max_tokens` long.
    ///
    /// # Errors
    ///
    /// Returns an error if the backend is unreachable or answers with an error.
    async fn complete(&self, context: &[Turn], max_tokens: u32) -> Result<String>;
}
