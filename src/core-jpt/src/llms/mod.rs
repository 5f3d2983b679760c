pub mod openai;
pub mod prompts;
pub mod rotation;

#[cfg(any(test, feature = "test-helpers"))]
pub mod mock;

use std::sync::Arc;

use async_trait::async_trait;

pub use openai::OpenAiChat;
pub use rotation::{KeyRotatingProvider, next_key_index};

/// Machine-checkable category of a failed LLM call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LlmErrorKind {
    /// Quota exhausted or too many requests for this credential.
    RateLimited,
    /// Credential rejected or lacking permission.
    AuthFailed,
    /// Transport failure before a usable answer arrived.
    Network,
    Other,
}

impl LlmErrorKind {
    /// True when switching to another API key may succeed where this one failed.
    pub fn is_rotatable(self) -> bool {
        matches!(self, Self::RateLimited | Self::AuthFailed)
    }
}

#[derive(Debug, Clone, thiserror::Error)]
#[error("{kind:?}: {message}")]
pub struct LlmError {
    pub kind: LlmErrorKind,
    pub message: String,
}

impl LlmError {
    pub fn new(kind: LlmErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
        }
    }
}

/// Interface to a hosted LLM that lets us complete a prompt and await a response.
#[async_trait]
pub trait LlmProvider: Send + Sync {
    async fn complete_prompt(&self, prompt: &str) -> Result<String, LlmError>;
}

#[async_trait]
impl<P: LlmProvider + ?Sized> LlmProvider for Arc<P> {
    async fn complete_prompt(&self, prompt: &str) -> Result<String, LlmError> {
        self.as_ref().complete_prompt(prompt).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rotatable_kinds() {
        assert!(LlmErrorKind::RateLimited.is_rotatable());
        assert!(LlmErrorKind::AuthFailed.is_rotatable());
        assert!(!LlmErrorKind::Network.is_rotatable());
        assert!(!LlmErrorKind::Other.is_rotatable());
    }

    #[test]
    fn test_llm_error_display() {
        let error = LlmError::new(LlmErrorKind::AuthFailed, "key revoked");
        assert_eq!(error.to_string(), "AuthFailed: key revoked");
    }
}
