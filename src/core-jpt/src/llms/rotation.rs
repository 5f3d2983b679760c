//! API key rotation.
//!
//! Each configured key gets its own provider. A cursor remembers which key is current;
//! a rate-limit or auth failure advances it (circularly) and the same prompt is retried,
//! at most once per key, so a call makes at most `providers.len()` attempts.

use std::sync::atomic::{AtomicUsize, Ordering};

use async_trait::async_trait;

use crate::llms::{LlmError, LlmErrorKind, LlmProvider};

/// The key index that follows `current` in a ring of `len` keys.
pub fn next_key_index(current: usize, len: usize) -> usize {
    if len == 0 { 0 } else { (current + 1) % len }
}

pub struct KeyRotatingProvider<P> {
    providers: Vec<P>,
    cursor: AtomicUsize,
}

impl<P: LlmProvider> KeyRotatingProvider<P> {
    /// Fails when no provider is supplied: a run cannot start without at least one key.
    pub fn new(providers: Vec<P>) -> Result<Self, LlmError> {
        if providers.is_empty() {
            return Err(LlmError::new(LlmErrorKind::AuthFailed, "No LLM API keys configured"));
        }
        Ok(Self {
            providers,
            cursor: AtomicUsize::new(0),
        })
    }

    /// Index of the key the next call starts with.
    pub fn current_index(&self) -> usize {
        self.cursor.load(Ordering::SeqCst)
    }

    pub fn key_count(&self) -> usize {
        self.providers.len()
    }
}

#[async_trait]
impl<P: LlmProvider> LlmProvider for KeyRotatingProvider<P> {
    async fn complete_prompt(&self, prompt: &str) -> Result<String, LlmError> {
        let len = self.providers.len();
        let mut index = self.current_index();
        let mut last_error = LlmError::new(LlmErrorKind::Other, "No LLM call attempted");

        for attempt in 1..=len {
            match self.providers[index].complete_prompt(prompt).await {
                Ok(response) => return Ok(response),
                Err(e) if e.kind.is_rotatable() => {
                    let next = next_key_index(index, len);
                    tracing::warn!(
                        "LLM key #{} failed ({:?}), rotating to key #{} [attempt {}/{}]",
                        index + 1,
                        e.kind,
                        next + 1,
                        attempt,
                        len
                    );
                    self.cursor.store(next, Ordering::SeqCst);
                    index = next;
                    last_error = e;
                }
                Err(e) => return Err(e),
            }
        }

        tracing::error!("All {} LLM keys failed: {}", len, last_error);
        Err(last_error)
    }
}
