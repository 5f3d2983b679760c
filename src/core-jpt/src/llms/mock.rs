//! Mock LLM provider for testing
//!
//! This module provides a mock implementation of the `LlmProvider` trait
//! that can be configured to return predefined responses or errors,
//! without making real API calls.

use std::sync::atomic::{AtomicUsize, Ordering};

use async_trait::async_trait;

use crate::llms::{LlmError, LlmErrorKind, LlmProvider};

/// Mock LLM provider for testing
///
/// Can be configured to:
/// - Return specific responses based on prompt content (first matching rule wins)
/// - Return a default response for any prompt
/// - Simulate API failures of a given category
pub struct MockLlmProvider {
    /// Ordered (prompt substring, response) rules.
    responses: Vec<(String, String)>,
    /// Default response if no specific match found
    default_response: Option<String>,
    /// If set, always return an error of this kind
    failure: Option<LlmErrorKind>,
    calls: AtomicUsize,
}

impl MockLlmProvider {
    /// Create a new empty mock provider
    pub fn new() -> Self {
        Self {
            responses: Vec::new(),
            default_response: None,
            failure: None,
            calls: AtomicUsize::new(0),
        }
    }

    /// Create a mock that returns a specific response when the prompt contains the given text
    pub fn with_response(prompt_contains: &str, response: &str) -> Self {
        let mut provider = Self::new();
        provider.add_response(prompt_contains, response);
        provider
    }

    /// Create a mock with multiple configured responses, checked in order
    pub fn with_responses(responses: Vec<(&str, &str)>) -> Self {
        let mut provider = Self::new();
        for (prompt_part, response) in responses {
            provider.add_response(prompt_part, response);
        }
        provider
    }

    /// Create a mock with a default response for any prompt
    pub fn with_default(response: &str) -> Self {
        let mut provider = Self::new();
        provider.set_default(response);
        provider
    }

    /// Create a mock that always fails with an error of the given kind
    pub fn with_failure(kind: LlmErrorKind) -> Self {
        let mut provider = Self::new();
        provider.failure = Some(kind);
        provider
    }

    /// Add a response rule, checked after the existing ones
    pub fn add_response(&mut self, prompt_contains: &str, response: &str) {
        self.responses.push((prompt_contains.to_string(), response.to_string()));
    }

    /// Set the default response
    pub fn set_default(&mut self, response: &str) {
        self.default_response = Some(response.to_string());
    }

    /// Number of prompts this provider has been asked to complete
    pub fn call_count(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

impl Default for MockLlmProvider {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl LlmProvider for MockLlmProvider {
    async fn complete_prompt(&self, prompt: &str) -> Result<String, LlmError> {
        self.calls.fetch_add(1, Ordering::SeqCst);

        if let Some(kind) = self.failure {
            return Err(LlmError::new(kind, "Mock LLM provider configured to fail"));
        }

        // Try to find a matching response based on prompt content
        for (key, response) in &self.responses {
            if prompt.contains(key) {
                return Ok(response.clone());
            }
        }

        // Use default response if available
        if let Some(default) = &self.default_response {
            return Ok(default.clone());
        }

        // No response configured
        Err(LlmError::new(
            LlmErrorKind::Other,
            "Mock LLM provider has no response configured for this prompt",
        ))
    }
}

/// Sample careers page: one real posting and a linked category header.
pub fn sample_listing_html() -> &'static str {
    r#"<html>
<head><title>Careers at A</title><script>var tracking = {"jobs": 99};</script><style>.x { color: red; }</style></head>
<body>
  <!-- hiring banner -->
  <h2><a href="/jobs/engineering">Engineering</a></h2>
  <ul>
    <li><a href="/jobs/42">Backend Engineer</a> <span>Remote</span></li>
  </ul>
</body>
</html>"#
}

/// Sample detail page matching the "Backend Engineer" posting.
pub fn sample_detail_html() -> &'static str {
    r#"<html><body>
  <h1>Backend Engineer</h1>
  <p>Company A is hiring a Backend Engineer to build our APIs.</p>
  <h3>Requirements</h3><ul><li>Rust</li><li>Postgres</li></ul>
  <button>Apply</button>
</body></html>"#
}

/// Model output for the sample listing page, including the misread category header.
/// The header carries a link, so only the existence check can tell it apart.
pub fn sample_extraction_response() -> &'static str {
    r#"```json
[
  {"title": "Backend Engineer", "company": "A", "location": "Remote", "url": "/jobs/42", "description": "Build our APIs"},
  {"title": "Engineering", "company": "A", "location": "", "url": "/jobs/engineering", "description": ""}
]
```"#
}

/// Existence-check output for the sample listing page: the header is gone.
pub fn sample_integrity_response() -> &'static str {
    r#"[{"title": "Backend Engineer", "company": "A", "location": "Remote", "url": "/jobs/42", "description": "Build our APIs"}]"#
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_mock_with_response() {
        let provider = MockLlmProvider::with_response("careers", "[]");

        let result = provider.complete_prompt("Extract the careers listing").await;
        assert_eq!(result.unwrap(), "[]");

        let result = provider.complete_prompt("Something unrelated").await;
        assert!(result.is_err());
        assert_eq!(provider.call_count(), 2);
    }

    #[tokio::test]
    async fn test_mock_first_rule_wins() {
        let provider = MockLlmProvider::with_responses(vec![("alpha", "first"), ("beta", "second")]);

        assert_eq!(provider.complete_prompt("beta then alpha").await.unwrap(), "first");
        assert_eq!(provider.complete_prompt("only beta").await.unwrap(), "second");
    }

    #[tokio::test]
    async fn test_mock_with_default() {
        let provider = MockLlmProvider::with_default("NO");
        assert_eq!(provider.complete_prompt("anything").await.unwrap(), "NO");
    }

    #[tokio::test]
    async fn test_mock_with_failure() {
        let provider = MockLlmProvider::with_failure(LlmErrorKind::RateLimited);
        let error = provider.complete_prompt("anything").await.unwrap_err();
        assert_eq!(error.kind, LlmErrorKind::RateLimited);
    }
}
