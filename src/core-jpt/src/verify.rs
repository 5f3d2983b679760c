//! Second-pass checks on extracted candidates.
//!
//! The existence check asks the model to audit its own extraction against the listing page.
//! The detail check fetches each candidate's own page and asks whether it is a real posting.
//! The detail check is fail-closed; what an unusable existence check does is a policy choice.

use std::collections::HashSet;
use std::str::FromStr;

use data_model_jpt::identity::normalize_title;
use data_model_jpt::models::CandidateJob;

use crate::extract::{parse_job_objects, string_field};
use crate::fetch::FetchRouter;
use crate::html::{DEFAULT_MAX_DETAIL_CHARS, clean_html};
use crate::llms::LlmProvider;
use crate::llms::prompts::{prompt_verify_detail, prompt_verify_integrity};

/// What the existence check does when the model's answer can't be used
/// (call failed, nothing parseable, or an empty answer for a non-empty input).
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum InconclusivePolicy {
    /// Pass every candidate through unchanged; the detail check still applies.
    #[default]
    KeepOriginal,
    /// Discard every candidate from the page.
    DropAll,
}

impl FromStr for InconclusivePolicy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "keep" | "keep_original" | "keeporiginal" => Ok(Self::KeepOriginal),
            "drop" | "drop_all" | "dropall" => Ok(Self::DropAll),
            other => Err(format!("unknown existence check policy '{}', expected 'keep' or 'drop'", other)),
        }
    }
}

pub struct Verifier<P> {
    provider: P,
    policy: InconclusivePolicy,
    max_detail_chars: usize,
}

impl<P: LlmProvider> Verifier<P> {
    pub fn new(provider: P) -> Self {
        Self {
            provider,
            policy: InconclusivePolicy::default(),
            max_detail_chars: DEFAULT_MAX_DETAIL_CHARS,
        }
    }

    pub fn with_policy(mut self, policy: InconclusivePolicy) -> Self {
        self.policy = policy;
        self
    }

    pub fn with_max_detail_chars(mut self, max_detail_chars: usize) -> Self {
        self.max_detail_chars = max_detail_chars;
        self
    }

    pub fn policy(&self) -> InconclusivePolicy {
        self.policy
    }

    /// The candidates the model confirms are present in `cleaned_html`.
    /// Survivors are the original records (never the model's rewrite of them),
    /// matched by normalized title.
    pub async fn verify_integrity(&self, candidates: Vec<CandidateJob>, cleaned_html: &str) -> Vec<CandidateJob> {
        if candidates.is_empty() {
            return candidates;
        }

        let confirmed = match self.confirmed_titles(&candidates, cleaned_html).await {
            Some(titles) => titles,
            None => return self.inconclusive(candidates),
        };

        let before = candidates.len();
        let survivors: Vec<CandidateJob> = candidates
            .into_iter()
            .filter(|c| confirmed.contains(&normalize_title(&c.title)))
            .collect();
        if survivors.len() < before {
            tracing::info!("Existence check removed {} of {} candidates", before - survivors.len(), before);
        }
        survivors
    }

    /// Normalized titles from the model's audit, or `None` when the answer is unusable.
    async fn confirmed_titles(&self, candidates: &[CandidateJob], cleaned_html: &str) -> Option<HashSet<String>> {
        let candidates_json = match serde_json::to_string_pretty(candidates) {
            Ok(json) => json,
            Err(e) => {
                tracing::error!("Could not serialize candidates for the existence check: {}", e);
                return None;
            }
        };
        let prompt = match prompt_verify_integrity(&candidates_json, cleaned_html) {
            Ok(p) => p,
            Err(e) => {
                tracing::error!("Could not build existence check prompt: {}", e);
                return None;
            }
        };
        let response = match self.provider.complete_prompt(&prompt).await {
            Ok(r) => r,
            Err(e) => {
                tracing::warn!("Existence check failed: {}", e);
                return None;
            }
        };

        let titles: HashSet<String> = parse_job_objects(&response)
            .iter()
            .filter_map(|object| string_field(object, "title"))
            .map(normalize_title)
            .collect();
        if titles.is_empty() {
            tracing::warn!("Existence check returned nothing for {} candidates", candidates.len());
            return None;
        }
        Some(titles)
    }

    fn inconclusive(&self, candidates: Vec<CandidateJob>) -> Vec<CandidateJob> {
        match self.policy {
            InconclusivePolicy::KeepOriginal => {
                tracing::warn!("Existence check inconclusive, keeping all {} candidates", candidates.len());
                candidates
            }
            InconclusivePolicy::DropAll => {
                tracing::warn!("Existence check inconclusive, dropping all {} candidates", candidates.len());
                Vec::new()
            }
        }
    }

    /// True only when the model answers YES for this page. Blank pages, model failures
    /// and every other answer are false.
    pub async fn verify_detail(&self, detail_html: Option<&str>, candidate: &CandidateJob) -> bool {
        let Some(html) = detail_html else {
            tracing::debug!("No detail page for '{}'", candidate.title);
            return false;
        };
        let cleaned = clean_html(html, self.max_detail_chars);
        if cleaned.is_empty() {
            tracing::debug!("Detail page for '{}' is blank", candidate.title);
            return false;
        }

        let prompt = match prompt_verify_detail(&candidate.title, &candidate.company, &cleaned) {
            Ok(p) => p,
            Err(e) => {
                tracing::error!("Could not build detail check prompt for '{}': {}", candidate.title, e);
                return false;
            }
        };

        match self.provider.complete_prompt(&prompt).await {
            Ok(answer) => {
                let verified = is_yes(&answer);
                if !verified {
                    tracing::info!("Detail check rejected '{}' ({})", candidate.title, candidate.url);
                }
                verified
            }
            Err(e) => {
                tracing::warn!("Detail check failed for '{}': {}", candidate.title, e);
                false
            }
        }
    }

    /// Fetches the candidate's own page over HTTP and runs [`Verifier::verify_detail`] on it.
    pub async fn check_detail_page(&self, router: &FetchRouter, candidate: &CandidateJob) -> bool {
        if candidate.url.is_empty() {
            return false;
        }
        let html = router.fetch(&candidate.url, false).await;
        self.verify_detail(html.as_deref(), candidate).await
    }
}

fn is_yes(answer: &str) -> bool {
    answer
        .trim_start_matches(|c: char| c.is_whitespace() || c == '*' || c == '`' || c == '"')
        .to_ascii_uppercase()
        .starts_with("YES")
}

#[cfg(test)]
mod tests {
    use super::*;

    use std::sync::Arc;

    use async_trait::async_trait;
    use data_model_jpt::models::{UNKNOWN_COMPANY, UNSPECIFIED_LOCATION};

    use crate::Error;
    use crate::fetch::PageFetcher;
    use crate::llms::LlmErrorKind;
    use crate::llms::mock::{MockLlmProvider, sample_detail_html, sample_integrity_response};

    fn job(title: &str, url: &str) -> CandidateJob {
        CandidateJob {
            title: title.to_string(),
            company: "A".to_string(),
            location: UNSPECIFIED_LOCATION.to_string(),
            url: url.to_string(),
            description: String::new(),
            source_url: "https://a.example/careers".to_string(),
        }
    }

    struct FailingFetcher;

    #[async_trait]
    impl PageFetcher for FailingFetcher {
        async fn fetch_page(&self, _url: &str) -> Result<String, Error> {
            Err(Error::HttpStatus(404))
        }
    }

    struct FixedFetcher(&'static str);

    #[async_trait]
    impl PageFetcher for FixedFetcher {
        async fn fetch_page(&self, _url: &str) -> Result<String, Error> {
            Ok(self.0.to_string())
        }
    }

    #[test]
    fn test_policy_from_str() {
        assert_eq!("keep".parse::<InconclusivePolicy>(), Ok(InconclusivePolicy::KeepOriginal));
        assert_eq!(" DROP ".parse::<InconclusivePolicy>(), Ok(InconclusivePolicy::DropAll));
        assert!("maybe".parse::<InconclusivePolicy>().is_err());
        assert_eq!(InconclusivePolicy::default(), InconclusivePolicy::KeepOriginal);
    }

    #[test]
    fn test_is_yes() {
        assert!(is_yes("YES"));
        assert!(is_yes("yes, this is the posting"));
        assert!(is_yes("  **YES**"));
        assert!(!is_yes("NO"));
        assert!(!is_yes("Probably yes"));
        assert!(!is_yes(""));
    }

    #[tokio::test]
    async fn test_integrity_keeps_original_records_by_title() {
        let verifier = Verifier::new(MockLlmProvider::with_default(sample_integrity_response()));
        let candidates = vec![job("Backend Engineer", "https://a.example/jobs/42"), job("Engineering", "https://a.example/jobs/engineering")];

        let survivors = verifier.verify_integrity(candidates.clone(), "<li>Backend Engineer</li>").await;
        assert_eq!(survivors, vec![candidates[0].clone()]);
    }

    #[tokio::test]
    async fn test_integrity_matches_normalized_titles() {
        let verifier = Verifier::new(MockLlmProvider::with_default(r#"[{"title": "backend-engineer"}]"#));
        let survivors = verifier
            .verify_integrity(vec![job("Backend Engineer ", "/jobs/42")], "<html></html>")
            .await;
        assert_eq!(survivors.len(), 1);
        assert_eq!(survivors[0].title, "Backend Engineer ");
    }

    #[tokio::test]
    async fn test_integrity_inconclusive_follows_policy() {
        let candidates = vec![job("Backend Engineer", "/jobs/42"), job("SRE", "/jobs/7")];

        let keep = Verifier::new(MockLlmProvider::with_default("[]"));
        assert_eq!(keep.verify_integrity(candidates.clone(), "<html></html>").await, candidates);

        let drop = Verifier::new(MockLlmProvider::with_default("[]")).with_policy(InconclusivePolicy::DropAll);
        assert!(drop.verify_integrity(candidates.clone(), "<html></html>").await.is_empty());

        let failing = Verifier::new(MockLlmProvider::with_failure(LlmErrorKind::Network));
        assert_eq!(failing.verify_integrity(candidates.clone(), "<html></html>").await, candidates);

        let garbage = Verifier::new(MockLlmProvider::with_default("I am not sure."));
        assert_eq!(garbage.verify_integrity(candidates.clone(), "<html></html>").await, candidates);
    }

    #[tokio::test]
    async fn test_integrity_empty_input_skips_model() {
        let provider = Arc::new(MockLlmProvider::with_default("[]"));
        let verifier = Verifier::new(provider.clone());
        assert!(verifier.verify_integrity(Vec::new(), "<html></html>").await.is_empty());
        assert_eq!(provider.call_count(), 0);
    }

    #[tokio::test]
    async fn test_detail_yes_passes() {
        let verifier = Verifier::new(MockLlmProvider::with_response("You are checking whether a web page", "YES"));
        assert!(verifier.verify_detail(Some(sample_detail_html()), &job("Backend Engineer", "/jobs/42")).await);
    }

    #[tokio::test]
    async fn test_detail_is_fail_closed() {
        let candidate = job("Backend Engineer", "/jobs/42");

        let yes = Arc::new(MockLlmProvider::with_default("YES"));
        let verifier = Verifier::new(yes.clone());
        assert!(!verifier.verify_detail(None, &candidate).await);
        assert!(!verifier.verify_detail(Some(""), &candidate).await);
        assert!(!verifier.verify_detail(Some("   \n "), &candidate).await);
        assert_eq!(yes.call_count(), 0);

        let no = Verifier::new(MockLlmProvider::with_default("NO"));
        assert!(!no.verify_detail(Some(sample_detail_html()), &candidate).await);

        let unsure = Verifier::new(MockLlmProvider::with_default("It might be."));
        assert!(!unsure.verify_detail(Some(sample_detail_html()), &candidate).await);

        let failing = Verifier::new(MockLlmProvider::with_failure(LlmErrorKind::RateLimited));
        assert!(!failing.verify_detail(Some(sample_detail_html()), &candidate).await);
    }

    #[tokio::test]
    async fn test_check_detail_page_failed_fetch_is_false() {
        let verifier = Verifier::new(MockLlmProvider::with_default("YES"));
        let router = FetchRouter::new(Arc::new(FailingFetcher));
        assert!(!verifier.check_detail_page(&router, &job("Backend Engineer", "https://a.example/jobs/42")).await);
    }

    #[tokio::test]
    async fn test_check_detail_page_requires_url() {
        let provider = Arc::new(MockLlmProvider::with_default("YES"));
        let verifier = Verifier::new(provider.clone());
        let router = FetchRouter::new(Arc::new(FixedFetcher("<h1>Backend Engineer</h1>")));

        let mut candidate = job("Backend Engineer", "");
        candidate.company = UNKNOWN_COMPANY.to_string();
        assert!(!verifier.check_detail_page(&router, &candidate).await);
        assert_eq!(provider.call_count(), 0);

        candidate.url = "https://a.example/jobs/42".to_string();
        assert!(verifier.check_detail_page(&router, &candidate).await);
    }
}
