//! Turns a listing page into candidate jobs with the help of an LLM.

pub mod parse;

use data_model_jpt::models::{CandidateJob, UNKNOWN_COMPANY, UNSPECIFIED_LOCATION};

use crate::html::{DEFAULT_MAX_LISTING_CHARS, clean_html, truncate_chars};
use crate::llms::LlmProvider;
use crate::llms::prompts::prompt_extract_jobs;

pub use parse::{JsonObject, parse_job_objects, repair_objects, string_field, strip_code_fence};

/// Longest description kept per candidate.
pub const MAX_DESCRIPTION_CHARS: usize = 200;

pub struct Extractor<P> {
    provider: P,
    max_html_chars: usize,
}

impl<P: LlmProvider> Extractor<P> {
    pub fn new(provider: P) -> Self {
        Self {
            provider,
            max_html_chars: DEFAULT_MAX_LISTING_CHARS,
        }
    }

    pub fn with_max_html_chars(mut self, max_html_chars: usize) -> Self {
        self.max_html_chars = max_html_chars;
        self
    }

    /// The listing page as it is shown to the model.
    pub fn clean(&self, html: &str) -> String {
        clean_html(html, self.max_html_chars)
    }

    /// Cleans `html` and extracts the jobs it lists. Never fails: an unusable page,
    /// model failure or unparseable answer yields an empty list.
    pub async fn extract(&self, html: &str, source_url: &str) -> Vec<CandidateJob> {
        let cleaned = self.clean(html);
        self.extract_cleaned(&cleaned, source_url).await
    }

    /// Same as [`Extractor::extract`] for HTML that has already gone through [`Extractor::clean`].
    pub async fn extract_cleaned(&self, cleaned_html: &str, source_url: &str) -> Vec<CandidateJob> {
        if cleaned_html.is_empty() {
            tracing::warn!("Nothing to extract from {}: page is empty", source_url);
            return Vec::new();
        }
        tracing::debug!("Extracting jobs from {} ({} chars)", source_url, cleaned_html.chars().count());

        let prompt = match prompt_extract_jobs(cleaned_html) {
            Ok(p) => p,
            Err(e) => {
                tracing::error!("Could not build extraction prompt for {}: {}", source_url, e);
                return Vec::new();
            }
        };

        let response = match self.provider.complete_prompt(&prompt).await {
            Ok(r) => r,
            Err(e) => {
                tracing::error!("Extraction failed for {}: {}", source_url, e);
                return Vec::new();
            }
        };

        let candidates: Vec<CandidateJob> = parse_job_objects(&response)
            .iter()
            .filter_map(|object| to_candidate(object, source_url))
            .collect();
        tracing::info!("Extracted {} jobs from {}", candidates.len(), source_url);
        candidates
    }
}

/// Converts one model-produced object. Objects without a title are not jobs.
pub fn to_candidate(object: &JsonObject, source_url: &str) -> Option<CandidateJob> {
    let title = string_field(object, "title")?;
    Some(CandidateJob {
        title: title.to_string(),
        company: string_field(object, "company").unwrap_or(UNKNOWN_COMPANY).to_string(),
        location: string_field(object, "location").unwrap_or(UNSPECIFIED_LOCATION).to_string(),
        url: string_field(object, "url")
            .map(|url| resolve_url(source_url, url))
            .unwrap_or_default(),
        description: string_field(object, "description")
            .map(|d| truncate_chars(d, MAX_DESCRIPTION_CHARS).to_string())
            .unwrap_or_default(),
        source_url: source_url.to_string(),
    })
}

/// `link` made absolute against the page it was found on. Left as is when either can't be parsed.
pub fn resolve_url(source_url: &str, link: &str) -> String {
    match url::Url::parse(source_url).and_then(|base| base.join(link)) {
        Ok(resolved) => resolved.to_string(),
        Err(_) => link.to_string(),
    }
}
