use chrono::{DateTime, Utc};
use diesel::prelude::*;
use serde::{Deserialize, Serialize};

use crate::identity::fingerprint;
use crate::schema::{jobs, sources};

/// Company recorded when the listing doesn't name one.
pub const UNKNOWN_COMPANY: &str = "Unknown";

/// Location recorded when the listing doesn't name one.
pub const UNSPECIFIED_LOCATION: &str = "Not specified";

/// Name given to a source added without one.
pub const UNNAMED_SOURCE: &str = "Unnamed";

//
// Jobs
//

/// A job extracted from a listing page during one pipeline run.
/// Never stored directly: it is either discarded or promoted to a [`NewJob`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CandidateJob {
    pub title: String,
    pub company: String,
    pub location: String,
    /// Link to the posting's own page. May be empty.
    pub url: String,
    pub description: String,
    /// The listing page this candidate was extracted from.
    pub source_url: String,
}

impl Default for CandidateJob {
    fn default() -> Self {
        Self {
            title: String::new(),
            company: UNKNOWN_COMPANY.to_string(),
            location: UNSPECIFIED_LOCATION.to_string(),
            url: String::new(),
            description: String::new(),
            source_url: String::new(),
        }
    }
}

impl CandidateJob {
    /// The storage key this candidate would be persisted under.
    pub fn fingerprint(&self) -> String {
        fingerprint(&self.title, &self.url)
    }
}

/// A new, not yet seen job carrying its precomputed fingerprint.
/// `first_seen` and `notified` are left to the column defaults.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Insertable)]
#[diesel(table_name = jobs)]
pub struct NewJob {
    pub job_id: String,
    pub title: String,
    pub company: String,
    pub location: String,
    pub url: String,
    pub description: String,
    pub source_url: String,
}

impl NewJob {
    pub fn from_candidate(job_id: String, candidate: CandidateJob) -> Self {
        Self {
            job_id,
            title: candidate.title,
            company: candidate.company,
            location: candidate.location,
            url: candidate.url,
            description: candidate.description,
            source_url: candidate.source_url,
        }
    }

    /// The candidate this job was created from.
    pub fn to_candidate(&self) -> CandidateJob {
        CandidateJob {
            title: self.title.clone(),
            company: self.company.clone(),
            location: self.location.clone(),
            url: self.url.clone(),
            description: self.description.clone(),
            source_url: self.source_url.clone(),
        }
    }
}

/// A row of the `jobs` table.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Queryable, Selectable)]
#[diesel(table_name = jobs)]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub struct PersistedJob {
    pub job_id: String,
    pub title: String,
    pub company: Option<String>,
    pub location: Option<String>,
    pub url: Option<String>,
    pub description: Option<String>,
    pub source_url: Option<String>,
    pub first_seen: DateTime<Utc>,
    pub notified: bool,
}

impl PersistedJob {
    /// Whether the job was found on the source at `source_url`: that URL is a substring of the
    /// job's own `source_url`, so paginated or filtered variants of a listing page still match.
    pub fn found_on(&self, source_url: &str) -> bool {
        self.source_url.as_deref().is_some_and(|s| s.contains(source_url))
    }
}

/// Number of stored jobs per company.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CompanyCount {
    pub company: String,
    pub count: i64,
}

//
// Sources
//

/// A row of the `sources` table: one listing page the pipeline scrapes.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Queryable, Selectable)]
#[diesel(table_name = sources)]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub struct Source {
    pub id: i32,
    pub name: String,
    pub url: String,
    pub requires_browser: bool,
    pub last_checked: Option<DateTime<Utc>>,
    pub job_count: i32,
    pub created_at: DateTime<Utc>,
}

impl Source {
    /// How many of `jobs` were found on this source.
    pub fn matched_jobs(&self, jobs: &[PersistedJob]) -> usize {
        jobs.iter().filter(|job| job.found_on(&self.url)).count()
    }

    /// Whether the recorded `job_count` agrees with the jobs actually attributed to this source.
    pub fn job_count_matches(&self, jobs: &[PersistedJob]) -> bool {
        usize::try_from(self.job_count).is_ok_and(|recorded| recorded == self.matched_jobs(jobs))
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Insertable)]
#[diesel(table_name = sources)]
pub struct NewSource {
    pub name: String,
    pub url: String,
    pub requires_browser: bool,
}

/// Operator-supplied description of a source, as accepted by the API and the `JOB_SOURCES` setting.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SourcePayload {
    pub url: String,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub requires_browser: Option<bool>,
}

impl SourcePayload {
    /// Fills in the defaults: a blank name becomes `default_name`, and browser rendering is on unless disabled.
    pub fn into_new_source(self, default_name: &str) -> NewSource {
        let name = self
            .name
            .map(|n| n.trim().to_string())
            .filter(|n| !n.is_empty())
            .unwrap_or_else(|| default_name.to_string());
        NewSource {
            name,
            url: self.url.trim().to_string(),
            requires_browser: self.requires_browser.unwrap_or(true),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_candidate_defaults() {
        let candidate = CandidateJob::default();
        assert_eq!(candidate.company, UNKNOWN_COMPANY);
        assert_eq!(candidate.location, UNSPECIFIED_LOCATION);
        assert!(candidate.url.is_empty());
    }

    #[test]
    fn test_new_job_keeps_candidate_fields() {
        let candidate = CandidateJob {
            title: "Backend Engineer".to_string(),
            url: "https://a.example/jobs/42".to_string(),
            source_url: "https://a.example/careers".to_string(),
            ..Default::default()
        };
        let job = NewJob::from_candidate(candidate.fingerprint(), candidate.clone());
        assert_eq!(job.job_id, candidate.fingerprint());
        assert_eq!(job.title, "Backend Engineer");
        assert_eq!(job.company, UNKNOWN_COMPANY);
        assert_eq!(job.source_url, "https://a.example/careers");
        assert_eq!(job.to_candidate(), candidate);
    }

    #[test]
    fn test_source_payload_defaults() {
        let payload: SourcePayload = serde_json::from_str(r#"{"url": " https://a.example/careers "}"#).unwrap();
        let source = payload.into_new_source(UNNAMED_SOURCE);
        assert_eq!(source.url, "https://a.example/careers");
        assert_eq!(source.name, UNNAMED_SOURCE);
        assert!(source.requires_browser);
    }

    #[test]
    fn test_source_payload_explicit_values() {
        let payload: SourcePayload =
            serde_json::from_str(r#"{"url": "https://b.example/jobs", "name": "B Corp", "requires_browser": false}"#)
                .unwrap();
        let source = payload.into_new_source(UNNAMED_SOURCE);
        assert_eq!(source.name, "B Corp");
        assert!(!source.requires_browser);
    }

    #[test]
    fn test_source_payload_blank_name_uses_default() {
        let payload = SourcePayload {
            url: "https://c.example".to_string(),
            name: Some("   ".to_string()),
            requires_browser: None,
        };
        assert_eq!(payload.into_new_source("c.example").name, "c.example");
    }

    fn stored_job(title: &str, source_url: Option<&str>) -> PersistedJob {
        PersistedJob {
            job_id: title.to_string(),
            title: title.to_string(),
            company: None,
            location: None,
            url: None,
            description: None,
            source_url: source_url.map(str::to_string),
            first_seen: Utc::now(),
            notified: false,
        }
    }

    fn source(url: &str, job_count: i32) -> Source {
        Source {
            id: 1,
            name: "A".to_string(),
            url: url.to_string(),
            requires_browser: false,
            last_checked: None,
            job_count,
            created_at: Utc::now(),
        }
    }

    #[test]
    fn test_found_on_matches_by_substring() {
        let job = stored_job("one", Some("https://a.example/careers?page=2"));
        assert!(job.found_on("https://a.example/careers"));
        assert!(job.found_on("a.example"));
        assert!(!job.found_on("https://b.example"));
        assert!(!stored_job("two", None).found_on("https://a.example/careers"));
    }

    #[test]
    fn test_job_count_compared_with_matched_jobs() {
        let jobs = vec![
            stored_job("one", Some("https://a.example/careers")),
            stored_job("two", Some("https://a.example/careers/eng")),
            stored_job("three", Some("https://b.example/jobs")),
        ];

        let up_to_date = source("https://a.example/careers", 2);
        assert_eq!(up_to_date.matched_jobs(&jobs), 2);
        assert!(up_to_date.job_count_matches(&jobs));

        let stale = source("https://a.example/careers", 5);
        assert!(!stale.job_count_matches(&jobs));

        let never_run = source("https://c.example", 0);
        assert_eq!(never_run.matched_jobs(&jobs), 0);
        assert!(never_run.job_count_matches(&jobs));
        assert!(!source("https://c.example", -1).job_count_matches(&[]));
    }
}
