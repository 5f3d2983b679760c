//! Grouping of stored jobs under the source they were found on.

use data_model_jpt::models::{PersistedJob, Source};

use crate::models::{SourceJobs, SourceRef};

pub const OTHER_SOURCES: &str = "Other Sources";

/// Groups jobs by source. A job belongs to every source whose URL is a substring of the job's
/// `source_url`; jobs matching no source go to a trailing "Other Sources" group with id 0, which is
/// only present when non-empty.
pub fn group_by_source(sources: &[Source], jobs: &[PersistedJob]) -> Vec<SourceJobs> {
    let mut groups: Vec<SourceJobs> = sources
        .iter()
        .map(|source| SourceJobs {
            source: SourceRef {
                id: source.id,
                name: source.name.clone(),
                url: source.url.clone(),
            },
            jobs: jobs.iter().filter(|job| job.found_on(&source.url)).cloned().collect(),
        })
        .collect();

    let unknown: Vec<PersistedJob> = jobs
        .iter()
        .filter(|job| !sources.iter().any(|source| job.found_on(&source.url)))
        .cloned()
        .collect();
    if !unknown.is_empty() {
        groups.push(SourceJobs {
            source: SourceRef {
                id: 0,
                name: OTHER_SOURCES.to_string(),
                url: String::new(),
            },
            jobs: unknown,
        });
    }
    groups
}

#[cfg(test)]
mod tests {
    use super::*;

    use chrono::Utc;

    fn source(id: i32, url: &str) -> Source {
        Source {
            id,
            name: format!("Source {id}"),
            url: url.to_string(),
            requires_browser: false,
            last_checked: None,
            job_count: 0,
            created_at: Utc::now(),
        }
    }

    fn job(title: &str, source_url: Option<&str>) -> PersistedJob {
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

    fn titles(group: &SourceJobs) -> Vec<&str> {
        group.jobs.iter().map(|j| j.title.as_str()).collect()
    }

    #[test]
    fn test_jobs_grouped_by_substring() {
        let sources = vec![source(1, "https://a.example/careers"), source(2, "https://b.example")];
        let jobs = vec![
            job("one", Some("https://a.example/careers")),
            job("two", Some("https://b.example/jobs?page=2")),
            job("three", Some("https://a.example/careers/eng")),
        ];

        let groups = group_by_source(&sources, &jobs);
        assert_eq!(groups.len(), 2);
        assert_eq!(titles(&groups[0]), vec!["one", "three"]);
        assert_eq!(titles(&groups[1]), vec!["two"]);
    }

    #[test]
    fn test_unmatched_jobs_go_to_other_sources() {
        let sources = vec![source(1, "https://a.example/careers")];
        let jobs = vec![
            job("known", Some("https://a.example/careers")),
            job("removed source", Some("https://gone.example/jobs")),
            job("no source", None),
        ];

        let groups = group_by_source(&sources, &jobs);
        assert_eq!(groups.len(), 2);
        let other = &groups[1];
        assert_eq!(other.source.id, 0);
        assert_eq!(other.source.name, OTHER_SOURCES);
        assert_eq!(titles(other), vec!["removed source", "no source"]);
    }

    #[test]
    fn test_sources_without_jobs_still_listed() {
        let groups = group_by_source(&[source(7, "https://c.example")], &[]);
        assert_eq!(groups.len(), 1);
        assert_eq!(groups[0].source.id, 7);
        assert!(groups[0].jobs.is_empty());
    }
}
