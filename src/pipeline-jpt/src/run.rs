//! One pipeline run: FETCH → EXTRACT → DEDUPE → VERIFY → PERSIST+NOTIFY → STATS_UPDATE.

use std::collections::HashMap;
use std::sync::Arc;

use chrono::Utc;
use core_jpt::llms::LlmProvider;
use core_jpt::{Extractor, FetchRouter, FetchTarget, InconclusivePolicy, Verifier};
use data_model_jpt::dedup::find_new;
use data_model_jpt::models::{CandidateJob, NewJob, Source};
use data_model_jpt::store::{JobStore, SourceStore};
use serde::{Deserialize, Serialize};

use crate::errors::Error;
use crate::notify::Notifier;

pub const NO_SOURCES: &str = "No sources configured";
pub const NO_PAGES_FETCHED: &str = "Failed to fetch any sources";

/// Outcome of one run, as returned to whoever triggered it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RunReport {
    pub success: bool,
    pub message: String,
    /// Jobs persisted by this run.
    pub new_jobs: usize,
    /// Jobs extracted across all pages, before any check or dedup.
    pub total_parsed: usize,
    pub sources_checked: usize,
    pub sources_successful: usize,
}

impl RunReport {
    pub fn failure(message: impl Into<String>) -> Self {
        Self {
            success: false,
            message: message.into(),
            new_jobs: 0,
            total_parsed: 0,
            sources_checked: 0,
            sources_successful: 0,
        }
    }
}

pub struct Pipeline {
    jobs: Arc<dyn JobStore>,
    sources: Arc<dyn SourceStore>,
    router: FetchRouter,
    extractor: Extractor<Arc<dyn LlmProvider>>,
    verifier: Verifier<Arc<dyn LlmProvider>>,
    notifier: Arc<dyn Notifier>,
}

impl Pipeline {
    pub fn new(
        jobs: Arc<dyn JobStore>,
        sources: Arc<dyn SourceStore>,
        router: FetchRouter,
        provider: Arc<dyn LlmProvider>,
        notifier: Arc<dyn Notifier>,
    ) -> Self {
        Self {
            jobs,
            sources,
            router,
            extractor: Extractor::new(provider.clone()),
            verifier: Verifier::new(provider),
            notifier,
        }
    }

    pub fn with_policy(mut self, policy: InconclusivePolicy) -> Self {
        self.verifier = self.verifier.with_policy(policy);
        self
    }

    /// Runs every stage once. Never panics the caller and never returns an error:
    /// storage failures become a failed report.
    pub async fn run(&self) -> RunReport {
        tracing::info!("Running pipeline");
        match self.run_stages().await {
            Ok(report) => {
                if report.success {
                    tracing::info!("Pipeline run finished: {}", report.message);
                } else {
                    tracing::error!("Pipeline run failed: {}", report.message);
                }
                report
            }
            Err(e) => {
                tracing::error!("Pipeline run aborted: {}", e);
                RunReport::failure(format!("Pipeline run aborted: {}", e))
            }
        }
    }

    async fn run_stages(&self) -> Result<RunReport, Error> {
        let sources = self.sources.list_sources().await?;
        if sources.is_empty() {
            return Ok(RunReport::failure(NO_SOURCES));
        }

        // FETCH
        let targets: Vec<FetchTarget> = sources.iter().map(FetchTarget::from).collect();
        let mut pages = self.router.fetch_multiple(&targets).await;
        let fetched: Vec<(&Source, String)> = sources
            .iter()
            .filter_map(|source| pages.remove(&source.url).flatten().map(|html| (source, html)))
            .collect();
        if fetched.is_empty() {
            return Ok(RunReport {
                sources_checked: sources.len(),
                ..RunReport::failure(NO_PAGES_FETCHED)
            });
        }

        // EXTRACT
        let mut raw_counts: HashMap<i32, usize> = HashMap::new();
        let mut candidates: Vec<CandidateJob> = Vec::new();
        for (source, html) in &fetched {
            let cleaned = self.extractor.clean(html);
            let extracted = self.extractor.extract_cleaned(&cleaned, &source.url).await;
            raw_counts.insert(source.id, extracted.len());
            if extracted.is_empty() {
                continue;
            }
            let present = self.verifier.verify_integrity(extracted, &cleaned).await;
            tracing::info!("{}: {} jobs after existence check", source.name, present.len());
            candidates.extend(present);
        }
        let total_parsed: usize = raw_counts.values().sum();

        // DEDUPE
        let fresh = find_new(self.jobs.as_ref(), candidates).await?;

        // VERIFY
        let verified = self.verify_details(fresh).await;

        // PERSIST + NOTIFY
        let saved = self.jobs.save(&verified).await?;
        if !verified.is_empty() {
            self.notify(&verified).await;
        }

        // STATS_UPDATE
        let checked_at = Utc::now();
        for (source, _) in &fetched {
            let count = raw_counts.get(&source.id).copied().unwrap_or_default();
            match self
                .sources
                .update_source_stats(source.id, i32::try_from(count).unwrap_or(i32::MAX), checked_at)
                .await
            {
                Ok(()) => tracing::info!("Updated {}: {} jobs found in this run", source.name, count),
                Err(e) => tracing::warn!("Could not update stats for {}: {}", source.name, e),
            }
        }
        for source in sources.iter().filter(|s| !fetched.iter().any(|(f, _)| f.id == s.id)) {
            tracing::warn!("Skipped stats update for {} (fetch failed)", source.name);
        }

        Ok(RunReport {
            success: true,
            message: format!("Found {} new jobs", saved),
            new_jobs: saved,
            total_parsed,
            sources_checked: sources.len(),
            sources_successful: fetched.len(),
        })
    }

    /// Keeps the jobs whose own page confirms them. Jobs without a link can't be checked and are dropped.
    async fn verify_details(&self, fresh: Vec<NewJob>) -> Vec<NewJob> {
        if fresh.is_empty() {
            return fresh;
        }
        tracing::info!("Checking detail pages of {} new candidates", fresh.len());

        let mut verified = Vec::with_capacity(fresh.len());
        for job in fresh {
            if job.url.is_empty() {
                tracing::debug!("Dropped '{}': no link to a detail page", job.title);
                continue;
            }
            if self.verifier.check_detail_page(&self.router, &job.to_candidate()).await {
                tracing::info!("Verified: {}", job.title);
                verified.push(job);
            } else {
                tracing::warn!("Rejected: {} (detail page check failed)", job.title);
            }
        }
        verified
    }

    async fn notify(&self, jobs: &[NewJob]) {
        match self.notifier.send(jobs).await {
            Ok(()) => {
                let ids: Vec<String> = jobs.iter().map(|j| j.job_id.clone()).collect();
                if let Err(e) = self.jobs.mark_notified(&ids).await {
                    tracing::warn!("Notification sent but jobs not marked as notified: {}", e);
                }
            }
            Err(e) => tracing::warn!("Could not send notification for {} jobs: {}", jobs.len(), e),
        }
    }
}
