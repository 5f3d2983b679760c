//! Storage for persisted jobs and configured sources.
//!
//! Each operation is a single statement and therefore its own atomic unit.
//! The job table is append-only apart from the `notified` flag and the
//! confirmation-gated [`JobStore::clear_all`].

use std::collections::HashSet;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use diesel::OptionalExtension;
use diesel::dsl::count_star;
use diesel::prelude::*;
use diesel_async::RunQueryDsl;

use crate::db::DbPool;
use crate::models::{CompanyCount, NewJob, NewSource, PersistedJob, Source, UNKNOWN_COMPANY};
use crate::schema::{jobs, sources};

/// The exact text an operator must supply to wipe the job table.
pub const CLEAR_ALL_CONFIRMATION: &str = "DELETE_ALL_JOBS_PERMANENTLY";

#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("Database error: {0}")]
    Db(#[from] diesel::result::Error),
    #[error("Database pool error: {0}")]
    Pool(String),
    #[error("Confirmation token rejected: the job table was not cleared")]
    ConfirmationRejected,
}

impl<E: std::fmt::Debug> From<deadpool::managed::PoolError<E>> for StoreError {
    fn from(error: deadpool::managed::PoolError<E>) -> Self {
        Self::Pool(format!("{:?}", error))
    }
}

/// Rejects anything but the exact confirmation text.
pub fn check_confirmation(token: &str) -> Result<(), StoreError> {
    if token == CLEAR_ALL_CONFIRMATION {
        Ok(())
    } else {
        Err(StoreError::ConfirmationRejected)
    }
}

#[async_trait]
pub trait JobStore: Send + Sync {
    /// The subset of `job_ids` already present in the job table.
    async fn known_job_ids(&self, job_ids: &[String]) -> Result<HashSet<String>, StoreError>;

    /// Inserts the jobs, silently skipping any whose `job_id` is already stored.
    /// Returns the number of rows actually inserted.
    async fn save(&self, jobs: &[NewJob]) -> Result<usize, StoreError>;

    async fn mark_notified(&self, job_ids: &[String]) -> Result<usize, StoreError>;

    /// Most recently seen first.
    async fn list_jobs(&self, limit: i64) -> Result<Vec<PersistedJob>, StoreError>;

    async fn count_jobs(&self) -> Result<i64, StoreError>;

    /// Jobs per company, largest first.
    async fn company_counts(&self) -> Result<Vec<CompanyCount>, StoreError>;

    /// Deletes every job (never sources). Requires [`CLEAR_ALL_CONFIRMATION`].
    async fn clear_all(&self, confirmation: &str) -> Result<usize, StoreError>;
}

#[async_trait]
pub trait SourceStore: Send + Sync {
    /// Newest first.
    async fn list_sources(&self) -> Result<Vec<Source>, StoreError>;

    /// Returns the new id, or `None` when a source with the same URL already exists.
    async fn add_source(&self, source: &NewSource) -> Result<Option<i32>, StoreError>;

    /// False when no source has this id.
    async fn delete_source(&self, id: i32) -> Result<bool, StoreError>;

    async fn count_sources(&self) -> Result<i64, StoreError>;

    async fn update_source_stats(&self, id: i32, job_count: i32, checked_at: DateTime<Utc>) -> Result<(), StoreError>;
}

/// Postgres-backed store.
#[derive(Clone)]
pub struct PgStore {
    pool: DbPool,
}

impl PgStore {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }

    pub fn pool(&self) -> &DbPool {
        &self.pool
    }
}

#[async_trait]
impl JobStore for PgStore {
    async fn known_job_ids(&self, job_ids: &[String]) -> Result<HashSet<String>, StoreError> {
        if job_ids.is_empty() {
            return Ok(HashSet::new());
        }
        let mut conn = self.pool.get().await?;
        let found = jobs::table
            .filter(jobs::job_id.eq_any(job_ids))
            .select(jobs::job_id)
            .load::<String>(&mut conn)
            .await?;
        Ok(found.into_iter().collect())
    }

    async fn save(&self, new_jobs: &[NewJob]) -> Result<usize, StoreError> {
        if new_jobs.is_empty() {
            return Ok(0);
        }
        let mut conn = self.pool.get().await?;
        let inserted = diesel::insert_into(jobs::table)
            .values(new_jobs)
            .on_conflict_do_nothing()
            .execute(&mut conn)
            .await?;
        tracing::debug!("Inserted {} of {} jobs", inserted, new_jobs.len());
        Ok(inserted)
    }

    async fn mark_notified(&self, job_ids: &[String]) -> Result<usize, StoreError> {
        if job_ids.is_empty() {
            return Ok(0);
        }
        let mut conn = self.pool.get().await?;
        let updated = diesel::update(jobs::table.filter(jobs::job_id.eq_any(job_ids)))
            .set(jobs::notified.eq(true))
            .execute(&mut conn)
            .await?;
        Ok(updated)
    }

    async fn list_jobs(&self, limit: i64) -> Result<Vec<PersistedJob>, StoreError> {
        let mut conn = self.pool.get().await?;
        let rows = jobs::table
            .order(jobs::first_seen.desc())
            .limit(limit)
            .select(PersistedJob::as_select())
            .load(&mut conn)
            .await?;
        Ok(rows)
    }

    async fn count_jobs(&self) -> Result<i64, StoreError> {
        let mut conn = self.pool.get().await?;
        Ok(jobs::table.count().get_result::<i64>(&mut conn).await?)
    }

    async fn company_counts(&self) -> Result<Vec<CompanyCount>, StoreError> {
        let mut conn = self.pool.get().await?;
        let rows = jobs::table
            .group_by(jobs::company)
            .select((jobs::company, count_star()))
            .order(count_star().desc())
            .load::<(Option<String>, i64)>(&mut conn)
            .await?;
        Ok(rows
            .into_iter()
            .map(|(company, count)| CompanyCount {
                company: company.unwrap_or_else(|| UNKNOWN_COMPANY.to_string()),
                count,
            })
            .collect())
    }

    async fn clear_all(&self, confirmation: &str) -> Result<usize, StoreError> {
        check_confirmation(confirmation)?;
        let mut conn = self.pool.get().await?;
        let deleted = diesel::delete(jobs::table).execute(&mut conn).await?;
        tracing::warn!("Cleared {} jobs from the job table", deleted);
        Ok(deleted)
    }
}

#[async_trait]
impl SourceStore for PgStore {
    async fn list_sources(&self) -> Result<Vec<Source>, StoreError> {
        let mut conn = self.pool.get().await?;
        let rows = sources::table
            .order(sources::created_at.desc())
            .select(Source::as_select())
            .load(&mut conn)
            .await?;
        Ok(rows)
    }

    async fn add_source(&self, source: &NewSource) -> Result<Option<i32>, StoreError> {
        let mut conn = self.pool.get().await?;
        let id = diesel::insert_into(sources::table)
            .values(source)
            .on_conflict(sources::url)
            .do_nothing()
            .returning(sources::id)
            .get_result::<i32>(&mut conn)
            .await
            .optional()?;
        Ok(id)
    }

    async fn delete_source(&self, id: i32) -> Result<bool, StoreError> {
        let mut conn = self.pool.get().await?;
        let deleted = diesel::delete(sources::table.find(id)).execute(&mut conn).await?;
        Ok(deleted > 0)
    }

    async fn count_sources(&self) -> Result<i64, StoreError> {
        let mut conn = self.pool.get().await?;
        Ok(sources::table.count().get_result::<i64>(&mut conn).await?)
    }

    async fn update_source_stats(&self, id: i32, job_count: i32, checked_at: DateTime<Utc>) -> Result<(), StoreError> {
        let mut conn = self.pool.get().await?;
        diesel::update(sources::table.find(id))
            .set((sources::job_count.eq(job_count), sources::last_checked.eq(Some(checked_at))))
            .execute(&mut conn)
            .await?;
        Ok(())
    }
}
