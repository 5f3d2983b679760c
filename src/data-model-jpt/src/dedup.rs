use std::collections::HashSet;

use crate::models::{CandidateJob, NewJob};
use crate::store::{JobStore, StoreError};

/// Keeps the candidates whose fingerprint isn't stored yet, fingerprinting each one once.
///
/// A fingerprint repeated within `candidates` is kept only the first time, so a single run
/// never promotes (or notifies) the same job twice.
pub async fn find_new<S>(store: &S, candidates: Vec<CandidateJob>) -> Result<Vec<NewJob>, StoreError>
where
    S: JobStore + ?Sized,
{
    let fingerprinted: Vec<(String, CandidateJob)> = candidates.into_iter().map(|c| (c.fingerprint(), c)).collect();
    let ids: Vec<String> = fingerprinted.iter().map(|(id, _)| id.clone()).collect();
    let known = store.known_job_ids(&ids).await?;

    let mut seen_this_batch: HashSet<String> = HashSet::new();
    let fresh: Vec<NewJob> = fingerprinted
        .into_iter()
        .filter(|(id, _)| !known.contains(id) && seen_this_batch.insert(id.clone()))
        .map(|(id, candidate)| NewJob::from_candidate(id, candidate))
        .collect();

    tracing::debug!(
        "{} of {} candidates are new ({} already stored)",
        fresh.len(),
        ids.len(),
        known.len()
    );
    Ok(fresh)
}
