pub mod errors;
pub mod notify;
pub mod run;
pub mod scheduler;

use std::sync::Arc;

use core_jpt::AppConfig;
use core_jpt::llms::LlmProvider;
use data_model_jpt::models::NewSource;
use data_model_jpt::store::{JobStore, SourceStore};

pub use errors::Error;
pub use notify::{Delivery, Notifier, NotifyError, ResendNotifier, SmtpNotifier, notifier_for};
pub use run::{Pipeline, RunReport};
pub use scheduler::{PipelineRunner, Scheduler, SchedulerHandle, SchedulerSnapshot};

/// Wires the production pipeline: HTTP + Chrome fetching, one LLM client per key, Resend or SMTP emails.
/// Fails when no key is configured or the HTTP client can't be built.
pub fn build_pipeline<S>(config: &AppConfig, store: Arc<S>) -> Result<Pipeline, Error>
where
    S: JobStore + SourceStore + 'static,
{
    let provider: Arc<dyn LlmProvider> = Arc::new(config.llm_provider()?);
    let router = config.fetch_router()?;
    let delivery = Delivery::for_config(&config.email);
    match delivery {
        Delivery::Unconfigured => {
            tracing::warn!("Email delivery is not configured: new jobs will be saved without notification")
        }
        _ => tracing::info!("Email notifications go out via {:?}", delivery),
    }
    let notifier = notifier_for(&config.email);

    Ok(Pipeline::new(store.clone(), store, router, provider, notifier).with_policy(config.existence_check_policy))
}

/// Inserts the configured sources. Sources whose URL is already stored are left untouched.
pub async fn seed_sources<S>(store: &S, sources: &[NewSource]) -> Result<usize, Error>
where
    S: SourceStore + ?Sized,
{
    let mut added = 0;
    for source in sources {
        if store.add_source(source).await?.is_some() {
            tracing::info!("Added source {} ({})", source.name, source.url);
            added += 1;
        }
    }
    Ok(added)
}
