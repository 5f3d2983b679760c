//! Prints what is stored: job and source counts, the configured sources and the latest jobs.
//! Flags sources whose recorded job count disagrees with the jobs stored for them.

use anyhow::Context;
use clap::Parser;
use core_jpt::common::db_env::get_db_pool;
use data_model_jpt::store::{JobStore, PgStore, SourceStore};

#[derive(Parser)]
#[command(name = "check-db")]
#[command(about = "Summarizes the stored jobs and sources", long_about = None)]
struct Cli {
    /// How many of the most recent jobs to list.
    #[arg(short, long, default_value_t = 10)]
    limit: i64,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    let cli = Cli::parse();

    let store = PgStore::new(get_db_pool().await);

    let job_count = store.count_jobs().await.context("Cannot count jobs")?;
    let source_count = store.count_sources().await.context("Cannot count sources")?;
    println!("Jobs: {}", job_count);
    println!("Sources: {}", source_count);

    if job_count == 0 {
        println!("No jobs stored yet: either a fresh install or the table was cleared.");
    }

    let all_jobs = store.list_jobs(job_count).await.context("Cannot list jobs")?;
    let mut mismatched = 0;
    println!("\nSources:");
    for source in store.list_sources().await.context("Cannot list sources")? {
        let checked = source
            .last_checked
            .map(|t| t.to_rfc3339())
            .unwrap_or_else(|| "never".to_string());
        println!(
            "  [{}] {} {} (browser: {}, last checked: {})",
            source.id, source.name, source.url, source.requires_browser, checked
        );
        let stored = source.matched_jobs(&all_jobs);
        if source.job_count_matches(&all_jobs) {
            println!("      jobs: {} (matches stored jobs)", source.job_count);
        } else {
            mismatched += 1;
            println!(
                "      MISMATCH: recorded job count {} but {} stored jobs come from this source",
                source.job_count, stored
            );
        }
    }
    if mismatched > 0 {
        println!("{} source(s) have stale counts; the next pipeline run updates them.", mismatched);
    }

    println!("\nLatest jobs:");
    for job in store.list_jobs(cli.limit).await.context("Cannot list jobs")? {
        println!(
            "  {} | {} | {} | notified: {} | {}",
            job.first_seen.format("%Y-%m-%d %H:%M"),
            job.title,
            job.company.as_deref().unwrap_or("Unknown"),
            job.notified,
            job.url.as_deref().unwrap_or("")
        );
    }
    Ok(())
}
