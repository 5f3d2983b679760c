//! Deletes every stored job. Sources are kept.
//!
//! Usage: clear-jobs DELETE_ALL_JOBS_PERMANENTLY

use anyhow::Context;
use clap::Parser;
use core_jpt::common::db_env::get_db_pool;
use data_model_jpt::store::{CLEAR_ALL_CONFIRMATION, JobStore, PgStore};

#[derive(Parser)]
#[command(name = "clear-jobs")]
#[command(about = "Permanently deletes every stored job (sources are kept)", long_about = None)]
struct Cli {
    /// Must be exactly DELETE_ALL_JOBS_PERMANENTLY.
    confirmation: String,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    let cli = Cli::parse();

    let store = PgStore::new(get_db_pool().await);
    let before = store.count_jobs().await.context("Cannot count stored jobs")?;
    println!("Jobs currently stored: {}", before);

    match store.clear_all(&cli.confirmation).await {
        Ok(deleted) => {
            println!("Deleted {} jobs. Every posting will be treated as new on the next run.", deleted);
            Ok(())
        }
        Err(e) => {
            eprintln!("{}", e);
            eprintln!("Re-run with the confirmation argument: clear-jobs {}", CLEAR_ALL_CONFIRMATION);
            std::process::exit(1)
        }
    }
}
