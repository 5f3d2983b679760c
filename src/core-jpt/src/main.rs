use std::path::PathBuf;
use std::sync::Arc;

use clap::{Args, Parser, Subcommand};
use core_jpt::llms::LlmProvider;
use core_jpt::{AppConfig, Extractor, FetchRouter, Verifier, setup_logging};
use data_model_jpt::models::{CandidateJob, UNKNOWN_COMPANY, UNSPECIFIED_LOCATION};

#[derive(Parser)]
#[command(name = "core-jobs")]
#[command(about = "One-off fetch, extraction and verification of job listing pages", long_about = None)]
struct CoreCli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Download a page and print its HTML.
    Fetch {
        #[arg(value_parser = validate_url)]
        url: String,
        /// Render the page in headless Chrome instead of a plain GET.
        #[arg(short, long)]
        browser: bool,
    },

    /// Extract the jobs listed on a page and print them as JSON.
    Extract {
        #[command(flatten)]
        page: Page,
        /// Render the page in headless Chrome before extracting.
        #[arg(short, long)]
        browser: bool,
        /// Run the existence check on the extracted jobs.
        #[arg(long)]
        audit: bool,
    },

    /// Check whether a URL is the detail page of a given job.
    Verify {
        #[arg(value_parser = validate_url)]
        url: String,
        #[arg(short, long)]
        title: String,
        #[arg(short, long)]
        company: Option<String>,
    },
}

#[derive(Args)]
#[group(required = true, multiple = false)]
struct Page {
    /// The listing page URL to fetch.
    #[arg(short, long, value_parser = validate_url)]
    url: Option<String>,
    /// A pre-downloaded listing page.
    #[arg(short, long, value_parser = validate_input_file)]
    file: Option<PathBuf>,
}

fn validate_url(s: &str) -> Result<String, String> {
    url::Url::parse(s)
        .map(|_| s.to_string())
        .map_err(|e| format!("Invalid URL: {}", e))
}

fn validate_input_file(s: &str) -> Result<PathBuf, String> {
    let path = PathBuf::from(s);
    if !path.is_file() {
        return Err(format!("Input path is not a file: {}", path.display()));
    }
    Ok(path)
}

#[tokio::main]
async fn main() {
    dotenvy::dotenv().ok();
    setup_logging("core_jpt=info");
    let cli = CoreCli::parse();

    let config = match AppConfig::from_env() {
        Ok(c) => c,
        Err(e) => exit_with(&format!("Invalid configuration: {}", e)),
    };
    let router = match config.fetch_router() {
        Ok(r) => r,
        Err(e) => exit_with(&format!("Cannot set up fetching: {}", e)),
    };

    match cli.command {
        Commands::Fetch { url, browser } => match router.fetch(&url, browser).await {
            Some(html) => println!("{html}"),
            None => exit_with(&format!("Could not fetch {url}")),
        },

        Commands::Extract { page, browser, audit } => {
            let provider = llm_provider(&config);
            let (html, source_url) = page_content(&router, &page, browser).await;

            let extractor = Extractor::new(provider.clone());
            let cleaned = extractor.clean(&html);
            let mut jobs = extractor.extract_cleaned(&cleaned, &source_url).await;
            if audit {
                let verifier = Verifier::new(provider).with_policy(config.existence_check_policy);
                jobs = verifier.verify_integrity(jobs, &cleaned).await;
            }

            match serde_json::to_string_pretty(&jobs) {
                Ok(json) => println!("{json}"),
                Err(e) => exit_with(&format!("Cannot serialize jobs: {e}")),
            }
        }

        Commands::Verify { url, title, company } => {
            let verifier = Verifier::new(llm_provider(&config));
            let candidate = CandidateJob {
                title,
                company: company.unwrap_or_else(|| UNKNOWN_COMPANY.to_string()),
                location: UNSPECIFIED_LOCATION.to_string(),
                url,
                ..CandidateJob::default()
            };
            if verifier.check_detail_page(&router, &candidate).await {
                println!("YES: {} is a posting for '{}'", candidate.url, candidate.title);
            } else {
                println!("NO: {} could not be verified as a posting for '{}'", candidate.url, candidate.title);
                std::process::exit(2)
            }
        }
    }
}

fn llm_provider(config: &AppConfig) -> Arc<dyn LlmProvider> {
    match config.llm_provider() {
        Ok(p) => Arc::new(p),
        Err(e) => exit_with(&format!("Cannot set up the LLM client: {e}")),
    }
}

async fn page_content(router: &FetchRouter, page: &Page, browser: bool) -> (String, String) {
    match (&page.url, &page.file) {
        (Some(url), _) => match router.fetch(url, browser).await {
            Some(html) => (html, url.clone()),
            None => exit_with(&format!("Could not fetch {url}")),
        },
        (None, Some(file)) => match std::fs::read_to_string(file) {
            Ok(html) => (html, String::new()),
            Err(e) => exit_with(&format!("Cannot read file ({file:?}) due to: {e:?}")),
        },
        (None, None) => exit_with("Either --url or --file is required"),
    }
}

fn exit_with(message: &str) -> ! {
    eprintln!("ERROR: {message}");
    std::process::exit(1)
}
