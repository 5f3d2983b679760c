pub mod common;
pub mod config;
pub mod errors;
pub mod extract;
pub mod fetch;
pub mod html;
pub mod llms;
pub mod verify;

pub use common::logging::setup_logging;
pub use config::{AppConfig, ConfigError, EmailConfig, SmtpConfig};
pub use errors::Error;
pub use extract::Extractor;
pub use fetch::{FetchRouter, FetchTarget};
pub use verify::{InconclusivePolicy, Verifier};
