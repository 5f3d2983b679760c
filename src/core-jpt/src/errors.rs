use crate::llms::LlmError;

/// Custom error type for page fetching, prompt construction & LLM calls.
#[derive(Debug)]
pub enum Error {
    /// Cannot fetch a page because the URL is invalid.
    InvalidUrl(url::ParseError),

    /// HTTP download failed.
    DownloadError(reqwest::Error),

    /// HTTP download returned a non-success status.
    HttpStatus(u16),

    /// Headless browser could not be launched or failed while rendering.
    BrowserError(String),

    /// The fetch did not finish within its time budget.
    Timeout(std::time::Duration),

    /// Internal error: prompt substitution failed.
    PromptCreationFailure(subst::Error),

    /// Error calling the LLM.
    LlmError(LlmError),
}

impl std::fmt::Display for Error {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Error::InvalidUrl(err) => write!(f, "Not a valid URL: {}", err),
            Error::DownloadError(err) => write!(f, "Download error: {}", err),
            Error::HttpStatus(status) => write!(f, "Server responded with HTTP {}", status),
            Error::BrowserError(msg) => write!(f, "Browser error: {}", msg),
            Error::Timeout(limit) => write!(f, "Timed out after {:?}", limit),
            Error::PromptCreationFailure(err) => write!(f, "Failed to create prompt: {}", err),
            Error::LlmError(err) => write!(f, "Error calling LLM: {}", err),
        }
    }
}

impl std::error::Error for Error {}

/// Request errors occur during the download process.
impl From<reqwest::Error> for Error {
    fn from(err: reqwest::Error) -> Self {
        Error::DownloadError(err)
    }
}

/// URL parsing errors occur during the URL validation process.
impl From<url::ParseError> for Error {
    fn from(err: url::ParseError) -> Self {
        Error::InvalidUrl(err)
    }
}

impl From<chromiumoxide::error::CdpError> for Error {
    fn from(err: chromiumoxide::error::CdpError) -> Self {
        Error::BrowserError(err.to_string())
    }
}

impl From<subst::Error> for Error {
    fn from(err: subst::Error) -> Self {
        Error::PromptCreationFailure(err)
    }
}

impl From<LlmError> for Error {
    fn from(err: LlmError) -> Self {
        Error::LlmError(err)
    }
}
