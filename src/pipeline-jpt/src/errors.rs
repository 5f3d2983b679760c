use core_jpt::ConfigError;
use core_jpt::llms::LlmError;
use data_model_jpt::store::StoreError;

#[derive(Debug)]
pub enum Error {
    StoreError(StoreError),
    CoreError(core_jpt::Error),
    ConfigError(ConfigError),
    LlmError(LlmError),
    /// The scheduler controller task has stopped and no longer accepts commands.
    SchedulerUnavailable,
}

impl std::fmt::Display for Error {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::StoreError(store_error) => write!(f, "Storage error: {}", store_error),
            Self::CoreError(core_error) => write!(f, "{}", core_error),
            Self::ConfigError(config_error) => write!(f, "Configuration error: {}", config_error),
            Self::LlmError(llm_error) => write!(f, "LLM setup error: {}", llm_error),
            Self::SchedulerUnavailable => write!(f, "The scheduler is not running."),
        }
    }
}

impl std::error::Error for Error {}

impl From<StoreError> for Error {
    fn from(error: StoreError) -> Self {
        Self::StoreError(error)
    }
}

impl From<core_jpt::Error> for Error {
    fn from(error: core_jpt::Error) -> Self {
        Self::CoreError(error)
    }
}

impl From<ConfigError> for Error {
    fn from(error: ConfigError) -> Self {
        Self::ConfigError(error)
    }
}

impl From<LlmError> for Error {
    fn from(error: LlmError) -> Self {
        Self::LlmError(error)
    }
}
