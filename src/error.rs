use thiserror::Error;

#[derive(Debug, Error)]
pub enum RetentionError {
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Failed to set retention policy for log group {log_group_name}")]
    CorrectionFailure {
        log_group_name: String,
        #[source]
        source: anyhow::Error,
    },

    #[error("Failed to set retention policy for {failed} of {total} log group(s)")]
    CorrectionFailures { failed: usize, total: usize },

    #[error("Failed to enumerate log groups")]
    EnumerationFailure(#[source] anyhow::Error),

    #[error("Invalid configuration: {0}")]
    Configuration(String),
}

pub type Result<T, E = RetentionError> = std::result::Result<T, E>;
