use thiserror::Error;

/// Client-side rejections raised before any request is sent.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("Keyword cannot be empty")]
    EmptyKeyword,

    #[error("Keyword '{0}' is already in the list")]
    DuplicateKeyword(String),

    #[error("Select a category first")]
    NoCategorySelected,

    #[error("Source name cannot be empty")]
    EmptySourceName,

    #[error("Invalid source URL: {0}")]
    InvalidSourceUrl(String),

    #[error("Invalid schedule time '{0}': expected HH:MM")]
    InvalidScheduleTime(String),

    #[error("Unknown timezone '{0}'")]
    UnknownTimezone(String),
}
