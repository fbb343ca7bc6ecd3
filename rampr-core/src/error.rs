pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("task join error: {0}")]
    Join(#[from] tokio::task::JoinError),

    #[error("scenario catalog must not be empty")]
    EmptyCatalog,

    #[error("scenario `{0}`: `weight` must be a positive integer")]
    InvalidWeight(String),

    #[error("phase list must not be empty")]
    EmptyPhases,

    #[error("phase `{0}`: `concurrency` must be a positive integer")]
    InvalidConcurrency(String),

    #[error("phase `{0}`: `duration` must be positive")]
    InvalidDuration(String),

    #[error("invalid base url: `{0}`")]
    InvalidBaseUrl(String),

    #[error("invalid http method: `{0}`")]
    InvalidMethod(String),

    #[error("invalid request target: `{0}`")]
    InvalidTarget(String),

    #[error("target unavailable: {0}")]
    TargetUnavailable(String),
}

impl Error {
    /// True for errors that make a run invalid before any traffic is generated.
    #[must_use]
    pub fn is_configuration(&self) -> bool {
        matches!(
            self,
            Self::EmptyCatalog
                | Self::InvalidWeight(_)
                | Self::EmptyPhases
                | Self::InvalidConcurrency(_)
                | Self::InvalidDuration(_)
                | Self::InvalidBaseUrl(_)
                | Self::InvalidMethod(_)
                | Self::InvalidTarget(_)
        )
    }
}
