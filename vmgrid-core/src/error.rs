use thiserror::Error;

/// Error taxonomy for the allocation and lifecycle core.
///
/// Interactive callers receive these directly and can distinguish retryable
/// causes (different parameters may succeed) from validation failures.
/// Scheduled jobs log `Upstream` per item and skip; `Persistence` aborts the
/// current batch and the job retries on its next tick.
#[derive(Error, Debug)]
pub enum GridError {
    #[error("validation failed: {0}")]
    Validation(String),

    #[error("no network address available")]
    ResourceExhausted,

    #[error("placement rejected: {0}")]
    PlacementRejected(String),

    #[error("upstream fabric failure: {0}")]
    Upstream(String),

    #[error("persistence failure: {0}")]
    Persistence(String),

    #[error("not found: {0}")]
    NotFound(String),
}

pub type Result<T> = std::result::Result<T, GridError>;
