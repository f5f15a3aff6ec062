use thiserror::Error;

/// Pipeline-wide error taxonomy. Variants map to the propagation policy:
/// Configuration is fatal for the affected asset/run and never retried,
/// Validation and Transient abort the current batch/asset while the run
/// continues, DataGap skips the asset.
#[derive(Error, Debug)]
pub enum PipelineError {
    #[error("configuration error: {0}")]
    Configuration(String),

    #[error("validation error: {0}")]
    Validation(String),

    #[error("transient error: {0}")]
    Transient(String),

    #[error("data gap: {0}")]
    DataGap(String),

    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),
}

pub type PipelineResult<T> = Result<T, PipelineError>;
