use thiserror::Error;

#[derive(Error, Debug)]
pub enum MaintenanceError {
    #[error("cleanup interval must be positive")]
    ZeroInterval,

    #[error("maintenance task failed: {0}")]
    TaskFailed(#[from] tokio::task::JoinError),
}

pub type MaintenanceResult<T> = Result<T, MaintenanceError>;
