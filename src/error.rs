use thiserror::Error;

#[derive(Debug, Error)]
pub enum StaggerError {
    /// The timer worker thread could not be started.
    #[error("failed to spawn timer thread: {0}")]
    Spawn(#[from] std::io::Error),

    #[error("scheduler has been shut down")]
    SchedulerShutDown,

    #[error("invalid stagger options: {0}")]
    InvalidOptions(&'static str),
}

pub type Result<T> = std::result::Result<T, StaggerError>;
