use thiserror::Error;

#[derive(Debug, Error)]
pub enum EngineError {
    #[error("worker task failed: {0}")]
    Worker(#[from] tokio::task::JoinError),
}
