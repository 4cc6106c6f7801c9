pub mod clock;
pub mod repository;

/// Infrastructure failure reaching the engines from the durable store.
/// Kept apart from business rejections so callers can tell "try another
/// seat" from "system is down".
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("Storage unavailable: {0}")]
    Unavailable(String),
}

pub type StoreResult<T> = Result<T, StoreError>;
