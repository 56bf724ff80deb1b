use thiserror::Error;

/// Infrastructure failures from the expiring store and the notification transport.
#[derive(Debug, Error)]
pub enum ServiceError {
    #[error("storage error: {0}")]
    Storage(String),
    #[error("transport error: {0}")]
    Transport(String),
    #[error("codec error: {0}")]
    Codec(#[from] serde_json::Error),
}

impl From<redis::RedisError> for ServiceError {
    fn from(e: redis::RedisError) -> Self { Self::Storage(e.to_string()) }
}

impl From<lapin::Error> for ServiceError {
    fn from(e: lapin::Error) -> Self { Self::Transport(e.to_string()) }
}
