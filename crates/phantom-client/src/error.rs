use thiserror::Error;

/// Failures surfaced by the BaaS collaborators and the local cache.
///
/// None of these are fatal to a view: callers log them, show a notice, and
/// keep whatever local state they already had.
#[derive(Debug, Error)]
pub enum ClientError {
    #[error("remote call failed: {0}")]
    Remote(String),

    #[error("not found: {0}")]
    NotFound(String),

    #[error("local cache: {0}")]
    Cache(#[from] anyhow::Error),
}

pub type Result<T> = std::result::Result<T, ClientError>;
