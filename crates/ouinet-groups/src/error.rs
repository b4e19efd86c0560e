use thiserror::Error;

/// Failure modes of resource-group persistence.
#[derive(Debug, Error)]
pub enum GroupsError {
    #[error("i/o error: {0}")]
    Io(#[from] std::io::Error),
    #[error("invalid group name: {0}")]
    InvalidGroupName(#[from] ouinet_core::CoreError),
}
