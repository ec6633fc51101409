use thiserror::Error;

use super::types::PageId;

/// Buffer pool error types
#[derive(Error, Debug)]
pub enum BufPoolError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("buffer pool exhausted: no free or evictable frames")]
    PoolExhausted,

    #[error("invalid page ID: {0}")]
    InvalidPageId(PageId),
}

pub type Result<T> = std::result::Result<T, BufPoolError>;
