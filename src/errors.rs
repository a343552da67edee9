use thiserror::Error;

/// Error type for benchmark store and comparison operations.
#[derive(Debug, Error)]
pub enum BenchStoreError {
    #[error("not found: {0}")]
    NotFound(String),
    #[error("corrupt data: {0}")]
    CorruptData(String),
    #[error("io failure: {0}")]
    IoFailure(String),
    #[error("invalid argument: {0}")]
    InvalidArgument(String),
}

impl BenchStoreError {
    pub fn not_found<T: Into<String>>(msg: T) -> Self {
        BenchStoreError::NotFound(msg.into())
    }

    pub fn corrupt<T: Into<String>>(msg: T) -> Self {
        BenchStoreError::CorruptData(msg.into())
    }

    pub fn io<T: Into<String>>(msg: T) -> Self {
        BenchStoreError::IoFailure(msg.into())
    }

    pub fn invalid_argument<T: Into<String>>(msg: T) -> Self {
        BenchStoreError::InvalidArgument(msg.into())
    }

    pub fn is_not_found(&self) -> bool {
        matches!(self, BenchStoreError::NotFound(_))
    }

    pub fn is_corrupt(&self) -> bool {
        matches!(self, BenchStoreError::CorruptData(_))
    }

    pub fn is_io(&self) -> bool {
        matches!(self, BenchStoreError::IoFailure(_))
    }

    pub fn is_invalid_argument(&self) -> bool {
        matches!(self, BenchStoreError::InvalidArgument(_))
    }
}
