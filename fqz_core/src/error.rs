use std::path::PathBuf;

use thiserror::Error;

/// Exit codes stable across releases.
pub const EXIT_OK: i32 = 0;
pub const EXIT_USAGE: i32 = 1;
pub const EXIT_IO: i32 = 2;
pub const EXIT_FORMAT: i32 = 3;
pub const EXIT_CHECKSUM: i32 = 4;
pub const EXIT_UNSUPPORTED_CODEC: i32 = 5;
pub const EXIT_INVALID_STATE: i32 = 6;
pub const EXIT_CANCELLED: i32 = 7;

/// Every variant is a *kind*, not a wrapped foreign type: callers match on
/// the kind to decide exit codes and CLI messaging rather than leaning on
/// `anyhow::Error` for everything.
#[derive(Error, Debug)]
pub enum FqzError {
    #[error("usage error: {0}")]
    Usage(String),

    #[error("I/O error at {path:?} (offset {offset:?}): {source}")]
    Io {
        path: Option<PathBuf>,
        offset: Option<u64>,
        #[source]
        source: std::io::Error,
    },

    #[error("format error: {0}")]
    Format(String),

    #[error("checksum mismatch in block {block_id:?}: expected {expected:016x}, got {actual:016x}")]
    Checksum {
        block_id: Option<u32>,
        expected: u64,
        actual: u64,
    },

    #[error("unsupported codec: family=0x{family:x} version=0x{version:x}")]
    UnsupportedCodec { family: u8, version: u8 },

    #[error("invalid state: {0}")]
    InvalidState(String),

    #[error("operation cancelled")]
    Cancelled,
}

impl FqzError {
    pub fn exit_code(&self) -> i32 {
        match self {
            FqzError::Usage(_) => EXIT_USAGE,
            FqzError::Io { .. } => EXIT_IO,
            FqzError::Format(_) => EXIT_FORMAT,
            FqzError::Checksum { .. } => EXIT_CHECKSUM,
            FqzError::UnsupportedCodec { .. } => EXIT_UNSUPPORTED_CODEC,
            FqzError::InvalidState(_) => EXIT_INVALID_STATE,
            FqzError::Cancelled => EXIT_CANCELLED,
        }
    }

    pub fn io(source: std::io::Error) -> Self {
        FqzError::Io { path: None, offset: None, source }
    }

    pub fn io_at(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        FqzError::Io { path: Some(path.into()), offset: None, source }
    }

    pub fn io_at_offset(path: impl Into<PathBuf>, offset: u64, source: std::io::Error) -> Self {
        FqzError::Io { path: Some(path.into()), offset: Some(offset), source }
    }
}

impl From<std::io::Error> for FqzError {
    fn from(e: std::io::Error) -> Self {
        FqzError::io(e)
    }
}

pub type Result<T> = std::result::Result<T, FqzError>;
