use thiserror::Error;

/// Hostname trie error types
#[derive(Error, Debug)]
pub enum TrieError {
    #[error("Parse error at line {line}: {message}")]
    ParseErrorAtLine { line: usize, message: String },

    #[error("Invalid hostname: {0}")]
    InvalidHostname(String),

    #[error("Snapshot too small: {len} bytes, need at least {min}")]
    SnapshotTooSmall { len: usize, min: usize },

    #[error("Corrupt snapshot: {0}")]
    CorruptSnapshot(String),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, TrieError>;
