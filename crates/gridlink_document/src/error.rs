//! Error types for the document dialect.

use thiserror::Error;

/// Problems with stored bytes, reported as the source of an operation error.
#[derive(Debug, Error)]
pub enum DocumentError {
    /// A counter value is not an 8-byte big-endian integer.
    #[error("corrupted counter: expected 8 bytes, found {length}")]
    CorruptedCounter {
        /// Number of bytes found.
        length: usize,
    },

    /// A stored document could not be decoded.
    #[error("corrupted document: {message}")]
    CorruptedDocument {
        /// Description of the problem.
        message: String,
    },

    /// A write kept losing compare-and-swap races.
    #[error("gave up after {attempts} concurrent modification retries")]
    Contention {
        /// Attempts made.
        attempts: u32,
    },
}

impl DocumentError {
    /// Creates a corrupted document error.
    pub fn corrupted_document(message: impl Into<String>) -> Self {
        Self::CorruptedDocument {
            message: message.into(),
        }
    }
}
