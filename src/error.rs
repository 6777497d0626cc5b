//! Error type for the engine.
//!
//! Malformed source text is not an error: the compiler skips characters it
//! does not understand. Errors are either resource failures (mapping memory,
//! flipping page protection), which a front end should treat as fatal, or
//! capacity checks that reject a unit before any of it runs.

use crate::common::memory::Protection;

/// Result type alias for all fallible engine operations
pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// The kernel refused to map a region
    #[error("failed to map {len} bytes: {source}")]
    Map {
        len: usize,
        #[source]
        source: std::io::Error,
    },

    /// The kernel refused a protection change
    #[error("failed to make {len} bytes {protection}: {source}")]
    Protect {
        len: usize,
        protection: Protection,
        #[source]
        source: std::io::Error,
    },

    /// The unit's machine code does not fit in the code buffer
    #[error("code buffer full: unit does not fit in {capacity} bytes")]
    CodeBufferFull { capacity: usize },

    /// The unit would pop more values than the stack holds
    #[error("stack underflow: unit needs {needed} values, {available} on the stack")]
    StackUnderflow { needed: usize, available: usize },

    /// The unit would push past the end of the stack
    #[error("stack overflow: unit needs room for {required} values, capacity is {capacity}")]
    StackOverflow { required: usize, capacity: usize },

    /// Code for this backend cannot run on the current host
    #[error("{backend} code cannot be executed on this host")]
    ForeignBackend { backend: &'static str },

    #[error("invalid configuration: {0}")]
    InvalidConfig(String),
}

impl Error {
    /// Whether the engine is still usable after this error.
    ///
    /// Rejected units leave the stack and radix exactly as they were.
    pub fn is_recoverable(&self) -> bool {
        matches!(
            self,
            Error::CodeBufferFull { .. } | Error::StackUnderflow { .. } | Error::StackOverflow { .. }
        )
    }
}
