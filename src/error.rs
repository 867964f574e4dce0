//! Unified error types for the pellet gauge.
//!
//! Estimation itself never fails: missing inputs, unknown levels and
//! degenerate calibrations are absorbed and logged where they happen.  What
//! remains fallible is the plumbing around it (configuration, storage,
//! encoding, lifecycle misuse), and every such failure funnels into
//! [`Error`].

use core::fmt;

use crate::app::listeners::ListenerError;
use crate::app::ports::{ConfigError, StorageError};
use crate::app::service::Lifecycle;

// ---------------------------------------------------------------------------
// Top-level error
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq)]
pub enum Error {
    /// Configuration is invalid or could not be loaded.
    Config(ConfigError),
    /// The persistence backend failed.
    Storage(StorageError),
    /// Persisted state could not be encoded or decoded.
    Codec(CodecError),
    /// Operation requires an active tracker.
    Lifecycle(Lifecycle),
    /// Listener registration failed.
    Listener(ListenerError),
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Config(e) => write!(f, "config: {e}"),
            Self::Storage(e) => write!(f, "storage: {e}"),
            Self::Codec(e) => write!(f, "codec: {e}"),
            Self::Lifecycle(state) => write!(f, "tracker is {state}, not active"),
            Self::Listener(e) => write!(f, "listener: {e}"),
        }
    }
}

impl std::error::Error for Error {}

impl From<ConfigError> for Error {
    fn from(e: ConfigError) -> Self {
        Self::Config(e)
    }
}

impl From<StorageError> for Error {
    fn from(e: StorageError) -> Self {
        Self::Storage(e)
    }
}

impl From<CodecError> for Error {
    fn from(e: CodecError) -> Self {
        Self::Codec(e)
    }
}

impl From<ListenerError> for Error {
    fn from(e: ListenerError) -> Self {
        Self::Listener(e)
    }
}

// ---------------------------------------------------------------------------
// Codec errors
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CodecError {
    /// Serialisation failed.
    Encode,
    /// Stored bytes are not a valid state blob.
    Decode,
    /// Stored blob was written by an incompatible schema.
    UnsupportedVersion(u16),
}

impl fmt::Display for CodecError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Encode => write!(f, "encode failed"),
            Self::Decode => write!(f, "decode failed"),
            Self::UnsupportedVersion(v) => write!(f, "unsupported schema version {v}"),
        }
    }
}

// ---------------------------------------------------------------------------
// Convenience Result alias
// ---------------------------------------------------------------------------

/// Crate-wide `Result` alias.
pub type Result<T> = core::result::Result<T, Error>;
