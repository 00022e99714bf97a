//! Crate-wide error type.
//!
//! Errors fall into two groups:
//! - integration errors: the guest reported an address/size that does not fit its own memory,
//!   the ROM is empty, a required export is missing, or the guest trapped. These are fatal and
//!   the embedder should stop driving the session.
//! - input edge cases: a feature the guest does not export, or an event that arrived before boot.
//!   The dispatch loop logs and drops these.

use crate::loader::LoadError;

/// Result alias used throughout the crate.
pub type Result<T, E = BridgeError> = core::result::Result<T, E>;

#[derive(Debug, thiserror::Error)]
pub enum BridgeError {
    #[error(transparent)]
    Load(#[from] LoadError),

    #[error(transparent)]
    Config(#[from] crate::config::ConfigError),

    #[error("failed to set up the wasm runtime: {0:#}")]
    Runtime(anyhow::Error),

    #[error("guest does not export a linear memory named `memory`")]
    MissingMemory,

    #[error("guest is missing required export `{0}`")]
    MissingExport(&'static str),

    #[error("guest does not export `{0}`")]
    Unsupported(&'static str),

    #[error("guest range {addr:#x}+{len:#x} exceeds its {size:#x}-byte memory")]
    OutOfRange { addr: u64, len: usize, size: usize },

    #[error("guest string at {addr:#x} has no NUL terminator")]
    UnterminatedString { addr: u32 },

    #[error("ROM image is empty")]
    EmptyRom,

    #[error("guest trapped in `{entry}`: {trap:#}")]
    Trap {
        entry: &'static str,
        trap: wasmtime::Error,
    },

    #[error("guest faulted earlier and no longer accepts calls")]
    Faulted,

    #[error("session is not running")]
    NotRunning,
}

impl BridgeError {
    /// Whether the session must stop after this error.
    pub fn is_fatal(&self) -> bool {
        !matches!(self, BridgeError::Unsupported(_) | BridgeError::NotRunning)
    }
}
