//! Error types for attrprobe

use thiserror::Error;

use crate::frontend::ParseError;

/// Main error type for attrprobe operations
#[derive(Error, Debug)]
pub enum AttrProbeError {
    /// A caller passed an argument that can never be valid
    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    /// The provider could not parse the source text
    #[error(transparent)]
    Parse(#[from] ParseError),

    /// The compilation produced error diagnostics
    #[error("Compilation failed with {errors} error(s): {first}")]
    CompilationFailed {
        /// Number of error diagnostics
        errors: usize,
        /// Rendering of the first error
        first: String,
    },

    /// No provider is registered under this name or extension
    #[error("Unknown compilation provider: {0}")]
    UnknownProvider(String),

    /// The provider still has sessions leased out
    #[error("Provider `{name}` still has {leases} active session(s)")]
    ProviderInUse {
        /// Provider name
        name: String,
        /// Number of live sessions
        leases: usize,
    },

    /// No declaration matches the requested path
    #[error("Declaration not found: {0}")]
    DeclarationNotFound(String),

    /// The declaration exists but has no symbol in the compilation
    #[error("No declared symbol for `{0}`")]
    SymbolNotFound(String),

    /// A library manifest could not be decoded
    #[error("Invalid library manifest: {0}")]
    Manifest(#[from] serde_json::Error),
}

/// Result type alias for attrprobe operations
pub type Result<T> = std::result::Result<T, AttrProbeError>;
