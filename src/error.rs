//! Top-level error type for script generation.
//!
//! Each layer has its own error enum; [`BuildError`] wraps them so callers
//! of [`crate::registry::build_script`] handle a single type.

use thiserror::Error;

use crate::config::ConfigError;
use crate::release::ReleaseError;
use crate::resolver::ResolutionError;
use crate::script::SynthesisError;

/// Errors that abort script generation. No partial script is produced.
#[derive(Debug, Error)]
pub enum BuildError {
    /// The kernel release or architecture could not be parsed.
    #[error(transparent)]
    Release(#[from] ReleaseError),

    /// No builder is registered for the requested distro family.
    #[error("unsupported target \"{id}\"; expected one of: {supported}")]
    UnsupportedDistro {
        /// The requested identifier.
        id: String,
        /// Comma-separated registered identifiers.
        supported: String,
    },

    /// Kernel artifacts could not be resolved.
    #[error(transparent)]
    Resolution(#[from] ResolutionError),

    /// The family template is defective.
    #[error("script synthesis failed: {0}")]
    Synthesis(#[from] SynthesisError),

    /// The configuration file could not be loaded.
    #[error(transparent)]
    Config(#[from] ConfigError),
}

/// Result type alias using [`BuildError`].
pub type Result<T> = std::result::Result<T, BuildError>;
