//! Errors surfaced by the command-line front end.

use camino::Utf8PathBuf;
use driverforge::BuildError;
use driverforge::config::ConfigError;
use driverforge::release::ReleaseError;
use thiserror::Error;

/// Errors that end a CLI run with a non-zero exit code.
#[derive(Debug, Error)]
pub enum CliError {
    /// Resolution or synthesis failed.
    #[error(transparent)]
    Build(#[from] BuildError),

    /// The script could not be written to the requested file.
    #[error("failed to write {path}: {source}")]
    WriteOutput {
        /// Destination given with `--output`.
        path: Utf8PathBuf,
        /// Underlying I/O error.
        #[source]
        source: std::io::Error,
    },

    /// Standard output was closed or unwritable.
    #[error("failed to write to stdout: {0}")]
    Stdout(#[source] std::io::Error),

    /// The resolved set could not be serialised.
    #[error("failed to serialise resolved artifacts: {0}")]
    Json(#[from] serde_json::Error),
}

impl From<ConfigError> for CliError {
    fn from(err: ConfigError) -> Self {
        Self::Build(err.into())
    }
}

impl From<ReleaseError> for CliError {
    fn from(err: ReleaseError) -> Self {
        Self::Build(err.into())
    }
}

/// Result type alias using [`CliError`].
pub type Result<T> = std::result::Result<T, CliError>;
