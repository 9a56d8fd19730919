//! Build request configuration.
//!
//! [`BuildConfig`] names the driver being built, where its source archive
//! lives, which artifacts the generated script should produce, and,
//! optionally, kernel artifact URLs that bypass resolution. It can be read
//! from a TOML file whose keys mirror the struct fields.

use camino::{Utf8Path, Utf8PathBuf};
use serde::Deserialize;
use thiserror::Error;

/// Driver name used when none is configured.
pub const DEFAULT_DRIVER_NAME: &str = "falco";

/// Errors raised while loading a configuration file.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// The file could not be read.
    #[error("failed to read config file {path}")]
    Read {
        /// The path that was read.
        path: Utf8PathBuf,
        /// The underlying I/O error.
        #[source]
        source: std::io::Error,
    },

    /// The file is not valid TOML or contains unknown keys.
    #[error("invalid config: {reason}")]
    Parse {
        /// The parser's message.
        reason: String,
    },
}

/// What to build and where to put it.
#[derive(Clone, Debug, Deserialize, Eq, PartialEq)]
#[serde(default, deny_unknown_fields)]
pub struct BuildConfig {
    /// Driver version; also the source archive's basename.
    pub driver_version: String,
    /// Driver display name; the kernel module is `<driver_name>.ko`.
    pub driver_name: String,
    /// Where the built kernel module is written. No module is built when
    /// unset.
    pub module_path: Option<Utf8PathBuf>,
    /// Where the built eBPF probe is copied. No probe is built when unset.
    pub probe_path: Option<Utf8PathBuf>,
    /// Kernel artifact URLs used instead of resolving them from mirrors.
    pub kernel_urls: Option<Vec<String>>,
    /// Base URL hosting `<driver_version>.tar.gz`.
    pub download_base_url: String,
}

impl Default for BuildConfig {
    fn default() -> Self {
        Self {
            driver_version: String::new(),
            driver_name: DEFAULT_DRIVER_NAME.to_owned(),
            module_path: None,
            probe_path: None,
            kernel_urls: None,
            download_base_url: String::new(),
        }
    }
}

impl BuildConfig {
    /// Parse a configuration from TOML text.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Parse`] for malformed TOML or unknown keys.
    ///
    /// # Examples
    ///
    /// ```
    /// use driverforge::config::BuildConfig;
    ///
    /// let config = BuildConfig::from_toml_str(
    ///     "driver_version = \"2.0.0\"\nmodule_path = \"/out/falco.ko\"\n",
    /// )
    /// .expect("valid config");
    /// assert!(config.builds_module());
    /// assert!(!config.builds_probe());
    /// ```
    pub fn from_toml_str(text: &str) -> Result<Self, ConfigError> {
        toml::from_str(text).map_err(|e| ConfigError::Parse {
            reason: e.to_string(),
        })
    }

    /// Read and parse a configuration file.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Read`] if the file cannot be read, or
    /// [`ConfigError::Parse`] if its contents are invalid.
    pub fn load(path: &Utf8Path) -> Result<Self, ConfigError> {
        let text = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_owned(),
            source,
        })?;
        Self::from_toml_str(&text)
    }

    /// URL of the driver's source archive.
    #[must_use]
    pub fn module_download_url(&self) -> String {
        format!(
            "{}/{}.tar.gz",
            self.download_base_url.trim_end_matches('/'),
            self.driver_version
        )
    }

    /// Whether the script should build the kernel module.
    #[must_use]
    pub fn builds_module(&self) -> bool {
        self.module_path.as_ref().is_some_and(|p| !p.as_str().is_empty())
    }

    /// Whether the script should build the eBPF probe.
    #[must_use]
    pub fn builds_probe(&self) -> bool {
        self.probe_path.as_ref().is_some_and(|p| !p.as_str().is_empty())
    }
}
