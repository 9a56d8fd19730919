//! Kernel release parsing.
//!
//! A [`KernelRelease`] is the dotted `version.patchlevel.sublevel` triple of a
//! kernel plus the free-form suffix distributions append to it (the
//! "extraversion", e.g. `-8-amd64` or `-12-cloud-amd64`) and the target CPU
//! architecture. Every resolver derives its package filename patterns from
//! this value.

use std::fmt;

use serde::Serialize;
use thiserror::Error;

/// Errors raised while parsing a kernel release or architecture.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ReleaseError {
    /// The version string does not start with a dotted numeric prefix.
    #[error("invalid kernel release \"{value}\": expected <version>.<patchlevel>[.<sublevel>][extraversion]")]
    InvalidVersion {
        /// The rejected version string.
        value: String,
    },

    /// The architecture token is not one of the supported values.
    #[error("unsupported architecture \"{value}\"; expected one of: {expected}")]
    UnsupportedArchitecture {
        /// The rejected architecture token.
        value: String,
        /// Comma-separated list of accepted tokens.
        expected: String,
    },
}

/// Target CPU architecture of a kernel release.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(into = "&'static str")]
pub enum Architecture {
    /// 64-bit x86.
    Amd64,
    /// 64-bit ARM.
    Arm64,
}

impl Architecture {
    /// Canonical tokens, in the form Debian package names use them.
    const SUPPORTED: &'static [&'static str] = &["amd64", "arm64"];

    /// Return the canonical (Debian style) token for this architecture.
    ///
    /// # Examples
    ///
    /// ```
    /// use driverforge::release::Architecture;
    ///
    /// let arch = Architecture::parse("x86_64").expect("known alias");
    /// assert_eq!(arch.as_str(), "amd64");
    /// ```
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Amd64 => "amd64",
            Self::Arm64 => "arm64",
        }
    }

    /// Parse an architecture token, accepting both the Debian and the
    /// `uname -m` spelling.
    ///
    /// # Errors
    ///
    /// Returns [`ReleaseError::UnsupportedArchitecture`] for any other token.
    pub fn parse(value: &str) -> Result<Self, ReleaseError> {
        match value.trim() {
            "amd64" | "x86_64" => Ok(Self::Amd64),
            "arm64" | "aarch64" => Ok(Self::Arm64),
            other => Err(ReleaseError::UnsupportedArchitecture {
                value: other.to_owned(),
                expected: Self::SUPPORTED.join(", "),
            }),
        }
    }
}

impl From<Architecture> for &'static str {
    fn from(value: Architecture) -> Self {
        value.as_str()
    }
}

impl fmt::Display for Architecture {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A parsed kernel release targeted by a build request.
///
/// Values are immutable once parsed; equality is structural, so parsing the
/// same inputs twice yields equal values.
///
/// # Examples
///
/// ```
/// use driverforge::release::{Architecture, KernelRelease};
///
/// let release = KernelRelease::parse("5.10.0-8-amd64", "amd64").expect("valid release");
/// assert_eq!((release.version(), release.patch_level(), release.sublevel()), (5, 10, 0));
/// assert_eq!(release.full_extraversion(), "-8-amd64");
/// assert_eq!(release.architecture(), Architecture::Amd64);
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
pub struct KernelRelease {
    version: u32,
    patch_level: u32,
    sublevel: u32,
    full_extraversion: String,
    architecture: Architecture,
}

/// Characters that may open an extraversion.
const EXTRAVERSION_SEPARATORS: [char; 5] = ['-', '.', '+', '_', '~'];

/// Split a leading decimal number without leading zeros off `text`.
fn leading_number(text: &str) -> Option<(u32, &str)> {
    let end = text
        .find(|c: char| !c.is_ascii_digit())
        .unwrap_or(text.len());
    let (digits, rest) = text.split_at(end);
    if digits.is_empty() || (digits.len() > 1 && digits.starts_with('0')) {
        return None;
    }
    digits.parse().ok().map(|number| (number, rest))
}

fn is_extraversion(text: &str) -> bool {
    text.is_empty() || text.starts_with(EXTRAVERSION_SEPARATORS)
}

impl KernelRelease {
    /// Build a release from its parts.
    #[must_use]
    pub fn new(
        version: u32,
        patch_level: u32,
        sublevel: u32,
        full_extraversion: impl Into<String>,
        architecture: Architecture,
    ) -> Self {
        Self {
            version,
            patch_level,
            sublevel,
            full_extraversion: full_extraversion.into(),
            architecture,
        }
    }

    /// Parse a version string such as `4.19.0-6-cloud-amd64` together with an
    /// architecture hint.
    ///
    /// A missing sublevel (`5.10-rc1`) is read as `0`. Everything following
    /// the dotted prefix becomes the full extraversion untouched.
    ///
    /// # Errors
    ///
    /// Returns [`ReleaseError::InvalidVersion`] when no dotted prefix can be
    /// extracted, or [`ReleaseError::UnsupportedArchitecture`] when the
    /// architecture hint is unknown.
    pub fn parse(value: &str, architecture: &str) -> Result<Self, ReleaseError> {
        let architecture = Architecture::parse(architecture)?;
        let trimmed = value.trim();
        let invalid = || ReleaseError::InvalidVersion {
            value: value.to_owned(),
        };

        let (version, rest) = leading_number(trimmed).ok_or_else(invalid)?;
        let rest = rest.strip_prefix('.').ok_or_else(invalid)?;
        let (patch_level, rest) = leading_number(rest).ok_or_else(invalid)?;
        let (sublevel, extraversion) = match rest.strip_prefix('.').and_then(leading_number) {
            Some((sublevel, extraversion)) if is_extraversion(extraversion) => {
                (sublevel, extraversion)
            }
            _ => (0, rest),
        };
        if !is_extraversion(extraversion) {
            return Err(invalid());
        }

        Ok(Self {
            version,
            patch_level,
            sublevel,
            full_extraversion: extraversion.to_owned(),
            architecture,
        })
    }

    /// The major kernel version.
    #[must_use]
    pub const fn version(&self) -> u32 {
        self.version
    }

    /// The minor kernel version.
    #[must_use]
    pub const fn patch_level(&self) -> u32 {
        self.patch_level
    }

    /// The patch component of the dotted triple.
    #[must_use]
    pub const fn sublevel(&self) -> u32 {
        self.sublevel
    }

    /// The distribution suffix following the dotted triple.
    #[must_use]
    pub fn full_extraversion(&self) -> &str {
        &self.full_extraversion
    }

    /// The target architecture.
    #[must_use]
    pub const fn architecture(&self) -> Architecture {
        self.architecture
    }

    /// The dotted triple, e.g. `5.10.0`.
    #[must_use]
    pub fn full_version(&self) -> String {
        format!("{}.{}.{}", self.version, self.patch_level, self.sublevel)
    }
}

impl fmt::Display for KernelRelease {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}{} ({})",
            self.full_version(),
            self.full_extraversion,
            self.architecture
        )
    }
}
