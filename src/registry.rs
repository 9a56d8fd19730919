//! Builder registry.
//!
//! The table from distro-family identifier to [`Builder`] is constructed
//! once, on first use, and is read-only afterwards; concurrent lookups need
//! no locking.

use std::collections::BTreeMap;
use std::sync::OnceLock;

use log::debug;

use crate::builder::Builder;
use crate::builder::debian::Debian;
use crate::builder::vanilla::Vanilla;
use crate::config::BuildConfig;
use crate::error::{BuildError, Result};
use crate::fetch::{HttpFetcher, IndexFetcher};
use crate::release::KernelRelease;
use crate::resolver::ResolvedArtifactSet;

/// Immutable mapping from identifier to builder.
pub struct BuilderRegistry {
    builders: BTreeMap<&'static str, Box<dyn Builder>>,
}

impl BuilderRegistry {
    /// Build a registry from an explicit list of builders.
    ///
    /// A later builder with the same identifier replaces an earlier one.
    #[must_use]
    pub fn new(builders: Vec<Box<dyn Builder>>) -> Self {
        Self {
            builders: builders.into_iter().map(|b| (b.id(), b)).collect(),
        }
    }

    /// The registry of every built-in family.
    #[must_use]
    pub fn with_builtin_families() -> Self {
        let builders: Vec<Box<dyn Builder>> = vec![Box::new(Debian), Box::new(Vanilla)];
        Self::new(builders)
    }

    /// Registered identifiers in sorted order.
    #[must_use]
    pub fn ids(&self) -> Vec<&'static str> {
        self.builders.keys().copied().collect()
    }

    /// Look up the builder for `id`.
    ///
    /// # Errors
    ///
    /// Returns [`BuildError::UnsupportedDistro`] when no builder is
    /// registered under `id`.
    pub fn lookup(&self, id: &str) -> Result<&dyn Builder> {
        self.builders
            .get(id)
            .map(|builder| &**builder)
            .ok_or_else(|| BuildError::UnsupportedDistro {
                id: id.to_owned(),
                supported: self.ids().join(", "),
            })
    }

    /// Resolve the kernel artifacts `id` needs for `release`, using
    /// `config.kernel_urls` in place of resolution when set.
    ///
    /// # Errors
    ///
    /// Returns [`BuildError::UnsupportedDistro`] or a wrapped
    /// [`crate::resolver::ResolutionError`].
    pub fn resolve_with(
        &self,
        fetcher: &dyn IndexFetcher,
        id: &str,
        config: &BuildConfig,
        release: &KernelRelease,
    ) -> Result<ResolvedArtifactSet> {
        let builder = self.lookup(id)?;
        Ok(builder.resolve(fetcher, release, config.kernel_urls.as_deref())?)
    }

    /// Resolve and render the build script for `id`.
    ///
    /// # Errors
    ///
    /// Returns the first failure of lookup, resolution, or synthesis.
    pub fn build_script_with(
        &self,
        fetcher: &dyn IndexFetcher,
        id: &str,
        config: &BuildConfig,
        release: &KernelRelease,
    ) -> Result<String> {
        let builder = self.lookup(id)?;
        let artifacts = builder.resolve(fetcher, release, config.kernel_urls.as_deref())?;
        debug!(
            "rendering {id} script for {release} with {} artifacts",
            artifacts.len()
        );
        Ok(builder.synthesize(config, release, &artifacts)?)
    }
}

/// The process-wide registry of built-in families.
#[must_use]
pub fn registry() -> &'static BuilderRegistry {
    static REGISTRY: OnceLock<BuilderRegistry> = OnceLock::new();
    REGISTRY.get_or_init(BuilderRegistry::with_builtin_families)
}

/// Resolve and render the build script for `id` against live mirrors.
///
/// # Errors
///
/// Returns the first failure of lookup, resolution, or synthesis.
///
/// # Examples
///
/// ```no_run
/// use driverforge::config::BuildConfig;
/// use driverforge::registry::build_script;
/// use driverforge::release::KernelRelease;
///
/// let release = KernelRelease::parse("5.10.0-8-amd64", "amd64")?;
/// let config = BuildConfig {
///     driver_version: "2.0.0".to_owned(),
///     module_path: Some("/out/falco.ko".into()),
///     download_base_url: "https://download.example/driver".to_owned(),
///     ..BuildConfig::default()
/// };
/// let script = build_script("debian", &config, &release)?;
/// assert!(script.starts_with("#!/bin/bash"));
/// # Ok::<(), driverforge::error::BuildError>(())
/// ```
pub fn build_script(id: &str, config: &BuildConfig, release: &KernelRelease) -> Result<String> {
    registry().build_script_with(&HttpFetcher, id, config, release)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fetch::MockIndexFetcher;
    use crate::release::Architecture;
    use rstest::rstest;

    #[test]
    fn builtin_families_are_registered() {
        assert_eq!(registry().ids(), vec!["debian", "vanilla"]);
    }

    #[rstest]
    #[case("debian")]
    #[case("vanilla")]
    fn lookup_returns_matching_builder(#[case] id: &str) {
        let builder = registry().lookup(id).expect("registered");
        assert_eq!(builder.id(), id);
    }

    #[test]
    fn unknown_family_is_unsupported() {
        let err = registry().lookup("slackware").err().expect("not registered");
        match err {
            BuildError::UnsupportedDistro { id, supported } => {
                assert_eq!(id, "slackware");
                assert_eq!(supported, "debian, vanilla");
            }
            other => panic!("expected UnsupportedDistro, got {other:?}"),
        }
    }

    #[test]
    fn unknown_family_fails_before_any_network_access() {
        let mut fetcher = MockIndexFetcher::new();
        fetcher.expect_fetch_index().times(0);
        fetcher.expect_probe().times(0);

        let release = KernelRelease::new(5, 10, 0, "-8-amd64", Architecture::Amd64);
        let result =
            registry().build_script_with(&fetcher, "slackware", &BuildConfig::default(), &release);
        assert!(matches!(result, Err(BuildError::UnsupportedDistro { .. })));
    }

    #[test]
    fn override_urls_bypass_mirrors() {
        let mut fetcher = MockIndexFetcher::new();
        fetcher.expect_fetch_index().times(0);
        fetcher.expect_probe().times(1).returning(|_| Ok(()));

        let config = BuildConfig {
            kernel_urls: Some(vec!["https://override.test/linux-6.1.55.tar.xz".to_owned()]),
            ..BuildConfig::default()
        };
        let release = KernelRelease::new(6, 1, 55, "", Architecture::Amd64);
        let script = registry()
            .build_script_with(&fetcher, "vanilla", &config, &release)
            .expect("override satisfies vanilla");
        assert!(script.contains("'https://override.test/linux-6.1.55.tar.xz'"));
    }

    #[test]
    fn registry_is_shared_across_threads() {
        let handles: Vec<_> = (0..4)
            .map(|_| std::thread::spawn(|| registry().ids().len()))
            .collect();
        for handle in handles {
            assert_eq!(handle.join().expect("thread completes"), 2);
        }
    }
}
