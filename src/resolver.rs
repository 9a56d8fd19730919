//! Artifact resolution with mirror failover.
//!
//! A family describes what it needs as a [`ResolutionPlan`]: one
//! [`RoleSearch`] per artifact role, each with an ordered mirror list and a
//! [`PackageIndexMatcher`], plus the minimum number of URLs a usable set must
//! contain. [`resolve`] walks every role's mirrors in priority order, stops at
//! the first mirror that yields a match, probes the results, and applies the
//! cardinality gate.
//!
//! Transport failures on individual mirrors are logged and absorbed; only the
//! exhaustion of every candidate for a role is reported.

use std::fmt;

use log::{debug, info, warn};
use serde::Serialize;
use thiserror::Error;

use crate::fetch::{CachedFetcher, IndexFetcher};
use crate::index::PackageIndexMatcher;

/// The part a downloaded artifact plays in a kernel header tree.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum ArtifactRole {
    /// Architecture-specific kernel headers.
    Headers,
    /// Architecture-independent headers shared by every flavour.
    CommonHeaders,
    /// Host tools needed by kbuild (`fixdep`, `modpost`, ...).
    BuildSupport,
    /// A full upstream kernel source tree.
    KernelSource,
    /// A URL supplied by the caller instead of being resolved.
    Override,
}

impl ArtifactRole {
    /// A kebab-case label for messages.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Headers => "headers",
            Self::CommonHeaders => "common-headers",
            Self::BuildSupport => "build-support",
            Self::KernelSource => "kernel-source",
            Self::Override => "override",
        }
    }
}

impl fmt::Display for ArtifactRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Errors raised while resolving a family's artifacts.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ResolutionError {
    /// Every mirror and naming scheme was tried without a match for a role.
    #[error("no {role} package found on any mirror")]
    ArtifactNotFound {
        /// The unsatisfied role.
        role: ArtifactRole,
    },

    /// Some URLs were found but fewer than the family requires.
    #[error("found {found} kernel artifacts but at least {required} are required")]
    InsufficientArtifacts {
        /// How many usable URLs were found.
        found: usize,
        /// The family's minimum.
        required: usize,
    },

    /// A filename pattern built from the release failed to compile.
    #[error("invalid {role} filename pattern: {reason}")]
    InvalidPattern {
        /// The role whose pattern is broken.
        role: ArtifactRole,
        /// The regex compiler's message.
        reason: String,
    },
}

/// A resolved download URL tagged with its role.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ResolvedArtifact {
    /// The role this URL satisfies.
    pub role: ArtifactRole,
    /// The absolute download URL.
    pub url: String,
}

/// The ordered URLs a build script downloads.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct ResolvedArtifactSet(Vec<ResolvedArtifact>);

impl ResolvedArtifactSet {
    /// Wrap an ordered list of artifacts.
    #[must_use]
    pub const fn new(artifacts: Vec<ResolvedArtifact>) -> Self {
        Self(artifacts)
    }

    /// The artifacts in download order.
    #[must_use]
    pub fn artifacts(&self) -> &[ResolvedArtifact] {
        &self.0
    }

    /// The URLs in download order.
    #[must_use]
    pub fn urls(&self) -> Vec<&str> {
        self.0.iter().map(|a| a.url.as_str()).collect()
    }

    /// Number of artifacts.
    #[must_use]
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Whether the set is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

/// Where and how to look for one role.
#[derive(Debug, Clone)]
pub struct RoleSearch {
    /// The role being searched for.
    pub role: ArtifactRole,
    /// Mirror base URLs in priority order.
    pub mirrors: Vec<String>,
    /// Filename schemes applied to each mirror's index page.
    pub matcher: PackageIndexMatcher,
}

/// Everything a family needs resolved for one kernel release.
#[derive(Debug, Clone)]
pub struct ResolutionPlan {
    /// One search per required role, in download order.
    pub searches: Vec<RoleSearch>,
    /// The minimum number of reachable URLs a usable set contains.
    pub min_artifacts: usize,
}

/// Resolve a plan, or validate caller-supplied override URLs instead.
///
/// # Errors
///
/// Returns [`ResolutionError::ArtifactNotFound`] naming the first role no
/// mirror could satisfy, or [`ResolutionError::InsufficientArtifacts`] when
/// fewer than `plan.min_artifacts` URLs survive the reachability probe.
pub fn resolve(
    fetcher: &dyn IndexFetcher,
    plan: &ResolutionPlan,
    overrides: Option<&[String]>,
) -> Result<ResolvedArtifactSet, ResolutionError> {
    let candidates = match overrides {
        Some(urls) => urls
            .iter()
            .map(|url| ResolvedArtifact {
                role: ArtifactRole::Override,
                url: url.clone(),
            })
            .collect(),
        None => {
            let cached = CachedFetcher::new(fetcher);
            plan.searches
                .iter()
                .map(|search| resolve_role(&cached, search))
                .collect::<Result<Vec<_>, _>>()?
        }
    };

    let reachable = retain_reachable(fetcher, candidates);
    if reachable.len() < plan.min_artifacts {
        return Err(ResolutionError::InsufficientArtifacts {
            found: reachable.len(),
            required: plan.min_artifacts,
        });
    }
    Ok(ResolvedArtifactSet::new(reachable))
}

/// Walk one role's mirrors in order and return the first match.
///
/// # Errors
///
/// Returns [`ResolutionError::ArtifactNotFound`] when every mirror fails or
/// none of the matcher's schemes match any mirror's index.
pub fn resolve_role(
    fetcher: &dyn IndexFetcher,
    search: &RoleSearch,
) -> Result<ResolvedArtifact, ResolutionError> {
    for mirror in &search.mirrors {
        let body = match fetcher.fetch_index(mirror) {
            Ok(body) => body,
            Err(err) => {
                debug!("skipping mirror for {}: {err}", search.role);
                continue;
            }
        };

        let Some((scheme, found)) = search.matcher.first_matching(&body) else {
            debug!("no {} package listed at {mirror}", search.role);
            continue;
        };
        let Some(filename) = found.into_iter().next() else {
            continue;
        };

        info!(
            "{} resolved to {filename} at {mirror} ({} scheme)",
            search.role,
            scheme.name()
        );
        return Ok(ResolvedArtifact {
            role: search.role,
            url: join_url(mirror, &filename),
        });
    }

    Err(ResolutionError::ArtifactNotFound { role: search.role })
}

/// Drop every artifact whose URL fails its existence probe.
fn retain_reachable(
    fetcher: &dyn IndexFetcher,
    candidates: Vec<ResolvedArtifact>,
) -> Vec<ResolvedArtifact> {
    candidates
        .into_iter()
        .filter(|artifact| match fetcher.probe(&artifact.url) {
            Ok(()) => true,
            Err(err) => {
                warn!("dropping unreachable {} artifact: {err}", artifact.role);
                false
            }
        })
        .collect()
}

/// Join a mirror base URL and a filename with exactly one `/`.
#[must_use]
pub fn join_url(base: &str, filename: &str) -> String {
    format!("{}/{}", base.trim_end_matches('/'), filename.trim_start_matches('/'))
}

#[cfg(test)]
#[path = "resolver_tests.rs"]
mod tests;
