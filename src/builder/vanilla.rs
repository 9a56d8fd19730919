//! Upstream kernel.org source builds.
//!
//! For kernels without distribution packaging the script downloads the
//! release tarball and runs `modules_prepare` itself. kernel.org names
//! tarballs `linux-<v>.<p>.<s>.tar.xz`, except that `.0` releases are
//! published as `linux-<v>.<p>.tar.xz`.

use regex::escape;

use super::{Builder, TemplateData, templates};
use crate::config::BuildConfig;
use crate::index::{NamingScheme, PackageIndexMatcher};
use crate::release::KernelRelease;
use crate::resolver::{
    ArtifactRole, ResolutionError, ResolutionPlan, ResolvedArtifactSet, RoleSearch,
};
use crate::script::SynthesisError;

/// Registry identifier.
pub const ID: &str = "vanilla";

/// The source tarball.
pub const MIN_ARTIFACTS: usize = 1;

/// The upstream kernel builder.
#[derive(Debug, Clone, Copy, Default)]
pub struct Vanilla;

fn source_mirrors(release: &KernelRelease) -> Vec<String> {
    let major = release.version();
    vec![
        format!("https://cdn.kernel.org/pub/linux/kernel/v{major}.x/"),
        format!("https://mirrors.edge.kernel.org/pub/linux/kernel/v{major}.x/"),
    ]
}

fn source_schemes(release: &KernelRelease) -> Result<Vec<NamingScheme>, regex::Error> {
    let (v, p, s) = (release.version(), release.patch_level(), release.sublevel());
    let mut schemes = vec![NamingScheme::new(
        "full-version",
        &format!(r#"href="(linux-{v}\.{p}\.{s}\.tar\.xz)""#),
    )?];
    if s == 0 {
        schemes.push(NamingScheme::new(
            "short-version",
            &format!(r#"href="(linux-{}\.tar\.xz)""#, escape(&format!("{v}.{p}"))),
        )?);
    }
    Ok(schemes)
}

impl Builder for Vanilla {
    fn id(&self) -> &'static str {
        ID
    }

    fn plan(&self, release: &KernelRelease) -> Result<ResolutionPlan, ResolutionError> {
        let schemes = source_schemes(release).map_err(|err| ResolutionError::InvalidPattern {
            role: ArtifactRole::KernelSource,
            reason: err.to_string(),
        })?;
        Ok(ResolutionPlan {
            searches: vec![RoleSearch {
                role: ArtifactRole::KernelSource,
                mirrors: source_mirrors(release),
                matcher: PackageIndexMatcher::new(schemes),
            }],
            min_artifacts: MIN_ARTIFACTS,
        })
    }

    fn synthesize(
        &self,
        config: &BuildConfig,
        release: &KernelRelease,
        artifacts: &ResolvedArtifactSet,
    ) -> Result<String, SynthesisError> {
        TemplateData::new(config, release, artifacts).render(templates::VANILLA_KERNEL)
    }
}
