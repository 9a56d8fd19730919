//! Debian kernel header resolution.
//!
//! Debian splits what an out-of-tree build needs across three packages:
//! `linux-headers-<abi>-<flavour>`, `linux-headers-<abi>-common` and
//! `linux-kbuild-<major>.<minor>`. Header packages are looked up on the
//! security mirrors first and the kernel.org archive last; kbuild comes from
//! the kernel.org archive, under `linux-tools/` for 3.x kernels.
//!
//! Two filename generations are recognised. Older pools list packages by the
//! ABI string the release was given in, e.g.
//! `linux-headers-5.10.0-8-amd64_5.10.46-4_amd64.deb` for `5.10.0-8-amd64`;
//! a release given as a Debian package version (`5.10.103-1`) matches the
//! newer form `linux-headers-5.10.0-12-amd64_5.10.103-1_amd64.deb`.

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
pub const ID: &str = "debian";

/// Header package mirrors, in priority order.
pub const HEADER_MIRRORS: &[&str] = &[
    "http://security-cdn.debian.org/pool/main/l/linux/",
    "http://security-cdn.debian.org/pool/updates/main/l/linux/",
    "https://mirrors.edge.kernel.org/debian/pool/main/l/linux/",
];

/// kbuild package mirrors, in priority order.
pub const KBUILD_MIRRORS: &[&str] = &[
    "http://mirrors.kernel.org/debian/pool/main/l/linux/",
    "https://mirrors.edge.kernel.org/debian/pool/main/l/linux/",
];

/// kbuild package mirrors for 3.x kernels, whose kbuild was built from the
/// separate `linux-tools` source package.
pub const LEGACY_KBUILD_MIRRORS: &[&str] = &[
    "http://mirrors.kernel.org/debian/pool/main/l/linux-tools/",
    "https://mirrors.edge.kernel.org/debian/pool/main/l/linux-tools/",
];

/// Headers, common headers, and kbuild.
pub const MIN_ARTIFACTS: usize = 3;

/// The Debian family builder.
#[derive(Debug, Clone, Copy, Default)]
pub struct Debian;

/// Release-derived fragments shared by the header patterns.
struct HeaderNaming {
    /// Extraversion with the architecture and `-cloud` suffixes removed.
    extraversion: String,
    /// Flavour group of the headers package (`amd64`, `cloud-amd64`).
    flavour: String,
}

impl HeaderNaming {
    fn new(release: &KernelRelease) -> Self {
        let arch = release.architecture().as_str();
        let full = release.full_extraversion();
        let without_arch = full.strip_suffix(&format!("-{arch}")).unwrap_or(full);

        if full.contains("-cloud") {
            Self {
                extraversion: without_arch
                    .strip_suffix("-cloud")
                    .unwrap_or(without_arch)
                    .to_owned(),
                flavour: format!("cloud-{arch}"),
            }
        } else {
            Self {
                extraversion: without_arch.to_owned(),
                flavour: arch.to_owned(),
            }
        }
    }
}

/// Older and newer `linux-headers` schemes for one flavour group.
fn header_schemes(
    release: &KernelRelease,
    extraversion: &str,
    group: &str,
) -> Result<Vec<NamingScheme>, regex::Error> {
    let (v, p, s) = (release.version(), release.patch_level(), release.sublevel());
    let extra = escape(extraversion);
    let group = escape(group);
    let arch = escape(release.architecture().as_str());

    Ok(vec![
        NamingScheme::new(
            "abi",
            &format!(r#"href="(linux-headers-{v}\.{p}\.{s}{extra}-({group})_[^"]*({arch}|all)\.deb)""#),
        )?,
        NamingScheme::new(
            "package-version",
            &format!(
                r#"href="(linux-headers-[0-9]+\.[0-9]+\.[0-9]+-[0-9]+-({group})_{v}\.{p}\.{s}{extra}_({arch}|all)\.deb)""#
            ),
        )?,
    ])
}

fn kbuild_schemes(release: &KernelRelease) -> Result<Vec<NamingScheme>, regex::Error> {
    let (v, p) = (release.version(), release.patch_level());
    let arch = escape(release.architecture().as_str());
    Ok(vec![NamingScheme::new(
        "kbuild",
        &format!(r#"href="(linux-kbuild-{v}\.{p}_[^"]*{arch}\.deb)""#),
    )?])
}

fn mirrors(list: &[&str]) -> Vec<String> {
    list.iter().map(|m| (*m).to_owned()).collect()
}

fn invalid(role: ArtifactRole) -> impl FnOnce(regex::Error) -> ResolutionError {
    move |err| ResolutionError::InvalidPattern {
        role,
        reason: err.to_string(),
    }
}

impl Builder for Debian {
    fn id(&self) -> &'static str {
        ID
    }

    fn plan(&self, release: &KernelRelease) -> Result<ResolutionPlan, ResolutionError> {
        let naming = HeaderNaming::new(release);
        let kbuild_mirrors = if release.version() == 3 {
            LEGACY_KBUILD_MIRRORS
        } else {
            KBUILD_MIRRORS
        };

        let headers = RoleSearch {
            role: ArtifactRole::Headers,
            mirrors: mirrors(HEADER_MIRRORS),
            matcher: PackageIndexMatcher::new(
                header_schemes(release, &naming.extraversion, &naming.flavour)
                    .map_err(invalid(ArtifactRole::Headers))?,
            ),
        };
        let common = RoleSearch {
            role: ArtifactRole::CommonHeaders,
            mirrors: mirrors(HEADER_MIRRORS),
            matcher: PackageIndexMatcher::new(
                header_schemes(release, &naming.extraversion, "common")
                    .map_err(invalid(ArtifactRole::CommonHeaders))?,
            ),
        };
        let kbuild = RoleSearch {
            role: ArtifactRole::BuildSupport,
            mirrors: mirrors(kbuild_mirrors),
            matcher: PackageIndexMatcher::new(
                kbuild_schemes(release).map_err(invalid(ArtifactRole::BuildSupport))?,
            ),
        };

        Ok(ResolutionPlan {
            searches: vec![headers, common, kbuild],
            min_artifacts: MIN_ARTIFACTS,
        })
    }

    fn synthesize(
        &self,
        config: &BuildConfig,
        release: &KernelRelease,
        artifacts: &ResolvedArtifactSet,
    ) -> Result<String, SynthesisError> {
        TemplateData::new(config, release, artifacts).render(templates::DEBIAN_KERNEL)
    }
}

#[cfg(test)]
#[path = "debian_tests.rs"]
mod tests;
