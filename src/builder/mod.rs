//! Per-distro builders.
//!
//! A [`Builder`] pairs artifact resolution with script synthesis for one
//! distribution family. Families differ in where their kernel artifacts live
//! and how they are unpacked; the driver download and the module and probe
//! build steps are shared and live in [`templates`].

pub mod debian;
pub mod templates;
pub mod vanilla;

use camino::Utf8Path;

use crate::config::BuildConfig;
use crate::fetch::IndexFetcher;
use crate::release::KernelRelease;
use crate::resolver::{self, ResolutionError, ResolutionPlan, ResolvedArtifactSet};
use crate::script::{self, Section, SynthesisError, TemplateVars};

/// Directory the generated script stages the driver source into.
pub const DRIVER_BUILD_DIR: &str = "/tmp/driver";

/// Path the generated script normalises the kernel header tree to.
pub const KERNEL_DIR: &str = "/tmp/kernel";

/// GCC major version the generated scripts compile with.
pub const GCC_VERSION: &str = "8";

/// Resolution and synthesis for one distribution family.
pub trait Builder: Send + Sync {
    /// The family identifier used for registry lookup.
    fn id(&self) -> &'static str;

    /// Describe which artifacts `release` needs and where to look for them.
    ///
    /// # Errors
    ///
    /// Returns [`ResolutionError::InvalidPattern`] if a filename pattern
    /// derived from `release` does not compile.
    fn plan(&self, release: &KernelRelease) -> Result<ResolutionPlan, ResolutionError>;

    /// Resolve the kernel artifact URLs for `release`, or validate
    /// `overrides` in their place.
    ///
    /// # Errors
    ///
    /// Propagates any [`ResolutionError`] from planning or resolution.
    fn resolve(
        &self,
        fetcher: &dyn IndexFetcher,
        release: &KernelRelease,
        overrides: Option<&[String]>,
    ) -> Result<ResolvedArtifactSet, ResolutionError> {
        let plan = self.plan(release)?;
        resolver::resolve(fetcher, &plan, overrides)
    }

    /// Render the build script for already-resolved artifacts.
    ///
    /// # Errors
    ///
    /// Returns [`SynthesisError`] when the family's template references data
    /// it does not provide.
    fn synthesize(
        &self,
        config: &BuildConfig,
        release: &KernelRelease,
        artifacts: &ResolvedArtifactSet,
    ) -> Result<String, SynthesisError>;
}

/// LLVM major version used for the eBPF probe, pinned by kernel major.
///
/// # Examples
///
/// ```
/// use driverforge::builder::llvm_version;
/// use driverforge::release::{Architecture, KernelRelease};
///
/// let release = KernelRelease::new(5, 10, 0, "-8-amd64", Architecture::Amd64);
/// assert_eq!(llvm_version(&release), "12");
/// ```
#[must_use]
pub const fn llvm_version(release: &KernelRelease) -> &'static str {
    match release.version() {
        5 => "12",
        _ => "7",
    }
}

/// Module build inputs; present only when a module path is configured.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ModuleBuild<'a> {
    /// Driver name; the built object is `<driver_name>.ko`.
    pub driver_name: &'a str,
    /// Where the stripped module is written.
    pub output_path: &'a Utf8Path,
}

/// Probe build inputs; present only when a probe path is configured.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProbeBuild<'a> {
    /// Where the probe object is copied.
    pub output_path: &'a Utf8Path,
    /// Pinned `clang`/`llc` major version.
    pub llvm_version: &'static str,
}

/// Everything a family template consumes, derived fresh for each render.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TemplateData<'a> {
    /// Staging directory for the driver source.
    pub driver_build_dir: &'static str,
    /// Normalised kernel header path.
    pub kernel_dir: &'static str,
    /// Driver source archive URL.
    pub module_download_url: String,
    /// Kernel artifact URLs in download order.
    pub kernel_download_urls: Vec<&'a str>,
    /// The release's extraversion, used as `LOCALVERSION`.
    pub kernel_local_version: &'a str,
    /// Canonical architecture token.
    pub architecture: &'static str,
    /// GCC major version.
    pub gcc_version: &'static str,
    /// Module section inputs.
    pub module: Option<ModuleBuild<'a>>,
    /// Probe section inputs.
    pub probe: Option<ProbeBuild<'a>>,
}

impl<'a> TemplateData<'a> {
    /// Derive template data from a request and its resolved artifacts.
    #[must_use]
    pub fn new(
        config: &'a BuildConfig,
        release: &'a KernelRelease,
        artifacts: &'a ResolvedArtifactSet,
    ) -> Self {
        let module = config
            .module_path
            .as_deref()
            .filter(|_| config.builds_module())
            .map(|output_path| ModuleBuild {
                driver_name: &config.driver_name,
                output_path,
            });
        let probe = config
            .probe_path
            .as_deref()
            .filter(|_| config.builds_probe())
            .map(|output_path| ProbeBuild {
                output_path,
                llvm_version: llvm_version(release),
            });

        Self {
            driver_build_dir: DRIVER_BUILD_DIR,
            kernel_dir: KERNEL_DIR,
            module_download_url: config.module_download_url(),
            kernel_download_urls: artifacts.urls(),
            kernel_local_version: release.full_extraversion(),
            architecture: release.architecture().as_str(),
            gcc_version: GCC_VERSION,
            module,
            probe,
        }
    }

    /// Flatten into placeholder values.
    #[must_use]
    pub fn vars(&self) -> TemplateVars {
        let mut vars = TemplateVars::new()
            .quoted("driver_build_dir", self.driver_build_dir)
            .quoted("kernel_dir", self.kernel_dir)
            .quoted("module_download_url", &self.module_download_url)
            .quoted_list("kernel_download_urls", self.kernel_download_urls.iter().copied())
            .quoted("kernel_local_version", self.kernel_local_version)
            .raw("architecture", self.architecture)
            .raw("gcc_version", self.gcc_version);

        if let Some(module) = &self.module {
            vars = vars
                .quoted("module_file", &format!("{}.ko", module.driver_name))
                .quoted("module_output_path", module.output_path.as_str());
        }
        if let Some(probe) = &self.probe {
            vars = vars
                .quoted("probe_output_path", probe.output_path.as_str())
                .raw("llvm_version", probe.llvm_version);
        }
        vars
    }

    /// The sections to render: the shared driver download, the family's
    /// kernel section, and the module and probe sections when requested.
    #[must_use]
    pub fn sections(&self, kernel: Section) -> Vec<Section> {
        let mut sections = vec![templates::DRIVER_SOURCE, kernel];
        if self.module.is_some() {
            sections.push(templates::MODULE);
        }
        if self.probe.is_some() {
            sections.push(templates::PROBE);
        }
        sections
    }

    /// Render with the given family kernel section.
    ///
    /// # Errors
    ///
    /// Returns [`SynthesisError`] for template defects.
    pub fn render(&self, kernel: Section) -> Result<String, SynthesisError> {
        script::render(&self.sections(kernel), &self.vars())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::release::Architecture;
    use crate::resolver::{ArtifactRole, ResolvedArtifact};
    use camino::Utf8PathBuf;
    use rstest::rstest;

    fn artifacts() -> ResolvedArtifactSet {
        ResolvedArtifactSet::new(vec![ResolvedArtifact {
            role: ArtifactRole::KernelSource,
            url: "https://cdn.test/linux-6.1.55.tar.xz".to_owned(),
        }])
    }

    fn config(module: Option<&str>, probe: Option<&str>) -> BuildConfig {
        BuildConfig {
            driver_version: "2.0.0".to_owned(),
            module_path: module.map(Utf8PathBuf::from),
            probe_path: probe.map(Utf8PathBuf::from),
            download_base_url: "https://download.test/driver".to_owned(),
            ..BuildConfig::default()
        }
    }

    #[rstest]
    #[case::kernel_5(5, "12")]
    #[case::kernel_3(3, "7")]
    #[case::kernel_4(4, "7")]
    #[case::kernel_6(6, "7")]
    fn llvm_is_pinned_by_kernel_major(#[case] major: u32, #[case] expected: &str) {
        let release = KernelRelease::new(major, 0, 0, "", Architecture::Amd64);
        assert_eq!(llvm_version(&release), expected);
    }

    #[rstest]
    #[case::neither(None, None, false, false)]
    #[case::module_only(Some("/out/falco.ko"), None, true, false)]
    #[case::probe_only(None, Some("/out/probe.o"), false, true)]
    #[case::both(Some("/out/falco.ko"), Some("/out/probe.o"), true, true)]
    fn optional_sections_follow_configured_paths(
        #[case] module: Option<&str>,
        #[case] probe: Option<&str>,
        #[case] has_module: bool,
        #[case] has_probe: bool,
    ) {
        let config = config(module, probe);
        let release = KernelRelease::new(6, 1, 55, "", Architecture::Amd64);
        let artifacts = artifacts();
        let data = TemplateData::new(&config, &release, &artifacts);

        let names: Vec<&str> = data
            .sections(templates::VANILLA_KERNEL)
            .iter()
            .map(|s| s.name)
            .collect();
        assert_eq!(names.contains(&templates::MODULE.name), has_module);
        assert_eq!(names.contains(&templates::PROBE.name), has_probe);
        assert!(names.starts_with(&[templates::DRIVER_SOURCE.name, templates::VANILLA_KERNEL.name]));

        data.render(templates::VANILLA_KERNEL)
            .expect("every selected section renders");
    }

    #[test]
    fn module_file_is_named_after_driver() {
        let mut config = config(Some("/out/scap.ko"), None);
        config.driver_name = "scap".to_owned();
        let release = KernelRelease::new(6, 1, 55, "", Architecture::Amd64);
        let artifacts = artifacts();
        let vars = TemplateData::new(&config, &release, &artifacts).vars();
        assert_eq!(vars.get("module_file"), Some("'scap.ko'"));
        assert!(vars.get("llvm_version").is_none());
    }
}
