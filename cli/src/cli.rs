//! CLI argument definitions for driverforge.
//!
//! Kept apart from the entrypoint so parsing can be tested without touching
//! the network.

use camino::Utf8PathBuf;
use clap::{Args, Parser, Subcommand};

/// Generate kernel driver build scripts.
#[derive(Parser, Debug)]
#[command(name = "driverforge")]
#[command(version, about)]
#[command(long_about = concat!(
    "Generate kernel driver build scripts.\n\n",
    "driverforge locates the kernel headers a distribution publishes for a ",
    "given kernel release, then writes a shell script that downloads them ",
    "and builds a kernel module and/or eBPF probe against them. The script ",
    "is meant to run inside a throwaway build container.",
))]
#[command(after_help = concat!(
    "EXAMPLES:\n",
    "  Generate a module build script for a Debian kernel:\n",
    "    $ driverforge script -t debian -k 5.10.0-8-amd64 -a amd64 \\\n",
    "        --driver-version 2.0.0 --module-path /out/falco.ko \\\n",
    "        --download-base-url https://download.example/driver\n\n",
    "  Show which packages would be downloaded:\n",
    "    $ driverforge resolve -t debian -k 5.10.0-8-amd64 -a amd64 --json\n\n",
    "  List supported targets:\n",
    "    $ driverforge targets",
))]
pub struct Cli {
    /// Subcommand to execute.
    #[command(subcommand)]
    pub command: Command,
}

/// Available subcommands.
#[derive(Subcommand, Debug)]
pub enum Command {
    /// Resolve kernel artifacts and print the build script.
    Script(ScriptArgs),
    /// Resolve kernel artifacts and print their URLs.
    Resolve(ResolveArgs),
    /// List supported distro families.
    Targets,
}

/// The kernel a build is for.
#[derive(Args, Debug, Clone)]
pub struct TargetArgs {
    /// Distro family identifier (see `driverforge targets`).
    #[arg(short, long)]
    pub target: String,

    /// Kernel release as reported by `uname -r`.
    #[arg(short, long = "kernelrelease", value_name = "RELEASE")]
    pub kernel_release: String,

    /// Target architecture.
    #[arg(short, long, default_value = "amd64")]
    pub architecture: String,

    /// Kernel package URL to use instead of searching mirrors (repeatable).
    #[arg(long = "kernel-url", value_name = "URL")]
    pub kernel_urls: Vec<String>,
}

/// Arguments for the script command.
#[derive(Args, Debug, Clone)]
pub struct ScriptArgs {
    /// Kernel selection.
    #[command(flatten)]
    pub target: TargetArgs,

    /// TOML build configuration; flags below take precedence.
    #[arg(short, long, value_name = "FILE")]
    pub config: Option<Utf8PathBuf>,

    /// Driver source version to download.
    #[arg(long)]
    pub driver_version: Option<String>,

    /// Name of the built kernel module, without `.ko`.
    #[arg(long)]
    pub driver_name: Option<String>,

    /// Where the script places the built kernel module.
    #[arg(long, value_name = "PATH")]
    pub module_path: Option<Utf8PathBuf>,

    /// Where the script places the built eBPF probe.
    #[arg(long, value_name = "PATH")]
    pub probe_path: Option<Utf8PathBuf>,

    /// Base URL the driver source tarball is downloaded from.
    #[arg(long, value_name = "URL")]
    pub download_base_url: Option<String>,

    /// Write the script to a file instead of stdout.
    #[arg(short, long, value_name = "FILE")]
    pub output: Option<Utf8PathBuf>,

    /// Suppress the summary line on stderr.
    #[arg(short, long)]
    pub quiet: bool,
}

/// Arguments for the resolve command.
#[derive(Args, Debug, Clone)]
pub struct ResolveArgs {
    /// Kernel selection.
    #[command(flatten)]
    pub target: TargetArgs,

    /// Output in JSON format for scripting.
    #[arg(long)]
    pub json: bool,
}

impl TargetArgs {
    /// Override URLs, or `None` when no `--kernel-url` was given.
    #[must_use]
    pub fn overrides(&self) -> Option<Vec<String>> {
        if self.kernel_urls.is_empty() {
            None
        } else {
            Some(self.kernel_urls.clone())
        }
    }
}

#[cfg(test)]
#[path = "cli_tests.rs"]
mod tests;
