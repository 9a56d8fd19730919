//! driverforge CLI entrypoint.
//!
//! Resolves kernel artifacts for a target distro and kernel release and
//! either prints the generated build script or the artifact URLs. Nothing
//! is built locally.

mod cli;
mod error;

use std::io::Write;

use camino::Utf8Path;
use clap::Parser;
use driverforge::config::BuildConfig;
use driverforge::fetch::{HttpFetcher, IndexFetcher};
use driverforge::registry;
use driverforge::release::KernelRelease;
use driverforge::resolver::ResolvedArtifactSet;
use log::debug;
use serde::Serialize;

use crate::cli::{Cli, Command, ResolveArgs, ScriptArgs, TargetArgs};
use crate::error::{CliError, Result};

/// JSON document printed by `resolve --json`.
#[derive(Debug, Serialize)]
struct ResolveReport<'a> {
    target: &'a str,
    kernel_release: &'a KernelRelease,
    artifacts: &'a ResolvedArtifactSet,
}

fn main() {
    let cli = Cli::parse();
    let mut stdout = std::io::stdout();
    let mut stderr = std::io::stderr();
    let run_result = run(&cli, &HttpFetcher, &mut stdout, &mut stderr);
    let exit_code = exit_code_for_run_result(run_result, &mut stderr);
    if exit_code != 0 {
        std::process::exit(exit_code);
    }
}

fn run(
    cli: &Cli,
    fetcher: &dyn IndexFetcher,
    stdout: &mut dyn Write,
    stderr: &mut dyn Write,
) -> Result<()> {
    match &cli.command {
        Command::Script(args) => run_script(args, fetcher, stdout, stderr),
        Command::Resolve(args) => run_resolve(args, fetcher, stdout),
        Command::Targets => run_targets(stdout),
    }
}

fn run_script(
    args: &ScriptArgs,
    fetcher: &dyn IndexFetcher,
    stdout: &mut dyn Write,
    stderr: &mut dyn Write,
) -> Result<()> {
    let config = build_config_for_args(args)?;
    let release = parse_release(&args.target)?;
    let script = registry().build_script_with(fetcher, &args.target.target, &config, &release)?;

    match &args.output {
        Some(path) => write_script_file(path, &script)?,
        None => stdout.write_all(script.as_bytes()).map_err(CliError::Stdout)?,
    }

    if !args.quiet {
        let destination = args.output.as_ref().map_or("stdout", |p| p.as_str());
        write_stderr_line(
            stderr,
            format!(
                "wrote {} build script for {release} to {destination}",
                args.target.target
            ),
        );
    }
    Ok(())
}

fn run_resolve(
    args: &ResolveArgs,
    fetcher: &dyn IndexFetcher,
    stdout: &mut dyn Write,
) -> Result<()> {
    let release = parse_release(&args.target)?;
    let config = BuildConfig {
        kernel_urls: args.target.overrides(),
        ..BuildConfig::default()
    };
    let artifacts = registry().resolve_with(fetcher, &args.target.target, &config, &release)?;

    if args.json {
        let report = ResolveReport {
            target: &args.target.target,
            kernel_release: &release,
            artifacts: &artifacts,
        };
        let json = serde_json::to_string_pretty(&report)?;
        writeln!(stdout, "{json}").map_err(CliError::Stdout)?;
    } else {
        for url in artifacts.urls() {
            writeln!(stdout, "{url}").map_err(CliError::Stdout)?;
        }
    }
    Ok(())
}

fn run_targets(stdout: &mut dyn Write) -> Result<()> {
    for id in registry().ids() {
        writeln!(stdout, "{id}").map_err(CliError::Stdout)?;
    }
    Ok(())
}

fn parse_release(args: &TargetArgs) -> Result<KernelRelease> {
    Ok(KernelRelease::parse(&args.kernel_release, &args.architecture)?)
}

/// Load the config file, if any, then apply command-line overrides.
fn build_config_for_args(args: &ScriptArgs) -> Result<BuildConfig> {
    let mut config = match &args.config {
        Some(path) => BuildConfig::load(path)?,
        None => BuildConfig::default(),
    };

    if let Some(version) = &args.driver_version {
        config.driver_version.clone_from(version);
    }
    if let Some(name) = &args.driver_name {
        config.driver_name.clone_from(name);
    }
    if let Some(base) = &args.download_base_url {
        config.download_base_url.clone_from(base);
    }
    if args.module_path.is_some() {
        config.module_path.clone_from(&args.module_path);
    }
    if args.probe_path.is_some() {
        config.probe_path.clone_from(&args.probe_path);
    }
    if let Some(urls) = args.target.overrides() {
        config.kernel_urls = Some(urls);
    }

    debug!("effective build config: {config:?}");
    Ok(config)
}

fn write_script_file(path: &Utf8Path, script: &str) -> Result<()> {
    std::fs::write(path, script).map_err(|source| CliError::WriteOutput {
        path: path.to_owned(),
        source,
    })
}

fn exit_code_for_run_result(result: Result<()>, stderr: &mut dyn Write) -> i32 {
    match result {
        Ok(()) => 0,
        Err(err) => {
            write_stderr_line(stderr, format_args!("error: {err}"));
            1
        }
    }
}

fn write_stderr_line(stderr: &mut dyn Write, message: impl std::fmt::Display) {
    if writeln!(stderr, "{message}").is_err() {
        // Best-effort logging; ignore write failures.
    }
}

#[cfg(test)]
#[path = "main_tests.rs"]
mod tests;
