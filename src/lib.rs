//! Driverforge library.
//!
//! Resolves, for a kernel release and distribution family, the packages
//! needed to build an out-of-tree kernel module or eBPF probe against that
//! kernel, and synthesises the shell script that performs the build. The
//! script itself is executed elsewhere; this crate only talks to package
//! mirrors and produces text.
//!
//! # Modules
//!
//! - [`builder`] - Per-family resolution plans and script templates
//! - [`config`] - Build request configuration
//! - [`error`] - Top-level error type
//! - [`fetch`] - Mirror index retrieval
//! - [`index`] - Package filename matching
//! - [`registry`] - Family lookup and the `build_script` entry point
//! - [`release`] - Kernel release parsing
//! - [`resolver`] - Mirror failover and the cardinality gate
//! - [`script`] - Template rendering

pub mod builder;
pub mod config;
pub mod error;
pub mod fetch;
pub mod index;
pub mod registry;
pub mod release;
pub mod resolver;
pub mod script;

pub use config::BuildConfig;
pub use error::{BuildError, Result};
pub use registry::{BuilderRegistry, build_script, registry};
pub use release::{Architecture, KernelRelease};
