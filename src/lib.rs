//! # stagehand
//!
//! Rebuilds a build-output staging directory from a declarative manifest.
//!
//! A run clears (or creates) the staging root, then copies each pre-built
//! artifact into its named group folder, in declared order:
//!
//! - **Fail-fast**: the first missing source or failed copy stops the run and
//!   names the entry
//! - **Atomic mode**: build in a hidden work directory and swap it in only
//!   when every copy succeeded
//! - **Presets**: reusable manifests, including the socket client/server layout
//! - **Verify**: compare a staged tree with its manifest, byte for byte

pub mod cli;
pub mod common;
pub mod presets;
pub mod stager;

pub use common::errors::{RunFailure, StageError};
pub use stager::{plan, run_manifest, verify, Manifest, RunOptions, RunReport, StagingManager, Strategy};
