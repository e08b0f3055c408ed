// Copyright (c) The nextest Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Merge VSTest TRX reports into a single report.
//!
//! Test suites that are sharded across machines, or run once per target framework, produce one
//! TRX file per run. This crate combines them into one report with a single result per test, and
//! a summary recomputed from those results.
//!
//! # Examples
//!
//! ```no_run
//! use camino::Utf8Path;
//! use trx_merge::{DedupPolicy, TrxMerger};
//!
//! let merged = TrxMerger::new()
//!     .with_dedup_policy(DedupPolicy::LastInput)
//!     .merge(&["shard-1.trx", "shard-2.trx"], Utf8Path::new("merged.trx"))?;
//! println!("{} results", merged.results.len());
//! # Ok::<(), trx_merge::MergeError>(())
//! ```

#![warn(missing_docs)]

pub mod config;
pub mod discover;
mod dispatch;
pub mod errors;
mod exit_codes;
pub mod helpers;
mod merge;
mod output;

#[doc(hidden)]
pub use dispatch::*;
pub use errors::{ExpectedError, MergeError};
pub use exit_codes::TrxMergeExitCode;
pub use merge::*;
#[doc(hidden)]
pub use output::OutputContext;
