// Copyright (c) The nextest Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Read and write VSTest TRX reports in Rust.
//!
//! A TRX report is a single [`TestRun`]. [`TestRun::load`] and [`TestRun::save`] convert between
//! files and the in-memory model, and the model round-trips: for any run whose
//! [`relative_results_directory`](UnitTestResult::relative_results_directory) fields are
//! cleared, loading a saved run produces an equal run.
//!
//! Reading doesn't depend on XML namespaces. Documents with or without the default TRX namespace,
//! or with prefixed element names, are read identically.

mod deserialize;
mod errors;
mod report;
mod serialize;
#[cfg(test)]
mod test_helpers;

pub use errors::*;
pub use report::*;
