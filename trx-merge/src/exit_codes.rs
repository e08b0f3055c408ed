// Copyright (c) The nextest Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

/// Documented exit codes for `trx-merge` failures.
///
/// Unknown/unexpected failures will always result in exit code 1.
pub enum TrxMergeExitCode {}

impl TrxMergeExitCode {
    /// No errors occurred and trx-merge exited normally.
    pub const OK: i32 = 0;

    /// The merged report contains failed tests, and `--fail-on-failed-tests` was passed.
    pub const TEST_RUN_FAILED: i32 = 100;

    /// An input report could not be read or parsed.
    pub const INPUT_LOAD_FAILED: i32 = 104;

    /// Writing the merged report, or the summary on stdout, produced an error.
    pub const WRITE_OUTPUT_ERROR: i32 = 110;

    /// A user issue happened while setting up the merge: bad configuration, or no inputs.
    pub const SETUP_ERROR: i32 = 96;
}
