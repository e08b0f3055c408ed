// Copyright (c) The nextest Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Errors produced by trx-merge.

use crate::{
    exit_codes::TrxMergeExitCode,
    output::{StderrStyles, NO_HEADING_TARGET},
};
use camino::{Utf8Path, Utf8PathBuf};
use owo_colors::OwoColorize;
use quick_trx::{LoadError, SaveError};
use std::error::Error;
use thiserror::Error;

/// An error that occurred while merging reports.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum MergeError {
    /// No input reports were provided.
    #[error("no input reports were provided")]
    EmptyInput,

    /// An input report could not be read or parsed.
    #[error("failed to read input report `{path}`")]
    InputRead {
        /// The input that failed to load.
        path: Utf8PathBuf,

        /// The underlying error.
        #[source]
        err: LoadError,
    },

    /// The merged report could not be written.
    #[error("failed to write merged report to `{path}`")]
    Save {
        /// The output path.
        path: Utf8PathBuf,

        /// The underlying error.
        #[source]
        err: SaveError,
    },
}

/// An error that occurred while reading trx-merge configuration.
#[derive(Debug, Error)]
#[error("failed to parse trx-merge config at `{config_file}`")]
pub struct ConfigParseError {
    config_file: Utf8PathBuf,
    #[source]
    err: config::ConfigError,
}

impl ConfigParseError {
    pub(crate) fn new(config_file: impl Into<Utf8PathBuf>, err: config::ConfigError) -> Self {
        Self {
            config_file: config_file.into(),
            err,
        }
    }

    /// Returns the config file for this error.
    pub fn config_file(&self) -> &Utf8Path {
        &self.config_file
    }
}

/// An error that occurred while looking for input reports.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum DiscoverError {
    /// A directory could not be searched.
    #[error("failed to search directory `{path}`")]
    Walk {
        /// The directory being searched.
        path: Utf8PathBuf,

        /// The underlying error.
        #[source]
        err: walkdir::Error,
    },

    /// A path found while searching a directory is not valid UTF-8.
    #[error("path `{}` found while searching `{root}` is not valid UTF-8", .path.display())]
    NonUtf8Path {
        /// The directory being searched.
        root: Utf8PathBuf,

        /// The offending path.
        path: std::path::PathBuf,
    },

    /// Searching the inputs produced no reports.
    #[error("no .{extension} files found in the given inputs")]
    NoInputsFound {
        /// The extension searched for.
        extension: String,
    },
}

// The #[error()] strings below are placeholders. Errors are printed with display_to_stderr, which
// also prints the chain of causes.

/// An error that ends a trx-merge invocation with a documented exit code.
#[derive(Debug, Error)]
#[doc(hidden)]
pub enum ExpectedError {
    #[error("config parse error")]
    ConfigParseError {
        #[from]
        err: ConfigParseError,
    },
    #[error("input discovery error")]
    DiscoverError {
        #[from]
        err: DiscoverError,
    },
    #[error("merge error")]
    MergeError {
        #[from]
        err: MergeError,
    },
    #[error("writing summary failed")]
    WriteSummaryError {
        #[source]
        err: std::io::Error,
    },
    #[error("merged run failed")]
    TestRunFailed,
}

impl ExpectedError {
    /// Returns the exit code for the process.
    pub fn process_exit_code(&self) -> i32 {
        match self {
            Self::ConfigParseError { .. } | Self::DiscoverError { .. } => {
                TrxMergeExitCode::SETUP_ERROR
            }
            Self::MergeError { err } => match err {
                MergeError::EmptyInput => TrxMergeExitCode::SETUP_ERROR,
                MergeError::InputRead { .. } => TrxMergeExitCode::INPUT_LOAD_FAILED,
                MergeError::Save { .. } => TrxMergeExitCode::WRITE_OUTPUT_ERROR,
            },
            Self::WriteSummaryError { .. } => TrxMergeExitCode::WRITE_OUTPUT_ERROR,
            Self::TestRunFailed => TrxMergeExitCode::TEST_RUN_FAILED,
        }
    }

    /// Displays this error to stderr.
    pub fn display_to_stderr(&self, styles: &StderrStyles) {
        let mut next_error: Option<&dyn Error> = match self {
            Self::ConfigParseError { err } => {
                tracing::error!(
                    "failed to parse config at `{}`",
                    err.config_file().style(styles.bold)
                );
                err.source()
            }
            Self::DiscoverError { err } => {
                tracing::error!("{err}");
                err.source()
            }
            Self::MergeError { err } => {
                match err {
                    MergeError::EmptyInput => {
                        tracing::error!("no input reports were provided");
                    }
                    MergeError::InputRead { path, .. } => {
                        tracing::error!(
                            "failed to read input report `{}`",
                            path.style(styles.bold)
                        );
                    }
                    MergeError::Save { path, .. } => {
                        tracing::error!(
                            "failed to write merged report to `{}`",
                            path.style(styles.bold)
                        );
                    }
                }
                err.source()
            }
            Self::WriteSummaryError { err } => {
                tracing::error!("failed to write summary to stdout");
                Some(err as &dyn Error)
            }
            Self::TestRunFailed => {
                tracing::error!("merged report contains failed tests");
                None
            }
        };

        while let Some(err) = next_error {
            tracing::error!(target: NO_HEADING_TARGET, "\nCaused by:\n  {}", err);
            next_error = err.source();
        }
    }
}
