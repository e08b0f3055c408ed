// Copyright (c) The nextest Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

use crate::{
    config::TrxMergeConfig,
    discover::{discover_inputs, DiscoverOpts},
    errors::ExpectedError,
    exit_codes::TrxMergeExitCode,
    merge::{DedupPolicy, TrxMerger},
    output::{clap_styles, OutputContext, OutputOpts, SummaryStyles},
};
use camino::{Utf8Path, Utf8PathBuf};
use clap::{Args, Parser};
use owo_colors::OwoColorize;
use quick_trx::{TestOutcome, TestRun};
use std::io::Write;
use tracing::debug;

/// Merge TRX test reports into one.
///
/// Inputs are merged in the order given. When the same test appears in more than one input, a
/// single result is kept for it and the summary counters are recomputed from the results that
/// remain.
#[derive(Debug, Parser)]
#[command(version, styles = clap_styles::style())]
pub struct TrxMergeApp {
    /// TRX files to merge, or directories to search for them
    #[arg(required = true, value_name = "INPUTS")]
    inputs: Vec<Utf8PathBuf>,

    /// Path to write the merged report to
    #[arg(long, short, value_name = "PATH")]
    output: Utf8PathBuf,

    /// Search input directories recursively
    #[arg(long, short)]
    recursive: bool,

    /// Which result to keep when a test appears more than once [default: latest-start]
    #[arg(long, value_enum, value_name = "POLICY")]
    dedup: Option<DedupPolicy>,

    /// Exit with a non-zero code if the merged report contains failed tests
    #[arg(long)]
    fail_on_failed_tests: bool,

    #[command(flatten)]
    config_opts: ConfigOpts,

    #[command(flatten)]
    output_opts: OutputOpts,
}

#[derive(Debug, Args)]
struct ConfigOpts {
    /// Config file [default: .config/trx-merge.toml]
    #[arg(long, value_name = "PATH")]
    config_file: Option<Utf8PathBuf>,
}

impl ConfigOpts {
    fn make_config(&self) -> Result<TrxMergeConfig, ExpectedError> {
        Ok(TrxMergeConfig::from_sources(
            Utf8Path::new("."),
            self.config_file.as_deref(),
        )?)
    }
}

impl TrxMergeApp {
    /// Initializes logging and console colors.
    pub fn init_output(&self) -> OutputContext {
        self.output_opts.init()
    }

    /// Executes the app, writing the summary to `stdout`.
    ///
    /// Returns the process exit code.
    pub fn exec(
        self,
        output: OutputContext,
        stdout: &mut dyn Write,
    ) -> Result<i32, ExpectedError> {
        let config = self.config_opts.make_config()?;
        debug!("using config: {config:?}");

        let discover_opts = DiscoverOpts {
            extension: &config.discovery.extension,
            recursive: self.recursive || config.discovery.recursive,
        };
        let inputs = discover_inputs(&self.inputs, &discover_opts)?;

        let merger =
            TrxMerger::new().with_dedup_policy(self.dedup.unwrap_or(config.merge.dedup));
        let (merged, written) = merger.merge_to_path(&inputs, &self.output)?;

        write_summary(&merged, inputs.len(), &written, &output.stdout_styles(), stdout)
            .map_err(|err| ExpectedError::WriteSummaryError { err })?;

        if self.fail_on_failed_tests && merged.result_summary.outcome == TestOutcome::Failed {
            return Err(ExpectedError::TestRunFailed);
        }
        Ok(TrxMergeExitCode::OK)
    }
}

fn write_summary(
    merged: &TestRun,
    input_count: usize,
    written: &Utf8Path,
    styles: &SummaryStyles,
    mut writer: impl Write,
) -> std::io::Result<()> {
    let counters = &merged.result_summary.counters;
    let reports = if input_count == 1 { "report" } else { "reports" };
    writeln!(
        writer,
        "merged {} {reports} into {}",
        input_count.style(styles.count),
        written.style(styles.bold),
    )?;

    let other = counters
        .total
        .saturating_sub(counters.passed + counters.failed);
    write!(
        writer,
        "  {} tests: {} passed, {} failed",
        counters.total.style(styles.count),
        counters.passed.style(styles.pass),
        counters.failed.style(styles.fail),
    )?;
    if other > 0 {
        write!(writer, ", {} other", other.style(styles.count))?;
    }
    writeln!(writer)?;

    let outcome_style = match merged.result_summary.outcome {
        TestOutcome::Passed => styles.pass,
        _ => styles.fail,
    };
    writeln!(
        writer,
        "  outcome: {}",
        merged.result_summary.outcome.style(outcome_style)
    )?;
    writer.flush()
}
