// Copyright (c) The nextest Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Merging several TRX reports into one.
//!
//! The merged run is built from the concatenation of every input's records, in input order.
//! Results are then deduplicated by test id, keeping one canonical result per test, and the
//! summary is recomputed from the results that remain.

use crate::{errors::MergeError, helpers::parse_timestamp};
use camino::{Utf8Path, Utf8PathBuf};
use chrono::{DateTime, FixedOffset};
use quick_trx::{ResultSummary, TestDefinition, TestEntry, TestRun, Times, UnitTestResult};
use serde::Deserialize;
use std::collections::{hash_map::Entry, HashMap};
use tracing::{debug, info};

/// Decides which result is kept when a test appears more than once across the inputs.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "kebab-case")]
pub enum DedupPolicy {
    /// Keep the result with the latest start time.
    ///
    /// Ties, and results whose start time can't be parsed, go to the later input. A parseable
    /// start time always beats one that can't be parsed.
    #[default]
    LatestStart,

    /// Keep the result from the later input.
    LastInput,
}

impl DedupPolicy {
    /// Returns true if `candidate`, which comes later in input order, should replace
    /// `incumbent`.
    fn prefers(self, candidate: &UnitTestResult, incumbent: &UnitTestResult) -> bool {
        match self {
            Self::LatestStart => {
                parse_timestamp(&candidate.start_time) >= parse_timestamp(&incumbent.start_time)
            }
            Self::LastInput => true,
        }
    }
}

/// Merges TRX reports.
#[derive(Clone, Debug, Default)]
pub struct TrxMerger {
    dedup_policy: DedupPolicy,
}

impl TrxMerger {
    /// Creates a merger with the default [`DedupPolicy`].
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the policy used to pick between results for the same test.
    pub fn with_dedup_policy(mut self, dedup_policy: DedupPolicy) -> Self {
        self.dedup_policy = dedup_policy;
        self
    }

    /// Loads every input in order, merges them, and writes the merged report to `output`.
    ///
    /// Nothing is written unless every input loads. Returns the merged run as it would be read
    /// back from `output`.
    pub fn merge(
        &self,
        inputs: &[impl AsRef<Utf8Path>],
        output: &Utf8Path,
    ) -> Result<TestRun, MergeError> {
        self.merge_to_path(inputs, output).map(|(merged, _)| merged)
    }

    /// Like [`Self::merge`], but also returns the absolute path the merged report was written to.
    pub fn merge_to_path(
        &self,
        inputs: &[impl AsRef<Utf8Path>],
        output: &Utf8Path,
    ) -> Result<(TestRun, Utf8PathBuf), MergeError> {
        if inputs.is_empty() {
            return Err(MergeError::EmptyInput);
        }

        let mut runs = Vec::with_capacity(inputs.len());
        for input in inputs {
            let input = input.as_ref();
            let run = TestRun::load(input).map_err(|err| MergeError::InputRead {
                path: input.to_owned(),
                err,
            })?;
            debug!(
                "loaded {input}: {} results, {} test definitions",
                run.results.len(),
                run.test_definitions.len(),
            );
            runs.push(run);
        }

        let mut merged = self.merge_runs(runs)?;
        let written = merged.save(output).map_err(|err| MergeError::Save {
            path: output.to_owned(),
            err,
        })?;
        info!(
            "wrote merged report with {} results to {written}",
            merged.results.len()
        );

        merged.clear_relative_results_directories();
        Ok((merged, written))
    }

    /// Merges runs that have already been loaded. The inputs are consumed; their records are
    /// moved into the merged run.
    pub fn merge_runs(&self, runs: Vec<TestRun>) -> Result<TestRun, MergeError> {
        let Some(first) = runs.first() else {
            return Err(MergeError::EmptyInput);
        };

        let mut merged = TestRun::new(first.name.clone());
        merged
            .set_run_user(first.run_user.clone())
            .set_times(merged_times(&runs));

        let mut test_definitions = Vec::new();
        let mut test_entries = Vec::new();
        let mut results = Vec::new();
        let mut test_lists = Vec::new();
        let mut run_infos = Vec::new();
        for run in runs {
            test_definitions.extend(run.test_definitions);
            test_entries.extend(run.test_entries);
            results.extend(run.results);
            test_lists.extend(run.test_lists);
            run_infos.extend(run.result_summary.run_infos);
        }

        let results = dedup_by_key(
            "result",
            results,
            |result| &result.test_id,
            |candidate, incumbent| self.dedup_policy.prefers(candidate, incumbent),
        );

        // For duplicated definitions and entries, keep the one belonging to the canonical
        // execution of the test.
        let canonical_executions: HashMap<&str, &str> = results
            .iter()
            .map(|result| (result.test_id.as_str(), result.execution_id.as_str()))
            .collect();
        let is_canonical = |test_id: &str, execution_id: &str| {
            canonical_executions.get(test_id) == Some(&execution_id)
        };

        let test_definitions = dedup_by_key(
            "test definition",
            test_definitions,
            |definition| &definition.id,
            |candidate: &TestDefinition, incumbent: &TestDefinition| {
                is_canonical(&candidate.id, &candidate.execution.id)
                    && !is_canonical(&incumbent.id, &incumbent.execution.id)
            },
        );
        let test_entries = dedup_by_key(
            "test entry",
            test_entries,
            |entry| &entry.test_id,
            |candidate: &TestEntry, incumbent: &TestEntry| {
                is_canonical(&candidate.test_id, &candidate.execution_id)
                    && !is_canonical(&incumbent.test_id, &incumbent.execution_id)
            },
        );
        // Built-in lists such as "Results Not in a List" have the same id in every report.
        let test_lists = dedup_by_key("test list", test_lists, |list| &list.id, |_, _| false);

        merged.test_definitions = test_definitions;
        merged.test_entries = test_entries;
        merged.results = results;
        merged.test_lists = test_lists;
        merged.result_summary = ResultSummary {
            run_infos,
            ..Default::default()
        };
        merged.recompute_summary();

        Ok(merged)
    }
}

/// Merges the given TRX files into `output` with default settings.
///
/// See [`TrxMerger::merge`].
pub fn merge(
    inputs: &[impl AsRef<Utf8Path>],
    output: impl AsRef<Utf8Path>,
) -> Result<TestRun, MergeError> {
    TrxMerger::new().merge(inputs, output.as_ref())
}

/// Keeps one item per key. Among items sharing a key, an item later in the list replaces the
/// current pick if `prefers(later, current)` returns true.
///
/// Items that are kept stay in their original relative order.
fn dedup_by_key<T>(
    kind: &'static str,
    items: Vec<T>,
    key: impl Fn(&T) -> &String,
    prefers: impl Fn(&T, &T) -> bool,
) -> Vec<T> {
    let mut picks: HashMap<&str, usize> = HashMap::with_capacity(items.len());
    for (index, item) in items.iter().enumerate() {
        match picks.entry(key(item).as_str()) {
            Entry::Vacant(entry) => {
                entry.insert(index);
            }
            Entry::Occupied(mut entry) => {
                if prefers(item, &items[*entry.get()]) {
                    debug!("{kind} `{}`: replacing earlier duplicate", entry.key());
                    entry.insert(index);
                } else {
                    debug!("{kind} `{}`: discarding later duplicate", entry.key());
                }
            }
        }
    }

    let mut keep = vec![false; items.len()];
    for index in picks.into_values() {
        keep[index] = true;
    }

    items
        .into_iter()
        .zip(keep)
        .filter_map(|(item, keep)| keep.then_some(item))
        .collect()
}

fn merged_times(runs: &[TestRun]) -> Times {
    let start = pick_timestamp(runs.iter().map(|run| run.times.start.as_str()), |a, b| a < b);
    let finish = pick_timestamp(runs.iter().map(|run| run.times.finish.as_str()), |a, b| a > b);
    Times {
        creation: start.clone(),
        queuing: start.clone(),
        start,
        finish,
    }
}

/// Picks the timestamp for which `better(candidate, current)` holds against every other
/// parseable timestamp. Falls back to the first value if none can be parsed.
fn pick_timestamp<'a>(
    values: impl IntoIterator<Item = &'a str>,
    better: impl Fn(&DateTime<FixedOffset>, &DateTime<FixedOffset>) -> bool,
) -> String {
    let mut best: Option<(&str, Option<DateTime<FixedOffset>>)> = None;
    for value in values {
        let parsed = parse_timestamp(value);
        let replace = match (&best, &parsed) {
            (None, _) => true,
            (Some((_, None)), Some(_)) => true,
            (Some((_, Some(current))), Some(candidate)) => better(candidate, current),
            (Some(_), None) => false,
        };
        if replace {
            best = Some((value, parsed));
        }
    }
    best.map(|(value, _)| value.to_owned()).unwrap_or_default()
}
