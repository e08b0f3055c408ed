// Copyright (c) The nextest Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

use crate::{
    deserialize::deserialize_test_run,
    errors::{DeserializeError, LoadError, SaveError, SerializeError},
    serialize::serialize_test_run,
};
use atomicwrites::{AllowOverwrite, AtomicFile};
use camino::{Utf8Path, Utf8PathBuf};
use std::{
    convert::Infallible,
    fmt,
    io::{self, BufWriter, Read, Write},
    str::FromStr,
};
use uuid::Uuid;

/// The default XML namespace of a TRX document.
pub const TRX_NAMESPACE: &str = "http://microsoft.com/schemas/VisualStudio/TeamTest/2010";

/// The root element of a TRX report: a single test run.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct TestRun {
    /// The identity of this run, usually a GUID.
    pub id: String,

    /// The name of this run.
    pub name: String,

    /// The user the run was executed as. Empty if the report doesn't record one.
    pub run_user: String,

    /// Wall-clock timestamps for the run.
    pub times: Times,

    /// The tests known to this run. Serialized as `UnitTest` elements.
    pub test_definitions: Vec<TestDefinition>,

    /// Entries binding a test execution to a test list.
    pub test_entries: Vec<TestEntry>,

    /// The results of every test execution in this run.
    pub results: Vec<UnitTestResult>,

    /// Named groupings that test entries refer to.
    pub test_lists: Vec<TestList>,

    /// The aggregate verdict and counters for this run.
    pub result_summary: ResultSummary,
}

impl TestRun {
    /// Creates a new, empty `TestRun` with the given name and a freshly generated id.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            name: name.into(),
            ..Default::default()
        }
    }

    /// Sets the user the run was executed as.
    pub fn set_run_user(&mut self, run_user: impl Into<String>) -> &mut Self {
        self.run_user = run_user.into();
        self
    }

    /// Sets the run's timestamps.
    pub fn set_times(&mut self, times: Times) -> &mut Self {
        self.times = times;
        self
    }

    /// Resets [`UnitTestResult::relative_results_directory`] on every result.
    ///
    /// That field is never written out, so this is the state every run is in after being read
    /// back.
    pub fn clear_relative_results_directories(&mut self) -> &mut Self {
        for result in &mut self.results {
            result.relative_results_directory = None;
        }
        self
    }

    /// Recomputes the result summary's counters and outcome from `self.results`.
    ///
    /// The outcome is `Failed` if the `failed` counter is non-zero, and `Passed` otherwise. Every
    /// [`RunInfo`] outcome is updated to the new aggregate outcome.
    pub fn recompute_summary(&mut self) -> &mut Self {
        let counters = Counters::from_outcomes(self.results.iter().map(|r| &r.outcome));
        let outcome = if counters.failed > 0 {
            TestOutcome::Failed
        } else {
            TestOutcome::Passed
        };
        for run_info in &mut self.result_summary.run_infos {
            run_info.outcome = outcome.clone();
        }
        self.result_summary.counters = counters;
        self.result_summary.outcome = outcome;
        self
    }

    /// Serialize this run to the given writer.
    pub fn serialize(&self, writer: impl Write) -> Result<(), SerializeError> {
        serialize_test_run(self, writer)
    }

    /// Serialize this run to a string.
    pub fn to_string(&self) -> Result<String, SerializeError> {
        let mut buf: Vec<u8> = vec![];
        self.serialize(&mut buf)?;
        String::from_utf8(buf).map_err(|utf8_err| {
            SerializeError::from(io::Error::new(io::ErrorKind::InvalidData, utf8_err))
        })
    }

    /// Deserialize a run from an XML string.
    pub fn deserialize_str(xml: &str) -> Result<Self, DeserializeError> {
        deserialize_test_run(xml)
    }

    /// Deserialize a run from the given reader.
    pub fn deserialize(mut reader: impl Read) -> Result<Self, DeserializeError> {
        let mut xml = String::new();
        reader
            .read_to_string(&mut xml)
            .map_err(DeserializeError::io)?;
        Self::deserialize_str(&xml)
    }

    /// Reads a TRX file from disk.
    ///
    /// The file handle is closed before this returns, whether or not parsing succeeded.
    pub fn load(path: &Utf8Path) -> Result<Self, LoadError> {
        let xml = std::fs::read_to_string(path).map_err(|err| LoadError::Read {
            path: path.to_owned(),
            err,
        })?;
        Self::deserialize_str(&xml).map_err(|err| LoadError::Malformed {
            path: path.to_owned(),
            err,
        })
    }

    /// Writes this run to `path`, returning the absolute path that was written.
    ///
    /// The document is written to a temporary file in the same directory and renamed into
    /// place, so an existing file at `path` is either fully replaced or left untouched.
    pub fn save(&self, path: &Utf8Path) -> Result<Utf8PathBuf, SaveError> {
        let abs_path = std::path::absolute(path)
            .and_then(|abs_path| {
                Utf8PathBuf::from_path_buf(abs_path).map_err(|abs_path| {
                    io::Error::new(
                        io::ErrorKind::InvalidData,
                        format!("absolute path {} is not valid UTF-8", abs_path.display()),
                    )
                })
            })
            .map_err(|err| SaveError::Write {
                path: path.to_owned(),
                err,
            })?;

        let file = AtomicFile::new(&abs_path, AllowOverwrite);
        file.write(|f| {
            let mut writer = BufWriter::new(f);
            self.serialize(&mut writer)?;
            writer.flush().map_err(SerializeError::from)
        })
        .map_err(|err| match err {
            atomicwrites::Error::Internal(err) => SaveError::Write {
                path: abs_path.clone(),
                err,
            },
            atomicwrites::Error::User(err) => SaveError::Serialize {
                path: abs_path.clone(),
                err,
            },
        })?;

        Ok(abs_path)
    }
}

/// Timestamps for a test run.
///
/// Values are kept exactly as they appear in the report.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Times {
    /// When the run was created.
    pub creation: String,

    /// When the run was queued.
    pub queuing: String,

    /// When the run started.
    pub start: String,

    /// When the run finished.
    pub finish: String,
}

/// A test known to a run. Serialized as a `UnitTest` element.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct TestDefinition {
    /// The identity of this test. Results and entries refer to it as `testId`.
    pub id: String,

    /// The display name of the test.
    pub name: String,

    /// The module the test was loaded from.
    pub storage: String,

    /// The execution this definition is associated with.
    pub execution: Execution,

    /// The method implementing the test.
    pub test_method: TestMethod,
}

impl TestDefinition {
    /// Creates a new test definition.
    pub fn new(
        id: impl Into<String>,
        name: impl Into<String>,
        execution_id: impl Into<String>,
    ) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            execution: Execution {
                id: execution_id.into(),
            },
            ..Default::default()
        }
    }

    /// Sets the storage (originating module path).
    pub fn set_storage(&mut self, storage: impl Into<String>) -> &mut Self {
        self.storage = storage.into();
        self
    }

    /// Sets the test method.
    pub fn set_test_method(&mut self, test_method: TestMethod) -> &mut Self {
        self.test_method = test_method;
        self
    }
}

/// The execution identity attached to a [`TestDefinition`].
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Execution {
    /// The execution id. Distinct from the definition's own id.
    pub id: String,
}

/// The method that implements a test.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct TestMethod {
    /// The path to the assembly containing the method.
    pub code_base: String,

    /// The URI of the test adapter that discovered the method.
    pub adapter_type_name: String,

    /// The fully qualified class name.
    pub class_name: String,

    /// The method name.
    pub name: String,
}

/// Binds a test execution to a test list.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct TestEntry {
    pub test_id: String,
    pub execution_id: String,
    pub test_list_id: String,
}

impl TestEntry {
    /// Creates a new test entry.
    pub fn new(
        test_id: impl Into<String>,
        execution_id: impl Into<String>,
        test_list_id: impl Into<String>,
    ) -> Self {
        Self {
            test_id: test_id.into(),
            execution_id: execution_id.into(),
            test_list_id: test_list_id.into(),
        }
    }
}

/// A named grouping of test entries, e.g. "Results Not in a List".
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct TestList {
    pub id: String,
    pub name: String,
}

impl TestList {
    /// Creates a new test list.
    pub fn new(id: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
        }
    }
}

/// The result of a single test execution.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct UnitTestResult {
    /// The id of the [`TestDefinition`] this result belongs to.
    pub test_id: String,

    /// The id of this execution.
    pub execution_id: String,

    /// The name of the test.
    pub test_name: String,

    /// The machine the test ran on.
    pub computer_name: String,

    /// When the test started, as written in the report.
    pub start_time: String,

    /// When the test finished, as written in the report.
    pub end_time: String,

    /// How long the test took, as written in the report (e.g. `00:00:01.2340000`).
    pub duration: String,

    /// The test type GUID.
    pub test_type: String,

    /// The outcome of this execution.
    pub outcome: TestOutcome,

    /// The id of the [`TestList`] this result is grouped under.
    pub test_list_id: String,

    /// The directory results were stored in, relative to the run's results directory.
    ///
    /// This is a runtime-only hint: it is never written out and is always `None` after a
    /// report is read.
    pub relative_results_directory: Option<String>,

    /// Output captured during the execution.
    pub output: UnitTestResultOutput,
}

impl UnitTestResult {
    /// Creates a new result for the given test and execution.
    pub fn new(
        test_id: impl Into<String>,
        execution_id: impl Into<String>,
        outcome: TestOutcome,
    ) -> Self {
        Self {
            test_id: test_id.into(),
            execution_id: execution_id.into(),
            outcome,
            ..Default::default()
        }
    }

    /// Sets the test name.
    pub fn set_test_name(&mut self, test_name: impl Into<String>) -> &mut Self {
        self.test_name = test_name.into();
        self
    }

    /// Sets the start time.
    pub fn set_start_time(&mut self, start_time: impl Into<String>) -> &mut Self {
        self.start_time = start_time.into();
        self
    }

    /// Sets the end time.
    pub fn set_end_time(&mut self, end_time: impl Into<String>) -> &mut Self {
        self.end_time = end_time.into();
        self
    }

    /// Sets the test list id.
    pub fn set_test_list_id(&mut self, test_list_id: impl Into<String>) -> &mut Self {
        self.test_list_id = test_list_id.into();
        self
    }

    /// Sets standard output.
    pub fn set_std_out(&mut self, std_out: impl Into<String>) -> &mut Self {
        self.output.std_out = std_out.into();
        self
    }

    /// Sets standard error.
    pub fn set_std_err(&mut self, std_err: impl Into<String>) -> &mut Self {
        self.output.std_err = std_err.into();
        self
    }

    /// Sets error information.
    pub fn set_error_info(
        &mut self,
        message: impl Into<String>,
        stack_trace: impl Into<String>,
    ) -> &mut Self {
        self.output.error_info = Some(ErrorInfo {
            message: message.into(),
            stack_trace: stack_trace.into(),
        });
        self
    }
}

/// Output captured while a test executed.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct UnitTestResultOutput {
    pub std_out: String,
    pub std_err: String,
    pub error_info: Option<ErrorInfo>,
}

impl UnitTestResultOutput {
    /// Returns true if nothing was captured.
    pub fn is_empty(&self) -> bool {
        self.std_out.is_empty() && self.std_err.is_empty() && self.error_info.is_none()
    }
}

/// Information about a test failure.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct ErrorInfo {
    pub message: String,
    pub stack_trace: String,
}

/// The aggregate verdict of a run.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct ResultSummary {
    /// `Failed` if any contained result failed, `Passed` otherwise.
    pub outcome: TestOutcome,

    /// Tallies of results by outcome.
    pub counters: Counters,

    /// Free-text diagnostics, typically one per contributing run.
    pub run_infos: Vec<RunInfo>,
}

/// Tallies of the results in a run.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct Counters {
    pub total: usize,
    pub executed: usize,
    pub passed: usize,
    pub failed: usize,
    pub timeout: usize,
    pub aborted: usize,
    pub inconclusive: usize,
    pub passed_but_run_aborted: usize,
    pub not_runnable: usize,
    pub disconnected: usize,
    pub warning: usize,
    pub not_executed: usize,
    pub completed: usize,
    pub in_progress: usize,
    pub pending: usize,
}

impl Counters {
    /// Computes counters from scratch over a set of result outcomes.
    ///
    /// `total`, `executed` and `completed` are the number of outcomes. Every other counter is
    /// the number of outcomes of the matching kind.
    pub fn from_outcomes<'a>(outcomes: impl IntoIterator<Item = &'a TestOutcome>) -> Self {
        let mut counters = Self::default();
        for outcome in outcomes {
            counters.total += 1;
            let tally = match outcome {
                TestOutcome::Passed => &mut counters.passed,
                TestOutcome::Failed => &mut counters.failed,
                TestOutcome::Timeout => &mut counters.timeout,
                TestOutcome::Aborted => &mut counters.aborted,
                TestOutcome::Inconclusive => &mut counters.inconclusive,
                TestOutcome::PassedButRunAborted => &mut counters.passed_but_run_aborted,
                TestOutcome::NotRunnable => &mut counters.not_runnable,
                TestOutcome::Disconnected => &mut counters.disconnected,
                TestOutcome::Warning => &mut counters.warning,
                TestOutcome::NotExecuted => &mut counters.not_executed,
                TestOutcome::InProgress => &mut counters.in_progress,
                TestOutcome::Pending => &mut counters.pending,
                TestOutcome::Error | TestOutcome::Completed | TestOutcome::Other(_) => continue,
            };
            *tally += 1;
        }
        counters.executed = counters.total;
        counters.completed = counters.total;
        counters
    }
}

/// A diagnostic message attached to a run's summary.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct RunInfo {
    pub computer_name: String,
    pub outcome: TestOutcome,
    pub timestamp: String,
    pub text: String,
}

/// The outcome of a test, or of a whole run.
///
/// Values not defined by the TRX schema are preserved in [`TestOutcome::Other`].
#[derive(Clone, Debug, Default, PartialEq, Eq, Hash)]
pub enum TestOutcome {
    Error,
    Failed,
    Timeout,
    Aborted,
    Inconclusive,
    PassedButRunAborted,
    NotRunnable,
    NotExecuted,
    Disconnected,
    Warning,
    #[default]
    Passed,
    Completed,
    InProgress,
    Pending,
    Other(String),
}

impl TestOutcome {
    /// Returns the name of this outcome as written in a TRX report.
    pub fn as_str(&self) -> &str {
        match self {
            Self::Error => "Error",
            Self::Failed => "Failed",
            Self::Timeout => "Timeout",
            Self::Aborted => "Aborted",
            Self::Inconclusive => "Inconclusive",
            Self::PassedButRunAborted => "PassedButRunAborted",
            Self::NotRunnable => "NotRunnable",
            Self::NotExecuted => "NotExecuted",
            Self::Disconnected => "Disconnected",
            Self::Warning => "Warning",
            Self::Passed => "Passed",
            Self::Completed => "Completed",
            Self::InProgress => "InProgress",
            Self::Pending => "Pending",
            Self::Other(other) => other,
        }
    }
}

impl From<&str> for TestOutcome {
    fn from(s: &str) -> Self {
        match s {
            "Error" => Self::Error,
            "Failed" => Self::Failed,
            "Timeout" => Self::Timeout,
            "Aborted" => Self::Aborted,
            "Inconclusive" => Self::Inconclusive,
            "PassedButRunAborted" => Self::PassedButRunAborted,
            "NotRunnable" => Self::NotRunnable,
            "NotExecuted" => Self::NotExecuted,
            "Disconnected" => Self::Disconnected,
            "Warning" => Self::Warning,
            "Passed" => Self::Passed,
            "Completed" => Self::Completed,
            "InProgress" => Self::InProgress,
            "Pending" => Self::Pending,
            other => Self::Other(other.to_owned()),
        }
    }
}

impl FromStr for TestOutcome {
    type Err = Infallible;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(s.into())
    }
}

impl fmt::Display for TestOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_helpers::test_run;
    use proptest::prop_assert_eq;
    use test_case::test_case;
    use test_strategy::proptest;

    #[test_case("Passed", TestOutcome::Passed; "passed")]
    #[test_case("Failed", TestOutcome::Failed; "failed")]
    #[test_case("PassedButRunAborted", TestOutcome::PassedButRunAborted; "passed but run aborted")]
    #[test_case("NotExecuted", TestOutcome::NotExecuted; "not executed")]
    #[test_case("Flaky", TestOutcome::Other("Flaky".to_owned()); "unknown")]
    fn outcome_parse_and_display(input: &str, expected: TestOutcome) {
        let outcome: TestOutcome = input.parse().unwrap();
        assert_eq!(outcome, expected);
        assert_eq!(outcome.to_string(), input);
    }

    #[test]
    fn counters_from_outcomes() {
        let outcomes = [
            TestOutcome::Passed,
            TestOutcome::Failed,
            TestOutcome::Passed,
            TestOutcome::Timeout,
            TestOutcome::Error,
        ];
        let counters = Counters::from_outcomes(&outcomes);
        assert_eq!(
            counters,
            Counters {
                total: 5,
                executed: 5,
                completed: 5,
                passed: 2,
                failed: 1,
                timeout: 1,
                ..Default::default()
            }
        );
    }

    #[test]
    fn recompute_summary_updates_run_infos() {
        let mut run = TestRun::new("run");
        run.results.push(UnitTestResult::new("t1", "e1", TestOutcome::Passed));
        run.results.push(UnitTestResult::new("t2", "e2", TestOutcome::Failed));
        run.result_summary.run_infos.push(RunInfo {
            outcome: TestOutcome::Passed,
            ..Default::default()
        });

        run.recompute_summary();
        assert_eq!(run.result_summary.outcome, TestOutcome::Failed);
        assert_eq!(run.result_summary.counters.total, 2);
        assert_eq!(run.result_summary.run_infos[0].outcome, TestOutcome::Failed);

        run.results.pop();
        run.recompute_summary();
        assert_eq!(run.result_summary.outcome, TestOutcome::Passed);
        assert_eq!(run.result_summary.run_infos[0].outcome, TestOutcome::Passed);
    }

    #[test_case(TestOutcome::Timeout ; "timeout")]
    #[test_case(TestOutcome::Error ; "error")]
    #[test_case(TestOutcome::Aborted ; "aborted")]
    fn outcome_follows_failed_counter(outcome: TestOutcome) {
        let mut run = TestRun::new("run");
        run.results.push(UnitTestResult::new("t1", "e1", outcome));
        run.results.push(UnitTestResult::new("t2", "e2", TestOutcome::Passed));

        run.recompute_summary();
        assert_eq!(run.result_summary.counters.failed, 0);
        assert_eq!(run.result_summary.outcome, TestOutcome::Passed);
    }

    #[test]
    fn new_runs_get_distinct_ids() {
        let a = TestRun::new("run");
        let b = TestRun::new("run");
        assert_ne!(a.id, b.id);
        assert!(Uuid::parse_str(&a.id).is_ok());
    }

    #[proptest(cases = 64)]
    fn serialize_round_trip(#[strategy(test_run())] run: TestRun) {
        let xml = run.to_string().expect("serializing succeeds");
        let read_back = TestRun::deserialize_str(&xml).expect("deserializing succeeds");
        prop_assert_eq!(read_back, run);
    }

    #[test]
    fn relative_results_directory_is_not_written() {
        let mut run = TestRun::new("run");
        let mut result = UnitTestResult::new("t1", "e1", TestOutcome::Passed);
        result.relative_results_directory = Some("e1".to_owned());
        run.results.push(result);

        let xml = run.to_string().expect("serializing succeeds");
        assert!(!xml.contains("relativeResultsDirectory"), "{xml}");

        let read_back = TestRun::deserialize_str(&xml).expect("deserializing succeeds");
        assert_eq!(read_back.results[0].relative_results_directory, None);
        run.clear_relative_results_directories();
        assert_eq!(read_back, run);
    }
}
