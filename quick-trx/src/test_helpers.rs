// Copyright (c) The nextest Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Proptest strategies for TRX reports.

use crate::{
    Counters, ErrorInfo, Execution, ResultSummary, RunInfo, TestDefinition, TestEntry, TestList,
    TestMethod, TestOutcome, TestRun, Times, UnitTestResult, UnitTestResultOutput,
};
use proptest::{collection::vec, option, prelude::*};

/// Text that may need escaping, including leading and trailing whitespace and newlines.
fn xml_text() -> impl Strategy<Value = String> {
    "[a-zA-Z0-9 <>&'\"\n\t.:/_-]{0,24}"
}

fn id() -> impl Strategy<Value = String> {
    "[0-9a-f]{8}-[0-9a-f]{4}"
}

pub(crate) fn outcome() -> impl Strategy<Value = TestOutcome> {
    prop_oneof![
        4 => Just(TestOutcome::Passed),
        4 => Just(TestOutcome::Failed),
        1 => Just(TestOutcome::Timeout),
        1 => Just(TestOutcome::NotExecuted),
        1 => Just(TestOutcome::Error),
        1 => "[A-Z][a-z]{3,8}".prop_map(|s| TestOutcome::from(s.as_str())),
    ]
}

prop_compose! {
    fn times()(
        creation in xml_text(),
        queuing in xml_text(),
        start in xml_text(),
        finish in xml_text(),
    ) -> Times {
        Times { creation, queuing, start, finish }
    }
}

prop_compose! {
    fn test_definition()(
        id in id(),
        name in xml_text(),
        storage in xml_text(),
        execution_id in id(),
        code_base in xml_text(),
        adapter_type_name in xml_text(),
        class_name in xml_text(),
        method_name in xml_text(),
    ) -> TestDefinition {
        TestDefinition {
            id,
            name,
            storage,
            execution: Execution { id: execution_id },
            test_method: TestMethod {
                code_base,
                adapter_type_name,
                class_name,
                name: method_name,
            },
        }
    }
}

prop_compose! {
    fn test_entry()(test_id in id(), execution_id in id(), test_list_id in id()) -> TestEntry {
        TestEntry { test_id, execution_id, test_list_id }
    }
}

prop_compose! {
    fn test_list()(id in id(), name in xml_text()) -> TestList {
        TestList { id, name }
    }
}

prop_compose! {
    fn output()(
        std_out in xml_text(),
        std_err in xml_text(),
        error_info in option::of((xml_text(), xml_text())),
    ) -> UnitTestResultOutput {
        UnitTestResultOutput {
            std_out,
            std_err,
            error_info: error_info.map(|(message, stack_trace)| ErrorInfo { message, stack_trace }),
        }
    }
}

prop_compose! {
    fn unit_test_result()(
        test_id in id(),
        execution_id in id(),
        test_name in xml_text(),
        computer_name in xml_text(),
        start_time in xml_text(),
        end_time in xml_text(),
        duration in xml_text(),
        test_type in id(),
        outcome in outcome(),
        test_list_id in id(),
        output in output(),
    ) -> UnitTestResult {
        UnitTestResult {
            test_id,
            execution_id,
            test_name,
            computer_name,
            start_time,
            end_time,
            duration,
            test_type,
            outcome,
            test_list_id,
            relative_results_directory: None,
            output,
        }
    }
}

prop_compose! {
    fn counters()(values in vec(0..10_000usize, 15)) -> Counters {
        Counters {
            total: values[0],
            executed: values[1],
            passed: values[2],
            failed: values[3],
            timeout: values[4],
            aborted: values[5],
            inconclusive: values[6],
            passed_but_run_aborted: values[7],
            not_runnable: values[8],
            disconnected: values[9],
            warning: values[10],
            not_executed: values[11],
            completed: values[12],
            in_progress: values[13],
            pending: values[14],
        }
    }
}

prop_compose! {
    fn run_info()(
        computer_name in xml_text(),
        outcome in outcome(),
        timestamp in xml_text(),
        text in xml_text(),
    ) -> RunInfo {
        RunInfo { computer_name, outcome, timestamp, text }
    }
}

prop_compose! {
    fn result_summary()(
        outcome in outcome(),
        counters in counters(),
        run_infos in vec(run_info(), 0..3),
    ) -> ResultSummary {
        ResultSummary { outcome, counters, run_infos }
    }
}

prop_compose! {
    /// An arbitrary run. Cross-references between its entities are not kept consistent.
    pub(crate) fn test_run()(
        id in id(),
        name in xml_text(),
        run_user in xml_text(),
        times in times(),
        test_definitions in vec(test_definition(), 0..4),
        test_entries in vec(test_entry(), 0..4),
        results in vec(unit_test_result(), 0..4),
        test_lists in vec(test_list(), 0..3),
        result_summary in result_summary(),
    ) -> TestRun {
        TestRun {
            id,
            name,
            run_user,
            times,
            test_definitions,
            test_entries,
            results,
            test_lists,
            result_summary,
        }
    }
}
