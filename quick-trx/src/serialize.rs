// Copyright (c) The nextest Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Serialize a `TestRun`.

use crate::{
    errors::SerializeError, Counters, ErrorInfo, ResultSummary, RunInfo, TestDefinition,
    TestEntry, TestList, TestRun, Times, UnitTestResult, UnitTestResultOutput, TRX_NAMESPACE,
};
use quick_xml::{
    events::{BytesDecl, BytesEnd, BytesStart, BytesText, Event},
    Writer,
};
use std::io;

pub(crate) static TEST_RUN_TAG: &str = "TestRun";
pub(crate) static TIMES_TAG: &str = "Times";
pub(crate) static RESULTS_TAG: &str = "Results";
pub(crate) static UNIT_TEST_RESULT_TAG: &str = "UnitTestResult";
pub(crate) static OUTPUT_TAG: &str = "Output";
pub(crate) static STD_OUT_TAG: &str = "StdOut";
pub(crate) static STD_ERR_TAG: &str = "StdErr";
pub(crate) static ERROR_INFO_TAG: &str = "ErrorInfo";
pub(crate) static MESSAGE_TAG: &str = "Message";
pub(crate) static STACK_TRACE_TAG: &str = "StackTrace";
pub(crate) static TEST_DEFINITIONS_TAG: &str = "TestDefinitions";
pub(crate) static UNIT_TEST_TAG: &str = "UnitTest";
pub(crate) static EXECUTION_TAG: &str = "Execution";
pub(crate) static TEST_METHOD_TAG: &str = "TestMethod";
pub(crate) static TEST_ENTRIES_TAG: &str = "TestEntries";
pub(crate) static TEST_ENTRY_TAG: &str = "TestEntry";
pub(crate) static TEST_LISTS_TAG: &str = "TestLists";
pub(crate) static TEST_LIST_TAG: &str = "TestList";
pub(crate) static RESULT_SUMMARY_TAG: &str = "ResultSummary";
pub(crate) static COUNTERS_TAG: &str = "Counters";
pub(crate) static RUN_INFOS_TAG: &str = "RunInfos";
pub(crate) static RUN_INFO_TAG: &str = "RunInfo";
pub(crate) static TEXT_TAG: &str = "Text";

pub(crate) fn serialize_test_run(
    test_run: &TestRun,
    writer: impl io::Write,
) -> Result<(), SerializeError> {
    let mut writer = Writer::new_with_indent(writer, b' ', 4);

    let decl = BytesDecl::new("1.0", Some("UTF-8"), None);
    writer.write_event(Event::Decl(decl))?;

    serialize_test_run_impl(test_run, &mut writer)?;

    // Add a trailing newline.
    writer.write_indent()?;
    Ok(())
}

fn serialize_test_run_impl(
    test_run: &TestRun,
    writer: &mut Writer<impl io::Write>,
) -> Result<(), SerializeError> {
    // Use the destructuring syntax to ensure that all fields are handled.
    let TestRun {
        id,
        name,
        run_user,
        times,
        test_definitions,
        test_entries,
        results,
        test_lists,
        result_summary,
    } = test_run;

    let mut test_run_tag = BytesStart::new(TEST_RUN_TAG);
    test_run_tag.extend_attributes([
        ("id", id.as_str()),
        ("name", name.as_str()),
        ("runUser", run_user.as_str()),
        ("xmlns", TRX_NAMESPACE),
    ]);
    writer.write_event(Event::Start(test_run_tag))?;

    serialize_times(times, writer)?;

    serialize_empty_start_tag(RESULTS_TAG, writer)?;
    for result in results {
        serialize_unit_test_result(result, writer)?;
    }
    serialize_end_tag(RESULTS_TAG, writer)?;

    serialize_empty_start_tag(TEST_DEFINITIONS_TAG, writer)?;
    for test_definition in test_definitions {
        serialize_test_definition(test_definition, writer)?;
    }
    serialize_end_tag(TEST_DEFINITIONS_TAG, writer)?;

    serialize_empty_start_tag(TEST_ENTRIES_TAG, writer)?;
    for test_entry in test_entries {
        serialize_test_entry(test_entry, writer)?;
    }
    serialize_end_tag(TEST_ENTRIES_TAG, writer)?;

    serialize_empty_start_tag(TEST_LISTS_TAG, writer)?;
    for test_list in test_lists {
        serialize_test_list(test_list, writer)?;
    }
    serialize_end_tag(TEST_LISTS_TAG, writer)?;

    serialize_result_summary(result_summary, writer)?;

    serialize_end_tag(TEST_RUN_TAG, writer)?;
    writer.write_event(Event::Eof)?;

    Ok(())
}

fn serialize_times(
    times: &Times,
    writer: &mut Writer<impl io::Write>,
) -> Result<(), SerializeError> {
    let Times {
        creation,
        queuing,
        start,
        finish,
    } = times;

    let mut times_tag = BytesStart::new(TIMES_TAG);
    times_tag.extend_attributes([
        ("creation", creation.as_str()),
        ("queuing", queuing.as_str()),
        ("start", start.as_str()),
        ("finish", finish.as_str()),
    ]);
    writer.write_event(Event::Empty(times_tag))?;
    Ok(())
}

fn serialize_unit_test_result(
    result: &UnitTestResult,
    writer: &mut Writer<impl io::Write>,
) -> Result<(), SerializeError> {
    let UnitTestResult {
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
        // Never written: this is a runtime-only hint.
        relative_results_directory: _,
        output,
    } = result;

    let mut result_tag = BytesStart::new(UNIT_TEST_RESULT_TAG);
    result_tag.extend_attributes([
        ("executionId", execution_id.as_str()),
        ("testId", test_id.as_str()),
        ("testName", test_name.as_str()),
        ("computerName", computer_name.as_str()),
        ("duration", duration.as_str()),
        ("startTime", start_time.as_str()),
        ("endTime", end_time.as_str()),
        ("testType", test_type.as_str()),
        ("outcome", outcome.as_str()),
        ("testListId", test_list_id.as_str()),
    ]);

    if output.is_empty() {
        writer.write_event(Event::Empty(result_tag))?;
        return Ok(());
    }

    writer.write_event(Event::Start(result_tag))?;
    serialize_output(output, writer)?;
    serialize_end_tag(UNIT_TEST_RESULT_TAG, writer)?;

    Ok(())
}

fn serialize_output(
    output: &UnitTestResultOutput,
    writer: &mut Writer<impl io::Write>,
) -> Result<(), SerializeError> {
    let UnitTestResultOutput {
        std_out,
        std_err,
        error_info,
    } = output;

    serialize_empty_start_tag(OUTPUT_TAG, writer)?;

    if !std_out.is_empty() {
        serialize_text_element(STD_OUT_TAG, std_out, writer)?;
    }
    if !std_err.is_empty() {
        serialize_text_element(STD_ERR_TAG, std_err, writer)?;
    }
    if let Some(ErrorInfo {
        message,
        stack_trace,
    }) = error_info
    {
        serialize_empty_start_tag(ERROR_INFO_TAG, writer)?;
        serialize_text_element(MESSAGE_TAG, message, writer)?;
        serialize_text_element(STACK_TRACE_TAG, stack_trace, writer)?;
        serialize_end_tag(ERROR_INFO_TAG, writer)?;
    }

    serialize_end_tag(OUTPUT_TAG, writer)?;
    Ok(())
}

fn serialize_test_definition(
    test_definition: &TestDefinition,
    writer: &mut Writer<impl io::Write>,
) -> Result<(), SerializeError> {
    let TestDefinition {
        id,
        name,
        storage,
        execution,
        test_method,
    } = test_definition;

    let mut unit_test_tag = BytesStart::new(UNIT_TEST_TAG);
    unit_test_tag.extend_attributes([
        ("name", name.as_str()),
        ("storage", storage.as_str()),
        ("id", id.as_str()),
    ]);
    writer.write_event(Event::Start(unit_test_tag))?;

    let mut execution_tag = BytesStart::new(EXECUTION_TAG);
    execution_tag.push_attribute(("id", execution.id.as_str()));
    writer.write_event(Event::Empty(execution_tag))?;

    let mut test_method_tag = BytesStart::new(TEST_METHOD_TAG);
    test_method_tag.extend_attributes([
        ("codeBase", test_method.code_base.as_str()),
        ("adapterTypeName", test_method.adapter_type_name.as_str()),
        ("className", test_method.class_name.as_str()),
        ("name", test_method.name.as_str()),
    ]);
    writer.write_event(Event::Empty(test_method_tag))?;

    serialize_end_tag(UNIT_TEST_TAG, writer)?;
    Ok(())
}

fn serialize_test_entry(
    test_entry: &TestEntry,
    writer: &mut Writer<impl io::Write>,
) -> Result<(), SerializeError> {
    let TestEntry {
        test_id,
        execution_id,
        test_list_id,
    } = test_entry;

    let mut test_entry_tag = BytesStart::new(TEST_ENTRY_TAG);
    test_entry_tag.extend_attributes([
        ("testId", test_id.as_str()),
        ("executionId", execution_id.as_str()),
        ("testListId", test_list_id.as_str()),
    ]);
    writer.write_event(Event::Empty(test_entry_tag))?;
    Ok(())
}

fn serialize_test_list(
    test_list: &TestList,
    writer: &mut Writer<impl io::Write>,
) -> Result<(), SerializeError> {
    let TestList { id, name } = test_list;

    let mut test_list_tag = BytesStart::new(TEST_LIST_TAG);
    test_list_tag.extend_attributes([("name", name.as_str()), ("id", id.as_str())]);
    writer.write_event(Event::Empty(test_list_tag))?;
    Ok(())
}

fn serialize_result_summary(
    result_summary: &ResultSummary,
    writer: &mut Writer<impl io::Write>,
) -> Result<(), SerializeError> {
    let ResultSummary {
        outcome,
        counters,
        run_infos,
    } = result_summary;

    let mut result_summary_tag = BytesStart::new(RESULT_SUMMARY_TAG);
    result_summary_tag.push_attribute(("outcome", outcome.as_str()));
    writer.write_event(Event::Start(result_summary_tag))?;

    serialize_counters(counters, writer)?;

    serialize_empty_start_tag(RUN_INFOS_TAG, writer)?;
    for run_info in run_infos {
        serialize_run_info(run_info, writer)?;
    }
    serialize_end_tag(RUN_INFOS_TAG, writer)?;

    serialize_end_tag(RESULT_SUMMARY_TAG, writer)?;
    Ok(())
}

fn serialize_counters(
    counters: &Counters,
    writer: &mut Writer<impl io::Write>,
) -> Result<(), SerializeError> {
    let mut counters_tag = BytesStart::new(COUNTERS_TAG);
    for (name, value) in counter_attributes(counters) {
        counters_tag.push_attribute((name, value.to_string().as_str()));
    }
    writer.write_event(Event::Empty(counters_tag))?;
    Ok(())
}

/// The attribute name and value of every counter, in the order VSTest writes them.
pub(crate) fn counter_attributes(counters: &Counters) -> [(&'static str, usize); 15] {
    let Counters {
        total,
        executed,
        passed,
        failed,
        timeout,
        aborted,
        inconclusive,
        passed_but_run_aborted,
        not_runnable,
        disconnected,
        warning,
        not_executed,
        completed,
        in_progress,
        pending,
    } = *counters;

    [
        ("total", total),
        ("executed", executed),
        ("passed", passed),
        ("failed", failed),
        ("timeout", timeout),
        ("aborted", aborted),
        ("inconclusive", inconclusive),
        ("passedButRunAborted", passed_but_run_aborted),
        ("notRunnable", not_runnable),
        ("notExecuted", not_executed),
        ("disconnected", disconnected),
        ("warning", warning),
        ("completed", completed),
        ("inProgress", in_progress),
        ("pending", pending),
    ]
}

fn serialize_run_info(
    run_info: &RunInfo,
    writer: &mut Writer<impl io::Write>,
) -> Result<(), SerializeError> {
    let RunInfo {
        computer_name,
        outcome,
        timestamp,
        text,
    } = run_info;

    let mut run_info_tag = BytesStart::new(RUN_INFO_TAG);
    run_info_tag.extend_attributes([
        ("computerName", computer_name.as_str()),
        ("outcome", outcome.as_str()),
        ("timestamp", timestamp.as_str()),
    ]);
    writer.write_event(Event::Start(run_info_tag))?;
    serialize_text_element(TEXT_TAG, text, writer)?;
    serialize_end_tag(RUN_INFO_TAG, writer)?;
    Ok(())
}

fn serialize_text_element(
    tag_name: &'static str,
    text: &str,
    writer: &mut Writer<impl io::Write>,
) -> Result<(), SerializeError> {
    serialize_empty_start_tag(tag_name, writer)?;
    writer.write_event(Event::Text(BytesText::new(text)))?;
    serialize_end_tag(tag_name, writer)?;
    Ok(())
}

fn serialize_empty_start_tag(
    tag_name: &'static str,
    writer: &mut Writer<impl io::Write>,
) -> Result<(), SerializeError> {
    writer.write_event(Event::Start(BytesStart::new(tag_name)))?;
    Ok(())
}

fn serialize_end_tag(
    tag_name: &'static str,
    writer: &mut Writer<impl io::Write>,
) -> Result<(), SerializeError> {
    writer.write_event(Event::End(BytesEnd::new(tag_name)))?;
    Ok(())
}
