// Copyright (c) The nextest Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Deserialize a `TestRun`.
//!
//! Reading happens in two steps: the document is first parsed into a small element tree keyed by
//! local names (so prefixes and namespace declarations have no effect), and then each TRX entity
//! is read out of that tree by an explicit mapping function.

use crate::{
    errors::{DeserializeError, DeserializeErrorKind},
    serialize::*,
    Counters, ErrorInfo, Execution, ResultSummary, RunInfo, TestDefinition, TestEntry, TestList,
    TestMethod, TestOutcome, TestRun, Times, UnitTestResult, UnitTestResultOutput,
};
use indexmap::IndexMap;
use quick_xml::{events::Event, Reader};
use std::borrow::Cow;

pub(crate) fn deserialize_test_run(xml: &str) -> Result<TestRun, DeserializeError> {
    let root = parse_tree(xml)?;
    if root.name != TEST_RUN_TAG {
        return Err(DeserializeError::new(
            DeserializeErrorKind::UnexpectedRoot { found: root.name },
            Some(0),
        ));
    }
    test_run(&root)
}

/// An element, with everything but its local names, attributes, children and text stripped.
#[derive(Debug, Default)]
struct Element {
    name: String,
    attributes: IndexMap<String, String>,
    children: Vec<Element>,
    text: String,
}

impl Element {
    fn attr(&self, name: &str) -> String {
        self.attributes.get(name).cloned().unwrap_or_default()
    }

    fn child(&self, name: &str) -> Option<&Element> {
        self.children.iter().find(|child| child.name == name)
    }

    fn child_text(&self, name: &str) -> String {
        self.child(name)
            .map(|child| child.text.clone())
            .unwrap_or_default()
    }

    /// Returns the children named `item` of the child named `list`.
    fn list<'a>(&'a self, list: &str, item: &'a str) -> impl Iterator<Item = &'a Element> + 'a {
        self.child(list)
            .into_iter()
            .flat_map(move |list| list.children.iter().filter(move |child| child.name == item))
    }
}

fn parse_tree(xml: &str) -> Result<Element, DeserializeError> {
    let mut reader = Reader::from_str(xml);
    reader.config_mut().expand_empty_elements = true;

    let mut stack: Vec<Element> = Vec::new();
    let mut root: Option<Element> = None;

    loop {
        let event = reader.read_event().map_err(|err| {
            DeserializeError::new(
                DeserializeErrorKind::Xml(err),
                Some(reader.error_position() as u64),
            )
        })?;
        let position = reader.buffer_position() as u64;
        let xml_err = |err: quick_xml::Error| {
            DeserializeError::new(DeserializeErrorKind::Xml(err), Some(position))
        };

        match event {
            Event::Start(start) => {
                let name = decode_name(start.local_name().as_ref());
                if root.is_some() && stack.is_empty() {
                    return Err(DeserializeError::new(
                        DeserializeErrorKind::MultipleRoots { found: name },
                        Some(position),
                    ));
                }

                let mut attributes = IndexMap::new();
                for attr in start.attributes() {
                    let attr = attr.map_err(|err| xml_err(err.into()))?;
                    let key = attr.key;
                    if key.as_namespace_binding().is_some() {
                        continue;
                    }
                    let value = attr.unescape_value().map_err(xml_err)?;
                    attributes.insert(decode_name(key.local_name().as_ref()), value.into_owned());
                }

                stack.push(Element {
                    name,
                    attributes,
                    ..Default::default()
                });
            }
            Event::End(end) => {
                // quick-xml checks that end tags match their start tags, so this only catches
                // stray end tags after the root element.
                let Some(element) = stack.pop() else {
                    return Err(DeserializeError::new(
                        DeserializeErrorKind::UnmatchedEndTag {
                            element: decode_name(end.local_name().as_ref()),
                        },
                        Some(position),
                    ));
                };
                match stack.last_mut() {
                    Some(parent) => parent.children.push(element),
                    None => root = Some(element),
                }
            }
            Event::Text(text) => {
                let text = text.unescape().map_err(xml_err)?;
                push_text(&mut stack, text, position)?;
            }
            Event::CData(cdata) => {
                let text = String::from_utf8_lossy(&cdata);
                push_text(&mut stack, text, position)?;
            }
            Event::Eof => break,
            Event::Empty(_)
            | Event::Decl(_)
            | Event::PI(_)
            | Event::DocType(_)
            | Event::Comment(_) => {}
        }
    }

    if let Some(element) = stack.pop() {
        return Err(DeserializeError::new(
            DeserializeErrorKind::UnclosedElement {
                element: element.name,
            },
            Some(reader.buffer_position() as u64),
        ));
    }

    root.ok_or_else(|| DeserializeError::new(DeserializeErrorKind::MissingRoot, None))
}

fn push_text(
    stack: &mut [Element],
    text: Cow<'_, str>,
    position: u64,
) -> Result<(), DeserializeError> {
    match stack.last_mut() {
        Some(element) => element.text.push_str(&text),
        None if text.trim().is_empty() => {}
        None => {
            return Err(DeserializeError::new(
                DeserializeErrorKind::TextOutsideRoot,
                Some(position),
            ));
        }
    }
    Ok(())
}

fn decode_name(name: &[u8]) -> String {
    String::from_utf8_lossy(name).into_owned()
}

fn test_run(element: &Element) -> Result<TestRun, DeserializeError> {
    Ok(TestRun {
        id: element.attr("id"),
        name: element.attr("name"),
        run_user: element.attr("runUser"),
        times: element.child(TIMES_TAG).map(times).unwrap_or_default(),
        test_definitions: element
            .list(TEST_DEFINITIONS_TAG, UNIT_TEST_TAG)
            .map(test_definition)
            .collect(),
        test_entries: element
            .list(TEST_ENTRIES_TAG, TEST_ENTRY_TAG)
            .map(test_entry)
            .collect(),
        results: element
            .list(RESULTS_TAG, UNIT_TEST_RESULT_TAG)
            .map(unit_test_result)
            .collect(),
        test_lists: element
            .list(TEST_LISTS_TAG, TEST_LIST_TAG)
            .map(test_list)
            .collect(),
        result_summary: match element.child(RESULT_SUMMARY_TAG) {
            Some(summary) => result_summary(summary)?,
            None => ResultSummary::default(),
        },
    })
}

fn times(element: &Element) -> Times {
    Times {
        creation: element.attr("creation"),
        queuing: element.attr("queuing"),
        start: element.attr("start"),
        finish: element.attr("finish"),
    }
}

fn test_definition(element: &Element) -> TestDefinition {
    TestDefinition {
        id: element.attr("id"),
        name: element.attr("name"),
        storage: element.attr("storage"),
        execution: Execution {
            id: element
                .child(EXECUTION_TAG)
                .map(|execution| execution.attr("id"))
                .unwrap_or_default(),
        },
        test_method: element
            .child(TEST_METHOD_TAG)
            .map(|method| TestMethod {
                code_base: method.attr("codeBase"),
                adapter_type_name: method.attr("adapterTypeName"),
                class_name: method.attr("className"),
                name: method.attr("name"),
            })
            .unwrap_or_default(),
    }
}

fn test_entry(element: &Element) -> TestEntry {
    TestEntry {
        test_id: element.attr("testId"),
        execution_id: element.attr("executionId"),
        test_list_id: element.attr("testListId"),
    }
}

fn test_list(element: &Element) -> TestList {
    TestList {
        id: element.attr("id"),
        name: element.attr("name"),
    }
}

fn unit_test_result(element: &Element) -> UnitTestResult {
    UnitTestResult {
        test_id: element.attr("testId"),
        execution_id: element.attr("executionId"),
        test_name: element.attr("testName"),
        computer_name: element.attr("computerName"),
        start_time: element.attr("startTime"),
        end_time: element.attr("endTime"),
        duration: element.attr("duration"),
        test_type: element.attr("testType"),
        outcome: outcome(element),
        test_list_id: element.attr("testListId"),
        // Always reset on load, whatever the file says.
        relative_results_directory: None,
        output: element.child(OUTPUT_TAG).map(output).unwrap_or_default(),
    }
}

fn output(element: &Element) -> UnitTestResultOutput {
    UnitTestResultOutput {
        std_out: element.child_text(STD_OUT_TAG),
        std_err: element.child_text(STD_ERR_TAG),
        error_info: element.child(ERROR_INFO_TAG).map(|error_info| ErrorInfo {
            message: error_info.child_text(MESSAGE_TAG),
            stack_trace: error_info.child_text(STACK_TRACE_TAG),
        }),
    }
}

fn result_summary(element: &Element) -> Result<ResultSummary, DeserializeError> {
    Ok(ResultSummary {
        outcome: outcome(element),
        counters: match element.child(COUNTERS_TAG) {
            Some(counters_element) => counters(counters_element)?,
            None => Counters::default(),
        },
        run_infos: element
            .list(RUN_INFOS_TAG, RUN_INFO_TAG)
            .map(|run_info| RunInfo {
                computer_name: run_info.attr("computerName"),
                outcome: outcome(run_info),
                timestamp: run_info.attr("timestamp"),
                text: run_info.child_text(TEXT_TAG),
            })
            .collect(),
    })
}

fn counters(element: &Element) -> Result<Counters, DeserializeError> {
    let mut counters = Counters::default();
    for (attribute, slot) in counter_slots(&mut counters) {
        let Some(value) = element.attributes.get(attribute) else {
            continue;
        };
        *slot = value.trim().parse().map_err(|_| {
            DeserializeError::new(
                DeserializeErrorKind::InvalidCounter {
                    element: COUNTERS_TAG,
                    attribute,
                    value: value.clone(),
                },
                None,
            )
        })?;
    }
    Ok(counters)
}

fn counter_slots(counters: &mut Counters) -> [(&'static str, &mut usize); 15] {
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
    } = counters;

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

fn outcome(element: &Element) -> TestOutcome {
    TestOutcome::from(element.attr("outcome").as_str())
}

#[cfg(test)]
mod tests {
    use super::*;
    use indoc::indoc;
    use pretty_assertions::assert_eq;
    use test_case::test_case;

    #[test]
    fn reads_minimal_document() {
        let xml = indoc! {r#"
            <?xml version="1.0" encoding="UTF-8"?>
            <TestRun id="run-1" name="shard 1" runUser="ci">
                <Times creation="c" queuing="q" start="s" finish="f" />
                <Results>
                    <UnitTestResult testId="t1" executionId="e1" outcome="Passed" relativeResultsDirectory="e1" />
                </Results>
                <ResultSummary outcome="Passed">
                    <Counters total="1" executed="1" passed="1" />
                </ResultSummary>
            </TestRun>
        "#};

        let run = deserialize_test_run(xml).expect("document is valid");
        assert_eq!(run.id, "run-1");
        assert_eq!(run.run_user, "ci");
        assert_eq!(
            run.times,
            Times {
                creation: "c".to_owned(),
                queuing: "q".to_owned(),
                start: "s".to_owned(),
                finish: "f".to_owned(),
            }
        );
        assert_eq!(run.results.len(), 1);
        assert_eq!(run.results[0].relative_results_directory, None);
        assert_eq!(run.result_summary.counters.executed, 1);
        assert_eq!(run.result_summary.counters.failed, 0);
    }

    #[test]
    fn prefixed_names_are_matched_by_local_name() {
        let xml = indoc! {r#"
            <t:TestRun xmlns:t="http://microsoft.com/schemas/VisualStudio/TeamTest/2010" t:id="x">
                <t:TestLists>
                    <t:TestList id="l1" name="All Loaded Results" />
                </t:TestLists>
            </t:TestRun>
        "#};

        let run = deserialize_test_run(xml).expect("document is valid");
        assert_eq!(run.id, "x");
        assert_eq!(run.test_lists, vec![TestList::new("l1", "All Loaded Results")]);
    }

    #[test]
    fn unknown_elements_are_skipped() {
        let xml = indoc! {r#"
            <TestRun id="x" name="n">
                <TestSettings name="default" id="s1">
                    <Deployment runDeploymentRoot="root" />
                </TestSettings>
                <Results>
                    <UnitTestResult testId="t1" executionId="e1" outcome="Failed">
                        <Output>
                            <StdOut><![CDATA[raw <output>]]></StdOut>
                            <ErrorInfo>
                                <Message>boom &amp; bust</Message>
                                <StackTrace>at Foo()</StackTrace>
                            </ErrorInfo>
                        </Output>
                        <ResultFiles />
                    </UnitTestResult>
                </Results>
            </TestRun>
        "#};

        let run = deserialize_test_run(xml).expect("document is valid");
        let output = &run.results[0].output;
        assert_eq!(output.std_out, "raw <output>");
        assert_eq!(output.std_err, "");
        assert_eq!(
            output.error_info,
            Some(ErrorInfo {
                message: "boom & bust".to_owned(),
                stack_trace: "at Foo()".to_owned(),
            })
        );
    }

    #[test_case("", &["MissingRoot"]; "empty document")]
    #[test_case("<?xml version=\"1.0\"?>", &["MissingRoot"]; "declaration only")]
    #[test_case("<TestRun><Results></TestRun>", &["Xml"]; "mismatched end tag")]
    // Depending on the quick-xml version, a truncated document is reported either by the reader
    // or when the element stack is checked at the end.
    #[test_case("<TestRun><Results>", &["UnclosedElement", "Xml"]; "unclosed element")]
    #[test_case("<Report />", &["UnexpectedRoot"]; "wrong root")]
    #[test_case("<TestRun /><TestRun />", &["MultipleRoots"]; "two roots")]
    #[test_case("text <TestRun />", &["TextOutsideRoot"]; "text before root")]
    #[test_case(
        r#"<TestRun><ResultSummary><Counters total="-1" /></ResultSummary></TestRun>"#,
        &["InvalidCounter"];
        "negative counter"
    )]
    fn malformed_documents(xml: &str, expected_kinds: &[&str]) {
        let err = deserialize_test_run(xml).expect_err("document is malformed");
        let kind = format!("{:?}", err.kind());
        assert!(
            expected_kinds.iter().any(|expected| kind.starts_with(expected)),
            "expected one of {expected_kinds:?}, got {kind}"
        );
    }
}
