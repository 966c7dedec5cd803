// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

#![cfg(test)]

use std::collections::BTreeSet;
use std::env;

use anyhow::{bail, Result};
use ruleexpr::*;
use serde::Deserialize;
use test_generator::test_resources;

const DEFAULT_SCHEMA: &str = "tests/compiler/schema.yaml";

#[derive(Deserialize, Debug)]
#[serde(deny_unknown_fields)]
struct MacroCase {
    id: String,
    source: String,
}

#[derive(Deserialize, Debug)]
#[serde(deny_unknown_fields)]
struct EventCase {
    event: serde_json::Value,
    want: bool,
    // Evaluation time in nanoseconds.
    now: Option<i64>,
}

#[derive(Deserialize, Debug)]
#[serde(deny_unknown_fields)]
struct TestCase {
    note: String,
    expression: String,
    #[serde(default)]
    options: Option<Opts>,
    #[serde(default)]
    macros: Vec<MacroCase>,
    #[serde(default)]
    events: Vec<EventCase>,
    want_weight: Option<i64>,
    want_fields: Option<Vec<String>>,
    error: Option<String>,
    skip: Option<bool>,
}

#[derive(Deserialize, Debug)]
#[serde(deny_unknown_fields)]
struct YamlTest {
    schema: Option<Schema>,
    cases: Vec<TestCase>,
}

fn run_case(case: TestCase, model: &DocumentModel) -> Result<()> {
    let mut opts = case.options.unwrap_or_default();
    for m in &case.macros {
        let compiled = Macro::from_source(&m.id, &m.source, model, &opts)?;
        opts.add_macro(compiled);
    }

    let rule = match (Rule::compile(&case.note, &case.expression, model, &opts), &case.error) {
        (Ok(_), Some(expected)) => bail!("compilation succeeded, expected error `{expected}`"),
        (Ok(rule), None) => rule,
        (Err(actual), Some(expected)) => {
            let actual = actual.to_string();
            if !actual.contains(expected.as_str()) {
                bail!("Error message\n`{actual}\n`\ndoes not contain `{expected}`");
            }
            println!("{actual}");
            return Ok(());
        }
        (Err(actual), None) => return Err(actual),
    };

    if let Some(weight) = case.want_weight {
        if rule.weight() != weight {
            bail!("weight {} != {weight}", rule.weight());
        }
    }
    if let Some(fields) = &case.want_fields {
        let actual: Vec<_> = rule.fields.iter().cloned().collect();
        if &actual != fields {
            bail!("fields {actual:?} != {fields:?}");
        }
    }

    for (idx, e) in case.events.iter().enumerate() {
        let ctx = match e.now {
            Some(now) => Context::new(&e.event).with_now(now),
            None => Context::new(&e.event),
        };
        let got = rule.eval(&ctx);
        if got != e.want {
            bail!("event {idx}: `{}` evaluated to {got}, want {}", case.expression, e.want);
        }
    }
    Ok(())
}

fn yaml_test_impl(file: &str) -> Result<()> {
    let yaml_str = std::fs::read_to_string(file)?;
    let test: YamlTest = serde_yaml::from_str(&yaml_str)?;
    let schema = match test.schema {
        Some(schema) => schema,
        None => serde_yaml::from_str(&std::fs::read_to_string(DEFAULT_SCHEMA)?)?,
    };
    let model = DocumentModel::new(schema);

    println!("running {file}");

    let mut notes = BTreeSet::new();
    for case in test.cases {
        print!("case {} ", case.note);
        if !notes.insert(case.note.clone()) {
            bail!("duplicate case `{}`", case.note);
        }
        if case.skip == Some(true) {
            println!("skipped");
            continue;
        }
        if case.error.is_none() && case.events.is_empty() && case.want_weight.is_none() {
            panic!("either events, want_weight or error must be specified in test case.");
        }

        let note = case.note.clone();
        if let Err(e) = run_case(case, &model) {
            bail!("case `{note}` failed: {e}");
        }
        println!("passed");
    }

    Ok(())
}

fn yaml_test(file: &str) -> Result<()> {
    match yaml_test_impl(file) {
        Ok(_) => Ok(()),
        Err(e) => {
            // Errors returned from tests are not always printed by cargo test.
            panic!("{}", e);
        }
    }
}

#[test]
fn yaml_test_scenarios() -> Result<()> {
    yaml_test("tests/compiler/cases/scenarios.yaml")
}

#[test]
#[ignore = "intended for running a single yaml file"]
fn one_yaml() -> Result<()> {
    let Some(file) = env::args().find(|a| a.ends_with(".yaml")) else {
        bail!("missing <yaml-file>");
    };
    yaml_test(&file)
}

#[test_resources("tests/compiler/cases/**/*.yaml")]
fn run(path: &str) {
    yaml_test(path).unwrap()
}
