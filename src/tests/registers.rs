// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

use super::common::*;
use crate::*;

use anyhow::{bail, Result};
use serde_json::json;

#[test]
fn fields_of_one_iterator_share_a_register() -> Result<()> {
    let model = document_model()?;
    let (evaluator, state) = compile_rule(
        r#"process.ancestors.file.name == "sh" && process.ancestors.pid > 1"#,
        &model,
        &Opts::new(),
    )?;

    assert_eq!(state.registers_info().len(), 1);
    let Some(info) = state.register_info("r0") else {
        bail!("expected register r0");
    };
    assert_eq!(info.field, "process.ancestors");
    assert_eq!(
        info.sub_fields.iter().collect::<Vec<_>>(),
        ["process.ancestors.file.name", "process.ancestors.pid"]
    );
    assert_eq!(
        evaluator.weight,
        2 * (FUNCTION_WEIGHT + ITERATOR_WEIGHT)
    );

    // Both conditions must hold on the same ancestor.
    let split = json!({ "process": { "ancestors": [
        { "file": { "name": "sh" }, "pid": 1 },
        { "file": { "name": "bash" }, "pid": 5 },
    ] } });
    assert!(!evaluator.eval(&Context::new(&split)));

    let same = json!({ "process": { "ancestors": [
        { "file": { "name": "bash" }, "pid": 1 },
        { "file": { "name": "sh" }, "pid": 5 },
    ] } });
    assert!(evaluator.eval(&Context::new(&same)));
    Ok(())
}

#[test]
fn empty_iterator_never_matches() -> Result<()> {
    let model = document_model()?;
    let (evaluator, _) = compile_rule(
        r#"process.ancestors.file.name != "sh""#,
        &model,
        &Opts::new(),
    )?;
    let event = json!({ "process": { "ancestors": [] } });
    assert!(!evaluator.eval(&Context::new(&event)));

    let event = json!({ "process": {} });
    assert!(!evaluator.eval(&Context::new(&event)));
    Ok(())
}

#[test]
fn independent_iterators_match_independently() -> Result<()> {
    let model = document_model()?;
    let (evaluator, state) = compile_rule(
        r#"process.ancestors.pid == 1 && process.envs.name == "PATH""#,
        &model,
        &Opts::new(),
    )?;
    assert_eq!(state.registers_info().len(), 2);

    let event = json!({ "process": {
        "ancestors": [{ "pid": 7 }, { "pid": 1 }],
        "envs": [{ "name": "HOME" }, { "name": "PATH" }],
    } });
    assert!(evaluator.eval(&Context::new(&event)));

    let event = json!({ "process": {
        "ancestors": [{ "pid": 7 }],
        "envs": [{ "name": "PATH" }],
    } });
    assert!(!evaluator.eval(&Context::new(&event)));
    Ok(())
}

#[test]
fn empty_iterator_only_falsifies_its_condition() -> Result<()> {
    let model = document_model()?;
    let (evaluator, _) = compile_rule(
        r#"process.name == "bash" || process.ancestors.file.name == "sh""#,
        &model,
        &Opts::new(),
    )?;

    let event = json!({ "process": { "name": "bash", "ancestors": [] } });
    assert!(evaluator.eval(&Context::new(&event)));
    let event = json!({ "process": { "name": "zsh", "ancestors": [] } });
    assert!(!evaluator.eval(&Context::new(&event)));
    let event = json!({ "process": { "name": "zsh", "ancestors": [
        { "file": { "name": "init" } },
        { "file": { "name": "sh" } },
    ] } });
    assert!(evaluator.eval(&Context::new(&event)));

    let (evaluator, _) = compile_rule(
        r#"process.ancestors.pid == 1 || process.envs.name == "PATH""#,
        &model,
        &Opts::new(),
    )?;
    let event = json!({ "process": { "ancestors": [], "envs": [{ "name": "PATH" }] } });
    assert!(evaluator.eval(&Context::new(&event)));
    Ok(())
}

#[test]
fn negation_applies_to_the_whole_iteration() -> Result<()> {
    let model = document_model()?;
    let (evaluator, _) = compile_rule(
        r#"not (process.ancestors.file.name == "init")"#,
        &model,
        &Opts::new(),
    )?;

    let event = json!({ "process": { "ancestors": [
        { "file": { "name": "init" } },
        { "file": { "name": "sh" } },
    ] } });
    assert!(!evaluator.eval(&Context::new(&event)));
    let event = json!({ "process": { "ancestors": [{ "file": { "name": "sh" } }] } });
    assert!(evaluator.eval(&Context::new(&event)));
    let event = json!({ "process": { "ancestors": [] } });
    assert!(evaluator.eval(&Context::new(&event)));
    Ok(())
}

#[test]
fn shared_register_spans_nested_conditions() -> Result<()> {
    let model = document_model()?;
    let (evaluator, _) = compile_rule(
        r#"process.ancestors.file.name == "sh" && (process.name == "cron" || process.ancestors.pid == 1)"#,
        &model,
        &Opts::new(),
    )?;

    let split = json!({ "process": { "name": "bash", "ancestors": [
        { "file": { "name": "sh" }, "pid": 7 },
        { "file": { "name": "init" }, "pid": 1 },
    ] } });
    assert!(!evaluator.eval(&Context::new(&split)));

    let same = json!({ "process": { "name": "bash", "ancestors": [
        { "file": { "name": "init" }, "pid": 7 },
        { "file": { "name": "sh" }, "pid": 1 },
    ] } });
    assert!(evaluator.eval(&Context::new(&same)));

    let cron = json!({ "process": { "name": "cron", "ancestors": [
        { "file": { "name": "sh" }, "pid": 7 },
    ] } });
    assert!(evaluator.eval(&Context::new(&cron)));
    Ok(())
}

#[test]
fn compiled_expressions_iterate() -> Result<()> {
    let model = document_model()?;
    let (evaluator, _) = compile_expr(
        r#"process.ancestors.file.name == "sh""#,
        &model,
        &Opts::new(),
    )?;
    let Evaluator::Bool(evaluator) = evaluator else {
        bail!("expected a bool evaluator");
    };

    let event = json!({ "process": { "ancestors": [
        { "file": { "name": "init" } },
        { "file": { "name": "sh" } },
    ] } });
    assert!(evaluator.eval(&Context::new(&event)));
    Ok(())
}

#[test]
fn iterators_cannot_meet_in_one_condition() -> Result<()> {
    let model = document_model()?;
    for rule in [
        "process.ancestors.file.name == process.envs.name",
        r#"(process.ancestors.pid == 1 && process.envs.name == "PATH") || (process.ancestors.pid == 2 && process.envs.name == "HOME")"#,
        "process.ancestors[_].file.name == process.ancestors.file.name",
    ] {
        match compile_error(rule, &model, &Opts::new())? {
            CompileError::IteratorInteraction { first, .. } => {
                assert_eq!(first, "process.ancestors", "{rule}")
            }
            e => bail!("{rule}: unexpected error {e}"),
        }
    }
    Ok(())
}

#[test]
fn anonymous_register_binds_one_iterator() -> Result<()> {
    let model = document_model()?;
    let (evaluator, state) = compile_rule(
        r#"process.ancestors[_].file.name == "sh" && process.ancestors[_].pid == 3"#,
        &model,
        &Opts::new(),
    )?;
    assert_eq!(state.registers_info().len(), 1);

    let event = json!({ "process": { "ancestors": [
        { "file": { "name": "init" }, "pid": 1 },
        { "file": { "name": "sh" }, "pid": 3 },
    ] } });
    assert!(evaluator.eval(&Context::new(&event)));

    match compile_error(
        r#"process.ancestors[_].pid == 1 && process.envs[_].name == "PATH""#,
        &model,
        &Opts::new(),
    )? {
        CompileError::RegisterMultipleFields { register } => assert_eq!(register, "_"),
        e => bail!("unexpected error {e}"),
    }
    Ok(())
}

#[test]
fn named_registers_are_rejected() -> Result<()> {
    let model = document_model()?;
    match compile_error("process.ancestors[A].pid == 1", &model, &Opts::new())? {
        CompileError::RegisterNameNotAllowed { register } => assert_eq!(register, "A"),
        e => bail!("unexpected error {e}"),
    }
    Ok(())
}

#[test]
fn malformed_registers_are_rejected() -> Result<()> {
    let model = document_model()?;
    for rule in ["process.ancestors[].pid == 1", "process.ancestors[_].file[_].name == \"sh\""] {
        let error = compile_error(rule, &model, &Opts::new())?;
        assert!(
            matches!(error, CompileError::RegisterFormat { .. }),
            "{rule}: {error}"
        );
    }

    let error = compile_error("process[_].name == \"sh\"", &model, &Opts::new())?;
    assert!(matches!(
        error,
        CompileError::Model(ModelError::IteratorNotFound(_))
    ));
    Ok(())
}
