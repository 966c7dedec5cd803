// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

use std::sync::Arc;

use anyhow::{bail, Result};
use ruleexpr::*;
use serde_json::json;

const SCHEMA: &str = r#"
fields:
  process.name: string
  process.pid: { type: int, handler: true }
  process.ancestors.name: string
  user.groups: string_array
iterators: [process.ancestors]
"#;

// Compares names case-insensitively, as a case-preserving filesystem would.
struct IgnoreCase;

impl OpOverrides for IgnoreCase {
    fn string_equals(
        &self,
        a: &StringEvaluator,
        b: &StringEvaluator,
    ) -> Option<core::result::Result<BoolEvaluator, CompileError>> {
        let (a, b) = (a.clone(), b.clone());
        let field = if a.field.is_empty() { b.field.clone() } else { a.field.clone() };
        Some(Ok(BoolEvaluator::dynamic(
            field,
            a.weight + b.weight,
            move |ctx: &Context<'_>| a.eval(ctx).eq_ignore_ascii_case(&b.eval(ctx)),
        )))
    }

    fn string_values_contains(
        &self,
        a: &StringEvaluator,
        b: &StringValuesEvaluator,
    ) -> Option<core::result::Result<BoolEvaluator, CompileError>> {
        let a = a.clone();
        let values: Vec<String> = b.values.scalars().map(|s| s.to_lowercase()).collect();
        Some(Ok(BoolEvaluator::dynamic(
            a.field.clone(),
            a.weight + IN_ARRAY_WEIGHT,
            move |ctx: &Context<'_>| values.contains(&a.eval(ctx).to_lowercase()),
        )))
    }
}

fn model() -> Result<DocumentModel> {
    let schema: Schema = serde_yaml::from_str(SCHEMA)?;
    Ok(DocumentModel::new(schema).with_overrides("process.name", Arc::new(IgnoreCase)))
}

#[test]
fn overrides_replace_equality() -> Result<()> {
    let model = model()?;
    let opts = Opts::new();
    let event = json!({ "process": { "name": "BASH" } });
    let ctx = Context::new(&event);

    assert!(Rule::compile("eq", r#"process.name == "bash""#, &model, &opts)?.eval(&ctx));
    assert!(Rule::compile("eq_rev", r#""Bash" == process.name"#, &model, &opts)?.eval(&ctx));
    assert!(Rule::compile("in", r#"process.name in ["sh", "bash"]"#, &model, &opts)?.eval(&ctx));
    assert!(!Rule::compile("ne", r#"process.name != "bash""#, &model, &opts)?.eval(&ctx));
    Ok(())
}

#[test]
fn rules_expose_fields_and_values() -> Result<()> {
    let model = model()?;
    let rule = Rule::compile(
        "ancestry",
        r#"process.pid == 1 && process.ancestors.name in ["sshd", "cron"] && user.groups == "wheel""#,
        &model,
        &Opts::new(),
    )?;

    assert_eq!(rule.id, "ancestry");
    assert_eq!(
        rule.fields.iter().collect::<Vec<_>>(),
        ["process.ancestors.name", "process.pid", "user.groups"]
    );
    assert_eq!(
        rule.weight(),
        HANDLER_WEIGHT
            + (FUNCTION_WEIGHT + ITERATOR_WEIGHT + IN_ARRAY_WEIGHT)
            + (FUNCTION_WEIGHT + IN_ARRAY_WEIGHT)
    );

    let Some(values) = rule.field_values.get("process.ancestors.name") else {
        bail!("missing tracked values");
    };
    let names: Vec<_> = values.iter().map(|v| &v.value).collect();
    assert_eq!(
        names,
        [
            &Constant::String("cron".into()),
            &Constant::String("sshd".into())
        ]
    );

    let event = json!({
        "process": { "pid": 1, "ancestors": [{ "name": "bash" }, { "name": "cron" }] },
        "user": { "groups": ["users", "wheel"] },
    });
    assert!(rule.eval(&Context::new(&event)));

    let event = json!({
        "process": { "pid": 1, "ancestors": [{ "name": "bash" }] },
        "user": { "groups": ["wheel"] },
    });
    assert!(!rule.eval(&Context::new(&event)));
    Ok(())
}

#[test]
fn foreign_events_evaluate_to_defaults() -> Result<()> {
    let model = model()?;
    let rule = Rule::compile("pid", "process.pid == 0", &model, &Opts::new())?;
    // The document model only understands JSON events.
    let event = 42u64;
    assert!(rule.eval(&Context::new(&event)));
    Ok(())
}

#[test]
fn schema_rejects_unknown_keys() {
    assert!(Schema::from_json_str(r#"{ "fields": {}, "handlers": [] }"#).is_err());
    assert!(Schema::from_json_str(r#"{ "fields": { "a": "float" } }"#).is_err());
}

// A model over a plain Rust event type.
struct Connection {
    port: i64,
    peers: Vec<&'static str>,
}

struct ConnectionModel;

struct Peers;

impl FieldIterator for Peers {
    fn count(&self, ctx: &Context<'_>) -> usize {
        ctx.event::<Connection>().map(|c| c.peers.len()).unwrap_or_default()
    }
}

impl Model for ConnectionModel {
    fn get_evaluator(
        &self,
        field: &str,
        register: Option<&RegisterId>,
    ) -> core::result::Result<Evaluator, ModelError> {
        match (field, register.cloned()) {
            ("conn.port", _) => Ok(IntEvaluator::dynamic(field, FUNCTION_WEIGHT, |ctx: &Context<'_>| {
                ctx.event::<Connection>().map(|c| c.port).unwrap_or_default()
            })
            .into()),
            ("conn.peers.host", Some(register)) => Ok(StringEvaluator::dynamic(
                field,
                FUNCTION_WEIGHT,
                move |ctx: &Context<'_>| {
                    ctx.event::<Connection>()
                        .and_then(|c| c.peers.get(ctx.register(&register)))
                        .map(|p| p.to_string())
                        .unwrap_or_default()
                },
            )
            .into()),
            _ => Err(ModelError::FieldNotFound(field.to_string())),
        }
    }

    fn get_iterator(&self, field: &str) -> core::result::Result<Arc<dyn FieldIterator>, ModelError> {
        match field {
            "conn.peers" => Ok(Arc::new(Peers)),
            _ => Err(ModelError::IteratorNotFound(field.to_string())),
        }
    }
}

#[test]
fn custom_models_plug_in() -> Result<()> {
    let rule = Rule::compile(
        "ssh_to_internal",
        r#"conn.port == 22 && conn.peers.host =~ "10.*""#,
        &ConnectionModel,
        &Opts::new(),
    )?;

    let event = Connection {
        port: 22,
        peers: vec!["192.168.0.1", "10.0.0.7"],
    };
    assert!(rule.eval(&Context::new(&event)));

    let event = Connection {
        port: 22,
        peers: vec!["192.168.0.1"],
    };
    assert!(!rule.eval(&Context::new(&event)));
    Ok(())
}
