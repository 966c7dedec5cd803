// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

use anyhow::{bail, Result};
use ruleexpr::unstable::*;
use serde::Deserialize;
use test_generator::test_resources;

// Renders an expression tree as an s-expression, making grouping explicit.
fn render_expression(e: &Expression) -> String {
    let lhs = render_comparison(&e.comparison);
    match &e.next {
        Some((op, next)) => format!("({op} {lhs} {})", render_expression(next)),
        None => lhs,
    }
}

fn render_comparison(c: &Comparison) -> String {
    let lhs = render_bit_operation(&c.bit_operation);
    match &c.rhs {
        None => lhs,
        Some(ComparisonRhs::Scalar(s)) => {
            format!("({} {lhs} {})", s.op, render_comparison(&s.next))
        }
        Some(ComparisonRhs::Array(a)) => format!("({} {lhs} {})", a.op, render_array(&a.array)),
    }
}

fn render_bit_operation(b: &BitOperation) -> String {
    let lhs = render_unary(&b.unary);
    match &b.next {
        Some((op, next)) => format!("({op} {lhs} {})", render_bit_operation(next)),
        None => lhs,
    }
}

fn render_unary(u: &Unary) -> String {
    match u {
        Unary::Operation { op, operand, .. } => format!("({op} {})", render_unary(operand)),
        Unary::Primary(p) => render_primary(p),
    }
}

fn render_primary(p: &Primary) -> String {
    match p {
        Primary::Ident { name, .. } => name.clone(),
        Primary::Number { value, .. } => value.to_string(),
        Primary::Duration { value, .. } => format!("{value}ns"),
        Primary::String { value, .. } => format!("{value:?}"),
        Primary::Pattern { value, .. } => format!("~{value:?}"),
        Primary::Regexp { value, .. } => format!("r{value:?}"),
        Primary::SubExpression { expr, .. } => render_expression(expr),
    }
}

fn render_array(a: &Array) -> String {
    let items: Vec<String> = match a {
        Array::Ident { name, .. } => return name.clone(),
        Array::Numbers { values, .. } => values.iter().map(|v| v.to_string()).collect(),
        Array::StringMembers { members, .. } => members
            .iter()
            .map(|m| match m {
                StringMember::String(s) => format!("{s:?}"),
                StringMember::Pattern(s) => format!("~{s:?}"),
                StringMember::Regexp(s) => format!("r{s:?}"),
            })
            .collect(),
    };
    format!("[{}]", items.join(" "))
}

fn render_macro(body: &MacroBody) -> String {
    match body {
        MacroBody::Expression(e) => render_expression(e),
        MacroBody::Array(a) => render_array(a),
    }
}

#[derive(Deserialize, Debug)]
#[serde(deny_unknown_fields)]
struct TestCase {
    note: String,
    expression: Option<String>,
    #[serde(rename = "macro")]
    macro_body: Option<String>,
    want_tree: Option<String>,
    error: Option<String>,
}

#[derive(Deserialize, Debug)]
#[serde(deny_unknown_fields)]
struct YamlTest {
    cases: Vec<TestCase>,
}

fn run_case(case: &TestCase) -> Result<()> {
    let parsed = match (&case.expression, &case.macro_body) {
        (Some(text), None) => parse_expression(&case.note, text).map(|e| render_expression(&e)),
        (None, Some(text)) => parse_macro(&case.note, text).map(|m| render_macro(&m)),
        _ => bail!("exactly one of expression or macro must be specified"),
    };

    match (parsed, &case.error) {
        (Ok(tree), None) => match &case.want_tree {
            Some(want) if &tree != want => {
                bail!("tree mismatch:\nleft  = {tree}\nright = {want}")
            }
            _ => Ok(()),
        },
        (Ok(tree), Some(expected)) => bail!("parsed as {tree}, expected error `{expected}`"),
        (Err(actual), Some(expected)) => {
            let actual = actual.to_string();
            if !actual.contains(expected.as_str()) {
                bail!("Error message\n`{actual}\n`\ndoes not contain `{expected}`");
            }
            Ok(())
        }
        (Err(actual), None) => Err(actual),
    }
}

fn yaml_test_impl(file: &str) -> Result<()> {
    let yaml_str = std::fs::read_to_string(file)?;
    let test: YamlTest = serde_yaml::from_str(&yaml_str)?;

    println!("running {file}");
    for case in &test.cases {
        print!("case {} ", case.note);
        if let Err(e) = run_case(case) {
            bail!("case `{}` failed: {e}", case.note);
        }
        println!("passed");
    }
    Ok(())
}

#[test_resources("tests/parser/cases/*.yaml")]
fn run(path: &str) {
    if let Err(e) = yaml_test_impl(path) {
        panic!("{}", e);
    }
}

#[test]
fn spans_cover_nodes() -> Result<()> {
    let source = Source::from_contents(
        "rule.secl".to_string(),
        "process.name == \"bash\" && (open.flags & 1 != 0)".to_string(),
    )?;
    let mut parser = Parser::new(&source)?;
    let expr = parser.parse_expression()?;
    assert_eq!(expr.span.text(), source.contents().as_str());
    assert_eq!(expr.comparison.span.text(), "process.name == \"bash\"");

    let Some((_, next)) = &expr.next else {
        bail!("expected a conjunction");
    };
    assert_eq!(next.span.text(), "(open.flags & 1 != 0)");
    Ok(())
}

#[test]
fn errors_name_the_file() -> Result<()> {
    let Err(e) = parse_expression("rule.secl", "process.name == ") else {
        bail!("expected a parse error");
    };
    let msg = e.to_string();
    assert!(msg.contains("--> rule.secl:1:"), "{msg}");
    assert!(msg.contains("expecting identifier, literal or `(`"), "{msg}");
    Ok(())
}
