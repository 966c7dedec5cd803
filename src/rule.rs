// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

use crate::ast::{Expression, Ref};
use crate::compiler::compile_rule_expression;
use crate::context::Context;
use crate::error::Result;
use crate::evaluator::{BoolEvaluator, Field};
use crate::model::Model;
use crate::opts::Opts;
use crate::parser;
use crate::state::{FieldValue, State};

use std::collections::{BTreeMap, BTreeSet};

/// A compiled rule, ready to be evaluated against events.
#[derive(Debug, Clone)]
pub struct Rule {
    pub id: String,
    pub expression: String,
    pub evaluator: BoolEvaluator,
    /// Fields read by the rule.
    pub fields: BTreeSet<Field>,
    /// Static values fields are compared against.
    pub field_values: BTreeMap<Field, Vec<FieldValue>>,
}

impl Rule {
    /// Parses and compiles `expression`.
    pub fn compile(
        id: &str,
        expression: &str,
        model: &dyn Model,
        opts: &Opts,
    ) -> anyhow::Result<Rule> {
        let ast = parser::parse_expression(id, expression)?;
        Ok(Self::from_ast(id, expression, &ast, model, opts)?)
    }

    pub fn from_ast(
        id: &str,
        expression: &str,
        ast: &Ref<Expression>,
        model: &dyn Model,
        opts: &Opts,
    ) -> Result<Rule> {
        let mut state = State::new(model);
        let evaluator = compile_rule_expression(ast, opts, &mut state)?;

        tracing::debug!(
            rule = id,
            weight = evaluator.weight,
            fields = ?state.fields(),
            registers = state.registers_info().len(),
            "compiled rule"
        );

        Ok(Rule {
            id: id.to_string(),
            expression: expression.to_string(),
            evaluator,
            fields: state.fields().clone(),
            field_values: state.field_values().clone(),
        })
    }

    pub fn eval(&self, ctx: &Context<'_>) -> bool {
        self.evaluator.eval(ctx)
    }

    pub fn weight(&self) -> i64 {
        self.evaluator.weight
    }
}
