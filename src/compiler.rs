// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

//! Compilation of rule expressions into evaluators.
//!
//! The compiler walks the AST depth first. Every node compiles its children
//! and then asks the operator library for the operator matching the
//! evaluator variants of its operands. Identifiers are resolved against the
//! constants and macros of [`Opts`], then against the [`Model`](crate::Model).

mod comparisons;
mod expressions;
mod primaries;

use crate::ast::{Expression, Ref};
use crate::error::{CompileError, Kind, Result};
use crate::evaluator::{BoolEvaluator, Evaluator};
use crate::opts::Opts;
use crate::lexer::Span;
use crate::registers::{bind_scopes, scoped, Scope};
use crate::state::State;

use core::ops::Range;

pub struct Compiler<'a, 'm> {
    opts: &'a Opts,
    state: &'a mut State<'m>,
    scopes: Vec<Scope>,
}

impl<'a, 'm> Compiler<'a, 'm> {
    pub fn new(opts: &'a Opts, state: &'a mut State<'m>) -> Self {
        Self {
            opts,
            state,
            scopes: vec![],
        }
    }

    // Position in the register read log, used to delimit sub-expressions.
    fn reads_mark(&self) -> usize {
        self.state.register_reads().len()
    }

    fn scoped(&mut self, evaluator: BoolEvaluator, from: usize, span: &Span) -> BoolEvaluator {
        let reads: Range<usize> = from..self.reads_mark();
        scoped(evaluator, reads, span, &mut self.scopes)
    }

    /// Attaches every register to the sub-expression iterating it.
    pub fn finish(self) -> Result<()> {
        bind_scopes(&self.scopes, self.state)
    }
}

/// Compiles `expr` into an evaluator of any kind.
///
/// Boolean sub-expressions reading fields under an iterator hold when one
/// element of the iterator satisfies them.
pub fn compile(expr: &Ref<Expression>, opts: &Opts, state: &mut State<'_>) -> Result<Evaluator> {
    let mut compiler = Compiler::new(opts, state);
    let evaluator = compiler.compile_expression(expr)?;
    compiler.finish()?;
    Ok(evaluator)
}

/// Compiles a complete rule expression, which must be boolean.
pub fn compile_rule_expression(
    expr: &Ref<Expression>,
    opts: &Opts,
    state: &mut State<'_>,
) -> Result<BoolEvaluator> {
    match compile(expr, opts, state)? {
        Evaluator::Bool(evaluator) => Ok(evaluator),
        _ => Err(CompileError::Type {
            expected: Kind::Bool,
        }
        .at(&expr.span)),
    }
}
