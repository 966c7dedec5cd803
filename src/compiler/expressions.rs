// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

use crate::ast::*;
use crate::compiler::Compiler;
use crate::error::{CompileError, Kind, Result};
use crate::evaluator::{Evaluator, IntEvaluator};
use crate::lexer::Span;
use crate::operators::*;

fn expect_int<'e>(e: &'e Evaluator, span: &Span) -> Result<&'e IntEvaluator> {
    match e {
        // Durations only make sense in comparisons.
        Evaluator::Int(i) if !i.is_duration => Ok(i),
        _ => Err(CompileError::Type {
            expected: Kind::Int,
        }
        .at(span)),
    }
}

impl Compiler<'_, '_> {
    pub fn compile_expression(&mut self, expr: &Ref<Expression>) -> Result<Evaluator> {
        let mark = self.reads_mark();
        let lhs = self.compile_comparison(&expr.comparison)?;
        let Some((op, next)) = &expr.next else {
            return Ok(lhs);
        };
        let rhs = self.compile_expression(next)?;

        let type_error = |span: &Span| {
            CompileError::Type {
                expected: Kind::Bool,
            }
            .at(span)
        };
        let (Evaluator::Bool(a), Evaluator::Bool(b)) = (&lhs, &rhs) else {
            return Err(match &lhs {
                Evaluator::Bool(_) => type_error(&next.span),
                _ => type_error(&expr.comparison.span),
            });
        };

        let result = match op {
            LogicalOp::And => and(a, b),
            LogicalOp::Or => or(a, b),
        };
        Ok(self.scoped(result, mark, &expr.span).into())
    }

    pub(super) fn compile_bit_operation(&mut self, bit_op: &Ref<BitOperation>) -> Result<Evaluator> {
        let lhs = self.compile_unary(&bit_op.unary)?;
        let Some((op, next)) = &bit_op.next else {
            return Ok(lhs);
        };
        let rhs = self.compile_bit_operation(next)?;

        let a = expect_int(&lhs, bit_op.unary.span())?;
        let b = expect_int(&rhs, &next.span)?;
        Ok(match op {
            BitOp::And => int_and(a, b),
            BitOp::Or => int_or(a, b),
            BitOp::Xor => int_xor(a, b),
        }
        .into())
    }

    fn compile_unary(&mut self, unary: &Ref<Unary>) -> Result<Evaluator> {
        let (span, op, operand) = match unary.as_ref() {
            Unary::Primary(primary) => {
                let mark = self.reads_mark();
                return Ok(match self.compile_primary(primary)? {
                    Evaluator::Bool(b) => self.scoped(b, mark, primary.span()).into(),
                    e => e,
                });
            }
            Unary::Operation { span, op, operand } => (span, op, operand),
        };

        let value = self.compile_unary(operand)?;
        match (op, &value) {
            (UnaryOp::Not, Evaluator::Bool(b)) => Ok(not(b).into()),
            (UnaryOp::Not, _) => Err(CompileError::Type {
                expected: Kind::Bool,
            }
            .at(span)),
            (UnaryOp::Minus, Evaluator::Int(i)) => Ok(minus(i).into()),
            (UnaryOp::Minus, _) => Err(CompileError::Type {
                expected: Kind::Int,
            }
            .at(span)),
            (UnaryOp::BitNot, _) => Ok(int_not(expect_int(&value, span)?).into()),
        }
    }
}
