// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

use crate::ast::*;
use crate::compiler::Compiler;
use crate::error::{CompileError, Kind, Result};
use crate::evaluator::*;
use crate::operators::*;
use crate::pattern::compile_pattern;
use crate::state::FieldValue;

type OpResult = ::core::result::Result<BoolEvaluator, CompileError>;

fn unknown_operator(op: ScalarOp) -> CompileError {
    CompileError::UnknownOperator { op: op.to_string() }
}

// Element kind expected on the right of a scalar comparison.
fn scalar_kind(e: &Evaluator) -> Kind {
    match e {
        Evaluator::Bool(_) | Evaluator::BoolArray(_) => Kind::Bool,
        Evaluator::Int(_) | Evaluator::IntArray(_) => Kind::Int,
        Evaluator::String(_) | Evaluator::StringArray(_) | Evaluator::StringValues(_) => {
            Kind::String
        }
    }
}

fn int_ordering(op: ScalarOp, a: &IntEvaluator, b: &IntEvaluator) -> OpResult {
    let duration = a.is_duration || b.is_duration;
    Ok(match (op, duration) {
        (ScalarOp::Eq, _) => int_equals(a, b),
        (ScalarOp::Lt, false) => lesser_than(a, b),
        (ScalarOp::Le, false) => lesser_or_equal_than(a, b),
        (ScalarOp::Gt, false) => greater_than(a, b),
        (ScalarOp::Ge, false) => greater_or_equal_than(a, b),
        (ScalarOp::Lt, true) => duration_lesser_than(a, b),
        (ScalarOp::Le, true) => duration_lesser_or_equal_than(a, b),
        (ScalarOp::Gt, true) => duration_greater_than(a, b),
        (ScalarOp::Ge, true) => duration_greater_or_equal_than(a, b),
        _ => return Err(unknown_operator(op)),
    })
}

impl Compiler<'_, '_> {
    pub(super) fn compile_comparison(&mut self, cmp: &Ref<Comparison>) -> Result<Evaluator> {
        let mark = self.reads_mark();
        let lhs = self.compile_bit_operation(&cmp.bit_operation)?;
        match &cmp.rhs {
            None => Ok(lhs),
            Some(ComparisonRhs::Scalar(scalar)) => {
                let rhs = self.compile_comparison(&scalar.next)?;
                let (op, negate) = match scalar.op {
                    ScalarOp::Ne => (ScalarOp::Eq, true),
                    ScalarOp::NotMatch => (ScalarOp::Match, true),
                    op => (op, false),
                };
                let result = self
                    .scalar_comparison(op, lhs, rhs)
                    .map_err(|e| e.at(&cmp.span))?;
                let result = if negate { not(&result) } else { result };
                Ok(self.scoped(result, mark, &cmp.span).into())
            }
            Some(ComparisonRhs::Array(array)) => {
                let rhs = self.compile_array(&array.array)?;
                let result = self
                    .array_comparison(lhs, rhs)
                    .map_err(|e| e.at(&cmp.span))?;
                let result = match array.op {
                    ArrayOp::In => result,
                    ArrayOp::NotIn => not(&result),
                };
                Ok(self.scoped(result, mark, &cmp.span).into())
            }
        }
    }

    // Records the static operand a field is compared against.
    fn track(&mut self, field: &str, value: &Evaluator) {
        if field.is_empty() {
            return;
        }
        let values: Vec<FieldValue> = match value {
            Evaluator::String(s) if s.is_static() => vec![FieldValue {
                value: Constant::String(s.value.clone()),
                kind: s.kind,
            }],
            Evaluator::StringValues(v) => v
                .values
                .scalars()
                .map(|s| FieldValue {
                    value: Constant::String(s.clone()),
                    kind: ValueKind::Scalar,
                })
                .collect(),
            Evaluator::Int(i) if i.is_static() => vec![FieldValue {
                value: Constant::Int(i.value),
                kind: ValueKind::Scalar,
            }],
            Evaluator::IntArray(a) if a.is_static() => a
                .value
                .iter()
                .map(|v| FieldValue {
                    value: Constant::Int(*v),
                    kind: ValueKind::Scalar,
                })
                .collect(),
            Evaluator::Bool(b) if b.is_static() => vec![FieldValue {
                value: Constant::Bool(b.value),
                kind: ValueKind::Scalar,
            }],
            _ => return,
        };
        for v in values {
            self.state.update_field_values(field, v);
        }
    }

    fn track_pair(&mut self, lhs: &Evaluator, rhs: &Evaluator) {
        self.track(lhs.field(), rhs);
        self.track(rhs.field(), lhs);
    }

    /// Positive scalar comparisons: `==`, `=~` and the orderings.
    fn scalar_comparison(&mut self, op: ScalarOp, lhs: Evaluator, rhs: Evaluator) -> OpResult {
        if op == ScalarOp::Eq {
            self.track_pair(&lhs, &rhs);
        }

        match (lhs, rhs) {
            (Evaluator::Bool(a), Evaluator::Bool(b)) => match op {
                ScalarOp::Eq => Ok(bool_equals(&a, &b)),
                _ => Err(unknown_operator(op)),
            },
            (Evaluator::BoolArray(a), Evaluator::Bool(b)) => match op {
                ScalarOp::Eq => Ok(array_bool_equals(&a, &b)),
                _ => Err(unknown_operator(op)),
            },
            (Evaluator::String(a), Evaluator::String(mut b)) => match op {
                ScalarOp::Eq => string_equals(&a, &b),
                ScalarOp::Match => {
                    compile_pattern(&mut b)?;
                    self.track(&a.field, &Evaluator::String(b.clone()));
                    string_equals(&a, &b)
                }
                _ => Err(unknown_operator(op)),
            },
            (Evaluator::StringArray(a), Evaluator::String(mut b)) => match op {
                ScalarOp::Eq => string_array_contains(&b, &a),
                ScalarOp::Match => {
                    compile_pattern(&mut b)?;
                    self.track(&a.field, &Evaluator::String(b.clone()));
                    string_array_contains(&b, &a)
                }
                _ => Err(unknown_operator(op)),
            },
            (Evaluator::Int(a), Evaluator::Int(b)) => int_ordering(op, &a, &b),
            (Evaluator::Int(a), Evaluator::IntArray(b)) => match op {
                ScalarOp::Eq => Ok(int_array_equals(&a, &b)),
                ScalarOp::Lt => Ok(int_array_lesser_than(&a, &b)),
                ScalarOp::Le => Ok(int_array_lesser_or_equal_than(&a, &b)),
                ScalarOp::Gt => Ok(int_array_greater_than(&a, &b)),
                ScalarOp::Ge => Ok(int_array_greater_or_equal_than(&a, &b)),
                _ => Err(unknown_operator(op)),
            },
            // `array < b` holds when `b > element` for some element.
            (Evaluator::IntArray(a), Evaluator::Int(b)) => match op {
                ScalarOp::Eq => Ok(int_array_equals(&b, &a)),
                ScalarOp::Lt => Ok(int_array_greater_than(&b, &a)),
                ScalarOp::Le => Ok(int_array_greater_or_equal_than(&b, &a)),
                ScalarOp::Gt => Ok(int_array_lesser_than(&b, &a)),
                ScalarOp::Ge => Ok(int_array_lesser_or_equal_than(&b, &a)),
                _ => Err(unknown_operator(op)),
            },
            (lhs, _) => Err(CompileError::Type {
                expected: scalar_kind(&lhs),
            }),
        }
    }

    /// Positive membership: `in`.
    fn array_comparison(&mut self, lhs: Evaluator, rhs: Evaluator) -> OpResult {
        self.track(lhs.field(), &rhs);

        let array_type = |expected| Err(CompileError::ArrayType { expected });
        match (lhs, rhs) {
            (Evaluator::Bool(a), Evaluator::BoolArray(b)) => Ok(array_bool_contains(&a, &b)),
            (Evaluator::Bool(_), _) => array_type(Kind::Bool),
            (Evaluator::String(a), Evaluator::StringArray(b)) => string_array_contains(&a, &b),
            (Evaluator::String(a), Evaluator::StringValues(b)) => string_values_contains(&a, &b),
            (Evaluator::String(_), _) => array_type(Kind::String),
            (Evaluator::StringValues(a), Evaluator::StringArray(b)) => string_array_matches(&a, &b),
            (Evaluator::StringValues(_), _) => array_type(Kind::String),
            (Evaluator::Int(a), Evaluator::IntArray(b)) => Ok(int_array_equals(&a, &b)),
            (Evaluator::Int(_), _) => array_type(Kind::Int),
            (Evaluator::IntArray(a), Evaluator::IntArray(b)) => Ok(int_array_matches(&a, &b)),
            (Evaluator::IntArray(_), _) => array_type(Kind::Int),
            _ => Err(CompileError::Type {
                expected: Kind::Array,
            }),
        }
    }
}
