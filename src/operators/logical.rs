// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

use super::{bool_result, int_result, map, pick_field, AsOperand, Operand};
use crate::context::Context;
use crate::evaluator::{BoolEvaluator, IntEvaluator};

use std::sync::Arc;

/// Short-circuiting conjunction. A static `false` operand folds the result.
pub fn and(a: &BoolEvaluator, b: &BoolEvaluator) -> BoolEvaluator {
    let field = pick_field(&a.field, &b.field);
    let weight = a.weight + b.weight;
    let op = match (a.operand(), b.operand()) {
        (Operand::Static(a), Operand::Static(b)) => Operand::Static(a && b),
        (Operand::Static(false), _) | (_, Operand::Static(false)) => Operand::Static(false),
        (Operand::Static(true), other) | (other, Operand::Static(true)) => other,
        (Operand::Dynamic(fa), Operand::Dynamic(fb)) => {
            Operand::Dynamic(Arc::new(move |ctx: &Context<'_>| fa(ctx) && fb(ctx)))
        }
    };
    bool_result(op, field, weight)
}

/// Short-circuiting disjunction. A static `true` operand folds the result.
pub fn or(a: &BoolEvaluator, b: &BoolEvaluator) -> BoolEvaluator {
    let field = pick_field(&a.field, &b.field);
    let weight = a.weight + b.weight;
    let op = match (a.operand(), b.operand()) {
        (Operand::Static(a), Operand::Static(b)) => Operand::Static(a || b),
        (Operand::Static(true), _) | (_, Operand::Static(true)) => Operand::Static(true),
        (Operand::Static(false), other) | (other, Operand::Static(false)) => other,
        (Operand::Dynamic(fa), Operand::Dynamic(fb)) => {
            Operand::Dynamic(Arc::new(move |ctx: &Context<'_>| fa(ctx) || fb(ctx)))
        }
    };
    bool_result(op, field, weight)
}

pub fn not(a: &BoolEvaluator) -> BoolEvaluator {
    bool_result(map(a.operand(), |v| !v), a.field.clone(), a.weight)
}

/// Arithmetic negation. Negating a duration yields a duration.
pub fn minus(a: &IntEvaluator) -> IntEvaluator {
    let mut result = int_result(map(a.operand(), |v| v.wrapping_neg()), a.field.clone(), a.weight);
    result.is_duration = a.is_duration;
    result
}
