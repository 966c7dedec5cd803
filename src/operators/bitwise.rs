// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

use super::{int_result, map, map2, pick_field, AsOperand};
use crate::evaluator::IntEvaluator;

fn bitwise(a: &IntEvaluator, b: &IntEvaluator, f: fn(i64, i64) -> i64) -> IntEvaluator {
    int_result(
        map2(a.operand(), b.operand(), move |a, b| f(*a, *b)),
        pick_field(&a.field, &b.field),
        a.weight + b.weight,
    )
}

pub fn int_and(a: &IntEvaluator, b: &IntEvaluator) -> IntEvaluator {
    bitwise(a, b, |a, b| a & b)
}

pub fn int_or(a: &IntEvaluator, b: &IntEvaluator) -> IntEvaluator {
    bitwise(a, b, |a, b| a | b)
}

pub fn int_xor(a: &IntEvaluator, b: &IntEvaluator) -> IntEvaluator {
    bitwise(a, b, |a, b| a ^ b)
}

pub fn int_not(a: &IntEvaluator) -> IntEvaluator {
    int_result(map(a.operand(), |v| !v), a.field.clone(), a.weight)
}
