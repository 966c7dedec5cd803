// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

use super::{bool_result, map2, pick_field, AsOperand};
use crate::evaluator::{BoolEvaluator, IntEvaluator};

fn compare_ints(a: &IntEvaluator, b: &IntEvaluator, f: fn(&i64, &i64) -> bool) -> BoolEvaluator {
    bool_result(
        map2(a.operand(), b.operand(), f),
        pick_field(&a.field, &b.field),
        a.weight + b.weight,
    )
}

pub fn int_equals(a: &IntEvaluator, b: &IntEvaluator) -> BoolEvaluator {
    compare_ints(a, b, i64::eq)
}

pub fn lesser_than(a: &IntEvaluator, b: &IntEvaluator) -> BoolEvaluator {
    compare_ints(a, b, i64::lt)
}

pub fn lesser_or_equal_than(a: &IntEvaluator, b: &IntEvaluator) -> BoolEvaluator {
    compare_ints(a, b, i64::le)
}

pub fn greater_than(a: &IntEvaluator, b: &IntEvaluator) -> BoolEvaluator {
    compare_ints(a, b, i64::gt)
}

pub fn greater_or_equal_than(a: &IntEvaluator, b: &IntEvaluator) -> BoolEvaluator {
    compare_ints(a, b, i64::ge)
}

pub fn bool_equals(a: &BoolEvaluator, b: &BoolEvaluator) -> BoolEvaluator {
    bool_result(
        map2(a.operand(), b.operand(), bool::eq),
        pick_field(&a.field, &b.field),
        a.weight + b.weight,
    )
}
