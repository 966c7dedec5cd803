// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

use super::{bool_result, map2, pick_field, AsOperand};
use crate::evaluator::{
    BoolArrayEvaluator, BoolEvaluator, IntArrayEvaluator, IntEvaluator, IN_ARRAY_WEIGHT,
};

// True if `f(a, element)` holds for some element of the array.
fn int_array_any(a: &IntEvaluator, b: &IntArrayEvaluator, f: fn(i64, i64) -> bool) -> BoolEvaluator {
    bool_result(
        map2(a.operand(), b.operand(), move |a, values| {
            values.iter().any(|v| f(*a, *v))
        }),
        pick_field(&a.field, &b.field),
        a.weight + b.weight + IN_ARRAY_WEIGHT,
    )
}

/// Whether `a` equals an element of `b`.
pub fn int_array_equals(a: &IntEvaluator, b: &IntArrayEvaluator) -> BoolEvaluator {
    int_array_any(a, b, |a, v| a == v)
}

/// Whether `a` is lesser than an element of `b`.
pub fn int_array_lesser_than(a: &IntEvaluator, b: &IntArrayEvaluator) -> BoolEvaluator {
    int_array_any(a, b, |a, v| a < v)
}

pub fn int_array_lesser_or_equal_than(a: &IntEvaluator, b: &IntArrayEvaluator) -> BoolEvaluator {
    int_array_any(a, b, |a, v| a <= v)
}

pub fn int_array_greater_than(a: &IntEvaluator, b: &IntArrayEvaluator) -> BoolEvaluator {
    int_array_any(a, b, |a, v| a > v)
}

pub fn int_array_greater_or_equal_than(a: &IntEvaluator, b: &IntArrayEvaluator) -> BoolEvaluator {
    int_array_any(a, b, |a, v| a >= v)
}

/// Whether the two arrays share an element.
pub fn int_array_matches(a: &IntArrayEvaluator, b: &IntArrayEvaluator) -> BoolEvaluator {
    bool_result(
        map2(a.operand(), b.operand(), |a, b| a.iter().any(|v| b.contains(v))),
        pick_field(&a.field, &b.field),
        a.weight + b.weight + IN_ARRAY_WEIGHT,
    )
}

/// Whether `a` equals an element of `b`.
pub fn array_bool_contains(a: &BoolEvaluator, b: &BoolArrayEvaluator) -> BoolEvaluator {
    bool_result(
        map2(a.operand(), b.operand(), |a, values| values.contains(a)),
        pick_field(&a.field, &b.field),
        a.weight + b.weight + IN_ARRAY_WEIGHT,
    )
}

/// `array == b`: whether some element of the array equals `b`.
pub fn array_bool_equals(a: &BoolArrayEvaluator, b: &BoolEvaluator) -> BoolEvaluator {
    bool_result(
        map2(a.operand(), b.operand(), |values, b| values.contains(b)),
        pick_field(&a.field, &b.field),
        a.weight + b.weight + IN_ARRAY_WEIGHT,
    )
}
