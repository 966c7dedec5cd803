// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

use super::{bool_result, map, map2, pick_field, AsOperand};
use crate::error::CompileError;
use crate::evaluator::{
    BoolEvaluator, StringArrayEvaluator, StringEvaluator, StringValuesEvaluator, IN_ARRAY_WEIGHT,
    IN_PATTERN_ARRAY_WEIGHT, REGEXP_WEIGHT,
};

type Result<T> = ::core::result::Result<T, CompileError>;

/// String equality. Overrides of the left operand win over those of the
/// right operand, which win over [`default_string_equals`].
pub fn string_equals(a: &StringEvaluator, b: &StringEvaluator) -> Result<BoolEvaluator> {
    let overridden = [a, b]
        .iter()
        .filter_map(|e| e.op_overrides.as_ref())
        .find_map(|o| o.string_equals(a, b));
    match overridden {
        Some(result) => result,
        None => Ok(default_string_equals(a, b)),
    }
}

/// Equality, or matching when one operand carries a compiled pattern.
pub fn default_string_equals(a: &StringEvaluator, b: &StringEvaluator) -> BoolEvaluator {
    let field = pick_field(&a.field, &b.field);
    let weight = a.weight + b.weight;

    let (subject, pattern) = if b.matcher.is_some() {
        (a, b)
    } else if a.matcher.is_some() {
        (b, a)
    } else {
        return bool_result(map2(a.operand(), b.operand(), |a, b| a == b), field, weight);
    };

    let pattern = pattern.clone();
    bool_result(
        map(subject.operand(), move |s| pattern.matches(s)),
        field,
        weight + REGEXP_WEIGHT,
    )
}

/// Whether the string `a`, possibly a pattern, matches an element of `b`.
pub fn string_array_contains(a: &StringEvaluator, b: &StringArrayEvaluator) -> Result<BoolEvaluator> {
    let overridden = a
        .op_overrides
        .as_ref()
        .and_then(|o| o.string_array_contains(a, b))
        .or_else(|| {
            b.op_overrides
                .as_ref()
                .and_then(|o| o.string_array_contains(a, b))
        });
    if let Some(result) = overridden {
        return result;
    }

    let field = pick_field(&b.field, &a.field);
    let mut weight = a.weight + b.weight + IN_ARRAY_WEIGHT;
    if a.matcher.is_some() {
        weight += REGEXP_WEIGHT;
    }

    let op = if a.is_static() {
        let a = a.clone();
        map(b.operand(), move |values| values.iter().any(|v| a.matches(v)))
    } else {
        map2(a.operand(), b.operand(), |a, values| values.contains(a))
    };
    Ok(bool_result(op, field, weight))
}

/// Membership of `a` in a literal set of strings and patterns.
pub fn string_values_contains(
    a: &StringEvaluator,
    b: &StringValuesEvaluator,
) -> Result<BoolEvaluator> {
    if let Some(result) = a
        .op_overrides
        .as_ref()
        .and_then(|o| o.string_values_contains(a, b))
    {
        return result;
    }

    let weight = a.weight
        + b.weight
        + if b.values.has_patterns() {
            IN_PATTERN_ARRAY_WEIGHT
        } else {
            IN_ARRAY_WEIGHT
        };
    let values = b.values.clone();
    Ok(bool_result(
        map(a.operand(), move |s| values.matches(s)),
        a.field.clone(),
        weight,
    ))
}

/// Whether any element of `b` is a member of the literal set `a`.
pub fn string_array_matches(
    a: &StringValuesEvaluator,
    b: &StringArrayEvaluator,
) -> Result<BoolEvaluator> {
    if let Some(result) = b
        .op_overrides
        .as_ref()
        .and_then(|o| o.string_array_matches(a, b))
    {
        return result;
    }

    let weight = a.weight
        + b.weight
        + if a.values.has_patterns() {
            IN_PATTERN_ARRAY_WEIGHT
        } else {
            IN_ARRAY_WEIGHT
        };
    let values = a.values.clone();
    Ok(bool_result(
        map(b.operand(), move |elements| {
            elements.iter().any(|e| values.matches(e))
        }),
        b.field.clone(),
        weight,
    ))
}
