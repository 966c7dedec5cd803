// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

// Duration comparisons. An operand that is not a duration is a timestamp in
// nanoseconds and is compared through the time elapsed since it, as seen
// from the evaluation time of the context.

use super::{bool_result, map2, pick_field, AsOperand, Operand};
use crate::context::Context;
use crate::evaluator::{BoolEvaluator, IntEvaluator};

use std::sync::Arc;

fn elapsed(e: &IntEvaluator) -> Operand<i64> {
    match e.operand() {
        op if e.is_duration => op,
        Operand::Static(ts) => {
            Operand::Dynamic(Arc::new(move |ctx: &Context<'_>| ctx.now().saturating_sub(ts)))
        }
        Operand::Dynamic(f) => {
            Operand::Dynamic(Arc::new(move |ctx: &Context<'_>| {
                ctx.now().saturating_sub(f(ctx))
            }))
        }
    }
}

fn compare_durations(
    a: &IntEvaluator,
    b: &IntEvaluator,
    f: fn(&i64, &i64) -> bool,
) -> BoolEvaluator {
    bool_result(
        map2(elapsed(a), elapsed(b), f),
        pick_field(&a.field, &b.field),
        a.weight + b.weight,
    )
}

pub fn duration_lesser_than(a: &IntEvaluator, b: &IntEvaluator) -> BoolEvaluator {
    compare_durations(a, b, i64::lt)
}

pub fn duration_lesser_or_equal_than(a: &IntEvaluator, b: &IntEvaluator) -> BoolEvaluator {
    compare_durations(a, b, i64::le)
}

pub fn duration_greater_than(a: &IntEvaluator, b: &IntEvaluator) -> BoolEvaluator {
    compare_durations(a, b, i64::gt)
}

pub fn duration_greater_or_equal_than(a: &IntEvaluator, b: &IntEvaluator) -> BoolEvaluator {
    compare_durations(a, b, i64::ge)
}
