// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

//! Typed operators combining evaluators.
//!
//! Every operator takes fully typed operands and returns a new evaluator
//! whose weight is the sum of the operand weights plus the cost of the
//! operator. When all operands are static the result is folded into a
//! constant.

mod arrays;
mod bitwise;
mod comparison;
mod duration;
mod logical;
mod strings;

pub use arrays::*;
pub use bitwise::*;
pub use comparison::*;
pub use duration::*;
pub use logical::*;
pub use strings::*;

use crate::context::Context;
use crate::evaluator::*;

use std::sync::Arc;

/// Either a value known at compile time or a function of the context.
pub(crate) enum Operand<T> {
    Static(T),
    Dynamic(Arc<dyn Fn(&Context<'_>) -> T + Send + Sync>),
}

pub(crate) trait AsOperand {
    type Value;

    fn operand(&self) -> Operand<Self::Value>;
}

macro_rules! as_operand {
    ($name:ident, $ty:ty) => {
        impl AsOperand for $name {
            type Value = $ty;

            fn operand(&self) -> Operand<$ty> {
                match &self.eval_fn {
                    Some(f) => Operand::Dynamic(f.clone()),
                    None => Operand::Static(self.value.clone()),
                }
            }
        }
    };
}

as_operand!(BoolEvaluator, bool);
as_operand!(IntEvaluator, i64);
as_operand!(StringEvaluator, String);
as_operand!(BoolArrayEvaluator, Vec<bool>);
as_operand!(IntArrayEvaluator, Vec<i64>);
as_operand!(StringArrayEvaluator, Vec<String>);

pub(crate) fn map<A, R>(a: Operand<A>, f: impl Fn(&A) -> R + Send + Sync + 'static) -> Operand<R>
where
    A: Send + Sync + 'static,
{
    match a {
        Operand::Static(a) => Operand::Static(f(&a)),
        Operand::Dynamic(fa) => {
            Operand::Dynamic(Arc::new(move |ctx: &Context<'_>| f(&fa(ctx))))
        }
    }
}

pub(crate) fn map2<A, B, R>(
    a: Operand<A>,
    b: Operand<B>,
    f: impl Fn(&A, &B) -> R + Send + Sync + 'static,
) -> Operand<R>
where
    A: Send + Sync + 'static,
    B: Send + Sync + 'static,
{
    match (a, b) {
        (Operand::Static(a), Operand::Static(b)) => Operand::Static(f(&a, &b)),
        (Operand::Dynamic(fa), Operand::Static(b)) => {
            Operand::Dynamic(Arc::new(move |ctx: &Context<'_>| f(&fa(ctx), &b)))
        }
        (Operand::Static(a), Operand::Dynamic(fb)) => {
            Operand::Dynamic(Arc::new(move |ctx: &Context<'_>| f(&a, &fb(ctx))))
        }
        (Operand::Dynamic(fa), Operand::Dynamic(fb)) => {
            Operand::Dynamic(Arc::new(move |ctx: &Context<'_>| f(&fa(ctx), &fb(ctx))))
        }
    }
}

// Field reported by a combined evaluator: the first dynamic operand's.
pub(crate) fn pick_field(a: &str, b: &str) -> Field {
    if a.is_empty() { b } else { a }.to_string()
}

pub(crate) fn bool_result(op: Operand<bool>, field: Field, weight: i64) -> BoolEvaluator {
    match op {
        Operand::Static(value) => BoolEvaluator::constant(value),
        Operand::Dynamic(f) => BoolEvaluator {
            eval_fn: Some(f),
            field,
            weight,
            ..Default::default()
        },
    }
}

pub(crate) fn int_result(op: Operand<i64>, field: Field, weight: i64) -> IntEvaluator {
    match op {
        Operand::Static(value) => IntEvaluator::constant(value),
        Operand::Dynamic(f) => IntEvaluator {
            eval_fn: Some(f),
            field,
            weight,
            ..Default::default()
        },
    }
}
