// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

use crate::context::Context;
use crate::error::{CompileError, Kind};
use crate::pattern::StringMatcher;

use core::fmt;
use std::collections::BTreeSet;
use std::sync::Arc;

use serde::{Deserialize, Serialize};

/// Dotted path of a model field, e.g. `process.file.name`.
pub type Field = String;

/// Identifier of an evaluation register, allocated per compilation.
pub type RegisterId = String;

// Cost estimates, in increasing order.
pub const FUNCTION_WEIGHT: i64 = 5;
pub const IN_ARRAY_WEIGHT: i64 = 10;
pub const HANDLER_WEIGHT: i64 = 50;
pub const REGEXP_WEIGHT: i64 = 100;
pub const IN_PATTERN_ARRAY_WEIGHT: i64 = 1000;
pub const ITERATOR_WEIGHT: i64 = 2000;

pub type BoolEvalFn = Arc<dyn Fn(&Context<'_>) -> bool + Send + Sync>;
pub type IntEvalFn = Arc<dyn Fn(&Context<'_>) -> i64 + Send + Sync>;
pub type StringEvalFn = Arc<dyn Fn(&Context<'_>) -> String + Send + Sync>;
pub type BoolArrayEvalFn = Arc<dyn Fn(&Context<'_>) -> Vec<bool> + Send + Sync>;
pub type IntArrayEvalFn = Arc<dyn Fn(&Context<'_>) -> Vec<i64> + Send + Sync>;
pub type StringArrayEvalFn = Arc<dyn Fn(&Context<'_>) -> Vec<String> + Send + Sync>;

/// How the value of a [`StringEvaluator`] is compared.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ValueKind {
    #[default]
    Scalar,
    Pattern,
    Regexp,
}

/// Per-field replacements for the default string operators.
///
/// Every method returns `None` to fall back to the default operator.
pub trait OpOverrides: Send + Sync {
    fn string_equals(
        &self,
        _a: &StringEvaluator,
        _b: &StringEvaluator,
    ) -> Option<Result<BoolEvaluator, CompileError>> {
        None
    }

    fn string_values_contains(
        &self,
        _a: &StringEvaluator,
        _b: &StringValuesEvaluator,
    ) -> Option<Result<BoolEvaluator, CompileError>> {
        None
    }

    fn string_array_contains(
        &self,
        _a: &StringEvaluator,
        _b: &StringArrayEvaluator,
    ) -> Option<Result<BoolEvaluator, CompileError>> {
        None
    }

    fn string_array_matches(
        &self,
        _a: &StringValuesEvaluator,
        _b: &StringArrayEvaluator,
    ) -> Option<Result<BoolEvaluator, CompileError>> {
        None
    }
}

// Accessors shared by every evaluator variant.
macro_rules! evaluator_common {
    ($name:ident, $ty:ty, $fn_ty:ty) => {
        impl $name {
            /// Evaluator backed by a runtime function.
            pub fn dynamic(
                field: impl Into<Field>,
                weight: i64,
                f: impl Fn(&Context<'_>) -> $ty + Send + Sync + 'static,
            ) -> Self {
                Self {
                    eval_fn: Some(Arc::new(f)),
                    field: field.into(),
                    weight,
                    ..Default::default()
                }
            }

            pub fn from_fn(eval_fn: $fn_ty, weight: i64) -> Self {
                Self {
                    eval_fn: Some(eval_fn),
                    weight,
                    ..Default::default()
                }
            }

            pub fn is_static(&self) -> bool {
                self.eval_fn.is_none()
            }

            pub fn eval(&self, ctx: &Context<'_>) -> $ty {
                match &self.eval_fn {
                    Some(f) => f(ctx),
                    None => self.value.clone(),
                }
            }
        }
    };
}

#[derive(Clone, Default)]
pub struct BoolEvaluator {
    pub value: bool,
    pub eval_fn: Option<BoolEvalFn>,
    pub field: Field,
    pub weight: i64,
}

impl BoolEvaluator {
    pub fn constant(value: bool) -> Self {
        Self {
            value,
            ..Default::default()
        }
    }
}

evaluator_common!(BoolEvaluator, bool, BoolEvalFn);

#[derive(Clone, Default)]
pub struct IntEvaluator {
    pub value: i64,
    pub eval_fn: Option<IntEvalFn>,
    pub field: Field,
    pub weight: i64,
    /// Set for duration literals and duration typed fields, in nanoseconds.
    pub is_duration: bool,
}

impl IntEvaluator {
    pub fn constant(value: i64) -> Self {
        Self {
            value,
            ..Default::default()
        }
    }

    pub fn duration(nanos: i64) -> Self {
        Self {
            value: nanos,
            is_duration: true,
            ..Default::default()
        }
    }
}

evaluator_common!(IntEvaluator, i64, IntEvalFn);

#[derive(Clone, Default)]
pub struct StringEvaluator {
    pub value: String,
    pub eval_fn: Option<StringEvalFn>,
    pub field: Field,
    pub weight: i64,
    pub kind: ValueKind,
    /// Compiled once from `value` when it is used as a pattern.
    pub matcher: Option<Arc<StringMatcher>>,
    pub op_overrides: Option<Arc<dyn OpOverrides>>,
}

impl StringEvaluator {
    pub fn constant(value: impl Into<String>) -> Self {
        Self {
            value: value.into(),
            ..Default::default()
        }
    }

    pub fn with_kind(value: impl Into<String>, kind: ValueKind) -> Self {
        Self {
            value: value.into(),
            kind,
            ..Default::default()
        }
    }

    pub fn with_overrides(mut self, overrides: Arc<dyn OpOverrides>) -> Self {
        self.op_overrides = Some(overrides);
        self
    }

    /// Whether `s` matches this static value, through the compiled matcher
    /// if there is one.
    pub fn matches(&self, s: &str) -> bool {
        match &self.matcher {
            Some(m) => m.is_match(s),
            None => self.value == s,
        }
    }
}

evaluator_common!(StringEvaluator, String, StringEvalFn);

#[derive(Clone, Default)]
pub struct BoolArrayEvaluator {
    pub value: Vec<bool>,
    pub eval_fn: Option<BoolArrayEvalFn>,
    pub field: Field,
    pub weight: i64,
}

impl BoolArrayEvaluator {
    pub fn constant(value: Vec<bool>) -> Self {
        Self {
            value,
            ..Default::default()
        }
    }
}

evaluator_common!(BoolArrayEvaluator, Vec<bool>, BoolArrayEvalFn);

#[derive(Clone, Default)]
pub struct IntArrayEvaluator {
    pub value: Vec<i64>,
    pub eval_fn: Option<IntArrayEvalFn>,
    pub field: Field,
    pub weight: i64,
}

impl IntArrayEvaluator {
    pub fn constant(value: Vec<i64>) -> Self {
        Self {
            value,
            ..Default::default()
        }
    }
}

evaluator_common!(IntArrayEvaluator, Vec<i64>, IntArrayEvalFn);

#[derive(Clone, Default)]
pub struct StringArrayEvaluator {
    pub value: Vec<String>,
    pub eval_fn: Option<StringArrayEvalFn>,
    pub field: Field,
    pub weight: i64,
    pub op_overrides: Option<Arc<dyn OpOverrides>>,
}

impl StringArrayEvaluator {
    pub fn constant(value: Vec<String>) -> Self {
        Self {
            value,
            ..Default::default()
        }
    }

    pub fn with_overrides(mut self, overrides: Arc<dyn OpOverrides>) -> Self {
        self.op_overrides = Some(overrides);
        self
    }
}

evaluator_common!(StringArrayEvaluator, Vec<String>, StringArrayEvalFn);

/// A literal set of strings, patterns and regular expressions.
#[derive(Clone, Default, Debug)]
pub struct StringValues {
    scalars: BTreeSet<String>,
    matchers: Vec<Arc<StringMatcher>>,
}

impl StringValues {
    pub fn append_scalar(&mut self, value: impl Into<String>) {
        self.scalars.insert(value.into());
    }

    /// Adds a member, compiling it first unless it is a plain scalar.
    pub fn append_member(&mut self, value: &str, kind: ValueKind) -> Result<(), CompileError> {
        match kind {
            ValueKind::Scalar => self.append_scalar(value),
            ValueKind::Pattern => self.matchers.push(Arc::new(StringMatcher::glob(value)?)),
            ValueKind::Regexp => self.matchers.push(Arc::new(StringMatcher::regexp(value)?)),
        }
        Ok(())
    }

    pub fn matches(&self, value: &str) -> bool {
        self.scalars.contains(value) || self.matchers.iter().any(|m| m.is_match(value))
    }

    pub fn scalars(&self) -> impl Iterator<Item = &String> {
        self.scalars.iter()
    }

    pub fn has_patterns(&self) -> bool {
        !self.matchers.is_empty()
    }

    pub fn is_empty(&self) -> bool {
        self.scalars.is_empty() && self.matchers.is_empty()
    }
}

#[derive(Clone, Default, Debug)]
pub struct StringValuesEvaluator {
    pub values: StringValues,
    pub weight: i64,
}

impl StringValuesEvaluator {
    pub fn new(values: StringValues) -> Self {
        Self { values, weight: 0 }
    }
}

fn fmt_evaluator<T: fmt::Debug>(
    f: &mut fmt::Formatter<'_>,
    name: &str,
    value: &T,
    dynamic: bool,
    field: &str,
    weight: i64,
) -> fmt::Result {
    let mut s = f.debug_struct(name);
    if dynamic {
        s.field("field", &field);
    } else {
        s.field("value", value);
    }
    s.field("weight", &weight).finish()
}

impl fmt::Debug for BoolEvaluator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let dynamic = !self.is_static();
        fmt_evaluator(f, "BoolEvaluator", &self.value, dynamic, &self.field, self.weight)
    }
}

impl fmt::Debug for IntEvaluator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = if self.is_duration {
            "IntEvaluator(duration)"
        } else {
            "IntEvaluator"
        };
        fmt_evaluator(f, name, &self.value, !self.is_static(), &self.field, self.weight)
    }
}

impl fmt::Debug for StringEvaluator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut s = f.debug_struct("StringEvaluator");
        if self.is_static() {
            s.field("value", &self.value).field("kind", &self.kind);
        } else {
            s.field("field", &self.field);
        }
        s.field("weight", &self.weight)
            .field("overrides", &self.op_overrides.is_some())
            .finish()
    }
}

impl fmt::Debug for BoolArrayEvaluator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let dynamic = !self.is_static();
        fmt_evaluator(f, "BoolArrayEvaluator", &self.value, dynamic, &self.field, self.weight)
    }
}

impl fmt::Debug for IntArrayEvaluator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let dynamic = !self.is_static();
        fmt_evaluator(f, "IntArrayEvaluator", &self.value, dynamic, &self.field, self.weight)
    }
}

impl fmt::Debug for StringArrayEvaluator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let dynamic = !self.is_static();
        fmt_evaluator(f, "StringArrayEvaluator", &self.value, dynamic, &self.field, self.weight)
    }
}

/// A compiled node: one of the typed evaluators.
#[derive(Clone, Debug)]
pub enum Evaluator {
    Bool(BoolEvaluator),
    Int(IntEvaluator),
    String(StringEvaluator),
    StringValues(StringValuesEvaluator),
    BoolArray(BoolArrayEvaluator),
    IntArray(IntArrayEvaluator),
    StringArray(StringArrayEvaluator),
}

impl Evaluator {
    pub fn kind(&self) -> Kind {
        match self {
            Self::Bool(_) => Kind::Bool,
            Self::Int(_) => Kind::Int,
            Self::String(_) => Kind::String,
            _ => Kind::Array,
        }
    }

    pub fn weight(&self) -> i64 {
        match self {
            Self::Bool(e) => e.weight,
            Self::Int(e) => e.weight,
            Self::String(e) => e.weight,
            Self::StringValues(e) => e.weight,
            Self::BoolArray(e) => e.weight,
            Self::IntArray(e) => e.weight,
            Self::StringArray(e) => e.weight,
        }
    }

    pub fn add_weight(&mut self, weight: i64) {
        match self {
            Self::Bool(e) => e.weight += weight,
            Self::Int(e) => e.weight += weight,
            Self::String(e) => e.weight += weight,
            Self::StringValues(e) => e.weight += weight,
            Self::BoolArray(e) => e.weight += weight,
            Self::IntArray(e) => e.weight += weight,
            Self::StringArray(e) => e.weight += weight,
        }
    }

    /// Source field, empty for constants.
    pub fn field(&self) -> &str {
        match self {
            Self::Bool(e) => &e.field,
            Self::Int(e) => &e.field,
            Self::String(e) => &e.field,
            Self::StringValues(_) => "",
            Self::BoolArray(e) => &e.field,
            Self::IntArray(e) => &e.field,
            Self::StringArray(e) => &e.field,
        }
    }

    pub fn is_static(&self) -> bool {
        match self {
            Self::Bool(e) => e.is_static(),
            Self::Int(e) => e.is_static(),
            Self::String(e) => e.is_static(),
            Self::StringValues(_) => true,
            Self::BoolArray(e) => e.is_static(),
            Self::IntArray(e) => e.is_static(),
            Self::StringArray(e) => e.is_static(),
        }
    }

    /// The value of a fully constant evaluator.
    pub fn static_value(&self) -> Option<Constant> {
        if !self.is_static() {
            return None;
        }
        Some(match self {
            Self::Bool(e) => Constant::Bool(e.value),
            Self::Int(e) => Constant::Int(e.value),
            Self::String(e) => Constant::String(e.value.clone()),
            Self::StringValues(e) => Constant::StringArray(e.values.scalars().cloned().collect()),
            Self::BoolArray(e) => Constant::BoolArray(e.value.clone()),
            Self::IntArray(e) => Constant::IntArray(e.value.clone()),
            Self::StringArray(e) => Constant::StringArray(e.value.clone()),
        })
    }
}

impl From<BoolEvaluator> for Evaluator {
    fn from(e: BoolEvaluator) -> Self {
        Self::Bool(e)
    }
}

impl From<IntEvaluator> for Evaluator {
    fn from(e: IntEvaluator) -> Self {
        Self::Int(e)
    }
}

impl From<StringEvaluator> for Evaluator {
    fn from(e: StringEvaluator) -> Self {
        Self::String(e)
    }
}

impl From<StringValuesEvaluator> for Evaluator {
    fn from(e: StringValuesEvaluator) -> Self {
        Self::StringValues(e)
    }
}

impl From<BoolArrayEvaluator> for Evaluator {
    fn from(e: BoolArrayEvaluator) -> Self {
        Self::BoolArray(e)
    }
}

impl From<IntArrayEvaluator> for Evaluator {
    fn from(e: IntArrayEvaluator) -> Self {
        Self::IntArray(e)
    }
}

impl From<StringArrayEvaluator> for Evaluator {
    fn from(e: StringArrayEvaluator) -> Self {
        Self::StringArray(e)
    }
}

/// A named value substituted for an identifier at compile time.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Constant {
    Bool(bool),
    Int(i64),
    String(String),
    BoolArray(Vec<bool>),
    IntArray(Vec<i64>),
    StringArray(Vec<String>),
}

impl Constant {
    /// Static evaluator for this constant; string lists become literal sets
    /// so that they can be used with `in`.
    pub fn to_evaluator(&self) -> Evaluator {
        match self {
            Self::Bool(v) => BoolEvaluator::constant(*v).into(),
            Self::Int(v) => IntEvaluator::constant(*v).into(),
            Self::String(v) => StringEvaluator::constant(v.clone()).into(),
            Self::BoolArray(v) => BoolArrayEvaluator::constant(v.clone()).into(),
            Self::IntArray(v) => IntArrayEvaluator::constant(v.clone()).into(),
            Self::StringArray(v) => {
                let mut values = StringValues::default();
                for s in v {
                    values.append_scalar(s.clone());
                }
                StringValuesEvaluator::new(values).into()
            }
        }
    }
}
