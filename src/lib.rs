// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

// Use README.md as crate documentation.
#![doc = include_str!(concat!(env!("CARGO_MANIFEST_DIR"), "/README.md"))]

mod ast;
mod compiler;
mod context;
mod document;
mod error;
mod evaluator;
mod lexer;
mod model;
pub mod operators;
mod opts;
mod parser;
mod pattern;
mod registers;
mod rule;
mod state;

pub use compiler::{compile, compile_rule_expression};
pub use context::Context;
pub use document::{DocumentModel, FieldSpec, FieldType, Schema};
pub use error::{CompileError, Kind, Result, SpannedCompileError};
pub use evaluator::{
    BoolArrayEvaluator, BoolEvalFn, BoolEvaluator, Constant, Evaluator, Field, IntArrayEvaluator,
    IntEvalFn, IntEvaluator, OpOverrides, RegisterId, StringArrayEvaluator, StringEvalFn,
    StringEvaluator, StringValues, StringValuesEvaluator, ValueKind, FUNCTION_WEIGHT,
    HANDLER_WEIGHT, IN_ARRAY_WEIGHT, IN_PATTERN_ARRAY_WEIGHT, ITERATOR_WEIGHT, REGEXP_WEIGHT,
};
pub use model::{FieldIterator, Model, ModelError};
pub use opts::{Macro, MacroId, Opts};
pub use pattern::{compile_pattern, StringMatcher};
pub use registers::resolve_identifier;
pub use rule::Rule;
pub use state::{FieldValue, RegisterInfo, State};

/// Items in `unstable` are likely to change.
pub mod unstable {
    pub use crate::ast::*;
    pub use crate::lexer::*;
    pub use crate::parser::*;
}

#[cfg(test)]
mod tests;
