// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

use crate::error::CompileError;
use crate::evaluator::{StringEvaluator, ValueKind};

use std::sync::Arc;

use globset::{GlobBuilder, GlobMatcher};
use regex::Regex;

/// A compiled glob pattern or regular expression.
#[derive(Debug, Clone)]
pub enum StringMatcher {
    Glob(GlobMatcher),
    Regexp(Regex),
}

// Only `*` is a wildcard in rule patterns. It also matches `/` and a run of
// stars means the same as one.
fn glob_syntax(pattern: &str) -> String {
    let mut out = String::with_capacity(pattern.len());
    let mut prev_star = false;
    for ch in pattern.chars() {
        match ch {
            '*' if prev_star => continue,
            '*' => out.push('*'),
            '?' | '[' | ']' | '{' | '}' | '\\' => {
                out.push('\\');
                out.push(ch);
            }
            _ => out.push(ch),
        }
        prev_star = ch == '*';
    }
    out
}

impl StringMatcher {
    pub fn glob(pattern: &str) -> Result<Self, CompileError> {
        let glob = GlobBuilder::new(&glob_syntax(pattern))
            .literal_separator(false)
            .backslash_escape(true)
            .build()
            .map_err(|e| CompileError::InvalidPattern {
                pattern: pattern.to_string(),
                message: e.to_string(),
            })?;
        Ok(Self::Glob(glob.compile_matcher()))
    }

    pub fn regexp(expr: &str) -> Result<Self, CompileError> {
        let re = Regex::new(expr).map_err(|e| CompileError::InvalidPattern {
            pattern: expr.to_string(),
            message: e.to_string(),
        })?;
        Ok(Self::Regexp(re))
    }

    pub fn is_match(&self, s: &str) -> bool {
        match self {
            Self::Glob(g) => g.is_match(s),
            Self::Regexp(re) => re.is_match(s),
        }
    }
}

/// Compiles the static value of `evaluator` into its matcher.
///
/// A scalar value becomes a glob pattern. Field backed evaluators cannot be
/// used as patterns.
pub fn compile_pattern(evaluator: &mut StringEvaluator) -> Result<(), CompileError> {
    if !evaluator.is_static() {
        return Err(CompileError::NonStaticPattern {
            field: evaluator.field.clone(),
        });
    }
    if evaluator.matcher.is_some() {
        return Ok(());
    }
    let matcher = match evaluator.kind {
        ValueKind::Scalar | ValueKind::Pattern => {
            evaluator.kind = ValueKind::Pattern;
            StringMatcher::glob(&evaluator.value)?
        }
        ValueKind::Regexp => StringMatcher::regexp(&evaluator.value)?,
    };
    evaluator.matcher = Some(Arc::new(matcher));
    Ok(())
}
