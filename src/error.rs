// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.
#![allow(clippy::pattern_type_mismatch)]

use crate::lexer::Span;
use crate::model::ModelError;

use core::fmt;

/// Evaluator kind named by type errors.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Kind {
    Bool,
    Int,
    String,
    Array,
}

impl fmt::Display for Kind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Bool => "bool",
            Self::Int => "int",
            Self::String => "string",
            Self::Array => "array",
        })
    }
}

#[derive(thiserror::Error, Debug)]
pub enum CompileError {
    #[error("type error: expected {expected}")]
    Type { expected: Kind },

    #[error("array type error: expected array of {expected}")]
    ArrayType { expected: Kind },

    #[error("unknown operator `{op}`")]
    UnknownOperator { op: String },

    #[error("non-static pattern: `{field}` cannot be used as a pattern")]
    NonStaticPattern { field: String },

    #[error("invalid pattern `{pattern}`: {message}")]
    InvalidPattern { pattern: String, message: String },

    #[error("register name not allowed: `{register}`, only `_` may be given explicitly")]
    RegisterNameNotAllowed { register: String },

    #[error("register `{register}` used by multiple fields")]
    RegisterMultipleFields { register: String },

    #[error("fields of iterators `{first}` and `{second}` cannot be matched in the same condition")]
    IteratorInteraction { first: String, second: String },

    #[error("wrong register format in `{field}`")]
    RegisterFormat { field: String },

    #[error(transparent)]
    Model(#[from] ModelError),

    #[error("unknown entity: {0}")]
    UnknownEntity(String),

    #[error("invalid macro `{id}`: {message}")]
    InvalidMacro { id: String, message: String },
}

/// A [`CompileError`] together with the location of the offending node.
#[derive(Debug)]
pub struct SpannedCompileError {
    pub error: CompileError,
    pub span: Option<Span>,
}

impl SpannedCompileError {
    pub fn new(error: CompileError) -> Self {
        Self { error, span: None }
    }

    /// Attaches `span` unless a more precise one is already present.
    pub fn with_span(mut self, span: &Span) -> Self {
        if self.span.is_none() {
            self.span = Some(span.clone());
        }
        self
    }
}

impl fmt::Display for SpannedCompileError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if let Some(span) = &self.span {
            let msg = format!("{}", self.error);
            write!(f, "{}", span.message("error", &msg))
        } else {
            write!(f, "{}", self.error)
        }
    }
}

impl From<CompileError> for SpannedCompileError {
    fn from(error: CompileError) -> Self {
        Self::new(error)
    }
}

impl From<ModelError> for SpannedCompileError {
    fn from(error: ModelError) -> Self {
        Self::new(error.into())
    }
}

impl core::error::Error for SpannedCompileError {
    fn source(&self) -> Option<&(dyn core::error::Error + 'static)> {
        Some(&self.error)
    }
}

impl CompileError {
    pub fn at(self, span: &Span) -> SpannedCompileError {
        SpannedCompileError::from(self).with_span(span)
    }
}

pub type Result<T> = ::core::result::Result<T, SpannedCompileError>;

#[cfg(test)]
mod tests {
    use super::*;
    use crate::lexer::Source;

    #[test]
    fn spanned_error_renders_snippet() -> anyhow::Result<()> {
        let source = Source::from_contents("rule.secl".into(), "a == b".into())?;
        let span = Span {
            source,
            line: 1,
            col: 6,
            start: 5,
            end: 6,
        };
        let err = CompileError::Type {
            expected: Kind::Int,
        }
        .at(&span);
        let text = err.to_string();
        assert!(text.contains("rule.secl:1:6"), "{text}");
        assert!(text.contains("type error: expected int"), "{text}");
        assert!(core::error::Error::source(&err).is_some());
        Ok(())
    }

    #[test]
    fn first_span_wins() -> anyhow::Result<()> {
        let source = Source::from_contents("r".into(), "x\ny".into())?;
        let inner = Span {
            source: source.clone(),
            line: 2,
            col: 1,
            start: 2,
            end: 3,
        };
        let outer = Span {
            source,
            line: 1,
            col: 1,
            start: 0,
            end: 3,
        };
        let err = CompileError::UnknownEntity("primary".into())
            .at(&inner)
            .with_span(&outer);
        assert_eq!(err.span.map(|s| s.line), Some(2));
        Ok(())
    }
}
