// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

use crate::lexer::Span;

use core::{cmp, fmt, ops::Deref};
use std::sync::Arc;

#[derive(Debug, PartialEq, Eq, Clone, Copy)]
pub enum LogicalOp {
    And,
    Or,
}

#[derive(Debug, PartialEq, Eq, Clone, Copy)]
pub enum BitOp {
    And,
    Or,
    Xor,
}

#[derive(Debug, PartialEq, Eq, Clone, Copy)]
pub enum UnaryOp {
    Not,
    Minus,
    BitNot,
}

#[derive(Debug, PartialEq, Eq, Clone, Copy)]
pub enum ScalarOp {
    Eq,
    Ne,
    Lt,
    Le,
    Gt,
    Ge,
    Match,
    NotMatch,
}

#[derive(Debug, PartialEq, Eq, Clone, Copy)]
pub enum ArrayOp {
    In,
    NotIn,
}

impl fmt::Display for LogicalOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::And => "&&",
            Self::Or => "||",
        })
    }
}

impl fmt::Display for BitOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::And => "&",
            Self::Or => "|",
            Self::Xor => "^",
        })
    }
}

impl fmt::Display for UnaryOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Not => "!",
            Self::Minus => "-",
            Self::BitNot => "^",
        })
    }
}

impl fmt::Display for ScalarOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Eq => "==",
            Self::Ne => "!=",
            Self::Lt => "<",
            Self::Le => "<=",
            Self::Gt => ">",
            Self::Ge => ">=",
            Self::Match => "=~",
            Self::NotMatch => "!~",
        })
    }
}

impl fmt::Display for ArrayOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::In => "in",
            Self::NotIn => "notin",
        })
    }
}

pub struct NodeRef<T> {
    r: Arc<T>,
}

impl<T> Clone for NodeRef<T> {
    fn clone(&self) -> Self {
        Self { r: self.r.clone() }
    }
}

impl<T: fmt::Debug> fmt::Debug for NodeRef<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.r.as_ref().fmt(f)
    }
}

impl<T> cmp::PartialEq for NodeRef<T> {
    fn eq(&self, other: &Self) -> bool {
        Arc::as_ptr(&self.r).eq(&Arc::as_ptr(&other.r))
    }
}

impl<T> cmp::Eq for NodeRef<T> {}

impl<T> Deref for NodeRef<T> {
    type Target = T;

    fn deref(&self) -> &Self::Target {
        &self.r
    }
}

impl<T> AsRef<T> for NodeRef<T> {
    fn as_ref(&self) -> &T {
        self.deref()
    }
}

impl<T> NodeRef<T> {
    pub fn new(t: T) -> Self {
        Self { r: Arc::new(t) }
    }
}

pub type Ref<T> = NodeRef<T>;

/// `comparison [ ("||" | "&&") expression ]`
#[derive(Debug)]
pub struct Expression {
    pub span: Span,
    pub comparison: Ref<Comparison>,
    pub next: Option<(LogicalOp, Ref<Expression>)>,
}

/// `bit_operation [ scalar_comparison | array_comparison ]`
#[derive(Debug)]
pub struct Comparison {
    pub span: Span,
    pub bit_operation: Ref<BitOperation>,
    pub rhs: Option<ComparisonRhs>,
}

#[derive(Debug)]
pub enum ComparisonRhs {
    Scalar(Ref<ScalarComparison>),
    Array(Ref<ArrayComparison>),
}

#[derive(Debug)]
pub struct ScalarComparison {
    pub span: Span,
    pub op: ScalarOp,
    pub next: Ref<Comparison>,
}

#[derive(Debug)]
pub struct ArrayComparison {
    pub span: Span,
    pub op: ArrayOp,
    pub array: Ref<Array>,
}

/// `unary [ ("&" | "|" | "^") bit_operation ]`
#[derive(Debug)]
pub struct BitOperation {
    pub span: Span,
    pub unary: Ref<Unary>,
    pub next: Option<(BitOp, Ref<BitOperation>)>,
}

#[derive(Debug)]
pub enum Unary {
    Operation {
        span: Span,
        op: UnaryOp,
        operand: Ref<Unary>,
    },
    Primary(Ref<Primary>),
}

impl Unary {
    pub fn span(&self) -> &Span {
        match self {
            Self::Operation { span, .. } => span,
            Self::Primary(primary) => primary.span(),
        }
    }
}

#[derive(Debug)]
pub enum Primary {
    Ident { span: Span, name: String },
    Number { span: Span, value: i64 },
    Duration { span: Span, value: i64 },
    String { span: Span, value: String },
    Pattern { span: Span, value: String },
    Regexp { span: Span, value: String },
    SubExpression { span: Span, expr: Ref<Expression> },
}

impl Primary {
    pub fn span(&self) -> &Span {
        match self {
            Self::Ident { span, .. }
            | Self::Number { span, .. }
            | Self::Duration { span, .. }
            | Self::String { span, .. }
            | Self::Pattern { span, .. }
            | Self::Regexp { span, .. }
            | Self::SubExpression { span, .. } => span,
        }
    }
}

#[derive(Debug)]
pub enum StringMember {
    String(String),
    Pattern(String),
    Regexp(String),
}

#[derive(Debug)]
pub enum Array {
    Numbers {
        span: Span,
        values: Vec<i64>,
    },
    StringMembers {
        span: Span,
        members: Vec<StringMember>,
    },
    Ident {
        span: Span,
        name: String,
    },
}

impl Array {
    pub fn span(&self) -> &Span {
        match self {
            Self::Numbers { span, .. } | Self::StringMembers { span, .. } | Self::Ident { span, .. } => {
                span
            }
        }
    }
}

/// Body of a macro: either a full expression or a bare array.
#[derive(Debug)]
pub enum MacroBody {
    Expression(Ref<Expression>),
    Array(Ref<Array>),
}
