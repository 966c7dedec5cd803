// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

use crate::ast::*;
use crate::compiler::Compiler;
use crate::error::{CompileError, Result};
use crate::evaluator::*;
use crate::lexer::Span;
use crate::pattern::compile_pattern;
use crate::registers::resolve_identifier;

impl Compiler<'_, '_> {
    pub(super) fn compile_primary(&mut self, primary: &Ref<Primary>) -> Result<Evaluator> {
        Ok(match primary.as_ref() {
            Primary::Ident { span, name } => return self.compile_ident(name, span),
            Primary::Number { value, .. } => IntEvaluator::constant(*value).into(),
            Primary::Duration { value, .. } => IntEvaluator::duration(*value).into(),
            Primary::String { value, .. } => StringEvaluator::constant(value.clone()).into(),
            Primary::Pattern { span, value } => compile_literal(value, ValueKind::Pattern, span)?,
            Primary::Regexp { span, value } => compile_literal(value, ValueKind::Regexp, span)?,
            Primary::SubExpression { expr, .. } => return self.compile_expression(expr),
        })
    }

    pub fn compile_array(&mut self, array: &Ref<Array>) -> Result<Evaluator> {
        match array.as_ref() {
            Array::Numbers { span, values } if values.is_empty() => {
                Err(CompileError::UnknownEntity("empty array".to_string()).at(span))
            }
            Array::Numbers { values, .. } => Ok(IntArrayEvaluator::constant(values.clone()).into()),
            Array::StringMembers { span, members } => {
                let mut values = StringValues::default();
                for member in members {
                    let (value, kind) = match member {
                        StringMember::String(s) => (s, ValueKind::Scalar),
                        StringMember::Pattern(s) => (s, ValueKind::Pattern),
                        StringMember::Regexp(s) => (s, ValueKind::Regexp),
                    };
                    values.append_member(value, kind).map_err(|e| e.at(span))?;
                }
                Ok(StringValuesEvaluator::new(values).into())
            }
            Array::Ident { span, name } => self.compile_ident(name, span),
        }
    }

    /// Constants first, then macros, then model fields.
    fn compile_ident(&mut self, name: &str, span: &Span) -> Result<Evaluator> {
        if let Some(constant) = self.opts.constant(name) {
            return Ok(constant.to_evaluator());
        }

        let m = self
            .state
            .get_macro(name)
            .or_else(|| self.opts.macros.get(name))
            .cloned();
        if let Some(m) = m {
            tracing::trace!(name, fields = ?m.fields, "expanding macro");
            for field in &m.fields {
                self.state.update_fields(field);
            }
            return Ok(m.value);
        }

        resolve_identifier(name, span, self.opts, self.state)
    }
}

fn compile_literal(value: &str, kind: ValueKind, span: &Span) -> Result<Evaluator> {
    let mut evaluator = StringEvaluator::with_kind(value, kind);
    compile_pattern(&mut evaluator).map_err(|e| e.at(span))?;
    Ok(evaluator.into())
}
