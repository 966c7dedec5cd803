// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

//! Shared helpers for crate level compiler tests.

use crate::*;

use core::cell::Cell;
use std::sync::Arc;

use anyhow::Result;

pub const SCHEMA: &str = r#"
fields:
  process.name: string
  process.pid: int
  process.created_at: int
  process.argv: string_array
  process.is_thread: bool
  process.ancestors.file.name: string
  process.ancestors.pid: int
  process.envs.name: string
  open.filename: string
  open.flags: int
  open.timeout: duration
  open.retry: duration
iterators:
  - process.ancestors
  - process.envs
"#;

pub fn document_model() -> Result<DocumentModel> {
    Ok(DocumentModel::new(serde_yaml::from_str(SCHEMA)?))
}

/// Wraps a model and counts how often the compiler consults it.
pub struct CountingModel<M> {
    pub inner: M,
    pub lookups: Cell<usize>,
}

impl<M: Model> CountingModel<M> {
    pub fn new(inner: M) -> Self {
        Self {
            inner,
            lookups: Cell::new(0),
        }
    }
}

impl<M: Model> Model for CountingModel<M> {
    fn get_evaluator(
        &self,
        field: &str,
        register: Option<&RegisterId>,
    ) -> core::result::Result<Evaluator, ModelError> {
        self.lookups.set(self.lookups.get() + 1);
        self.inner.get_evaluator(field, register)
    }

    fn get_iterator(&self, field: &str) -> core::result::Result<Arc<dyn FieldIterator>, ModelError> {
        self.lookups.set(self.lookups.get() + 1);
        self.inner.get_iterator(field)
    }
}

pub fn compile_expr<'m>(
    text: &str,
    model: &'m dyn Model,
    opts: &Opts,
) -> Result<(Evaluator, State<'m>)> {
    let ast = unstable::parse_expression("<test>", text)?;
    let mut state = State::new(model);
    let evaluator = compile(&ast, opts, &mut state)?;
    Ok((evaluator, state))
}

pub fn compile_rule<'m>(
    text: &str,
    model: &'m dyn Model,
    opts: &Opts,
) -> Result<(BoolEvaluator, State<'m>)> {
    let ast = unstable::parse_expression("<test>", text)?;
    let mut state = State::new(model);
    let evaluator = compile_rule_expression(&ast, opts, &mut state)?;
    Ok((evaluator, state))
}

/// Compiles `text` as a rule and returns the error it must fail with.
pub fn compile_error(text: &str, model: &dyn Model, opts: &Opts) -> Result<CompileError> {
    let ast = unstable::parse_expression("<test>", text)?;
    let mut state = State::new(model);
    match compile_rule_expression(&ast, opts, &mut state) {
        Ok(_) => anyhow::bail!("`{text}` compiled without error"),
        Err(e) => Ok(e.error),
    }
}
