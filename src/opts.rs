// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

use crate::ast::MacroBody;
use crate::compiler::Compiler;
use crate::error::{CompileError, Result};
use crate::evaluator::{Constant, Evaluator, Field};
use crate::model::Model;
use crate::parser;
use crate::state::State;

use std::collections::{BTreeMap, BTreeSet};

use lazy_static::lazy_static;
use serde::Deserialize;

pub type MacroId = String;

lazy_static! {
    /// Constants available to every rule unless overridden.
    static ref DEFAULT_CONSTANTS: BTreeMap<&'static str, Constant> = {
        let mut m = BTreeMap::new();
        m.insert("true", Constant::Bool(true));
        m.insert("false", Constant::Bool(false));
        m
    };
}

/// A named, precompiled evaluator substituted for an identifier.
#[derive(Debug, Clone)]
pub struct Macro {
    pub id: MacroId,
    pub value: Evaluator,
    /// Fields read by the macro body.
    pub fields: BTreeSet<Field>,
}

impl Macro {
    /// Compiles a macro body against `model`.
    ///
    /// The body may use constants and macros already present in `opts`. It
    /// may not iterate over fields.
    pub fn compile(id: &str, body: &MacroBody, model: &dyn Model, opts: &Opts) -> Result<Macro> {
        let mut state = State::new(model);
        let (value, span) = {
            let mut compiler = Compiler::new(opts, &mut state);
            match body {
                MacroBody::Expression(expr) => (compiler.compile_expression(expr)?, &expr.span),
                MacroBody::Array(array) => (compiler.compile_array(array)?, array.span()),
            }
        };

        if !state.registers_info().is_empty() {
            return Err(CompileError::InvalidMacro {
                id: id.to_string(),
                message: "macros cannot iterate over fields".to_string(),
            }
            .at(span));
        }

        tracing::debug!(id, fields = ?state.fields(), weight = value.weight(), "compiled macro");
        Ok(Macro {
            id: id.to_string(),
            value,
            fields: state.fields().clone(),
        })
    }

    /// Parses and compiles the macro `id` from its source text.
    pub fn from_source(
        id: &str,
        text: &str,
        model: &dyn Model,
        opts: &Opts,
    ) -> anyhow::Result<Macro> {
        let body = parser::parse_macro(id, text)?;
        Ok(Self::compile(id, &body, model, opts)?)
    }
}

/// Compilation options shared by every rule of a policy.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Opts {
    /// Old field names and the fields replacing them.
    pub legacy_attributes: BTreeMap<Field, Field>,
    pub constants: BTreeMap<String, Constant>,
    #[serde(skip)]
    pub macros: BTreeMap<MacroId, Macro>,
}

impl Opts {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_json_str(json: &str) -> anyhow::Result<Self> {
        Ok(serde_json::from_str(json)?)
    }

    #[cfg(feature = "yaml")]
    pub fn from_yaml_str(yaml: &str) -> anyhow::Result<Self> {
        Ok(serde_yaml::from_str(yaml)?)
    }

    pub fn add_constant(&mut self, name: impl Into<String>, value: Constant) {
        self.constants.insert(name.into(), value);
    }

    pub fn add_macro(&mut self, m: Macro) {
        self.macros.insert(m.id.clone(), m);
    }

    /// Looks `name` up in the user constants, then in the defaults.
    pub fn constant(&self, name: &str) -> Option<&Constant> {
        self.constants
            .get(name)
            .or_else(|| DEFAULT_CONSTANTS.get(name))
    }

    pub fn legacy_field<'f>(&'f self, field: &'f str) -> &'f str {
        self.legacy_attributes
            .get(field)
            .map(|f| f.as_str())
            .unwrap_or(field)
    }
}
