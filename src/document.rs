// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

//! A data model over JSON documents.
//!
//! Events are [`serde_json::Value`]s and fields are dotted paths into them.
//! A [`Schema`] declares the type of every field and which paths are
//! iterators, i.e. arrays of objects whose members can be matched one
//! element at a time.

use crate::context::Context;
use crate::evaluator::*;
use crate::model::{FieldIterator, Model, ModelError};

use std::collections::{BTreeMap, BTreeSet};
use std::sync::Arc;

use serde::Deserialize;
use serde_json::Value;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FieldType {
    Bool,
    Int,
    /// Nanoseconds.
    Duration,
    String,
    BoolArray,
    IntArray,
    StringArray,
}

/// Declaration of a field: either its type alone or a full specification.
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum FieldSpec {
    Type(FieldType),
    Full {
        #[serde(rename = "type")]
        field_type: FieldType,
        /// Read through a resolver handler rather than a plain accessor.
        #[serde(default)]
        handler: bool,
    },
}

impl FieldSpec {
    pub fn field_type(&self) -> FieldType {
        match self {
            Self::Type(t) | Self::Full { field_type: t, .. } => *t,
        }
    }

    pub fn weight(&self) -> i64 {
        match self {
            Self::Full { handler: true, .. } => HANDLER_WEIGHT,
            _ => FUNCTION_WEIGHT,
        }
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Schema {
    pub fields: BTreeMap<Field, FieldSpec>,
    pub iterators: BTreeSet<Field>,
}

impl Schema {
    pub fn from_json_str(json: &str) -> anyhow::Result<Self> {
        Ok(serde_json::from_str(json)?)
    }

    #[cfg(feature = "yaml")]
    pub fn from_yaml_str(yaml: &str) -> anyhow::Result<Self> {
        Ok(serde_yaml::from_str(yaml)?)
    }

    fn iterator_of(&self, field: &str) -> Option<&Field> {
        self.iterators.iter().find(|it| {
            field
                .strip_prefix(it.as_str())
                .is_some_and(|rest| rest.is_empty() || rest.starts_with('.'))
        })
    }
}

fn split_path(path: &str) -> Vec<String> {
    path.split('.')
        .filter(|s| !s.is_empty())
        .map(str::to_string)
        .collect()
}

fn lookup<'v>(mut value: &'v Value, path: &[String]) -> Option<&'v Value> {
    for key in path {
        value = value.get(key)?;
    }
    Some(value)
}

// Reads a field, going through the element bound to `register` when the
// field lives under an iterator.
#[derive(Debug)]
struct Accessor {
    iterator: Vec<String>,
    rest: Vec<String>,
    register: Option<RegisterId>,
}

impl Accessor {
    fn read<'v>(&self, ctx: &Context<'v>) -> Option<&'v Value> {
        let event = ctx.event::<Value>()?;
        if self.iterator.is_empty() {
            return lookup(event, &self.rest);
        }
        let index = self
            .register
            .as_deref()
            .map(|r| ctx.register(r))
            .unwrap_or_default();
        let element = lookup(event, &self.iterator)?.as_array()?.get(index)?;
        lookup(element, &self.rest)
    }
}

struct DocumentIterator {
    path: Vec<String>,
}

impl FieldIterator for DocumentIterator {
    fn count(&self, ctx: &Context<'_>) -> usize {
        ctx.event::<Value>()
            .and_then(|e| lookup(e, &self.path))
            .and_then(Value::as_array)
            .map(Vec::len)
            .unwrap_or_default()
    }
}

fn collect<T>(value: Option<&Value>, f: impl Fn(&Value) -> Option<T>) -> Vec<T> {
    value
        .and_then(Value::as_array)
        .map(|a| a.iter().filter_map(f).collect())
        .unwrap_or_default()
}

/// [`Model`] implementation for JSON events described by a [`Schema`].
#[derive(Default)]
pub struct DocumentModel {
    schema: Schema,
    overrides: BTreeMap<Field, Arc<dyn OpOverrides>>,
}

impl DocumentModel {
    pub fn new(schema: Schema) -> Self {
        Self {
            schema,
            overrides: BTreeMap::new(),
        }
    }

    /// Attaches custom string operators to `field`.
    pub fn with_overrides(mut self, field: impl Into<Field>, overrides: Arc<dyn OpOverrides>) -> Self {
        self.overrides.insert(field.into(), overrides);
        self
    }

    pub fn schema(&self) -> &Schema {
        &self.schema
    }
}

impl Model for DocumentModel {
    fn get_evaluator(
        &self,
        field: &str,
        register: Option<&RegisterId>,
    ) -> Result<Evaluator, ModelError> {
        let spec = self
            .schema
            .fields
            .get(field)
            .ok_or_else(|| ModelError::FieldNotFound(field.to_string()))?;

        let accessor = Arc::new(match self.schema.iterator_of(field) {
            Some(it) => Accessor {
                iterator: split_path(it),
                rest: split_path(&field[it.len()..]),
                register: register.cloned(),
            },
            None => Accessor {
                iterator: vec![],
                rest: split_path(field),
                register: None,
            },
        });
        let weight = spec.weight();
        let overrides = self.overrides.get(field).cloned();

        let a = accessor;
        Ok(match spec.field_type() {
            FieldType::Bool => BoolEvaluator::dynamic(field, weight, move |ctx: &Context<'_>| {
                a.read(ctx).and_then(Value::as_bool).unwrap_or_default()
            })
            .into(),
            FieldType::Int | FieldType::Duration => {
                let mut e = IntEvaluator::dynamic(field, weight, move |ctx: &Context<'_>| {
                    a.read(ctx).and_then(Value::as_i64).unwrap_or_default()
                });
                e.is_duration = spec.field_type() == FieldType::Duration;
                e.into()
            }
            FieldType::String => {
                let mut e = StringEvaluator::dynamic(field, weight, move |ctx: &Context<'_>| {
                    a.read(ctx)
                        .and_then(Value::as_str)
                        .unwrap_or_default()
                        .to_string()
                });
                e.op_overrides = overrides;
                e.into()
            }
            FieldType::BoolArray => {
                BoolArrayEvaluator::dynamic(field, weight, move |ctx: &Context<'_>| {
                    collect(a.read(ctx), Value::as_bool)
                })
                .into()
            }
            FieldType::IntArray => IntArrayEvaluator::dynamic(field, weight, move |ctx: &Context<'_>| {
                collect(a.read(ctx), Value::as_i64)
            })
            .into(),
            FieldType::StringArray => {
                let mut e = StringArrayEvaluator::dynamic(field, weight, move |ctx: &Context<'_>| {
                    collect(a.read(ctx), |v| v.as_str().map(str::to_string))
                });
                e.op_overrides = overrides;
                e.into()
            }
        })
    }

    fn get_iterator(&self, field: &str) -> Result<Arc<dyn FieldIterator>, ModelError> {
        if !self.schema.iterators.contains(field) {
            return Err(ModelError::IteratorNotFound(field.to_string()));
        }
        Ok(Arc::new(DocumentIterator {
            path: split_path(field),
        }))
    }
}
