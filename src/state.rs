// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

use crate::evaluator::{Constant, Field, RegisterId, ValueKind};
use crate::model::{FieldIterator, Model};
use crate::opts::{Macro, MacroId};

use core::fmt;
use std::collections::{BTreeMap, BTreeSet};
use std::sync::Arc;

/// Bookkeeping for one allocated register.
#[derive(Clone)]
pub struct RegisterInfo {
    /// The iterator field the register walks.
    pub field: Field,
    pub iterator: Arc<dyn FieldIterator>,
    /// Leaf fields read through this register.
    pub sub_fields: BTreeSet<Field>,
}

impl fmt::Debug for RegisterInfo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RegisterInfo")
            .field("field", &self.field)
            .field("sub_fields", &self.sub_fields)
            .finish()
    }
}

/// A static value a field was compared against.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldValue {
    pub value: Constant,
    pub kind: ValueKind,
}

/// Mutable state of a single compilation.
///
/// A `State` must not be shared between compilations: register ids are only
/// unique within one state.
pub struct State<'m> {
    model: &'m dyn Model,
    macros: BTreeMap<MacroId, Macro>,
    registers_info: BTreeMap<RegisterId, RegisterInfo>,
    iterator_registers: BTreeMap<Field, RegisterId>,
    anonymous_register: Option<RegisterId>,
    next_register: usize,
    // Registers in the order fields reading through them were resolved.
    register_reads: Vec<RegisterId>,
    fields: BTreeSet<Field>,
    field_values: BTreeMap<Field, Vec<FieldValue>>,
}

impl<'m> State<'m> {
    pub fn new(model: &'m dyn Model) -> Self {
        Self {
            model,
            macros: BTreeMap::new(),
            registers_info: BTreeMap::new(),
            iterator_registers: BTreeMap::new(),
            anonymous_register: None,
            next_register: 0,
            register_reads: vec![],
            fields: BTreeSet::new(),
            field_values: BTreeMap::new(),
        }
    }

    pub fn with_macros(model: &'m dyn Model, macros: BTreeMap<MacroId, Macro>) -> Self {
        let mut state = Self::new(model);
        state.macros = macros;
        state
    }

    pub fn model(&self) -> &'m dyn Model {
        self.model
    }

    pub fn add_macro(&mut self, m: Macro) {
        self.macros.insert(m.id.clone(), m);
    }

    pub fn get_macro(&self, id: &str) -> Option<&Macro> {
        self.macros.get(id)
    }

    /// Fields read by the compiled expression.
    pub fn fields(&self) -> &BTreeSet<Field> {
        &self.fields
    }

    pub fn update_fields(&mut self, field: &str) {
        if !self.fields.contains(field) {
            self.fields.insert(field.to_string());
        }
    }

    pub fn field_values(&self) -> &BTreeMap<Field, Vec<FieldValue>> {
        &self.field_values
    }

    pub fn update_field_values(&mut self, field: &str, value: FieldValue) {
        let values = self.field_values.entry(field.to_string()).or_default();
        if !values.contains(&value) {
            values.push(value);
        }
    }

    pub fn registers_info(&self) -> &BTreeMap<RegisterId, RegisterInfo> {
        &self.registers_info
    }

    pub fn register_info(&self, id: &str) -> Option<&RegisterInfo> {
        self.registers_info.get(id)
    }

    pub(crate) fn register_info_mut(&mut self, id: &str) -> Option<&mut RegisterInfo> {
        self.registers_info.get_mut(id)
    }

    pub(crate) fn insert_register(&mut self, id: RegisterId, info: RegisterInfo) {
        self.registers_info.insert(id, info);
    }

    pub(crate) fn record_register_read(&mut self, id: &str) {
        self.register_reads.push(id.to_string());
    }

    pub(crate) fn register_reads(&self) -> &[RegisterId] {
        &self.register_reads
    }

    fn allocate_register(&mut self) -> RegisterId {
        let id = format!("r{}", self.next_register);
        self.next_register += 1;
        id
    }

    /// Register shared by every field iterating `it_field` without an
    /// explicit register.
    pub(crate) fn implicit_register(&mut self, it_field: &str) -> RegisterId {
        if let Some(id) = self.iterator_registers.get(it_field) {
            return id.clone();
        }
        let id = self.allocate_register();
        self.iterator_registers
            .insert(it_field.to_string(), id.clone());
        id
    }

    /// Register shared by every `_` of the compilation.
    pub(crate) fn anonymous_register(&mut self) -> RegisterId {
        if let Some(id) = &self.anonymous_register {
            return id.clone();
        }
        let id = self.allocate_register();
        self.anonymous_register = Some(id.clone());
        id
    }
}

impl fmt::Debug for State<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("State")
            .field("macros", &self.macros.keys().collect::<Vec<_>>())
            .field("registers_info", &self.registers_info)
            .field("fields", &self.fields)
            .field("field_values", &self.field_values)
            .finish()
    }
}
