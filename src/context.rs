// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

use core::any::Any;
use core::cell::{Cell, RefCell};
use std::collections::BTreeMap;
use std::time::{SystemTime, UNIX_EPOCH};

/// Per-event evaluation state.
///
/// A context borrows the event being evaluated, owns the register bindings
/// used while iterating repeated fields and caches the evaluation time used
/// by duration comparisons. It is created for one evaluation and dropped
/// afterwards; compiled evaluators never retain it.
pub struct Context<'a> {
    event: &'a dyn Any,
    registers: RefCell<BTreeMap<String, usize>>,
    now: Cell<Option<i64>>,
}

impl<'a> Context<'a> {
    pub fn new(event: &'a dyn Any) -> Self {
        Self {
            event,
            registers: RefCell::new(BTreeMap::new()),
            now: Cell::new(None),
        }
    }

    /// Fixes the evaluation time, in nanoseconds since the unix epoch.
    pub fn with_now(self, now: i64) -> Self {
        self.now.set(Some(now));
        self
    }

    /// The event, if it is of type `E`.
    pub fn event<E: Any>(&self) -> Option<&'a E> {
        self.event.downcast_ref::<E>()
    }

    /// Index of the element currently bound to `register`, 0 when unbound.
    pub fn register(&self, register: &str) -> usize {
        self.registers.borrow().get(register).copied().unwrap_or_default()
    }

    pub fn set_register(&self, register: &str, index: usize) {
        self.registers.borrow_mut().insert(register.to_string(), index);
    }

    pub fn clear_register(&self, register: &str) {
        self.registers.borrow_mut().remove(register);
    }

    /// Evaluation time in nanoseconds, captured on first use.
    pub fn now(&self) -> i64 {
        if let Some(now) = self.now.get() {
            return now;
        }
        let now = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| i64::try_from(d.as_nanos()).unwrap_or(i64::MAX))
            .unwrap_or_default();
        self.now.set(Some(now));
        now
    }
}
