// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

use crate::context::Context;
use crate::evaluator::{Evaluator, RegisterId};

use std::sync::Arc;

#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum ModelError {
    #[error("field `{0}` not found")]
    FieldNotFound(String),

    #[error("iterator `{0}` not found")]
    IteratorNotFound(String),
}

/// Enumerates the elements of a repeated substructure of an event.
///
/// Register-bound evaluators read the index of the element being visited
/// through [`Context::register`].
pub trait FieldIterator: Send + Sync {
    fn count(&self, ctx: &Context<'_>) -> usize;
}

/// The runtime data model a rule expression is compiled against.
///
/// The model owns every domain specific detail of field access. The
/// compiler only asks it for evaluators and iterators by dotted path.
pub trait Model {
    /// Returns the evaluator reading `field`.
    ///
    /// When `register` is given, `field` lives under an iterator and the
    /// evaluator must read the element whose index is bound to that
    /// register in the [`Context`].
    fn get_evaluator(
        &self,
        field: &str,
        register: Option<&RegisterId>,
    ) -> Result<Evaluator, ModelError>;

    /// Returns the iterator over the elements at `field`, or an error if
    /// `field` is not an iterator.
    fn get_iterator(&self, field: &str) -> Result<Arc<dyn FieldIterator>, ModelError>;
}
