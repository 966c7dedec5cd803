// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

use crate::context::Context;
use crate::error::{CompileError, Result};
use crate::evaluator::{BoolEvalFn, BoolEvaluator, Evaluator, Field, RegisterId, ITERATOR_WEIGHT};
use crate::lexer::Span;
use crate::model::{FieldIterator, Model};
use crate::opts::Opts;
use crate::state::{RegisterInfo, State};

use core::ops::Range;
use std::collections::{BTreeMap, BTreeSet};
use std::sync::{Arc, OnceLock};

use lazy_static::lazy_static;
use regex::Regex;

lazy_static! {
    static ref REGISTER_GROUP: Regex =
        Regex::new(r"\[([^\]]*)\]").expect("register group regex should be valid");
}

/// Explicit register id accepted in field paths.
const ANONYMOUS_REGISTER: &str = "_";

#[derive(Debug, PartialEq, Eq)]
pub(crate) struct ExtractedField {
    pub field: Field,
    pub iterator: Option<Field>,
    pub register: Option<String>,
}

/// Splits `a.b[R].c` into the leaf field `a.b.c`, the iterator field `a.b`
/// and the register id `R`.
pub(crate) fn extract_field(raw: &str) -> ::core::result::Result<ExtractedField, CompileError> {
    let format_error = || CompileError::RegisterFormat {
        field: raw.to_string(),
    };

    let mut groups = REGISTER_GROUP.captures_iter(raw);
    let Some(caps) = groups.next() else {
        return Ok(ExtractedField {
            field: raw.to_string(),
            iterator: None,
            register: None,
        });
    };
    if groups.next().is_some() {
        return Err(format_error());
    }

    let (Some(group), Some(id)) = (caps.get(0), caps.get(1)) else {
        return Err(format_error());
    };
    let iterator = &raw[..group.start()];
    if id.as_str().is_empty() || iterator.is_empty() {
        return Err(format_error());
    }

    Ok(ExtractedField {
        field: format!("{iterator}{}", &raw[group.end()..]),
        iterator: Some(iterator.to_string()),
        register: Some(id.as_str().to_string()),
    })
}

// The first prefix of `field` known to the model as an iterator.
fn find_iterator(model: &dyn Model, field: &str) -> Option<(Field, Arc<dyn FieldIterator>)> {
    let mut candidate = String::with_capacity(field.len());
    for node in field.split('.') {
        if !candidate.is_empty() {
            candidate.push('.');
        }
        candidate.push_str(node);
        if let Ok(iterator) = model.get_iterator(&candidate) {
            return Some((candidate, iterator));
        }
    }
    None
}

fn bind_register(
    state: &mut State<'_>,
    field: &str,
    it_field: &str,
    iterator: Arc<dyn FieldIterator>,
    explicit: Option<&str>,
) -> ::core::result::Result<RegisterId, CompileError> {
    let id = match explicit {
        None => state.implicit_register(it_field),
        Some(ANONYMOUS_REGISTER) => state.anonymous_register(),
        Some(other) => {
            return Err(CompileError::RegisterNameNotAllowed {
                register: other.to_string(),
            })
        }
    };

    match state.register_info_mut(&id) {
        Some(info) if info.field != it_field => {
            return Err(CompileError::RegisterMultipleFields {
                register: explicit.unwrap_or(id.as_str()).to_string(),
            });
        }
        Some(info) => {
            info.sub_fields.insert(field.to_string());
        }
        None => {
            tracing::trace!(register = %id, iterator = it_field, "allocated register");
            state.insert_register(
                id.clone(),
                RegisterInfo {
                    field: it_field.to_string(),
                    iterator,
                    sub_fields: BTreeSet::from([field.to_string()]),
                },
            );
        }
    }
    Ok(id)
}

/// Resolves a field identifier to the model evaluator reading it.
///
/// Legacy attribute renames are applied first. A field living under an
/// iterator is bound to a register so that evaluation can visit every
/// element of the iterator.
pub fn resolve_identifier(
    raw: &str,
    span: &Span,
    opts: &Opts,
    state: &mut State<'_>,
) -> Result<Evaluator> {
    let extracted = extract_field(raw).map_err(|e| e.at(span))?;
    let field = opts.legacy_field(&extracted.field).to_string();
    let model = state.model();

    let iterator = match &extracted.iterator {
        Some(it_field) => {
            let it_field = opts.legacy_field(it_field).to_string();
            let iterator = model
                .get_iterator(&it_field)
                .map_err(|e| CompileError::from(e).at(span))?;
            Some((it_field, iterator))
        }
        None => find_iterator(model, &field),
    };

    let register = match iterator {
        Some((it_field, iterator)) => Some(
            bind_register(
                state,
                &field,
                &it_field,
                iterator,
                extracted.register.as_deref(),
            )
            .map_err(|e| e.at(span))?,
        ),
        None => None,
    };

    let mut evaluator = model
        .get_evaluator(&field, register.as_ref())
        .map_err(|e| CompileError::from(e).at(span))?;
    if let Some(id) = &register {
        evaluator.add_weight(ITERATOR_WEIGHT);
        state.record_register_read(id);
    }
    state.update_fields(&field);
    Ok(evaluator)
}

type Bindings = Vec<(RegisterId, Arc<dyn FieldIterator>)>;

/// A boolean sub-expression that may become the iteration scope of the
/// registers read inside it.
///
/// `reads` is the range of [`State::register_reads`] recorded while the
/// sub-expression was compiled. The registers to iterate are only known once
/// the whole expression has been compiled, see [`bind_scopes`].
pub(crate) struct Scope {
    span: Span,
    reads: Range<usize>,
    bindings: Arc<OnceLock<Bindings>>,
}

fn visit(
    registers: &[(RegisterId, Arc<dyn FieldIterator>)],
    f: &BoolEvalFn,
    ctx: &Context<'_>,
) -> bool {
    let Some(((id, iterator), rest)) = registers.split_first() else {
        return f(ctx);
    };
    let mut found = false;
    for index in 0..iterator.count(ctx) {
        ctx.set_register(id, index);
        if visit(rest, f, ctx) {
            found = true;
            break;
        }
    }
    ctx.clear_register(id);
    found
}

/// Makes `evaluator` a candidate iteration scope for the registers read
/// while it was compiled.
pub(crate) fn scoped(
    evaluator: BoolEvaluator,
    reads: Range<usize>,
    span: &Span,
    scopes: &mut Vec<Scope>,
) -> BoolEvaluator {
    if reads.is_empty() {
        return evaluator;
    }
    let Some(f) = evaluator.eval_fn.clone() else {
        return evaluator;
    };

    let bindings: Arc<OnceLock<Bindings>> = Arc::new(OnceLock::new());
    scopes.push(Scope {
        span: span.clone(),
        reads,
        bindings: bindings.clone(),
    });
    BoolEvaluator {
        eval_fn: Some(Arc::new(move |ctx: &Context<'_>| match bindings.get() {
            Some(registers) => visit(registers, &f, ctx),
            None => f(ctx),
        })),
        ..evaluator
    }
}

/// Binds every register to the smallest scope containing all of its reads.
///
/// That scope is evaluated for each element of the register's iterator and
/// holds when one element satisfies it. A scope over an empty iterator is
/// false, while the rest of the expression is unaffected. Two registers
/// meeting in the same scope would require matching elements of both
/// iterators together, which is not supported.
pub(crate) fn bind_scopes(scopes: &[Scope], state: &State<'_>) -> Result<()> {
    let mut bindings: BTreeMap<usize, Bindings> = BTreeMap::new();
    for (id, info) in state.registers_info() {
        let mut reads = state
            .register_reads()
            .iter()
            .enumerate()
            .filter(|(_, r)| *r == id)
            .map(|(i, _)| i);
        let Some(first) = reads.next() else {
            continue;
        };
        let last = reads.last().unwrap_or(first);

        let scope = scopes
            .iter()
            .enumerate()
            .filter(|(_, s)| s.reads.start <= first && last < s.reads.end)
            .min_by_key(|(_, s)| s.reads.len());
        if let Some((index, _)) = scope {
            bindings
                .entry(index)
                .or_default()
                .push((id.clone(), info.iterator.clone()));
        }
    }

    for (index, registers) in bindings {
        let scope = &scopes[index];
        if let [(first, _), (second, _), ..] = registers.as_slice() {
            let iterator = |id: &str| {
                state
                    .register_info(id)
                    .map(|info| info.field.clone())
                    .unwrap_or_default()
            };
            return Err(CompileError::IteratorInteraction {
                first: iterator(first.as_str()),
                second: iterator(second.as_str()),
            }
            .at(&scope.span));
        }
        let ids: Vec<&RegisterId> = registers.iter().map(|(id, _)| id).collect();
        tracing::trace!(registers = ?ids, "bound register scope");
        // A scope is bound once, right after its expression is compiled.
        let _ = scope.bindings.set(registers);
    }
    Ok(())
}
