//! Error taxonomy.
//!
//! Every error reflects a caller-supplied structural contract violation
//! rather than a transient condition: nothing is retried, and a failed
//! render leaves the output in an unspecified but not corrupted state
//! (already-applied discrete mutations stay applied).

use crate::template::{HoleShape, Key};
use thiserror::Error;
use std::sync::Arc;

/// Structure could not be compiled into a skeleton.
#[derive(Debug, Clone, Error)]
pub enum CompileError {
    /// An attribute name matches more than one binding syntax at once
    /// (e.g. `@click?`).
    #[error("ambiguous attribute kind `{name}`")]
    AmbiguousAttribute { name: Arc<str> },

    /// A value slot is bound by more than one placeholder site.
    #[error("value slot {index} is bound more than once")]
    DuplicateSlot { index: usize },

    /// A value slot below the declared count has no binding site.
    #[error("value slot {index} has no binding site")]
    UnboundSlot { index: usize },
}

/// A skeleton could not be bound to a fresh instance.
#[derive(Debug, Clone, Error)]
pub enum BindError {
    /// An instruction's site does not resolve in the cloned skeleton;
    /// the skeleton is corrupted or foreign.
    #[error("binding site missing for value slot {index}")]
    SiteMissing { index: usize },

    /// The template's value list does not match its structure's slots.
    #[error("template carries {provided} values but its structure declares {expected} slots")]
    ValueCount { expected: usize, provided: usize },
}

/// The caller violated a rendering contract mid-patch.
#[derive(Debug, Clone, Error)]
pub enum ContractError {
    /// Two entries of one keyed arrangement claim the same key.
    #[error("duplicate key `{key}` within one keyed arrangement")]
    DuplicateKey { key: Key },

    /// A content hole's value changed shape class across renders of the
    /// same binding site.
    #[error("content hole changed shape from {from} to {to}")]
    ShapeChanged { from: HoleShape, to: HoleShape },

    /// An attribute binding received a value of the wrong kind (e.g. a
    /// non-listener on an event slot).
    #[error("{binding} binding received a {found} value")]
    KindMismatch {
        binding: &'static str,
        found: &'static str,
    },
}

/// Any failure surfaced by a render call.
#[derive(Debug, Clone, Error)]
pub enum RenderError {
    #[error(transparent)]
    Compile(#[from] CompileError),
    #[error(transparent)]
    Bind(#[from] BindError),
    #[error(transparent)]
    Contract(#[from] ContractError),
}
