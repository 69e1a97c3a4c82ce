//! weft: a declarative templating engine with minimal-mutation rendering.
//!
//! Callers describe output as a [`Template`] (an immutable static
//! [`Structure`] plus one dynamic [`Value`] per slot) and re-render it
//! against previous output through a [`Renderer`]. The engine compiles
//! each structure once into a cached skeleton, binds per-slot updaters to
//! cloned output nodes, and on every subsequent render applies only the
//! mutations needed to reach the new state: unchanged values are skipped
//! by identity, unchanged structures diff values only, and keyed
//! collections are reconciled so that reordered entries keep their
//! subtrees (and with them any expensive state such as listeners or
//! nested instances).
//!
//! Rendering is single-threaded, synchronous, and non-reentrant per
//! target; every error is a caller contract violation surfaced through
//! [`RenderError`], never retried.

pub mod compile;
pub mod error;
mod instance;
mod mount;
mod reconcile;
pub mod template;
mod updater;

pub use compile::{CachePolicy, SkeletonCache};
pub use error::{BindError, CompileError, ContractError, RenderError};
pub use mount::Renderer;
pub use template::{
    AttrValue, HoleShape, Key, Markup, NodeCallback, Structure, StructureId, StyleMap, Template,
    Value,
};
pub use weft_tree::{Event, Listener, NodeId, PropertyValue, Tree};
