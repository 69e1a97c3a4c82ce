//! The updater set: one strategy per binding kind.
//!
//! An updater is a small state object owning the target node id and the
//! last value it applied. Updates are idempotent under identity: a value
//! that compares the same as the last applied one is a no-op, except the
//! very first call, which always applies. The mount engine performs the
//! same identity check before dispatching here, so both layers skip
//! independently.

use crate::compile::SkeletonCache;
use crate::error::{ContractError, RenderError};
use crate::mount::{self, Hole};
use crate::reconcile::{ArrangementState, SequenceState};
use crate::template::{HoleShape, NodeCallback, StyleMap, Value};
use std::sync::Arc;
use weft_tree::{Listener, NodeId, PropertyValue, Tree};

pub(crate) enum Updater {
    Event {
        node: NodeId,
        name: Arc<str>,
        last: Option<Listener>,
    },
    Toggle {
        node: NodeId,
        name: Arc<str>,
        last: Option<Value>,
    },
    Attribute {
        node: NodeId,
        name: Arc<str>,
        last: Option<Value>,
    },
    Property {
        node: NodeId,
        name: Arc<str>,
        last: Option<Value>,
    },
    Reference {
        node: NodeId,
        last: Option<NodeCallback>,
    },
    Style {
        node: NodeId,
        last: Option<StyleMap>,
    },
    Text {
        node: NodeId,
        last: Option<Value>,
    },
    Fragment(Hole),
    Sequence(SequenceState),
    Arrangement(ArrangementState),
}

impl Updater {
    pub(crate) fn apply(
        &mut self,
        tree: &mut Tree,
        cache: &mut SkeletonCache,
        value: &Value,
    ) -> Result<(), RenderError> {
        match self {
            Updater::Event { node, name, last } => {
                let Value::Listener(listener) = value else {
                    return Err(ContractError::KindMismatch {
                        binding: "event",
                        found: value.kind_name(),
                    }
                    .into());
                };
                if last.as_ref().is_some_and(|previous| previous.same(listener)) {
                    return Ok(());
                }
                // Never more than one active listener per name.
                if let Some(previous) = last.take() {
                    tree.remove_listener(*node, name, &previous);
                }
                tree.add_listener(*node, name.clone(), listener.clone());
                *last = Some(listener.clone());
                Ok(())
            }
            Updater::Toggle { node, name, last } => {
                if last.as_ref().is_some_and(|previous| previous.same(value)) {
                    return Ok(());
                }
                if value.truthy() {
                    tree.set_attribute(*node, name.clone(), "");
                } else {
                    tree.remove_attribute(*node, name);
                }
                *last = Some(value.clone());
                Ok(())
            }
            Updater::Attribute { node, name, last } => {
                if last.as_ref().is_some_and(|previous| previous.same(value)) {
                    return Ok(());
                }
                tree.set_attribute(*node, name.clone(), value.to_text().as_ref());
                *last = Some(value.clone());
                Ok(())
            }
            Updater::Property { node, name, last } => {
                if last.as_ref().is_some_and(|previous| previous.same(value)) {
                    return Ok(());
                }
                tree.set_property(*node, name.clone(), property_value(value));
                *last = Some(value.clone());
                Ok(())
            }
            Updater::Reference { node, last } => {
                let Value::Callback(callback) = value else {
                    return Err(ContractError::KindMismatch {
                        binding: "reference",
                        found: value.kind_name(),
                    }
                    .into());
                };
                if last.as_ref().is_some_and(|previous| previous.same(callback)) {
                    return Ok(());
                }
                callback.call(*node);
                *last = Some(callback.clone());
                Ok(())
            }
            Updater::Style { node, last } => {
                let Value::Style(styles) = value else {
                    return Err(ContractError::KindMismatch {
                        binding: "style",
                        found: value.kind_name(),
                    }
                    .into());
                };
                if last.as_ref().is_some_and(|previous| previous.same(styles)) {
                    return Ok(());
                }
                for (name, new_value) in styles.iter() {
                    let unchanged =
                        last.as_ref().and_then(|previous| previous.get(name)) == Some(new_value);
                    if !unchanged {
                        tree.set_style(*node, name, new_value);
                    }
                }
                // Keys absent from the new mapping stay applied.
                *last = Some(styles.clone());
                Ok(())
            }
            Updater::Text { node, last } => {
                if value.shape() != HoleShape::Text {
                    return Err(ContractError::ShapeChanged {
                        from: HoleShape::Text,
                        to: value.shape(),
                    }
                    .into());
                }
                if last.as_ref().is_some_and(|previous| previous.same(value)) {
                    return Ok(());
                }
                tree.set_text(*node, value.to_text().as_ref());
                *last = Some(value.clone());
                Ok(())
            }
            Updater::Fragment(hole) => {
                let Value::Template(template) = value else {
                    return Err(ContractError::ShapeChanged {
                        from: HoleShape::Template,
                        to: value.shape(),
                    }
                    .into());
                };
                mount::patch_hole(tree, cache, hole, template)
            }
            Updater::Sequence(state) => {
                let Value::Sequence(templates) = value else {
                    return Err(ContractError::ShapeChanged {
                        from: HoleShape::Sequence,
                        to: value.shape(),
                    }
                    .into());
                };
                state.apply(tree, cache, templates)
            }
            Updater::Arrangement(state) => {
                let Value::Arrangement(entries) = value else {
                    return Err(ContractError::ShapeChanged {
                        from: HoleShape::Arrangement,
                        to: value.shape(),
                    }
                    .into());
                };
                state.apply(tree, cache, entries)
            }
        }
    }
}

/// Property assignment bypasses attribute serialization for scalar
/// values; everything else falls back to the textual coercion.
fn property_value(value: &Value) -> PropertyValue {
    match value {
        Value::Text(text) => PropertyValue::Text(text.clone()),
        Value::Int(number) => PropertyValue::Int(*number),
        Value::Float(number) => PropertyValue::Float(*number),
        Value::Bool(flag) => PropertyValue::Bool(*flag),
        other => PropertyValue::Text(other.to_text()),
    }
}
