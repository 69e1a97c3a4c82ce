//! Instance binder: turns a compiled skeleton plus initial values into a
//! live fragment with one bound updater per value slot.
//!
//! All instruction sites are resolved before any placeholder is replaced,
//! so the child-index paths recorded at compile time stay valid while the
//! fragment is rewritten. Content holes resolve their kind here, once,
//! from the shape of the initial value; the placeholder marker is
//! replaced by a dedicated text node or a boundary-marker pair, leaving
//! the output clean of compiler artifacts.

use crate::compile::{BindingKind, CompiledSkeleton, SitePath};
use crate::error::BindError;
use crate::mount::Hole;
use crate::reconcile::{ArrangementState, SequenceState};
use crate::template::{HoleShape, Value};
use crate::updater::Updater;
use weft_tree::{NodeId, Tree};

/// A freshly bound skeleton clone, not yet inserted anywhere.
pub(crate) struct Instance {
    /// Transient fragment holding the cloned output roots.
    pub(crate) fragment: NodeId,
    /// One updater per value slot.
    pub(crate) updaters: Vec<Updater>,
}

/// Clone the skeleton into the live tree and bind every instruction.
pub(crate) fn instantiate(
    tree: &mut Tree,
    skeleton: &CompiledSkeleton,
    values: &[Value],
) -> Result<Instance, BindError> {
    if values.len() != skeleton.instructions.len() {
        return Err(BindError::ValueCount {
            expected: skeleton.instructions.len(),
            provided: values.len(),
        });
    }

    let fragment = tree.create_fragment();
    for &root in &skeleton.roots {
        if let Some(copy) = tree.import(&skeleton.fragment, root) {
            tree.append(fragment, copy);
        }
    }

    // Resolve every site before mutating the fragment.
    let mut sites = Vec::with_capacity(skeleton.instructions.len());
    for instruction in &skeleton.instructions {
        let node = resolve_site(tree, fragment, &instruction.site).ok_or(BindError::SiteMissing {
            index: instruction.value_index,
        })?;
        sites.push(node);
    }

    let mut updaters = Vec::with_capacity(sites.len());
    for (instruction, node) in skeleton.instructions.iter().zip(sites) {
        updaters.push(bind_site(tree, &instruction.kind, instruction.value_index, node, values)?);
    }

    Ok(Instance { fragment, updaters })
}

fn resolve_site(tree: &Tree, fragment: NodeId, site: &SitePath) -> Option<NodeId> {
    let mut node = fragment;
    for &step in site {
        node = tree.children(node).get(step as usize).copied()?;
    }
    Some(node)
}

fn bind_site(
    tree: &mut Tree,
    kind: &BindingKind,
    index: usize,
    node: NodeId,
    values: &[Value],
) -> Result<Updater, BindError> {
    let element = |tree: &Tree| -> Result<NodeId, BindError> {
        if tree.is_element(node) {
            Ok(node)
        } else {
            Err(BindError::SiteMissing { index })
        }
    };

    Ok(match kind {
        BindingKind::Event(name) => Updater::Event {
            node: element(tree)?,
            name: name.clone(),
            last: None,
        },
        BindingKind::Toggle(name) => Updater::Toggle {
            node: element(tree)?,
            name: name.clone(),
            last: None,
        },
        BindingKind::Property(name) => Updater::Property {
            node: element(tree)?,
            name: name.clone(),
            last: None,
        },
        BindingKind::Attribute(name) => Updater::Attribute {
            node: element(tree)?,
            name: name.clone(),
            last: None,
        },
        BindingKind::Reference => Updater::Reference {
            node: element(tree)?,
            last: None,
        },
        BindingKind::Style => Updater::Style {
            node: element(tree)?,
            last: None,
        },
        BindingKind::Content => {
            if !tree.is_marker(node) {
                return Err(BindError::SiteMissing { index });
            }
            let parent = tree.parent(node).ok_or(BindError::SiteMissing { index })?;
            match values[index].shape() {
                HoleShape::Text => {
                    let text = tree.create_text("");
                    tree.insert_before(parent, text, Some(node));
                    tree.remove_subtree(node);
                    Updater::Text { node: text, last: None }
                }
                shape => {
                    let start = tree.create_marker();
                    let end = tree.create_marker();
                    tree.insert_before(parent, start, Some(node));
                    tree.insert_before(parent, end, Some(node));
                    tree.remove_subtree(node);
                    match shape {
                        HoleShape::Template => Updater::Fragment(Hole::new(start, end)),
                        HoleShape::Sequence => Updater::Sequence(SequenceState::new(start, end)),
                        _ => Updater::Arrangement(ArrangementState::new(start, end)),
                    }
                }
            }
        }
    })
}
