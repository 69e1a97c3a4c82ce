//! Skeleton compiler and cache.
//!
//! Compiling a structure walks its markup once, building a prototype
//! fragment (cloned per instantiation, never reused directly) and one
//! instruction per value slot. Attribute slots are classified here by
//! their name syntax; content holes stay generic because their kind
//! depends on the runtime shape of the first value, which only the
//! binder sees.
//!
//! The cache is an explicit object owned by the renderer, keyed by
//! structure id, with an injectable eviction policy.

use crate::error::CompileError;
use crate::template::{AttrValue, Markup, Structure, StructureId};
use indexmap::IndexMap;
use rustc_hash::FxBuildHasher;
use smallvec::SmallVec;
use std::rc::Rc;
use std::sync::Arc;
use tracing::debug;
use weft_tree::{NodeId, Tree};

/// Child-index path from the fragment root to a binding site.
pub type SitePath = SmallVec<[u32; 8]>;

/// How a value slot binds to its site.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BindingKind {
    Event(Arc<str>),
    Toggle(Arc<str>),
    Property(Arc<str>),
    Reference,
    Style,
    Attribute(Arc<str>),
    /// Child-content hole; kind resolution is deferred to bind time.
    Content,
}

/// One binding site of a compiled skeleton.
#[derive(Debug, Clone)]
pub struct Instruction {
    pub value_index: usize,
    pub kind: BindingKind,
    pub site: SitePath,
}

/// A structure compiled once: prototype fragment plus instruction list.
/// Never mutated after creation.
pub struct CompiledSkeleton {
    pub structure_id: StructureId,
    pub(crate) fragment: Tree,
    pub(crate) roots: Vec<NodeId>,
    /// Sorted by value index: `instructions[i].value_index == i`.
    pub(crate) instructions: Vec<Instruction>,
}

/// Eviction policy for the skeleton cache.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CachePolicy {
    /// Keep every compiled skeleton for the cache's lifetime, trading
    /// memory for never recompiling.
    Unbounded,
    /// Keep at most this many skeletons, evicting least recently used.
    Lru(usize),
}

/// Process-lifetime store of compiled skeletons, keyed by structure id.
pub struct SkeletonCache {
    entries: IndexMap<StructureId, Rc<CompiledSkeleton>, FxBuildHasher>,
    policy: CachePolicy,
}

impl SkeletonCache {
    pub fn new(policy: CachePolicy) -> Self {
        Self {
            entries: IndexMap::default(),
            policy,
        }
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn contains(&self, id: StructureId) -> bool {
        self.entries.contains_key(&id)
    }

    /// Fetch the compiled skeleton for a structure, compiling on first
    /// sight. Repeated calls with structurally identical input return the
    /// same cached skeleton.
    pub fn lookup(&mut self, structure: &Structure) -> Result<Rc<CompiledSkeleton>, CompileError> {
        if let Some(index) = self.entries.get_index_of(&structure.id()) {
            if matches!(self.policy, CachePolicy::Lru(_)) {
                let last = self.entries.len() - 1;
                self.entries.move_index(index, last);
                return Ok(self.entries[last].clone());
            }
            return Ok(self.entries[index].clone());
        }

        debug!(structure_id = structure.id().0, "compiling skeleton");
        let skeleton = Rc::new(compile(structure)?);
        self.entries.insert(structure.id(), skeleton.clone());
        if let CachePolicy::Lru(capacity) = self.policy {
            while self.entries.len() > capacity.max(1) {
                if let Some((evicted, _)) = self.entries.shift_remove_index(0) {
                    debug!(structure_id = evicted.0, "evicting skeleton");
                }
            }
        }
        Ok(skeleton)
    }
}

impl Default for SkeletonCache {
    fn default() -> Self {
        Self::new(CachePolicy::Unbounded)
    }
}

/// Compile a structure into a skeleton. Deterministic for a given
/// structure id.
pub fn compile(structure: &Structure) -> Result<CompiledSkeleton, CompileError> {
    let mut fragment = Tree::new();
    let mut instructions = Vec::new();
    let mut roots = Vec::new();

    for (index, root) in structure.roots().iter().enumerate() {
        let mut path = SitePath::new();
        path.push(index as u32);
        let id = compile_markup(&mut fragment, root, &path, &mut instructions)?;
        roots.push(id);
    }

    // Every declared slot must be bound exactly once.
    let mut seen = vec![false; structure.value_slots()];
    for instruction in &instructions {
        if seen[instruction.value_index] {
            return Err(CompileError::DuplicateSlot {
                index: instruction.value_index,
            });
        }
        seen[instruction.value_index] = true;
    }
    for (index, bound) in seen.iter().enumerate() {
        if !bound {
            return Err(CompileError::UnboundSlot { index });
        }
    }
    instructions.sort_by_key(|instruction| instruction.value_index);

    Ok(CompiledSkeleton {
        structure_id: structure.id(),
        fragment,
        roots,
        instructions,
    })
}

fn compile_markup(
    tree: &mut Tree,
    markup: &Markup,
    path: &SitePath,
    instructions: &mut Vec<Instruction>,
) -> Result<NodeId, CompileError> {
    match markup {
        Markup::Text(text) => Ok(tree.create_text(text.as_ref())),
        Markup::Hole(index) => {
            instructions.push(Instruction {
                value_index: *index,
                kind: BindingKind::Content,
                site: path.clone(),
            });
            Ok(tree.create_marker())
        }
        Markup::Element {
            tag,
            attributes,
            children,
        } => {
            let element = tree.create_element(tag.clone());
            for (name, value) in attributes {
                match value {
                    AttrValue::Static(text) => {
                        tree.set_attribute(element, name.clone(), text.as_ref());
                    }
                    AttrValue::Slot(index) => {
                        instructions.push(Instruction {
                            value_index: *index,
                            kind: classify_attribute(name)?,
                            site: path.clone(),
                        });
                    }
                }
            }
            for (child_index, child) in children.iter().enumerate() {
                let mut child_path = path.clone();
                child_path.push(child_index as u32);
                let node = compile_markup(tree, child, &child_path, instructions)?;
                tree.append(element, node);
            }
            Ok(element)
        }
    }
}

/// Classify a slot-bearing attribute name: `@name` event, `name?` toggle,
/// `.name` property, `ref` reference callback, `style` style map,
/// anything else a plain attribute. A name matching more than one prefix
/// or suffix pattern at once is ambiguous.
fn classify_attribute(name: &Arc<str>) -> Result<BindingKind, CompileError> {
    let event = name.strip_prefix('@');
    let toggle = name.strip_suffix('?');
    let property = name.strip_prefix('.');

    let matched = event.is_some() as u8 + toggle.is_some() as u8 + property.is_some() as u8;
    if matched > 1 {
        return Err(CompileError::AmbiguousAttribute { name: name.clone() });
    }

    Ok(if let Some(event_name) = event {
        BindingKind::Event(event_name.into())
    } else if let Some(toggle_name) = toggle {
        BindingKind::Toggle(toggle_name.into())
    } else if let Some(property_name) = property {
        BindingKind::Property(property_name.into())
    } else if name.as_ref() == "ref" {
        BindingKind::Reference
    } else if name.as_ref() == "style" {
        BindingKind::Style
    } else {
        BindingKind::Attribute(name.clone())
    })
}
