//! Mount/patch engine.
//!
//! A `Hole` is an anchor range: a pair of boundary markers plus whatever
//! was last mounted between them. Patching a hole compares structure
//! identity first: an identical structure diffs values only, a changed
//! one discards the old subtree and re-instantiates. The `Renderer` is
//! the public entry point: it owns the skeleton cache and one hole per
//! render target.

use crate::compile::{CachePolicy, SkeletonCache};
use crate::error::RenderError;
use crate::instance::instantiate;
use crate::template::{StructureId, Template, Value};
use crate::updater::Updater;
use rustc_hash::FxHashMap;
use tracing::trace;
use weft_tree::{NodeId, Tree};

/// An anchor range owned by one binding: two boundary markers and the
/// instance mounted between them.
pub struct Hole {
    pub(crate) start: NodeId,
    pub(crate) end: NodeId,
    pub(crate) mounted: Option<Mounted>,
}

/// What is currently rendered in a hole.
pub(crate) struct Mounted {
    structure_id: StructureId,
    /// Last rendered value per slot, for the engine-level diff.
    values: Vec<Value>,
    updaters: Vec<Updater>,
}

impl Hole {
    pub(crate) fn new(start: NodeId, end: NodeId) -> Self {
        Self {
            start,
            end,
            mounted: None,
        }
    }

    pub fn start(&self) -> NodeId {
        self.start
    }

    pub fn end(&self) -> NodeId {
        self.end
    }
}

/// Render a template into a hole: value-only diff when the structure is
/// unchanged, full replacement otherwise.
pub(crate) fn patch_hole(
    tree: &mut Tree,
    cache: &mut SkeletonCache,
    hole: &mut Hole,
    template: &Template,
) -> Result<(), RenderError> {
    if let Some(mounted) = &mut hole.mounted {
        if mounted.structure_id == template.structure_id() {
            let new_values = template.values();
            if new_values.len() != mounted.values.len() {
                return Err(crate::error::BindError::ValueCount {
                    expected: mounted.values.len(),
                    provided: new_values.len(),
                }
                .into());
            }
            for ((old, updater), new) in mounted
                .values
                .iter_mut()
                .zip(mounted.updaters.iter_mut())
                .zip(new_values)
            {
                if !old.same(new) {
                    updater.apply(tree, cache, new)?;
                    *old = new.clone();
                }
            }
            return Ok(());
        }
        trace!(
            old = mounted.structure_id.0,
            new = template.structure_id().0,
            "structure changed, replacing subtree"
        );
    }

    // First render, or the structure changed: discard and rebuild.
    hole.mounted = None;
    tree.remove_between(hole.start, hole.end);

    let skeleton = cache.lookup(template.structure())?;
    let instance = instantiate(tree, &skeleton, template.values())?;

    let Some(parent) = tree.parent(hole.end) else {
        debug_assert!(false, "hole end marker has no parent");
        return Ok(());
    };
    for child in tree.take_children(instance.fragment) {
        tree.insert_before(parent, child, Some(hole.end));
    }
    tree.remove_subtree(instance.fragment);

    let mut updaters = instance.updaters;
    let mut values = Vec::with_capacity(template.values().len());
    for (updater, value) in updaters.iter_mut().zip(template.values()) {
        updater.apply(tree, cache, value)?;
        values.push(value.clone());
    }
    hole.mounted = Some(Mounted {
        structure_id: template.structure_id(),
        values,
        updaters,
    });
    Ok(())
}

/// Top-level render entry. Owns the skeleton cache and one anchor range
/// per target; rendering is idempotent per target: the first call
/// establishes the range inside the target's content, subsequent calls
/// patch it.
pub struct Renderer {
    cache: SkeletonCache,
    targets: FxHashMap<NodeId, Hole>,
}

impl Renderer {
    pub fn new() -> Self {
        Self::with_cache_policy(CachePolicy::Unbounded)
    }

    pub fn with_cache_policy(policy: CachePolicy) -> Self {
        Self {
            cache: SkeletonCache::new(policy),
            targets: FxHashMap::default(),
        }
    }

    pub fn cache(&self) -> &SkeletonCache {
        &self.cache
    }

    pub fn render(
        &mut self,
        tree: &mut Tree,
        target: NodeId,
        template: &Template,
    ) -> Result<(), RenderError> {
        let Self { cache, targets } = self;
        let hole = targets.entry(target).or_insert_with(|| {
            let start = tree.create_marker();
            let end = tree.create_marker();
            tree.append(target, start);
            tree.append(target, end);
            Hole::new(start, end)
        });
        patch_hole(tree, cache, hole, template)
    }
}

impl Default for Renderer {
    fn default() -> Self {
        Self::new()
    }
}
