//! List reconciler: unkeyed sequences and keyed arrangements.
//!
//! A sequence aligns purely by position: the live collection grows or
//! shrinks at the tail until lengths match, then every position is
//! patched through the normal mount rule.
//!
//! An arrangement aligns by key. The matching between old and new key
//! orders must be order-preserving and maximal; with unique keys that is
//! the longest increasing subsequence of old positions read in new-key
//! order. Entries on that subsequence stay put, retained entries off it
//! move as whole ranges (markers and subtree relocate together, so
//! identity, such as listeners and nested state, survives), vanished keys
//! are removed, and fresh keys are inserted in front of the next settled
//! range. A single right-to-left pass applies all of it.

use crate::compile::SkeletonCache;
use crate::error::{ContractError, RenderError};
use crate::mount::{Hole, patch_hole};
use crate::template::{Key, Template};
use rustc_hash::FxHashMap;
use tracing::trace;
use weft_tree::{NodeId, Tree};

/// Positional collection bound to one content hole.
pub(crate) struct SequenceState {
    start: NodeId,
    end: NodeId,
    holes: Vec<Hole>,
}

impl SequenceState {
    pub(crate) fn new(start: NodeId, end: NodeId) -> Self {
        Self {
            start,
            end,
            holes: Vec::new(),
        }
    }

    pub(crate) fn apply(
        &mut self,
        tree: &mut Tree,
        cache: &mut SkeletonCache,
        templates: &[Template],
    ) -> Result<(), RenderError> {
        if templates.is_empty() {
            if !self.holes.is_empty() {
                tree.remove_between(self.start, self.end);
                self.holes.clear();
            }
            return Ok(());
        }

        if templates.len() < self.holes.len() {
            for hole in self.holes.drain(templates.len()..) {
                remove_hole(tree, hole);
            }
        }
        while self.holes.len() < templates.len() {
            self.holes.push(fresh_hole_before(tree, self.end));
        }

        for (hole, template) in self.holes.iter_mut().zip(templates) {
            patch_hole(tree, cache, hole, template)?;
        }
        Ok(())
    }
}

/// Keyed collection bound to one content hole.
pub(crate) struct ArrangementState {
    start: NodeId,
    end: NodeId,
    entries: Vec<Entry>,
}

struct Entry {
    key: Key,
    hole: Hole,
}

impl ArrangementState {
    pub(crate) fn new(start: NodeId, end: NodeId) -> Self {
        Self {
            start,
            end,
            entries: Vec::new(),
        }
    }

    pub(crate) fn apply(
        &mut self,
        tree: &mut Tree,
        cache: &mut SkeletonCache,
        pairs: &[(Key, Template)],
    ) -> Result<(), RenderError> {
        // Reject key collisions before touching the output.
        let mut new_index: FxHashMap<&Key, usize> = FxHashMap::default();
        for (index, (key, _)) in pairs.iter().enumerate() {
            if new_index.insert(key, index).is_some() {
                return Err(ContractError::DuplicateKey { key: key.clone() }.into());
            }
        }

        if self.entries.is_empty() {
            for (key, template) in pairs {
                let mut hole = fresh_hole_before(tree, self.end);
                patch_hole(tree, cache, &mut hole, template)?;
                self.entries.push(Entry {
                    key: key.clone(),
                    hole,
                });
            }
            return Ok(());
        }

        if pairs.is_empty() {
            tree.remove_between(self.start, self.end);
            self.entries.clear();
            return Ok(());
        }

        let mut old_entries: Vec<Option<Entry>> = std::mem::take(&mut self.entries)
            .into_iter()
            .map(Some)
            .collect();
        let mut old_index: FxHashMap<Key, usize> = FxHashMap::default();
        for (index, entry) in old_entries.iter().enumerate() {
            if let Some(entry) = entry {
                old_index.insert(entry.key.clone(), index);
            }
        }

        // Keys absent from the new order lose their ranges entirely.
        for slot in old_entries.iter_mut() {
            if slot
                .as_ref()
                .is_some_and(|entry| !new_index.contains_key(&entry.key))
            {
                if let Some(entry) = slot.take() {
                    remove_hole(tree, entry.hole);
                }
            }
        }

        // Retained entries keep identity. Those on a longest increasing
        // run of old positions stay where they are; the rest move as
        // whole ranges.
        let retained: Vec<Option<usize>> = pairs
            .iter()
            .map(|(key, _)| old_index.get(key).copied())
            .collect();
        let settled = longest_increasing_run(&retained);
        trace!(
            old = old_entries.len(),
            new = pairs.len(),
            settled = settled.iter().filter(|s| **s).count(),
            "reconciling keyed arrangement"
        );

        let mut next_anchor = self.end;
        let mut reversed: Vec<Entry> = Vec::with_capacity(pairs.len());
        for (index, (key, template)) in pairs.iter().enumerate().rev() {
            let mut entry = match retained[index].and_then(|old| old_entries[old].take()) {
                Some(entry) => {
                    if !settled[index] {
                        tree.move_range_before(entry.hole.start(), entry.hole.end(), next_anchor);
                    }
                    entry
                }
                None => Entry {
                    key: key.clone(),
                    hole: fresh_hole_before(tree, next_anchor),
                },
            };
            patch_hole(tree, cache, &mut entry.hole, template)?;
            next_anchor = entry.hole.start();
            reversed.push(entry);
        }
        reversed.reverse();
        self.entries = reversed;
        Ok(())
    }
}

fn fresh_hole_before(tree: &mut Tree, anchor: NodeId) -> Hole {
    let start = tree.create_marker();
    let end = tree.create_marker();
    if let Some(parent) = tree.parent(anchor) {
        tree.insert_before(parent, start, Some(anchor));
        tree.insert_before(parent, end, Some(anchor));
    }
    Hole::new(start, end)
}

fn remove_hole(tree: &mut Tree, hole: Hole) {
    tree.remove_between(hole.start(), hole.end());
    tree.remove_subtree(hole.start());
    tree.remove_subtree(hole.end());
}

/// Mark the new-order indices whose old positions form a longest strictly
/// increasing subsequence (patience algorithm; `None` entries are fresh
/// keys and never part of the run).
fn longest_increasing_run(positions: &[Option<usize>]) -> Vec<bool> {
    let mut settled = vec![false; positions.len()];
    // tails[k]: index of the smallest tail of any increasing run of
    // length k + 1 seen so far.
    let mut tails: Vec<usize> = Vec::new();
    let mut predecessor: Vec<Option<usize>> = vec![None; positions.len()];

    for (index, position) in positions.iter().enumerate() {
        let Some(position) = *position else { continue };
        let slot = tails.partition_point(|&tail| positions[tail].is_some_and(|p| p < position));
        predecessor[index] = slot.checked_sub(1).map(|s| tails[s]);
        if slot == tails.len() {
            tails.push(index);
        } else {
            tails[slot] = index;
        }
    }

    let mut current = tails.last().copied();
    while let Some(index) = current {
        settled[index] = true;
        current = predecessor[index];
    }
    settled
}

#[cfg(test)]
mod tests {
    use super::longest_increasing_run;

    #[test]
    fn increasing_input_is_fully_settled() {
        let settled = longest_increasing_run(&[Some(0), Some(1), Some(2)]);
        assert_eq!(settled, vec![true, true, true]);
    }

    #[test]
    fn reorder_keeps_a_maximal_run() {
        // Old [a, b, c, d] rendered as new [b, d, a, c]:
        // old positions in new order are [1, 3, 0, 2].
        let settled = longest_increasing_run(&[Some(1), Some(3), Some(0), Some(2)]);
        assert_eq!(settled.iter().filter(|s| **s).count(), 2);
        // Exactly one maximal run survives; the others move.
        assert_eq!(settled, vec![false, false, true, true]);
    }

    #[test]
    fn fresh_keys_are_never_settled() {
        let settled = longest_increasing_run(&[Some(0), None, Some(2)]);
        assert_eq!(settled, vec![true, false, true]);
    }

    #[test]
    fn empty_input() {
        assert!(longest_increasing_run(&[]).is_empty());
    }

    #[test]
    fn descending_input_keeps_one() {
        let settled = longest_increasing_run(&[Some(2), Some(1), Some(0)]);
        assert_eq!(settled.iter().filter(|s| **s).count(), 1);
    }
}
