//! Minimize and restore.
//!
//! Minimizing a leaf captures a [`MinimizedRecord`] (ID, position, last
//! rectangle, store and floors) and removes the leaf from the tree. The
//! record lives outside the tree until [`SashTree::restore`] puts it back:
//!
//! 1. into the placeholder leaf, if the tree is empty;
//! 2. to the right of the first leaf, if the pane used to be the root;
//! 3. otherwise beside the leaf whose rectangle overlaps the old one the
//!    most (ties go to the first leaf in pre-order), on the old side.

use serde::{Deserialize, Serialize};
use tracing::debug_span;

use casement_core::geometry::Rect;

use crate::error::SashError;
use crate::ops::PaneSpec;
use crate::sash::{SashId, SashPosition, SashSize, SashStore, SplitAxis};
use crate::tree::SashTree;

/// Out-of-tree snapshot of a minimized pane.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MinimizedRecord {
    pub id: SashId,
    pub position: SashPosition,
    /// Rectangle in root coordinates at the time of minimizing.
    pub rect: Rect,
    pub store: SashStore,
    pub min_width: u32,
    pub min_height: u32,
}

/// Where a restored pane ended up.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum RestorePlacement {
    /// The tree was empty; the placeholder leaf took the pane.
    ReplacedPlaceholder,
    /// The pane used to be the root; it was split off the first leaf.
    SplitFirstLeaf { target: SashId },
    /// Split off the leaf with the largest overlap with the old rectangle.
    SplitIntersecting { target: SashId, overlap: u64 },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RestoreOutcome {
    pub id: SashId,
    pub placement: RestorePlacement,
}

/// Minimized records in minimize order, keyed by sash ID.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MinimizedRegistry {
    records: Vec<MinimizedRecord>,
}

impl MinimizedRegistry {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Store a record, replacing any earlier record with the same ID.
    pub fn insert(&mut self, record: MinimizedRecord) {
        self.records.retain(|existing| existing.id != record.id);
        self.records.push(record);
    }

    #[must_use]
    pub fn get(&self, id: SashId) -> Option<&MinimizedRecord> {
        self.records.iter().find(|record| record.id == id)
    }

    /// Remove and return the record for `id`.
    pub fn take(&mut self, id: SashId) -> Option<MinimizedRecord> {
        let index = self.records.iter().position(|record| record.id == id)?;
        Some(self.records.remove(index))
    }

    #[must_use]
    pub fn contains(&self, id: SashId) -> bool {
        self.get(id).is_some()
    }

    pub fn iter(&self) -> impl Iterator<Item = &MinimizedRecord> {
        self.records.iter()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.records.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}

impl SashTree {
    /// Capture leaf `id` into a record and remove it from the tree.
    pub fn minimize(&mut self, id: SashId) -> Result<MinimizedRecord, SashError> {
        let _span = debug_span!("sash.minimize", %id).entered();
        let record = self.require_leaf(id)?;
        if self.is_placeholder() {
            return Err(SashError::InvalidPosition {
                position: record.position,
                reason: "the placeholder pane cannot be minimized",
            });
        }
        let minimized = MinimizedRecord {
            id,
            position: record.position,
            rect: record.rect,
            store: record.store().cloned().unwrap_or_default(),
            min_width: record.min_width,
            min_height: record.min_height,
        };
        self.remove_pane(id)?;
        Ok(minimized)
    }

    /// Reinsert a minimized pane under its original ID.
    ///
    /// On error the tree is unchanged and the caller still owns `record`.
    pub fn restore(&mut self, record: &MinimizedRecord) -> Result<RestoreOutcome, SashError> {
        let _span = debug_span!("sash.restore", id = %record.id, position = ?record.position)
            .entered();
        if record.rect.is_empty() {
            return Err(SashError::InvalidGeometry {
                width: record.rect.width,
                height: record.rect.height,
                reason: "minimized record has an empty rectangle",
            });
        }
        if self.nodes.contains_key(&record.id) {
            return Err(SashError::DuplicateId { id: record.id });
        }

        let spec = PaneSpec {
            store: record.store.clone(),
            size: None,
            min_width: Some(record.min_width),
            min_height: Some(record.min_height),
            id: Some(record.id),
        };

        if self.is_placeholder() {
            let id = self.add_pane(self.root, spec, SashPosition::Right)?;
            return Ok(RestoreOutcome {
                id,
                placement: RestorePlacement::ReplacedPlaceholder,
            });
        }

        let Some(axis) = record.position.axis() else {
            let Some(&target) = self.leaves().first() else {
                return Err(SashError::NotFound { id: self.root });
            };
            let id = self.add_pane(target, spec, SashPosition::Right)?;
            return Ok(RestoreOutcome {
                id,
                placement: RestorePlacement::SplitFirstLeaf { target },
            });
        };

        let (target, overlap) = self.best_overlap(record.rect)?;
        let target_record = self.require(target)?;
        let available = axis.extent(target_record.rect);
        let wanted = axis.extent(record.rect).min(available);
        let own_min = match axis {
            SplitAxis::Horizontal => record.min_width,
            SplitAxis::Vertical => record.min_height,
        };
        let target_min = self.min_size(target)?.along(axis);
        let size = (wanted >= own_min && available - wanted >= target_min)
            .then_some(SashSize::Pixels(wanted));

        let id = self.add_pane(target, PaneSpec { size, ..spec }, record.position)?;
        Ok(RestoreOutcome {
            id,
            placement: RestorePlacement::SplitIntersecting { target, overlap },
        })
    }

    /// Leaf with the largest intersection with `rect`; first in pre-order
    /// wins ties, including the all-disjoint case.
    fn best_overlap(&self, rect: Rect) -> Result<(SashId, u64), SashError> {
        let mut best: Option<(SashId, u64)> = None;
        for leaf in self.leaves() {
            let overlap = self.require(leaf)?.rect.intersection_area(&rect);
            if best.is_none_or(|(_, current)| overlap > current) {
                best = Some((leaf, overlap));
            }
        }
        best.ok_or(SashError::NotFound { id: self.root })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn rect_of(tree: &SashTree, id: SashId) -> Rect {
        tree.get_by_id(id).map(|record| record.rect).expect("sash exists")
    }

    fn two_panes() -> (SashTree, SashId, SashId) {
        let mut tree = SashTree::new(800, 600, SashStore::titled("main")).expect("tree");
        let left = tree.root();
        let right = tree
            .add_pane(
                left,
                PaneSpec::new(SashStore::titled("A")).with_size(SashSize::Pixels(300)),
                SashPosition::Right,
            )
            .expect("split right");
        (tree, left, right)
    }

    #[test]
    fn minimize_then_restore_round_trips() {
        let (mut tree, left, right) = two_panes();
        let record = tree.minimize(right).expect("minimize");
        assert_eq!(record.position, SashPosition::Right);
        assert_eq!(record.rect, Rect::new(500, 0, 300, 600));
        assert_eq!(record.store, SashStore::titled("A"));
        assert_eq!(rect_of(&tree, left), Rect::from_size(800, 600));

        let outcome = tree.restore(&record).expect("restore");
        assert_eq!(outcome.id, right);
        assert_eq!(
            outcome.placement,
            RestorePlacement::SplitIntersecting {
                target: left,
                overlap: 300 * 600,
            }
        );
        assert_eq!(rect_of(&tree, left), Rect::new(0, 0, 500, 600));
        assert_eq!(rect_of(&tree, right), Rect::new(500, 0, 300, 600));
        assert_eq!(
            tree.get_by_id(right).and_then(|r| r.store().cloned()),
            Some(SashStore::titled("A"))
        );
    }

    #[test]
    fn restore_into_placeholder() {
        let mut tree = SashTree::new(640, 480, SashStore::titled("solo")).expect("tree");
        let solo = tree.root();
        let record = tree.minimize(solo).expect("minimize root");
        assert_eq!(record.position, SashPosition::Root);
        assert!(tree.is_placeholder());

        let outcome = tree.restore(&record).expect("restore");
        assert_eq!(outcome.id, solo);
        assert_eq!(outcome.placement, RestorePlacement::ReplacedPlaceholder);
        assert_eq!(tree.len(), 1);
        assert_eq!(rect_of(&tree, solo), Rect::from_size(640, 480));
        assert!(tree.validate().is_ok());
    }

    #[test]
    fn restore_root_record_splits_first_leaf() {
        let mut tree = SashTree::new(800, 600, SashStore::titled("solo")).expect("tree");
        let solo = tree.root();
        let record = tree.minimize(solo).expect("minimize root");
        let fresh = tree.root();
        tree.add_pane(fresh, PaneSpec::new(SashStore::titled("new")), SashPosition::Right)
            .expect("fill placeholder");
        let other = tree
            .add_pane(fresh, PaneSpec::new(SashStore::titled("other")), SashPosition::Bottom)
            .expect("split");

        let outcome = tree.restore(&record).expect("restore");
        assert_eq!(
            outcome.placement,
            RestorePlacement::SplitFirstLeaf { target: fresh }
        );
        assert_eq!(tree.sibling(solo), Some(fresh));
        assert_eq!(
            tree.get_by_id(solo).map(|r| r.position),
            Some(SashPosition::Right)
        );
        assert_eq!(tree.leaves(), vec![fresh, solo, other]);
    }

    #[test]
    fn zero_overlap_ties_go_to_first_leaf() {
        let (mut tree, left, _right) = two_panes();
        let record = MinimizedRecord {
            id: SashId::new(50).expect("non-zero"),
            position: SashPosition::Bottom,
            rect: Rect::new(5_000, 5_000, 100, 100),
            store: SashStore::titled("far away"),
            min_width: 50,
            min_height: 50,
        };
        let outcome = tree.restore(&record).expect("restore");
        assert_eq!(
            outcome.placement,
            RestorePlacement::SplitIntersecting {
                target: left,
                overlap: 0,
            }
        );
        assert_eq!(rect_of(&tree, record.id), Rect::new(0, 500, 500, 100));
    }

    #[test]
    fn equal_overlap_ties_go_to_first_leaf() {
        let (mut tree, left, right) = two_panes();
        let record = MinimizedRecord {
            id: SashId::new(70).expect("non-zero"),
            position: SashPosition::Bottom,
            rect: Rect::new(300, 0, 400, 600),
            store: SashStore::titled("straddling"),
            min_width: 50,
            min_height: 50,
        };
        assert_eq!(
            rect_of(&tree, left).intersection_area(&record.rect),
            rect_of(&tree, right).intersection_area(&record.rect)
        );

        let outcome = tree.restore(&record).expect("restore");
        assert_eq!(
            outcome.placement,
            RestorePlacement::SplitIntersecting {
                target: left,
                overlap: 200 * 600,
            }
        );
        assert_eq!(tree.sibling(record.id), Some(left));
        assert_eq!(rect_of(&tree, right), Rect::new(500, 0, 300, 600));
    }

    #[test]
    fn oversized_record_falls_back_to_even_split() {
        let (mut tree, left, _right) = two_panes();
        let record = MinimizedRecord {
            id: SashId::new(60).expect("non-zero"),
            position: SashPosition::Top,
            rect: Rect::new(0, 0, 500, 590),
            store: SashStore::titled("tall"),
            min_width: 50,
            min_height: 50,
        };
        tree.restore(&record).expect("restore");
        assert_eq!(rect_of(&tree, record.id), Rect::new(0, 0, 500, 300));
        assert_eq!(rect_of(&tree, left), Rect::new(0, 300, 500, 300));
    }

    #[test]
    fn bad_records_are_rejected_without_mutation() {
        let (mut tree, left, _right) = two_panes();
        let before = tree.state_hash();
        let empty = MinimizedRecord {
            id: SashId::new(70).expect("non-zero"),
            position: SashPosition::Left,
            rect: Rect::new(0, 0, 0, 600),
            store: SashStore::default(),
            min_width: 50,
            min_height: 50,
        };
        assert!(matches!(
            tree.restore(&empty),
            Err(SashError::InvalidGeometry { .. })
        ));
        let live = MinimizedRecord {
            id: left,
            rect: Rect::new(0, 0, 10, 10),
            ..empty
        };
        assert_eq!(tree.restore(&live), Err(SashError::DuplicateId { id: left }));
        assert_eq!(tree.state_hash(), before);
    }

    #[test]
    fn placeholder_cannot_be_minimized() {
        let mut tree = SashTree::placeholder(100, 100).expect("placeholder");
        let root = tree.root();
        assert!(matches!(
            tree.minimize(root),
            Err(SashError::InvalidPosition { .. })
        ));
    }

    #[test]
    fn registry_keeps_minimize_order() {
        let (mut tree, left, right) = two_panes();
        let mut registry = MinimizedRegistry::new();
        registry.insert(tree.minimize(right).expect("minimize right"));
        registry.insert(tree.minimize(left).expect("minimize left"));
        let order: Vec<_> = registry.iter().map(|record| record.id).collect();
        assert_eq!(order, vec![right, left]);
        assert!(registry.contains(left));
        assert_eq!(registry.take(right).map(|record| record.id), Some(right));
        assert_eq!(registry.len(), 1);
        assert!(registry.take(right).is_none());
    }
}
