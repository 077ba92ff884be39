//! Top-down layout solver.
//!
//! One pass computes minimums bottom-up into a table, then walks the tree
//! top-down dividing each split's rectangle between its two children:
//!
//! 1. If both children already have an extent along the split axis, the
//!    previous ratio is preserved.
//! 2. Otherwise the initial-size hint decides (the child without geometry
//!    first, then the leading child, then the trailing one), falling back
//!    to an even split.
//! 3. The divider is clamped so both children stay at or above their
//!    minimums. When the minimums do not fit at all, both children get
//!    exactly their minimums and the layout overflows the container.
//!
//! Geometry is unsigned, so the solver can never produce negative sizes.

use casement_core::geometry::Rect;
use tracing::{debug_span, trace, warn};

use crate::error::SashError;
use crate::sash::{SashId, SashNodeKind, SashSize, SashSplit};
use crate::tree::{MinTable, SashTree, check_extent};

/// Outcome of dividing one split's extent.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Division {
    pub first: u32,
    pub second: u32,
    /// True when the children's minimums exceed the available extent.
    pub overflow: bool,
}

/// Divide `available` between two children, honoring both minimums.
///
/// `desired_first` is clamped into `[first_min, available - second_min]`.
#[must_use]
pub fn distribute(available: u32, desired_first: u32, first_min: u32, second_min: u32) -> Division {
    if u64::from(first_min) + u64::from(second_min) > u64::from(available) {
        return Division {
            first: first_min,
            second: second_min,
            overflow: true,
        };
    }
    let first = desired_first.clamp(first_min, available - second_min);
    Division {
        first,
        second: available - first,
        overflow: false,
    }
}

impl SashTree {
    /// Lay the whole tree out into a new `width` x `height` container.
    ///
    /// Zero extents are rejected before any node is touched.
    pub fn resize(&mut self, width: u32, height: u32) -> Result<(), SashError> {
        check_extent(width, height)?;
        self.container = Rect::from_size(width, height);
        self.layout_all();
        Ok(())
    }

    /// True when the last layout could not tile every split exactly, which
    /// happens only when minimums exceed the space available.
    #[must_use]
    pub fn is_overflowing(&self) -> bool {
        let Some(root) = self.nodes.get(&self.root) else {
            return false;
        };
        if root.rect != self.container {
            return true;
        }
        self.nodes.values().any(|record| {
            let SashNodeKind::Split(split) = &record.kind else {
                return false;
            };
            let (Some(first), Some(second)) =
                (self.nodes.get(&split.first), self.nodes.get(&split.second))
            else {
                return true;
            };
            let (expected_first, expected_second) = split.axis.divide(
                record.rect,
                split.axis.extent(first.rect),
                split.axis.extent(second.rect),
            );
            first.rect != expected_first
                || second.rect != expected_second
                || u64::from(split.axis.extent(first.rect))
                    + u64::from(split.axis.extent(second.rect))
                    != u64::from(split.axis.extent(record.rect))
        })
    }

    /// Relayout every node from the root.
    pub(crate) fn layout_all(&mut self) {
        let _span = debug_span!(
            "sash.layout",
            width = self.container.width,
            height = self.container.height,
            nodes = self.nodes.len()
        )
        .entered();
        let mins = self.min_table(self.root);
        let overflowed = self.layout_from(self.root, self.container, &mins);
        if overflowed > 0 {
            warn!(
                width = self.container.width,
                height = self.container.height,
                splits = overflowed,
                "container smaller than combined pane minimums; layout overflows"
            );
        }
    }

    /// Relayout the subtree at `id` into `area`. Returns the number of
    /// splits whose children's minimums did not fit.
    pub(crate) fn layout_from(&mut self, id: SashId, area: Rect, mins: &MinTable) -> usize {
        let mut overflowed = 0;
        let mut stack = vec![(id, area)];
        while let Some((current, area)) = stack.pop() {
            let min = mins.get(&current).copied().unwrap_or_default();
            let rect = Rect::new(
                area.x,
                area.y,
                area.width.max(min.width),
                area.height.max(min.height),
            );
            let Some(record) = self.nodes.get_mut(&current) else {
                continue;
            };
            record.rect = rect;
            let SashNodeKind::Split(split) = record.kind else {
                continue;
            };

            let division = self.divide_split(&split, rect, mins);
            if division.overflow {
                overflowed += 1;
                trace!(
                    split = %current,
                    first = division.first,
                    second = division.second,
                    "split clamped to child minimums"
                );
            }
            let (first_area, second_area) = split.axis.divide(rect, division.first, division.second);
            stack.push((split.second, second_area));
            stack.push((split.first, first_area));
        }
        overflowed
    }

    fn divide_split(&self, split: &SashSplit, rect: Rect, mins: &MinTable) -> Division {
        let axis = split.axis;
        let available = axis.extent(rect);
        let first_min = mins.get(&split.first).map_or(0, |min| min.along(axis));
        let second_min = mins.get(&split.second).map_or(0, |min| min.along(axis));
        let desired = self.desired_first(split, available);
        distribute(available, desired, first_min, second_min)
    }

    fn desired_first(&self, split: &SashSplit, available: u32) -> u32 {
        let axis = split.axis;
        let first = self.nodes.get(&split.first);
        let second = self.nodes.get(&split.second);
        let first_placed = first.is_some_and(|record| is_placed(record.rect));
        let second_placed = second.is_some_and(|record| is_placed(record.rect));
        let first_extent = first.map_or(0, |record| axis.extent(record.rect));
        let second_extent = second.map_or(0, |record| axis.extent(record.rect));

        // A child squeezed to zero along the axis still keeps its share.
        let total = u64::from(first_extent) + u64::from(second_extent);
        if first_placed && second_placed && total > 0 {
            return (u64::from(available) * u64::from(first_extent) / total) as u32;
        }

        let first_hint = first.and_then(|record| record.size);
        let second_hint = second.and_then(|record| record.size);
        let from_first = |hint: SashSize| hint.resolve(available);
        let from_second = |hint: SashSize| available - hint.resolve(available);

        // A child that has never been laid out was just inserted; its hint wins.
        let prefer_second = first_placed && !second_placed;
        let chosen = if prefer_second {
            second_hint.map(from_second).or(first_hint.map(from_first))
        } else {
            first_hint.map(from_first).or(second_hint.map(from_second))
        };
        chosen.unwrap_or(available / 2)
    }
}

/// Whether a node has been through a layout pass. Fresh records carry an
/// all-zero rect; a laid-out node always spans its parent's cross axis.
fn is_placed(rect: Rect) -> bool {
    rect.width > 0 || rect.height > 0
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ops::PaneSpec;
    use crate::sash::{SashPosition, SashStore};
    use tracing_test::traced_test;

    fn rect_of(tree: &SashTree, id: SashId) -> Rect {
        tree.get_by_id(id).map(|record| record.rect).expect("sash exists")
    }

    fn assert_tiles(tree: &SashTree) {
        let container = tree.container();
        let leaves = tree.leaves();
        let total: u64 = leaves.iter().map(|id| rect_of(tree, *id).area()).sum();
        assert_eq!(total, container.area(), "leaf areas must sum to container");
        for (index, a) in leaves.iter().enumerate() {
            let a_rect = rect_of(tree, *a);
            assert!(container.contains_rect(&a_rect), "{a} escapes container");
            for b in &leaves[index + 1..] {
                assert_eq!(a_rect.intersection_area(&rect_of(tree, *b)), 0);
            }
        }
    }

    #[test]
    fn distribute_clamps_into_minimums() {
        assert_eq!(
            distribute(800, 750, 100, 100),
            Division {
                first: 700,
                second: 100,
                overflow: false
            }
        );
        assert_eq!(
            distribute(800, 10, 100, 100),
            Division {
                first: 100,
                second: 700,
                overflow: false
            }
        );
        assert_eq!(
            distribute(150, 75, 100, 100),
            Division {
                first: 100,
                second: 100,
                overflow: true
            }
        );
    }

    #[test]
    fn even_split_without_hints() {
        let mut tree = SashTree::new(801, 600, SashStore::default()).expect("tree");
        let left = tree.root();
        let right = tree
            .add_pane(left, PaneSpec::new(SashStore::default()), SashPosition::Right)
            .expect("split");
        assert_eq!(rect_of(&tree, left), Rect::new(0, 0, 400, 600));
        assert_eq!(rect_of(&tree, right), Rect::new(400, 0, 401, 600));
        assert_tiles(&tree);
    }

    #[test]
    fn share_hint_applies_to_leading_child() {
        let mut tree = SashTree::new(800, 600, SashStore::default()).expect("tree");
        let bottom = tree.root();
        let top = tree
            .add_pane(
                bottom,
                PaneSpec::new(SashStore::default()).with_size(SashSize::fraction(0.25)),
                SashPosition::Top,
            )
            .expect("split");
        assert_eq!(rect_of(&tree, top), Rect::new(0, 0, 800, 150));
        assert_eq!(rect_of(&tree, bottom), Rect::new(0, 150, 800, 450));
    }

    #[test]
    fn resize_preserves_ratio() {
        let mut tree = SashTree::new(800, 600, SashStore::default()).expect("tree");
        let left = tree.root();
        let right = tree
            .add_pane(
                left,
                PaneSpec::new(SashStore::default()).with_size(SashSize::Pixels(200)),
                SashPosition::Right,
            )
            .expect("split");
        tree.resize(1600, 300).expect("resize");
        assert_eq!(rect_of(&tree, left), Rect::new(0, 0, 1200, 300));
        assert_eq!(rect_of(&tree, right), Rect::new(1200, 0, 400, 300));
        assert!(!tree.is_overflowing());
        assert_tiles(&tree);
    }

    #[test]
    fn resize_keeps_a_collapsed_pane_collapsed() {
        let mut tree = SashTree::new(800, 600, SashStore::default()).expect("tree");
        let left = tree.root();
        let right = tree
            .add_pane(
                left,
                PaneSpec::new(SashStore::default()).with_size(SashSize::Pixels(300)),
                SashPosition::Right,
            )
            .expect("split");
        tree.set_min_size(left, 0, 50).expect("zero floor");
        tree.resize_divider(left, right, -1_000).expect("collapse left");
        assert_eq!(rect_of(&tree, left), Rect::new(0, 0, 0, 600));
        assert_eq!(rect_of(&tree, right), Rect::new(0, 0, 800, 600));

        tree.resize(1600, 600).expect("grow");
        assert_eq!(rect_of(&tree, left), Rect::new(0, 0, 0, 600));
        assert_eq!(rect_of(&tree, right), Rect::new(0, 0, 1600, 600));
        assert_tiles(&tree);

        tree.resize_divider(left, right, 400).expect("reopen");
        tree.resize(800, 600).expect("shrink");
        assert_eq!(rect_of(&tree, left), Rect::new(0, 0, 200, 600));
        assert_eq!(rect_of(&tree, right), Rect::new(200, 0, 600, 600));
    }

    #[test]
    fn resize_rejects_zero_extent_without_touching_tree() {
        let mut tree = SashTree::new(800, 600, SashStore::default()).expect("tree");
        let before = tree.state_hash();
        assert!(matches!(
            tree.resize(800, 0),
            Err(SashError::InvalidGeometry { .. })
        ));
        assert_eq!(tree.state_hash(), before);
    }

    #[test]
    fn resize_to_exact_minimums_gives_exact_minimums() {
        let mut tree = SashTree::new(800, 600, SashStore::default()).expect("tree");
        let left = tree.root();
        let right = tree
            .add_pane(left, PaneSpec::new(SashStore::default()), SashPosition::Right)
            .expect("split");
        tree.resize(100, 50).expect("resize to minimums");
        assert_eq!(rect_of(&tree, left), Rect::new(0, 0, 50, 50));
        assert_eq!(rect_of(&tree, right), Rect::new(50, 0, 50, 50));
        assert!(!tree.is_overflowing());
    }

    #[test]
    #[traced_test]
    fn shrinking_below_minimums_overflows_without_negative_sizes() {
        let mut tree = SashTree::new(800, 600, SashStore::default()).expect("tree");
        let left = tree.root();
        let right = tree
            .add_pane(left, PaneSpec::new(SashStore::default()), SashPosition::Right)
            .expect("split");
        tree.resize(60, 20).expect("resize below minimums");
        assert_eq!(rect_of(&tree, left), Rect::new(0, 0, 50, 50));
        assert_eq!(rect_of(&tree, right), Rect::new(50, 0, 50, 50));
        assert!(tree.is_overflowing());
        assert!(logs_contain("layout overflows"));

        tree.resize(800, 600).expect("grow back");
        assert!(!tree.is_overflowing());
        assert_tiles(&tree);
    }

    #[test]
    fn nested_layout_tiles_container() {
        let mut tree = SashTree::new(1024, 768, SashStore::default()).expect("tree");
        let mut targets = vec![tree.root()];
        for round in 0..12 {
            let target = targets[round % targets.len()];
            let position = [
                SashPosition::Right,
                SashPosition::Bottom,
                SashPosition::Left,
                SashPosition::Top,
            ][round % 4];
            let id = tree
                .add_pane(target, PaneSpec::new(SashStore::default()).with_min_size(10, 10), position)
                .expect("split");
            targets.push(id);
        }
        assert_tiles(&tree);
        tree.resize(1999, 1001).expect("resize");
        assert_tiles(&tree);
    }
}
