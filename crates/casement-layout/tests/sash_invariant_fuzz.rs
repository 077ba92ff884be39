//! Property/fuzz-style invariants for sash tree operations.
//!
//! Random operation streams are driven through the public `SashTree` API.
//! After every mutation the tree must validate, minimums must match a
//! from-scratch recomputation, and (whenever the container is large enough)
//! the leaves must tile the container exactly. Replaying the same stream
//! must reproduce the same state hash.

use casement_layout::{
    MinSize, PaneSpec, Rect, SashId, SashNodeKind, SashOperation, SashPosition, SashSize,
    SashStore, SashTree, SplitAxis,
};
use proptest::prelude::*;

#[derive(Debug, Clone)]
struct Lcg {
    state: u64,
}

impl Lcg {
    fn new(seed: u64) -> Self {
        Self {
            state: seed ^ 0x9E37_79B9_7F4A_7C15,
        }
    }

    fn next_u64(&mut self) -> u64 {
        self.state = self.state.wrapping_mul(6364136223846793005).wrapping_add(1);
        self.state
    }

    fn next_u32_range(&mut self, min: u32, max: u32) -> u32 {
        debug_assert!(min <= max);
        if min == max {
            return min;
        }
        let span = u64::from(max - min + 1);
        min + (self.next_u64() % span) as u32
    }

    fn choose_index(&mut self, len: usize) -> usize {
        debug_assert!(len > 0);
        (self.next_u64() % len as u64) as usize
    }

    fn choose_bool(&mut self) -> bool {
        (self.next_u64() & 1) == 0
    }
}

const POSITIONS: [SashPosition; 4] = [
    SashPosition::Left,
    SashPosition::Right,
    SashPosition::Top,
    SashPosition::Bottom,
];

fn random_position(rng: &mut Lcg) -> SashPosition {
    POSITIONS[rng.choose_index(POSITIONS.len())]
}

fn random_size(rng: &mut Lcg) -> Option<SashSize> {
    match rng.next_u32_range(0, 2) {
        0 => None,
        1 => Some(SashSize::Pixels(rng.next_u32_range(1, 400))),
        _ => Some(SashSize::Share(rng.next_u32_range(1, 9_999) as u16)),
    }
}

fn two_distinct(rng: &mut Lcg, len: usize) -> (usize, usize) {
    let first = rng.choose_index(len);
    let mut second = rng.choose_index(len);
    while second == first {
        second = rng.choose_index(len);
    }
    (first, second)
}

fn random_operation(tree: &SashTree, rng: &mut Lcg, sequence: usize) -> SashOperation {
    let leaves = tree.leaves();

    let mut candidates = vec![0usize, 1, 6]; // AddPane, SetMinSize, Resize
    if leaves.len() > 1 {
        candidates.push(2); // RemovePane
        candidates.push(3); // SwapPanes
        candidates.push(5); // ResizeDivider
    }
    if leaves.len() > 2 {
        candidates.push(4); // MovePane
    }

    match candidates[rng.choose_index(candidates.len())] {
        0 => {
            let target = leaves[rng.choose_index(leaves.len())];
            let mut spec = PaneSpec::new(SashStore::titled(format!("pane-{sequence}")));
            spec.size = random_size(rng);
            SashOperation::AddPane {
                target,
                spec,
                position: random_position(rng),
            }
        }
        1 => {
            let id = leaves[rng.choose_index(leaves.len())];
            SashOperation::SetMinSize {
                id,
                width: rng.next_u32_range(10, 80),
                height: rng.next_u32_range(10, 80),
            }
        }
        2 => SashOperation::RemovePane {
            id: leaves[rng.choose_index(leaves.len())],
        },
        3 => {
            let (first, second) = two_distinct(rng, leaves.len());
            SashOperation::SwapPanes {
                first: leaves[first],
                second: leaves[second],
            }
        }
        4 => {
            let (id, target) = two_distinct(rng, leaves.len());
            SashOperation::MovePane {
                id: leaves[id],
                target: leaves[target],
                position: random_position(rng),
                size: random_size(rng),
            }
        }
        5 => {
            let first = leaves[rng.choose_index(leaves.len())];
            let second = tree.sibling(first).expect("non-root leaf has a sibling");
            let magnitude = i64::from(rng.next_u32_range(0, 300));
            SashOperation::ResizeDivider {
                first,
                second,
                delta: if rng.choose_bool() { magnitude } else { -magnitude },
            }
        }
        _ => SashOperation::Resize {
            width: rng.next_u32_range(200, 2_400),
            height: rng.next_u32_range(200, 1_600),
        },
    }
}

/// Independent recursive minimum computation.
fn expected_min(tree: &SashTree, id: SashId) -> MinSize {
    let record = tree.get_by_id(id).expect("node exists");
    match &record.kind {
        SashNodeKind::Leaf(_) => MinSize {
            width: record.min_width,
            height: record.min_height,
        },
        SashNodeKind::Split(split) => {
            let a = expected_min(tree, split.first);
            let b = expected_min(tree, split.second);
            let (width, height) = match split.axis {
                SplitAxis::Horizontal => (a.width + b.width, a.height.max(b.height)),
                SplitAxis::Vertical => (a.width.max(b.width), a.height + b.height),
            };
            MinSize {
                width: width.max(record.min_width),
                height: height.max(record.min_height),
            }
        }
    }
}

fn leaf_rect(tree: &SashTree, id: SashId) -> Rect {
    tree.get_by_id(id).map(|record| record.rect).expect("leaf exists")
}

fn assert_tree_invariants(tree: &SashTree) {
    tree.validate()
        .expect("tree should remain structurally valid");

    for record in tree.nodes() {
        assert_eq!(record.children().len() % 2, 0);
        assert_eq!(
            tree.min_size(record.id),
            Ok(expected_min(tree, record.id)),
            "computed minimum of {} drifted",
            record.id
        );
    }

    let container = tree.container();
    let root_min = tree.min_size(tree.root()).expect("root exists");
    let fits = container.width >= root_min.width && container.height >= root_min.height;
    assert_eq!(
        tree.is_overflowing(),
        !fits,
        "overflow flag must match whether minimums fit"
    );

    let leaves = tree.leaves();
    for id in &leaves {
        let record = tree.get_by_id(*id).expect("leaf exists");
        assert!(record.rect.width >= record.min_width);
        assert!(record.rect.height >= record.min_height);
    }
    if !fits {
        return;
    }

    let total: u64 = leaves.iter().map(|id| leaf_rect(tree, *id).area()).sum();
    assert_eq!(total, container.area(), "leaves must cover the container");
    for (index, a) in leaves.iter().enumerate() {
        let rect = leaf_rect(tree, *a);
        assert!(container.contains_rect(&rect), "{a} escapes {container}");
        for b in &leaves[index + 1..] {
            assert_eq!(
                rect.intersection_area(&leaf_rect(tree, *b)),
                0,
                "{a} overlaps {b}"
            );
        }
    }
}

fn fresh_tree() -> SashTree {
    SashTree::new(1_200, 900, SashStore::titled("root")).expect("root tree")
}

fn run_sequence(seed: u64, steps: usize) -> (SashTree, Vec<SashOperation>) {
    let mut tree = fresh_tree();
    let mut rng = Lcg::new(seed);
    let mut applied = Vec::with_capacity(steps);

    for step in 0..steps {
        let operation = random_operation(&tree, &mut rng, step);
        let outcome = tree.apply_operation(operation.clone());
        assert!(
            outcome.is_ok(),
            "operation failed at step {step}, seed={seed}, op={operation:?}, err={outcome:?}"
        );
        assert_tree_invariants(&tree);
        applied.push(operation);
    }

    (tree, applied)
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(48))]

    #[test]
    fn sash_tree_random_operation_sequences_preserve_invariants(
        seed in any::<u64>(),
        steps in 20usize..120,
    ) {
        let (tree, _) = run_sequence(seed, steps);
        assert_tree_invariants(&tree);
    }

    #[test]
    fn sash_tree_random_operation_sequences_replay_deterministically(
        seed in any::<u64>(),
        steps in 20usize..80,
    ) {
        let (final_tree, operations) = run_sequence(seed, steps);

        let mut replay_tree = fresh_tree();
        for operation in operations {
            replay_tree
                .apply_operation(operation)
                .expect("replay operation should succeed");
        }

        prop_assert_eq!(replay_tree.state_hash(), final_tree.state_hash());
        prop_assert_eq!(replay_tree, final_tree);
    }

    #[test]
    fn minimize_restore_returns_the_same_store(
        seed in any::<u64>(),
        steps in 5usize..40,
    ) {
        let (mut tree, _) = run_sequence(seed, steps);
        let leaves = tree.leaves();
        prop_assume!(leaves.len() >= 2);
        let mut rng = Lcg::new(seed.rotate_left(17));
        let victim = leaves[rng.choose_index(leaves.len())];
        let store = tree
            .get_by_id(victim)
            .and_then(|record| record.store().cloned())
            .expect("leaf store");
        let sibling_is_leaf = tree
            .sibling(victim)
            .and_then(|sibling| tree.is_leaf(sibling).ok())
            .unwrap_or(false);
        let before: Vec<_> = leaves.iter().map(|id| (*id, leaf_rect(&tree, *id))).collect();

        let record = tree.minimize(victim).expect("minimize");
        prop_assert!(tree.get_by_id(victim).is_none());
        assert_tree_invariants(&tree);

        let outcome = tree.restore(&record).expect("restore");
        prop_assert_eq!(outcome.id, victim);
        prop_assert_eq!(
            tree.get_by_id(victim).and_then(|record| record.store().cloned()),
            Some(store)
        );
        prop_assert_eq!(tree.leaves().len(), leaves.len());
        assert_tree_invariants(&tree);

        // With a leaf sibling the pane goes straight back where it was.
        if sibling_is_leaf && !tree.is_overflowing() {
            let after: Vec<_> = tree
                .leaves()
                .iter()
                .map(|id| (*id, leaf_rect(&tree, *id)))
                .collect();
            prop_assert_eq!(after, before);
        }
    }
}

#[test]
fn sash_tree_fuzz_seed_corpus_preserves_invariants() {
    let seeds = [
        0_u64,
        1,
        2,
        3,
        5,
        8,
        13,
        21,
        34,
        55,
        89,
        144,
        u32::MAX as u64,
        (u32::MAX as u64) + 1,
        u64::MAX - 1,
        u64::MAX,
    ];

    for seed in seeds {
        let (tree, _) = run_sequence(seed, 180);
        assert_tree_invariants(&tree);
    }
}

#[test]
fn not_found_operations_leave_tree_unchanged() {
    let (mut tree, _) = run_sequence(7, 40);
    let missing = SashId::new(u64::MAX).expect("non-zero");
    let before = tree.state_hash();
    for operation in [
        SashOperation::RemovePane { id: missing },
        SashOperation::AddPane {
            target: missing,
            spec: PaneSpec::default(),
            position: SashPosition::Left,
        },
        SashOperation::SwapPanes {
            first: tree.root(),
            second: missing,
        },
    ] {
        assert!(tree.apply_operation(operation).is_err());
        assert_eq!(tree.state_hash(), before);
    }
}
