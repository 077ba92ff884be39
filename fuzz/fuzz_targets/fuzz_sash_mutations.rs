#![no_main]

use arbitrary::Arbitrary;
use casement_layout::{PaneSpec, SashId, SashPosition, SashSize, SashStore, SashTree};
use libfuzzer_sys::fuzz_target;

#[derive(Debug, Arbitrary)]
enum Op {
    Add {
        target: u8,
        position: u8,
        pixels: Option<u16>,
    },
    Remove {
        pane: u8,
    },
    Swap {
        first: u8,
        second: u8,
    },
    Move {
        pane: u8,
        target: u8,
        position: u8,
    },
    Drag {
        pane: u8,
        delta: i16,
    },
    MinSize {
        pane: u8,
        width: u8,
        height: u8,
    },
    Minimize {
        pane: u8,
    },
    Restore,
    Resize {
        width: u16,
        height: u16,
    },
}

#[derive(Debug, Arbitrary)]
struct Input {
    width: u16,
    height: u16,
    ops: Vec<Op>,
}

fn position(raw: u8) -> SashPosition {
    match raw % 4 {
        0 => SashPosition::Left,
        1 => SashPosition::Right,
        2 => SashPosition::Top,
        _ => SashPosition::Bottom,
    }
}

fn pick(tree: &SashTree, raw: u8) -> SashId {
    let leaves = tree.leaves();
    leaves[usize::from(raw) % leaves.len()]
}

fuzz_target!(|input: Input| {
    let width = u32::from(input.width.max(1));
    let height = u32::from(input.height.max(1));
    let Ok(mut tree) = SashTree::new(width, height, SashStore::titled("root")) else {
        return;
    };
    let mut minimized = Vec::new();

    for op in input.ops.into_iter().take(256) {
        let before = tree.state_hash();
        let result = match op {
            Op::Add {
                target,
                position: raw,
                pixels,
            } => {
                let mut spec = PaneSpec::new(SashStore::default());
                spec.size = pixels.map(|pixels| SashSize::Pixels(u32::from(pixels)));
                tree.add_pane(pick(&tree, target), spec, position(raw))
                    .map(|_| ())
            }
            Op::Remove { pane } => tree.remove_pane(pick(&tree, pane)).map(|_| ()),
            Op::Swap { first, second } => {
                tree.swap_panes(pick(&tree, first), pick(&tree, second))
            }
            Op::Move {
                pane,
                target,
                position: raw,
            } => tree.move_pane(pick(&tree, pane), pick(&tree, target), position(raw), None),
            Op::Drag { pane, delta } => {
                let pane = pick(&tree, pane);
                match tree.sibling(pane) {
                    Some(sibling) => tree
                        .resize_divider(pane, sibling, i64::from(delta))
                        .map(|_| ()),
                    None => Ok(()),
                }
            }
            Op::MinSize {
                pane,
                width,
                height,
            } => tree.set_min_size(pick(&tree, pane), u32::from(width), u32::from(height)),
            Op::Minimize { pane } => tree.minimize(pick(&tree, pane)).map(|record| {
                minimized.push(record);
            }),
            Op::Restore => match minimized.pop() {
                Some(record) => tree.restore(&record).map(|_| ()),
                None => Ok(()),
            },
            Op::Resize { width, height } => {
                tree.resize(u32::from(width), u32::from(height))
            }
        };

        // Rejected operations must leave the tree untouched.
        if result.is_err() {
            assert_eq!(tree.state_hash(), before, "failed op mutated the tree");
        }
        assert!(tree.validate().is_ok(), "tree invariants broken");
        check_tiling(&tree);
    }
});

fn check_tiling(tree: &SashTree) {
    if tree.is_overflowing() {
        return;
    }
    let container = tree.container();
    let mut covered = 0u64;
    for id in tree.leaves() {
        let Some(record) = tree.get_by_id(id) else {
            panic!("leaf {id} vanished");
        };
        assert!(container.contains_rect(&record.rect), "leaf escapes container");
        assert!(record.rect.width >= record.min_width);
        assert!(record.rect.height >= record.min_height);
        covered += record.rect.area();
    }
    assert_eq!(covered, container.area(), "leaves do not tile the container");

    let root_min = tree.min_size(tree.root()).expect("root minimum");
    assert!(container.width >= root_min.width && container.height >= root_min.height);
}
