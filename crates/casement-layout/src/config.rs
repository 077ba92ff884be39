//! Declarative layout descriptions.
//!
//! A [`LayoutConfig`] is the JSON-friendly form of a tree: a container size
//! plus a nested [`SashSpec`]. [`SashTree::from_config`] turns it into a
//! live tree and [`SashTree::to_config`] exports one back, recording every
//! child's current extent so the export rebuilds the same geometry.
//!
//! ```json
//! {
//!   "width": 800,
//!   "height": 600,
//!   "root": {
//!     "children": [
//!       { "position": "left", "store": { "title": "Editor" } },
//!       { "position": "right", "size": { "pixels": 300 }, "store": { "title": "Preview" } }
//!     ]
//!   }
//! }
//! ```

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use tracing::debug_span;

use casement_core::geometry::Rect;

use crate::error::SashError;
use crate::sash::{
    DEFAULT_MIN_HEIGHT, DEFAULT_MIN_WIDTH, SashId, SashNodeKind, SashPosition, SashRecord,
    SashSize, SashSplit, SashStore,
};
use crate::tree::{SashTree, check_extent};

const fn default_min_width() -> u32 {
    DEFAULT_MIN_WIDTH
}

const fn default_min_height() -> u32 {
    DEFAULT_MIN_HEIGHT
}

/// Container size, leaf defaults and the tree description.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LayoutConfig {
    pub width: u32,
    pub height: u32,
    /// Leaf width floor used when a spec does not set `min_width`.
    #[serde(default = "default_min_width")]
    pub default_min_width: u32,
    /// Leaf height floor used when a spec does not set `min_height`.
    #[serde(default = "default_min_height")]
    pub default_min_height: u32,
    #[serde(default)]
    pub root: SashSpec,
}

impl LayoutConfig {
    /// Single empty pane filling `width` x `height`.
    #[must_use]
    pub fn new(width: u32, height: u32) -> Self {
        Self {
            width,
            height,
            default_min_width: DEFAULT_MIN_WIDTH,
            default_min_height: DEFAULT_MIN_HEIGHT,
            root: SashSpec::default(),
        }
    }

    #[must_use]
    pub fn with_root(mut self, root: SashSpec) -> Self {
        self.root = root;
        self
    }

    pub fn from_json(json: &str) -> Result<Self, ConfigError> {
        Ok(serde_json::from_str(json)?)
    }

    pub fn to_json(&self) -> Result<String, ConfigError> {
        Ok(serde_json::to_string_pretty(self)?)
    }
}

/// One node of a declarative layout. Leaves have no children, splits have
/// exactly two whose positions are complementary. Only leaves carry a store,
/// and the root takes no size hint.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct SashSpec {
    #[serde(default)]
    pub position: SashPosition,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub size: Option<SashSize>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub min_width: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub min_height: Option<u32>,
    #[serde(default)]
    pub store: SashStore,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub children: Vec<SashSpec>,
}

impl SashSpec {
    #[must_use]
    pub fn leaf(position: SashPosition, store: SashStore) -> Self {
        Self {
            position,
            store,
            ..Self::default()
        }
    }

    #[must_use]
    pub fn split(position: SashPosition, first: SashSpec, second: SashSpec) -> Self {
        Self {
            position,
            children: vec![first, second],
            ..Self::default()
        }
    }

    #[must_use]
    pub fn with_size(mut self, size: SashSize) -> Self {
        self.size = Some(size);
        self
    }

    #[must_use]
    pub fn with_min_size(mut self, width: u32, height: u32) -> Self {
        self.min_width = Some(width);
        self.min_height = Some(height);
        self
    }
}

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("malformed layout json: {0}")]
    Parse(#[from] serde_json::Error),
    #[error(transparent)]
    Layout(#[from] SashError),
}

impl SashTree {
    /// Build and lay out a tree from a declarative description.
    pub fn from_config(config: &LayoutConfig) -> Result<Self, SashError> {
        let _span = debug_span!("sash.from_config", width = config.width, height = config.height)
            .entered();
        check_extent(config.width, config.height)?;
        if config.root.position != SashPosition::Root {
            return Err(SashError::InvalidPosition {
                position: config.root.position,
                reason: "the root spec must use the root position",
            });
        }
        if config.root.size.is_some() {
            return Err(SashError::InvalidConfig {
                reason: "the root fills the container and takes no size hint".into(),
            });
        }

        let mut tree = Self {
            root: SashId::MIN,
            next_id: SashId::MIN,
            container: Rect::from_size(config.width, config.height),
            nodes: BTreeMap::new(),
        };
        let root = tree.allocate_id()?;
        tree.root = root;

        let mut pending = vec![(&config.root, root, None::<SashId>)];
        while let Some((spec, id, parent)) = pending.pop() {
            let mut record = match spec.children.as_slice() {
                [] => {
                    let mut leaf = SashRecord::leaf(id, parent, spec.position, spec.store.clone());
                    leaf.min_width = spec.min_width.unwrap_or(config.default_min_width);
                    leaf.min_height = spec.min_height.unwrap_or(config.default_min_height);
                    leaf
                }
                [a, b] => {
                    if spec.store != SashStore::default() {
                        return Err(SashError::InvalidConfig {
                            reason: format!(
                                "split at {:?} carries a store; only leaves hold pane data",
                                spec.position
                            ),
                        });
                    }
                    let Some(axis) = a.position.axis() else {
                        return Err(SashError::InvalidPosition {
                            position: a.position,
                            reason: "split children must be left/right or top/bottom",
                        });
                    };
                    if a.position.complement() != Some(b.position) {
                        return Err(SashError::InvalidPosition {
                            position: b.position,
                            reason: "split children must have complementary positions",
                        });
                    }
                    let (leading, trailing) = if a.position.is_leading() { (a, b) } else { (b, a) };
                    let first = tree.allocate_id()?;
                    let second = tree.allocate_id()?;
                    pending.push((trailing, second, Some(id)));
                    pending.push((leading, first, Some(id)));
                    let mut split = SashRecord::split(
                        id,
                        parent,
                        spec.position,
                        SashSplit {
                            axis,
                            first,
                            second,
                        },
                    );
                    split.min_width = spec.min_width.unwrap_or(0);
                    split.min_height = spec.min_height.unwrap_or(0);
                    split
                }
                other => {
                    return Err(SashError::InvalidConfig {
                        reason: format!(
                            "a sash has 0 or 2 children, found {} at {:?}",
                            other.len(),
                            spec.position
                        ),
                    });
                }
            };
            record.size = spec.size;
            let _ = tree.nodes.insert(id, record);
        }

        tree.validate()?;
        tree.layout_all();
        Ok(tree)
    }

    /// Export the current tree, pinning every child to its current extent.
    #[must_use]
    pub fn to_config(&self) -> LayoutConfig {
        LayoutConfig {
            width: self.container.width,
            height: self.container.height,
            default_min_width: DEFAULT_MIN_WIDTH,
            default_min_height: DEFAULT_MIN_HEIGHT,
            root: self.export_spec(self.root),
        }
    }

    fn export_spec(&self, root: SashId) -> SashSpec {
        // Post-order so every child spec exists before its parent.
        let mut order = Vec::new();
        let mut stack = vec![root];
        while let Some(id) = stack.pop() {
            if let Some(record) = self.nodes.get(&id) {
                order.push(id);
                stack.extend(record.children());
            }
        }

        let mut built: BTreeMap<SashId, SashSpec> = BTreeMap::new();
        for id in order.into_iter().rev() {
            let Some(record) = self.nodes.get(&id) else {
                continue;
            };
            let size = record
                .position
                .axis()
                .map(|axis| SashSize::Pixels(axis.extent(record.rect)));
            let mut spec = SashSpec {
                position: record.position,
                size,
                min_width: Some(record.min_width),
                min_height: Some(record.min_height),
                store: SashStore::default(),
                children: Vec::new(),
            };
            match &record.kind {
                SashNodeKind::Leaf(leaf) => spec.store = leaf.store.clone(),
                SashNodeKind::Split(split) => {
                    spec.children = split
                        .children()
                        .iter()
                        .filter_map(|child| built.remove(child))
                        .collect();
                }
            }
            let _ = built.insert(id, spec);
        }
        built.remove(&root).unwrap_or_default()
    }
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;

    const EDITOR_LAYOUT: &str = r#"{
        "width": 800,
        "height": 600,
        "root": {
            "children": [
                {
                    "position": "left",
                    "children": [
                        { "position": "top", "store": { "title": "Editor" } },
                        { "position": "bottom", "size": { "pixels": 200 }, "store": { "title": "Terminal" } }
                    ]
                },
                { "position": "right", "size": { "pixels": 300 }, "store": { "title": "Preview" } }
            ]
        }
    }"#;

    fn leaf_layout(tree: &SashTree) -> Vec<(Option<String>, Rect)> {
        tree.leaves()
            .into_iter()
            .filter_map(|id| tree.get_by_id(id))
            .map(|record| {
                (
                    record.store().and_then(|store| store.title.clone()),
                    record.rect,
                )
            })
            .collect()
    }

    #[test]
    fn json_layout_builds_expected_geometry() {
        let config = LayoutConfig::from_json(EDITOR_LAYOUT).expect("parse layout");
        assert_eq!(config.default_min_width, DEFAULT_MIN_WIDTH);
        let tree = SashTree::from_config(&config).expect("build tree");
        assert_eq!(
            leaf_layout(&tree),
            vec![
                (Some("Editor".to_string()), Rect::new(0, 0, 500, 400)),
                (Some("Terminal".to_string()), Rect::new(0, 400, 500, 200)),
                (Some("Preview".to_string()), Rect::new(500, 0, 300, 600)),
            ]
        );
        assert!(tree.validate().is_ok());
    }

    #[test]
    fn export_rebuilds_identical_leaves() {
        let config = LayoutConfig::from_json(EDITOR_LAYOUT).expect("parse layout");
        let mut tree = SashTree::from_config(&config).expect("build tree");
        tree.resize(1000, 700).expect("resize");
        let exported = tree.to_config();
        let json = exported.to_json().expect("serialize");
        let rebuilt =
            SashTree::from_config(&LayoutConfig::from_json(&json).expect("reparse")).expect("rebuild");
        assert_eq!(leaf_layout(&rebuilt), leaf_layout(&tree));
    }

    #[test]
    fn listing_order_of_children_does_not_matter() {
        let spec = SashSpec::split(
            SashPosition::Root,
            SashSpec::leaf(SashPosition::Bottom, SashStore::titled("low")),
            SashSpec::leaf(SashPosition::Top, SashStore::titled("high")),
        );
        let tree =
            SashTree::from_config(&LayoutConfig::new(100, 200).with_root(spec)).expect("build");
        let titles: Vec<_> = leaf_layout(&tree).into_iter().map(|(title, _)| title).collect();
        assert_eq!(
            titles,
            vec![Some("high".to_string()), Some("low".to_string())]
        );
    }

    #[test]
    fn malformed_configs_are_rejected() {
        let one_child = SashSpec {
            children: vec![SashSpec::leaf(SashPosition::Left, SashStore::default())],
            ..SashSpec::default()
        };
        assert!(matches!(
            SashTree::from_config(&LayoutConfig::new(100, 100).with_root(one_child)),
            Err(SashError::InvalidConfig { .. })
        ));

        let mismatched = SashSpec::split(
            SashPosition::Root,
            SashSpec::leaf(SashPosition::Left, SashStore::default()),
            SashSpec::leaf(SashPosition::Bottom, SashStore::default()),
        );
        assert!(matches!(
            SashTree::from_config(&LayoutConfig::new(100, 100).with_root(mismatched)),
            Err(SashError::InvalidPosition { .. })
        ));

        let rooted_child = SashSpec::split(
            SashPosition::Root,
            SashSpec::leaf(SashPosition::Root, SashStore::default()),
            SashSpec::leaf(SashPosition::Right, SashStore::default()),
        );
        assert!(matches!(
            SashTree::from_config(&LayoutConfig::new(100, 100).with_root(rooted_child)),
            Err(SashError::InvalidPosition { .. })
        ));

        assert!(matches!(
            SashTree::from_config(&LayoutConfig::new(0, 100)),
            Err(SashError::InvalidGeometry { .. })
        ));
    }

    #[test]
    fn split_stores_and_root_sizes_are_rejected() {
        let json = r#"{
            "width": 400,
            "height": 300,
            "root": {
                "store": { "title": "lost" },
                "children": [
                    { "position": "left" },
                    { "position": "right" }
                ]
            }
        }"#;
        let config = LayoutConfig::from_json(json).expect("parse layout");
        assert!(matches!(
            SashTree::from_config(&config),
            Err(SashError::InvalidConfig { .. })
        ));

        let sized_root = SashSpec::leaf(SashPosition::Root, SashStore::titled("solo"))
            .with_size(SashSize::Pixels(200));
        assert!(matches!(
            SashTree::from_config(&LayoutConfig::new(400, 300).with_root(sized_root)),
            Err(SashError::InvalidConfig { .. })
        ));

        let editor = LayoutConfig::from_json(EDITOR_LAYOUT).expect("parse layout");
        let exported = SashTree::from_config(&editor).expect("layout").to_config();
        assert!(SashTree::from_config(&exported).is_ok());
    }

    #[test]
    fn bad_json_is_a_parse_error() {
        assert!(matches!(
            LayoutConfig::from_json(r#"{"width": "wide"}"#),
            Err(ConfigError::Parse(_))
        ));
    }
}
