#![no_main]

use casement_layout::{LayoutConfig, SashTree};
use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &[u8]| {
    let Ok(json) = std::str::from_utf8(data) else {
        return;
    };
    let Ok(config) = LayoutConfig::from_json(json) else {
        return;
    };
    // Keep the container bounded so deep configs stay cheap.
    if config.width > 16_384 || config.height > 16_384 {
        return;
    }
    let Ok(tree) = SashTree::from_config(&config) else {
        return;
    };

    assert!(tree.validate().is_ok(), "config produced an invalid tree");

    // Exported layouts must rebuild to the same leaf geometry.
    let rebuilt = SashTree::from_config(&tree.to_config()).expect("export rebuilds");
    let rects = |tree: &SashTree| -> Vec<_> {
        tree.leaves()
            .into_iter()
            .filter_map(|id| tree.get_by_id(id).map(|record| record.rect))
            .collect()
    };
    if !tree.is_overflowing() {
        assert_eq!(rects(&rebuilt), rects(&tree), "export changed geometry");
    }
});
