//! Property-based tests for the grid expander using proptest.

use proptest::prelude::*;
use std::collections::HashSet;

use trellis_core::grid::{CallbackSpec, InputShape, OptimizerKind, RunConfig, SearchSpace};

fn space(shapes: usize, classes: usize, optimizers: usize, epochs: usize, callbacks: usize) -> SearchSpace {
    SearchSpace {
        input_shape: (0..shapes)
            .map(|i| InputShape {
                height: 8 + i as u32,
                width: 8,
                channels: 3,
            })
            .collect(),
        num_classes: (0..classes).map(|i| i + 2).collect(),
        optimizer: (0..optimizers)
            .map(|i| OptimizerKind::sgd(0.01 * (i + 1) as f32))
            .collect(),
        epochs: (0..epochs).map(|i| i + 1).collect(),
        callbacks: (0..callbacks)
            .map(|i| {
                vec![CallbackSpec::EarlyStopping {
                    patience: i + 1,
                    min_delta: 0.0,
                }]
            })
            .collect(),
    }
}

fn key(config: &RunConfig) -> String {
    serde_json::to_string(config).expect("configs serialize")
}

proptest! {
    #[test]
    fn expansion_len_matches_cardinality(
        a in 0usize..4,
        b in 0usize..4,
        c in 0usize..4,
        d in 0usize..4,
        e in 1usize..3,
    ) {
        let space = space(a, b, c, d, e);
        let expanded: Vec<RunConfig> = space.configurations().collect();
        prop_assert_eq!(expanded.len(), space.cardinality());
        prop_assert_eq!(space.cardinality(), a * b * c * d * e);
    }

    #[test]
    fn every_configuration_is_unique(
        a in 1usize..4,
        b in 1usize..4,
        c in 1usize..4,
        d in 1usize..4,
    ) {
        let space = space(a, b, c, d, 1);
        let keys: HashSet<String> = space.configurations().map(|c| key(&c)).collect();
        prop_assert_eq!(keys.len(), space.cardinality());
    }

    #[test]
    fn expansion_order_is_deterministic(
        a in 1usize..4,
        b in 1usize..4,
        c in 1usize..4,
        d in 1usize..4,
    ) {
        let space = space(a, b, c, d, 2);
        let first: Vec<RunConfig> = space.configurations().collect();
        let second: Vec<RunConfig> = space.configurations().collect();
        prop_assert_eq!(first, second);
    }

    #[test]
    fn any_empty_axis_empties_the_product(axis in 0usize..5) {
        let mut space = space(2, 2, 2, 2, 2);
        match axis {
            0 => space.input_shape.clear(),
            1 => space.num_classes.clear(),
            2 => space.optimizer.clear(),
            3 => space.epochs.clear(),
            _ => space.callbacks.clear(),
        }
        prop_assert_eq!(space.cardinality(), 0);
        prop_assert_eq!(space.configurations().count(), 0);
    }
}
