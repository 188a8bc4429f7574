//! Property tests for the prediction contract and its report

use cipherguess_core::{PredictionReport, PredictionResult};
use proptest::prelude::*;
use serde_json::{json, Map, Value};
use std::collections::BTreeMap;

fn distribution() -> impl Strategy<Value = BTreeMap<String, u32>> {
    prop::collection::btree_map("[A-Z][a-z]{2,10}", 0u32..=100, 0..8)
}

proptest! {
    #[test]
    fn report_distribution_is_sorted_and_totalled(probs in distribution(), confidence in 0u32..=100) {
        let probabilities: Map<String, Value> = probs
            .iter()
            .map(|(name, p)| (name.clone(), json!(p)))
            .collect();
        let result = PredictionResult::from_value(json!({
            "algorithm": "Caesar",
            "confidence": f64::from(confidence) / 100.0,
            "algorithm_probabilities": probabilities,
        }))
        .unwrap();

        let report = PredictionReport::new(&result);

        prop_assert_eq!(report.distribution.len(), probs.len());
        for pair in report.distribution.windows(2) {
            prop_assert!(pair[0].percent >= pair[1].percent);
        }
        let expected: u32 = probs.values().sum();
        prop_assert_eq!(report.total_percent, f64::from(expected));
    }

    #[test]
    fn omitted_features_stay_omitted(
        length in prop::option::of(0u64..10_000),
        entropy in prop::option::of(0u32..800),
    ) {
        let mut features = Map::new();
        if let Some(length) = length {
            features.insert("length".to_string(), json!(length));
        }
        if let Some(entropy) = entropy {
            features.insert("entropy".to_string(), json!(f64::from(entropy) / 100.0));
        }
        let payload = json!({
            "algorithm": "Modern",
            "confidence": 0.5,
            "features": features,
        });

        let result = PredictionResult::from_value(payload.clone()).unwrap();
        prop_assert_eq!(serde_json::to_value(&result).unwrap(), payload);
    }
}
