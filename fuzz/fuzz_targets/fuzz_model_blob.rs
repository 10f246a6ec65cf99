//! Fuzz target: learned-model blob
//!
//! Stores arbitrary bytes as the model and, when they decode, runs the
//! model on a fuzz-derived feature vector:
//! - No panics on any blob or input
//! - A model that loads either fails cleanly or scores within [0, 1]
//!
//! cargo fuzz run fuzz_model_blob

#![no_main]

use envnode::adapters::model::LogisticModel;
use envnode::adapters::nvs::NvsAdapter;
use envnode::app::ports::StoragePort;
use envnode::inference::RiskClassifier;
use envnode::reading::{FeatureVector, FEATURE_COUNT};
use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &[u8]| {
    let mut nvs = NvsAdapter::unavailable();
    if nvs.write("model", "risk_v1", data).is_err() {
        return;
    }
    let Ok(model) = LogisticModel::load(&nvs) else {
        return;
    };

    // Reuse the tail of the blob as feature input.
    let mut features = [0.0f32; FEATURE_COUNT];
    for (slot, chunk) in features.iter_mut().zip(data.rchunks_exact(4)) {
        *slot = f32::from_le_bytes([chunk[0], chunk[1], chunk[2], chunk[3]]);
    }

    let mut classifier = RiskClassifier::Learned(model);
    if let Ok(a) = classifier.classify(&FeatureVector(features)) {
        assert!(
            (0.0..=1.0).contains(&a.environmental_risk),
            "risk {} out of range",
            a.environmental_risk
        );
    }
});
