//! Display-value heatmap over fixed time intervals
//!
//! Buckets either the finalized representatives or the pre-clustering
//! originals (per configuration) into fixed-width time slots. Empty slots
//! produce no bucket.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// One non-empty heatmap slot.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HeatmapBucket {
    pub start_seconds: u64,
    pub end_seconds: u64,
    pub average_display_value: f64,
}

/// Bucket `(time_ms, display_value)` contributions into
/// `interval_seconds`-wide slots, averaging per slot.
pub fn generate(
    items: impl IntoIterator<Item = (f64, f64)>,
    interval_seconds: u32,
) -> Vec<HeatmapBucket> {
    let interval = interval_seconds.max(1) as u64;
    let mut slots: BTreeMap<u64, (f64, u64)> = BTreeMap::new();

    for (time_ms, value) in items {
        let seconds = (time_ms / 1000.0).max(0.0) as u64;
        let index = seconds / interval;
        let slot = slots.entry(index).or_insert((0.0, 0));
        slot.0 += value;
        slot.1 += 1;
    }

    slots
        .into_iter()
        .map(|(index, (sum, count))| HeatmapBucket {
            start_seconds: index * interval,
            end_seconds: (index + 1) * interval,
            average_display_value: sum / count as f64,
        })
        .collect()
}
