// Run statistics: merge reasons, rule hits, transform counts, heatmap
use crate::heatmap::HeatmapBucket;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Why a candidate comment was merged into an open cluster.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MergeReason {
    /// Character multisets exactly equal to an existing member's
    Identical,
    /// Approximate edit distance within threshold
    EditDistance,
    /// Phonetic multiset distance within threshold
    Pinyin,
    /// Bigram cosine score above threshold
    Cosine,
}

/// Accumulator for one combining run.
///
/// Chunk-local instances are produced by the clusterer and post-processor
/// and merged by the orchestrator; the final value is read-only output.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CombineStats {
    /// Merges by exact character-multiset equality
    pub merged_identical: u64,
    /// Merges by approximate edit distance
    pub merged_edit_distance: u64,
    /// Merges by phonetic similarity
    pub merged_pinyin: u64,
    /// Merges by bigram cosine similarity
    pub merged_cosine: u64,

    /// Comments isolated by a whitelist rule
    pub whitelist_hits: u64,
    /// Comments removed by a blacklist rule
    pub blacklist_hits: u64,
    /// Comments rewritten by a forcelist rule
    pub forcelist_hits: u64,

    /// Comments removed because their source is blacklisted
    pub filtered_source: u64,
    /// Representatives dropped under density pressure
    pub dropped_density: u64,
    /// Representatives with font shrunk under density pressure
    pub shrunk: u64,
    /// Representatives enlarged for popular merges
    pub enlarged: u64,
    /// Fixed-position representatives converted to scrolling
    pub converted_scroll: u64,

    /// Comment counts per source tag, over the unfiltered input
    pub per_source: HashMap<String, u64>,
    /// Total number of input comments before any filtering
    pub original_total: u64,
    /// Display-value heatmap buckets (empty when heatmap is off)
    pub heatmap: Vec<HeatmapBucket>,
}

impl CombineStats {
    /// Record one cluster merge by reason.
    pub fn record_merge(&mut self, reason: MergeReason) {
        match reason {
            MergeReason::Identical => self.merged_identical += 1,
            MergeReason::EditDistance => self.merged_edit_distance += 1,
            MergeReason::Pinyin => self.merged_pinyin += 1,
            MergeReason::Cosine => self.merged_cosine += 1,
        }
    }

    /// Fold another (chunk-local) stats record into this one.
    ///
    /// Heatmap buckets are not merged here; the orchestrator computes the
    /// heatmap once over the whole run.
    pub fn merge_from(&mut self, other: &CombineStats) {
        self.merged_identical += other.merged_identical;
        self.merged_edit_distance += other.merged_edit_distance;
        self.merged_pinyin += other.merged_pinyin;
        self.merged_cosine += other.merged_cosine;
        self.whitelist_hits += other.whitelist_hits;
        self.blacklist_hits += other.blacklist_hits;
        self.forcelist_hits += other.forcelist_hits;
        self.filtered_source += other.filtered_source;
        self.dropped_density += other.dropped_density;
        self.shrunk += other.shrunk;
        self.enlarged += other.enlarged;
        self.converted_scroll += other.converted_scroll;
        for (source, count) in &other.per_source {
            *self.per_source.entry(source.clone()).or_insert(0) += count;
        }
        self.original_total += other.original_total;
    }
}
