//! Batch orchestrator
//!
//! Drives the full combining run: per-source accounting, source-blacklist
//! filtering, time sorting, fixed-size chunking with one chunk of lookahead,
//! density carry across chunks, and statistics aggregation. When combining
//! is disabled the run degrades to an identity pass-through that still
//! produces per-source statistics and a heatmap.

use crate::cluster::Clusterer;
use crate::comment::{Comment, Representative};
use crate::config::{CombineConfig, HeatmapMode};
use crate::heatmap;
use crate::postprocess::{display_value, PostProcessor};
use crate::rules::RuleCache;
use crate::stats::CombineStats;
use serde::{Deserialize, Serialize};
use tracing::debug;

/// Result of one combining run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CombineOutput {
    pub representatives: Vec<Representative>,
    pub stats: CombineStats,
}

/// Run the full pipeline over one comment batch.
///
/// The rule cache is caller-owned so repeated runs with an unchanged
/// configuration skip recompilation.
pub fn combine(comments: &[Comment], config: &CombineConfig, cache: &RuleCache) -> CombineOutput {
    let rules = cache.get_or_compile(&config.rules);
    let mut stats = CombineStats {
        original_total: comments.len() as u64,
        ..Default::default()
    };
    for comment in comments {
        *stats
            .per_source
            .entry(comment.source_tag.clone())
            .or_insert(0) += 1;
    }

    if !config.combine.enable_combine {
        // Identity pass-through: one representative per input comment
        let representatives: Vec<Representative> =
            comments.iter().map(Representative::from_template).collect();
        if config.heatmap.mode != HeatmapMode::Off {
            stats.heatmap = heatmap::generate(
                comments
                    .iter()
                    .map(|c| (c.time_ms, display_value(&c.text, c.font_size))),
                config.heatmap.interval_seconds,
            );
        }
        return CombineOutput {
            representatives,
            stats,
        };
    }

    let mut sorted: Vec<Comment> = Vec::with_capacity(comments.len());
    for comment in comments {
        if rules.source_blacklisted(&comment.source_tag) {
            stats.filtered_source += 1;
        } else {
            sorted.push(comment.clone());
        }
    }
    sorted.sort_by(|a, b| {
        a.time_ms
            .partial_cmp(&b.time_ms)
            .unwrap_or(std::cmp::Ordering::Equal)
    });

    let chunks: Vec<&[Comment]> = sorted.chunks(config.combine.max_chunk_size).collect();
    let mut post = PostProcessor::new(config);
    let mut representatives = Vec::with_capacity(sorted.len());
    // Leading comments consumed from the current chunk by the previous
    // chunk's lookahead phase
    let mut consumed_prefix = 0usize;

    for (i, chunk) in chunks.iter().enumerate() {
        let mut chunk_stats = CombineStats::default();
        let mut clusterer = Clusterer::new(config, &rules);
        let primary_start = consumed_prefix.min(chunk.len());
        for comment in &chunk[primary_start..] {
            clusterer.feed_primary(comment, &mut chunk_stats);
        }

        consumed_prefix = 0;
        if let (Some(next), Some(last)) = (chunks.get(i + 1), chunk.last()) {
            let horizon_ms = last.time_ms + config.threshold_ms();
            for comment in next.iter() {
                if comment.time_ms > horizon_ms {
                    break;
                }
                clusterer.feed_lookahead(comment, &mut chunk_stats);
                consumed_prefix += 1;
            }
        }

        let clusters = clusterer.finish();
        debug!(
            chunk = i,
            clusters = clusters.len(),
            lookahead = consumed_prefix,
            "chunk clustered"
        );
        representatives.extend(post.process_chunk(clusters, &mut chunk_stats));
        stats.merge_from(&chunk_stats);
    }

    stats.heatmap = match config.heatmap.mode {
        HeatmapMode::Off => Vec::new(),
        HeatmapMode::Combined => heatmap::generate(
            representatives
                .iter()
                .map(|r| (r.time_ms, display_value(&r.text, r.font_size))),
            config.heatmap.interval_seconds,
        ),
        HeatmapMode::Original => heatmap::generate(
            sorted
                .iter()
                .map(|c| (c.time_ms, display_value(&c.text, c.font_size))),
            config.heatmap.interval_seconds,
        ),
    };

    CombineOutput {
        representatives,
        stats,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::comment::CommentMode;

    fn comment(id: i64, time_ms: f64, text: &str) -> Comment {
        Comment {
            id,
            time_ms,
            text: text.to_string(),
            ..Default::default()
        }
    }

    fn sourced(id: i64, time_ms: f64, text: &str, source: &str) -> Comment {
        Comment {
            source_tag: source.to_string(),
            ..comment(id, time_ms, text)
        }
    }

    #[test]
    fn test_pass_through_when_combine_disabled() {
        let mut config = CombineConfig::default();
        config.combine.enable_combine = false;

        let comments = vec![
            comment(1, 0.0, "same"),
            comment(2, 10.0, "same"),
            comment(3, 20.0, "same"),
        ];
        let cache = RuleCache::new();
        let output = combine(&comments, &config, &cache);

        assert_eq!(output.representatives.len(), 3);
        assert!(output.representatives.iter().all(|r| r.mark_count == 1));
        assert_eq!(output.stats.original_total, 3);
        assert_eq!(output.stats.merged_identical, 0);
        assert!(!output.stats.heatmap.is_empty());
    }

    #[test]
    fn test_basic_combining_run() {
        let config = CombineConfig::default();
        let comments = vec![
            comment(1, 0.0, "asdf"),
            comment(2, 100.0, "asdf"),
            comment(3, 200.0, "something else entirely"),
        ];
        let cache = RuleCache::new();
        let output = combine(&comments, &config, &cache);

        assert_eq!(output.representatives.len(), 2);
        let merged = output
            .representatives
            .iter()
            .find(|r| r.mark_count == 2)
            .expect("one merged representative");
        assert_eq!(merged.text, "asdf");
        assert_eq!(output.stats.merged_identical, 1);
    }

    #[test]
    fn test_source_blacklist_filters_before_clustering() {
        let mut config = CombineConfig::default();
        config.rules.black_source_list = r#"["bad-feed"]"#.to_string();

        let comments = vec![
            sourced(1, 0.0, "hello", "main"),
            sourced(2, 100.0, "hello", "bad-feed"),
        ];
        let cache = RuleCache::new();
        let output = combine(&comments, &config, &cache);

        assert_eq!(output.representatives.len(), 1);
        assert_eq!(output.representatives[0].mark_count, 1);
        assert_eq!(output.stats.filtered_source, 1);
        // Per-source counts cover the unfiltered input
        assert_eq!(output.stats.per_source["bad-feed"], 1);
        assert_eq!(output.stats.per_source["main"], 1);
    }

    #[test]
    fn test_unsorted_input_is_time_sorted() {
        let config = CombineConfig::default();
        let comments = vec![
            comment(1, 5000.0, "b"),
            comment(2, 0.0, "a"),
            comment(3, 9000.0, "c"),
        ];
        let cache = RuleCache::new();
        let output = combine(&comments, &config, &cache);

        let times: Vec<f64> = output.representatives.iter().map(|r| r.time_ms).collect();
        assert_eq!(times, vec![0.0, 5000.0, 9000.0]);
    }

    #[test]
    fn test_multi_chunk_equals_single_chunk() {
        // Four bursts of ten identical comments, 100 s apart: each burst is
        // one cluster, and every inter-burst gap is far wider than the
        // 15 s window. Chunk size 15 splits mid-burst, so the second burst
        // straddles a chunk boundary and its tail joins via lookahead.
        let mut comments = Vec::new();
        for burst in 0..4 {
            for i in 0..10 {
                comments.push(comment(
                    burst * 10 + i,
                    burst as f64 * 100_000.0 + i as f64 * 200.0,
                    "burst comment",
                ));
            }
        }

        let mut chunked = CombineConfig::default();
        chunked.combine.max_chunk_size = 15;
        let mut single = CombineConfig::default();
        single.combine.max_chunk_size = 1_000_000;

        let cache = RuleCache::new();
        let a = combine(&comments, &chunked, &cache);
        let b = combine(&comments, &single, &cache);

        assert_eq!(a.representatives.len(), 4);
        assert_eq!(a.representatives.len(), b.representatives.len());
        for (x, y) in a.representatives.iter().zip(&b.representatives) {
            assert_eq!(x.time_ms, y.time_ms);
            assert_eq!(x.text, y.text);
            assert_eq!(x.mark_count, y.mark_count);
            assert_eq!(x.font_size, y.font_size);
        }
        assert_eq!(a.stats.merged_identical, 36);
        assert_eq!(a.stats.merged_identical, b.stats.merged_identical);
        assert_eq!(a.stats.enlarged, b.stats.enlarged);
    }

    #[test]
    fn test_lookahead_joins_cluster_across_chunk_boundary() {
        let mut config = CombineConfig::default();
        config.combine.max_chunk_size = 2;
        config.combine.threshold_seconds = 15.0;

        // Chunk 1: ids 1-2; chunk 2 starts with an identical comment well
        // within the window, which joins via lookahead
        let comments = vec![
            comment(1, 0.0, "boundary text"),
            comment(2, 100.0, "boundary text"),
            comment(3, 200.0, "boundary text"),
            comment(4, 100_000.0, "far away"),
        ];
        let cache = RuleCache::new();
        let output = combine(&comments, &config, &cache);

        let merged = output
            .representatives
            .iter()
            .find(|r| r.text == "boundary text")
            .expect("merged representative");
        assert_eq!(merged.mark_count, 3);
        assert_eq!(output.stats.merged_identical, 2);
    }

    #[test]
    fn test_heatmap_modes() {
        let comments = vec![
            comment(1, 1000.0, "dup"),
            comment(2, 2000.0, "dup"),
            comment(3, 3000.0, "dup"),
        ];
        let cache = RuleCache::new();

        let mut off = CombineConfig::default();
        off.heatmap.mode = HeatmapMode::Off;
        assert!(combine(&comments, &off, &cache).stats.heatmap.is_empty());

        let mut combined = CombineConfig::default();
        combined.heatmap.mode = HeatmapMode::Combined;
        let combined_out = combine(&comments, &combined, &cache);
        // One merged representative -> one contribution
        assert_eq!(combined_out.stats.heatmap.len(), 1);

        let mut original = CombineConfig::default();
        original.heatmap.mode = HeatmapMode::Original;
        let original_out = combine(&comments, &original, &cache);
        assert_eq!(original_out.stats.heatmap.len(), 1);
        // Originals contribute three times the single representative
        assert!(
            original_out.stats.heatmap[0].average_display_value > 0.0
        );
    }

    #[test]
    fn test_effect_comments_survive_untouched() {
        let config = CombineConfig::default();
        let comments = vec![
            Comment {
                id: 1,
                time_ms: 0.0,
                mode: CommentMode::Bas,
                text: "script".to_string(),
                ..Default::default()
            },
            comment(2, 0.0, "plain"),
        ];
        let cache = RuleCache::new();
        let output = combine(&comments, &config, &cache);

        assert_eq!(output.representatives.len(), 2);
        let effect = output
            .representatives
            .iter()
            .find(|r| r.mode == CommentMode::Bas)
            .unwrap();
        assert_eq!(effect.text, "script");
        assert_eq!(effect.mark_count, 1);
    }
}
