//! End-to-end tests for the combining pipeline
//!
//! Each test drives the public `combine` entry point over a small batch and
//! asserts on representatives and statistics, the same surface the CLI uses.

use danmerge::comment::{parse_comments, Comment, CommentMode};
use danmerge::config::{CombineConfig, HeatmapMode};
use danmerge::pipeline::combine;
use danmerge::rules::RuleCache;

fn comment(id: i64, time_ms: f64, text: &str) -> Comment {
    Comment {
        id,
        time_ms,
        text: text.to_string(),
        ..Default::default()
    }
}

#[test]
fn test_identical_comments_collapse_to_one_representative() {
    let config = CombineConfig::default();
    let cache = RuleCache::new();
    let comments = vec![comment(1, 0.0, "asdf"), comment(2, 100.0, "asdf")];

    let output = combine(&comments, &config, &cache);

    assert_eq!(output.representatives.len(), 1);
    let rep = &output.representatives[0];
    assert_eq!(rep.text, "asdf");
    assert_eq!(rep.mark_count, 2);
    assert_eq!(rep.time_ms, 0.0);
    assert_eq!(output.stats.merged_identical, 1);
    assert_eq!(output.stats.original_total, 2);
}

#[test]
fn test_near_duplicates_merge_by_edit_distance() {
    let mut config = CombineConfig::default();
    config.combine.max_distance = 3;
    let cache = RuleCache::new();
    let comments = vec![comment(1, 0.0, "hello"), comment(2, 500.0, "hallo")];

    let output = combine(&comments, &config, &cache);

    assert_eq!(output.representatives.len(), 1);
    assert_eq!(output.representatives[0].mark_count, 2);
    assert_eq!(output.stats.merged_edit_distance, 1);
}

#[test]
fn test_window_expiry_separates_distant_repeats() {
    let mut config = CombineConfig::default();
    config.combine.threshold_seconds = 15.0;
    let cache = RuleCache::new();
    // Same text, 20 seconds apart: the first cluster closes before the
    // second comment arrives
    let comments = vec![comment(1, 0.0, "again"), comment(2, 20_000.0, "again")];

    let output = combine(&comments, &config, &cache);

    assert_eq!(output.representatives.len(), 2);
    assert!(output.representatives.iter().all(|r| r.mark_count == 1));
    assert_eq!(output.stats.merged_identical, 0);
}

#[test]
fn test_blacklist_literal_is_case_insensitive() {
    let mut config = CombineConfig::default();
    config.rules.blacklist = r#"[[false, "spam"]]"#.to_string();
    let cache = RuleCache::new();
    let comments = vec![
        comment(1, 0.0, "This is SPAM content"),
        comment(2, 100.0, "legitimate comment"),
    ];

    let output = combine(&comments, &config, &cache);

    assert_eq!(output.representatives.len(), 1);
    assert_eq!(output.representatives[0].text, "legitimate comment");
    assert_eq!(output.stats.blacklist_hits, 1);
}

#[test]
fn test_whitelisted_comments_are_isolated_not_merged() {
    let mut config = CombineConfig::default();
    config.rules.whitelist = r#"[[false, "gg"]]"#.to_string();
    let cache = RuleCache::new();
    let comments = vec![comment(1, 0.0, "GG"), comment(2, 100.0, "GG")];

    let output = combine(&comments, &config, &cache);

    // Identical texts, but the whitelist exempts both from clustering
    assert_eq!(output.representatives.len(), 2);
    assert!(output.representatives.iter().all(|r| r.mark_count == 1));
    assert_eq!(output.stats.whitelist_hits, 2);
    assert_eq!(output.stats.merged_identical, 0);
}

#[test]
fn test_forcelist_rewrites_before_matching() {
    let mut config = CombineConfig::default();
    config.rules.forcelist = r#"[["233+", "233"]]"#.to_string();
    let cache = RuleCache::new();
    let comments = vec![comment(1, 0.0, "2333333"), comment(2, 100.0, "233")];

    let output = combine(&comments, &config, &cache);

    assert_eq!(output.representatives.len(), 1);
    assert_eq!(output.representatives[0].mark_count, 2);
    assert_eq!(output.stats.forcelist_hits, 2);
}

#[test]
fn test_popular_cluster_gets_enlarged_font() {
    let mut config = CombineConfig::default();
    config.display.enlarge = true;
    let cache = RuleCache::new();
    let comments: Vec<Comment> = (0..6)
        .map(|i| comment(i, i as f64 * 100.0, "very popular"))
        .collect();

    let output = combine(&comments, &config, &cache);

    assert_eq!(output.representatives.len(), 1);
    let rep = &output.representatives[0];
    assert_eq!(rep.mark_count, 6);
    // 25 * ln(6)/ln(5) = 27.83, rounded up
    assert_eq!(rep.font_size, 28);
    assert_eq!(output.stats.enlarged, 1);
}

#[test]
fn test_mode_elevation_bottom_wins() {
    let config = CombineConfig::default();
    let cache = RuleCache::new();
    let comments = vec![
        comment(1, 0.0, "elevate me"),
        Comment {
            mode: CommentMode::Bottom,
            ..comment(2, 100.0, "elevate me")
        },
    ];

    let output = combine(&comments, &config, &cache);

    assert_eq!(output.representatives.len(), 1);
    assert_eq!(output.representatives[0].mode, CommentMode::Bottom);
}

#[test]
fn test_wide_fixed_comment_converts_to_scroll() {
    let mut config = CombineConfig::default();
    config.display.scroll_threshold = 100;
    let cache = RuleCache::new();
    // 10 ASCII chars at font 25: estimated width 10 * 0.6 * 25 = 150
    let comments = vec![Comment {
        mode: CommentMode::Top,
        ..comment(1, 0.0, "abcdefghij")
    }];

    let output = combine(&comments, &config, &cache);

    let rep = &output.representatives[0];
    assert_eq!(rep.mode, CommentMode::Scroll);
    assert!(rep.text.starts_with('\u{2192}'));
    assert_eq!(output.stats.converted_scroll, 1);
}

#[test]
fn test_density_drop_under_pressure() {
    let mut config = CombineConfig::default();
    config.display.drop_threshold = 1;
    let cache = RuleCache::new();
    // Three dissimilar comments in the same window; the first fills the
    // density budget and the rest are dropped
    let comments = vec![
        comment(1, 0.0, "aaaa"),
        comment(2, 100.0, "bbbb"),
        comment(3, 200.0, "cccc"),
    ];

    let output = combine(&comments, &config, &cache);

    assert_eq!(output.representatives.len(), 1);
    assert_eq!(output.stats.dropped_density, 2);
}

#[test]
fn test_effect_comments_bypass_everything() {
    let mut config = CombineConfig::default();
    config.rules.blacklist = r#"[[false, "script"]]"#.to_string();
    let cache = RuleCache::new();
    let comments = vec![Comment {
        mode: CommentMode::Bas,
        ..comment(1, 0.0, "some script payload")
    }];

    let output = combine(&comments, &config, &cache);

    // Effect modes are exempted before rule matching
    assert_eq!(output.representatives.len(), 1);
    assert_eq!(output.representatives[0].text, "some script payload");
    assert_eq!(output.stats.blacklist_hits, 0);
}

#[test]
fn test_heatmap_buckets_average_display_values() {
    let mut config = CombineConfig::default();
    config.heatmap.mode = HeatmapMode::Original;
    config.heatmap.interval_seconds = 5;
    let cache = RuleCache::new();
    // Two chars at font 25: display value 2.0 each
    let comments = vec![comment(1, 1000.0, "ab"), comment(2, 4000.0, "cdef")];

    let output = combine(&comments, &config, &cache);

    assert_eq!(output.stats.heatmap.len(), 1);
    let bucket = &output.stats.heatmap[0];
    assert_eq!(bucket.start_seconds, 0);
    assert_eq!(bucket.end_seconds, 5);
    assert_eq!(bucket.average_display_value, 3.0);
}

#[test]
fn test_lenient_json_input_end_to_end() {
    let json = r#"[
        {"id": "12", "time_ms": "1000", "mode": 5, "text": "top comment", "font_size": 0},
        {"time_ms": 1200.5, "mode": "scroll", "text": "top comment", "unknown_field": true},
        {"mode": [], "text": "weird mode"}
    ]"#;

    let comments = parse_comments(json).expect("lenient parse");
    assert_eq!(comments.len(), 3);
    assert_eq!(comments[0].id, 12);
    assert_eq!(comments[0].mode, CommentMode::Top);
    assert_eq!(comments[0].font_size, 25);
    assert_eq!(comments[2].mode, CommentMode::Scroll);

    let config = CombineConfig::default();
    let cache = RuleCache::new();
    let output = combine(&comments, &config, &cache);

    // The two "top comment" entries merge despite differing modes
    let merged = output
        .representatives
        .iter()
        .find(|r| r.mark_count == 2)
        .expect("merged pair");
    assert_eq!(merged.text, "top comment");

    // Output serializes cleanly
    let serialized = serde_json::to_string(&output).expect("serialize output");
    assert!(serialized.contains("representatives"));
    assert!(serialized.contains("mark_count"));
}

#[test]
fn test_config_file_roundtrip() {
    let dir = tempfile::tempdir().expect("temp dir");
    let path = dir.path().join("danmerge.toml");

    let mut config = CombineConfig::default();
    config.combine.threshold_seconds = 30.0;
    config.rules.blacklist = r#"[[true, "ad+"]]"#.to_string();
    config.save(&path).expect("save config");

    let loaded = CombineConfig::load(&path).expect("load config");
    assert_eq!(loaded.combine.threshold_seconds, 30.0);
    assert_eq!(loaded.rules.blacklist, r#"[[true, "ad+"]]"#);

    // The reloaded rules compile and behave
    let cache = RuleCache::new();
    let comments = vec![comment(1, 0.0, "buy addd now"), comment(2, 100.0, "fine")];
    let output = combine(&comments, &loaded, &cache);
    assert_eq!(output.representatives.len(), 1);
    assert_eq!(output.stats.blacklist_hits, 1);
}
