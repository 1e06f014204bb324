//! Cluster post-processing: representative construction and display fairness
//!
//! Converts finalized clusters into representatives, then applies mode
//! elevation, popularity enlargement, scroll conversion for over-wide fixed
//! comments, and density-based shrink/drop. Density state (a running scalar
//! plus an expiry queue) is carried across chunk boundaries so the first
//! representatives of a chunk see the previous chunk's contributions.

use crate::cluster::FinalCluster;
use crate::comment::{CommentMode, Representative};
use crate::config::CombineConfig;
use crate::stats::CombineStats;
use std::collections::VecDeque;
use tracing::debug;

/// How long one representative contributes to the running density.
pub const DENSITY_WINDOW_MS: f64 = 5000.0;

/// Glyphs that contribute no meaningful on-screen ink.
const NARROW_GLYPHS: &str = " \u{3000}.,:;'\"`|!¡·・。，、！？?~-_…";

/// Marker prefixed to comments converted from fixed to scrolling mode.
const SCROLL_MARKER: char = '\u{2192}';

/// Fonts never shrink or enlarge-floor below this size.
const MIN_FONT_SIZE: u32 = 10;

/// Heuristic on-screen "ink" of one comment: visible character count
/// (narrow glyphs excluded) scaled by font size.
pub fn display_value(text: &str, font_size: u32) -> f64 {
    let visible = text.chars().filter(|c| !NARROW_GLYPHS.contains(*c)).count();
    visible as f64 * font_size as f64 / 25.0
}

/// Estimated rendered width in pixels: ASCII ~0.6 em, everything else
/// ~1.0 em, scaled by font size. An estimate, not a layout measurement.
pub fn estimate_width(text: &str, font_size: u32) -> f64 {
    let ems: f64 = text
        .chars()
        .map(|c| if c.is_ascii() { 0.6 } else { 1.0 })
        .sum();
    ems * font_size as f64
}

/// Enlarge multiplier for a cluster of `size` members.
pub fn enlarge_multiplier(size: usize) -> f64 {
    if size <= 5 {
        1.0
    } else {
        (size as f64).ln() / 5.0_f64.ln()
    }
}

/// Post-processor with density state carried across chunks.
pub struct PostProcessor<'a> {
    config: &'a CombineConfig,
    density: f64,
    /// (expire_ms, contributed value), ordered by expiry
    expiry: VecDeque<(f64, f64)>,
}

impl<'a> PostProcessor<'a> {
    pub fn new(config: &'a CombineConfig) -> Self {
        Self {
            config,
            density: 0.0,
            expiry: VecDeque::new(),
        }
    }

    /// Convert one chunk's clusters into surviving representatives, in
    /// time order.
    pub fn process_chunk(
        &mut self,
        mut clusters: Vec<FinalCluster>,
        stats: &mut CombineStats,
    ) -> Vec<Representative> {
        clusters.sort_by(|a, b| {
            a.time_ms()
                .partial_cmp(&b.time_ms())
                .unwrap_or(std::cmp::Ordering::Equal)
        });

        let mut representatives = Vec::with_capacity(clusters.len());
        for cluster in clusters {
            if let Some(rep) = self.process_cluster(cluster, stats) {
                representatives.push(rep);
            }
        }
        representatives
    }

    fn process_cluster(
        &mut self,
        cluster: FinalCluster,
        stats: &mut CombineStats,
    ) -> Option<Representative> {
        let mut rep = Representative::from_template(&cluster.first().comment);
        rep.text = cluster.chosen_text.clone();
        rep.mark_count = cluster.members.len();
        rep.weight = cluster
            .members
            .iter()
            .map(|m| m.comment.weight)
            .max()
            .unwrap_or(rep.weight);
        if rep.mark_count > 1 {
            rep.descriptions
                .push(format!("merged {} comments", rep.mark_count));
        }

        if !cluster.ignored {
            self.elevate_mode(&mut rep, &cluster);
            self.enlarge(&mut rep, stats);
        }
        self.convert_scroll(&mut rep, stats);

        if self.config.density_enabled() {
            return self.account_density(rep, stats);
        }
        Some(rep)
    }

    /// Bottom placement beats top placement beats the template mode.
    fn elevate_mode(&self, rep: &mut Representative, cluster: &FinalCluster) {
        if !self.config.display.mode_elevation {
            return;
        }
        let elevated = if cluster
            .members
            .iter()
            .any(|m| m.comment.mode == CommentMode::Bottom)
        {
            CommentMode::Bottom
        } else if cluster
            .members
            .iter()
            .any(|m| m.comment.mode == CommentMode::Top)
        {
            CommentMode::Top
        } else {
            rep.mode
        };

        if elevated != rep.mode {
            rep.descriptions
                .push(format!("mode elevated to {:?}", elevated).to_lowercase());
            rep.mode = elevated;
        }
    }

    fn enlarge(&self, rep: &mut Representative, stats: &mut CombineStats) {
        if !self.config.display.enlarge {
            return;
        }
        let multiplier = enlarge_multiplier(rep.mark_count);
        if multiplier > 1.001 {
            let enlarged = (rep.font_size as f64 * multiplier).ceil() as u32;
            rep.font_size = enlarged.max(MIN_FONT_SIZE);
            rep.descriptions
                .push(format!("font enlarged x{:.2}", multiplier));
            stats.enlarged += 1;
        }
    }

    /// Convert an over-wide fixed-position representative to scrolling.
    fn convert_scroll(&self, rep: &mut Representative, stats: &mut CombineStats) {
        let threshold = self.config.display.scroll_threshold;
        if threshold == 0 || !rep.mode.is_fixed() {
            return;
        }
        let width = estimate_width(&rep.text, rep.font_size);
        if width > threshold as f64 {
            rep.mode = CommentMode::Scroll;
            rep.text = format!("{}{}", SCROLL_MARKER, rep.text);
            rep.descriptions
                .push(format!("converted to scroll (width ~{:.0}px)", width));
            stats.converted_scroll += 1;
        }
    }

    /// Maintain the running density and apply drop/shrink.
    fn account_density(
        &mut self,
        mut rep: Representative,
        stats: &mut CombineStats,
    ) -> Option<Representative> {
        // Expire contributions whose window has passed
        while let Some(&(expire_ms, value)) = self.expiry.front() {
            if expire_ms <= rep.time_ms {
                self.density -= value;
                self.expiry.pop_front();
            } else {
                break;
            }
        }

        let own_value = display_value(&rep.text, rep.font_size);

        // Drop on pre-add density strictly above the threshold
        let drop_threshold = self.config.display.drop_threshold;
        if drop_threshold > 0 && self.density > drop_threshold as f64 {
            stats.dropped_density += 1;
            debug!(
                time_ms = rep.time_ms,
                density = self.density,
                "representative dropped by density"
            );
            return None;
        }

        self.density += own_value;
        self.expiry.push_back((rep.time_ms + DENSITY_WINDOW_MS, own_value));

        // Shrink on post-add density above the threshold
        let shrink_threshold = self.config.display.shrink_threshold;
        if shrink_threshold > 0 && self.density > shrink_threshold as f64 && own_value > 0.0 {
            let rate = (self.density.powf(0.35) / own_value).min(1.732);
            if rate > 1.0 {
                let shrunk = ((rep.font_size as f64 / rate).floor() as u32).max(MIN_FONT_SIZE);
                if shrunk < rep.font_size {
                    rep.font_size = shrunk;
                    rep.descriptions
                        .push(format!("font shrunk x{:.2}", rate));
                    stats.shrunk += 1;
                }
            }
        }

        Some(rep)
    }
}
