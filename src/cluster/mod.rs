//! Sliding time-window clusterer
//!
//! Maintains a FIFO of open clusters ordered by opening time. Each incoming
//! time-sorted comment first evicts clusters that fell out of the window,
//! then scans the remaining open clusters newest-first and joins the first
//! match. A chunk is fed in two phases: the primary segment may open new
//! clusters; the lookahead segment (the next chunk's leading edge) may only
//! join existing ones.

use crate::comment::{Comment, CommentMode};
use crate::config::CombineConfig;
use crate::fingerprint::{Fingerprint, FingerprintOptions};
use crate::normalize::Normalizer;
use crate::rules::CompiledRules;
use crate::similarity::Comparator;
use crate::stats::{CombineStats, MergeReason};
use std::collections::HashMap;
use std::collections::VecDeque;
use tracing::debug;

/// One comment inside a cluster, with its derived comparison data.
#[derive(Debug, Clone)]
pub struct Member {
    pub comment: Comment,
    pub normalized: String,
    pub fingerprint: Fingerprint,
    /// Why this member joined; `None` for the cluster opener
    pub join_reason: Option<MergeReason>,
}

/// A finalized cluster ready for post-processing.
#[derive(Debug, Clone)]
pub struct FinalCluster {
    /// Members in arrival order; never empty
    pub members: Vec<Member>,
    /// Chosen representative text
    pub chosen_text: String,
    /// Cluster bypassed the merge algorithm (effect mode or whitelist hit)
    pub ignored: bool,
}

impl FinalCluster {
    pub fn first(&self) -> &Member {
        &self.members[0]
    }

    pub fn time_ms(&self) -> f64 {
        self.members[0].comment.time_ms
    }
}

#[derive(Debug)]
struct OpenCluster {
    members: Vec<Member>,
    /// Time of the first (oldest) member; the window anchor
    opened_ms: f64,
}

/// Per-chunk clustering engine.
pub struct Clusterer<'a> {
    config: &'a CombineConfig,
    rules: &'a CompiledRules,
    comparator: Comparator,
    fingerprint_options: FingerprintOptions,
    open: VecDeque<OpenCluster>,
    finalized: Vec<FinalCluster>,
}

impl<'a> Clusterer<'a> {
    pub fn new(config: &'a CombineConfig, rules: &'a CompiledRules) -> Self {
        Self {
            config,
            rules,
            comparator: Comparator::from_config(&config.combine),
            fingerprint_options: FingerprintOptions {
                use_pinyin: config.combine.use_pinyin,
                use_bigrams: config.cosine_enabled(),
            },
            open: VecDeque::new(),
            finalized: Vec::new(),
        }
    }

    /// Feed one primary-segment comment. May open a new cluster.
    pub fn feed_primary(&mut self, comment: &Comment, stats: &mut CombineStats) {
        match self.classify(comment, stats) {
            Classified::Ignored => self.emit_ignored(comment),
            Classified::Deleted => {}
            Classified::Mergeable(member) => {
                self.evict_expired(comment.time_ms);
                if let Some(member) = self.try_join(member, stats) {
                    self.open.push_back(OpenCluster {
                        opened_ms: member.comment.time_ms,
                        members: vec![member],
                    });
                }
            }
        }
    }

    /// Feed one lookahead comment from the next chunk's leading edge.
    ///
    /// Lookahead items may only join existing open clusters; items matching
    /// nothing are discarded, never carried forward. Items that bypass the
    /// merge algorithm (effect modes, rule hits) are handled as in the
    /// primary phase since the window does not apply to them.
    pub fn feed_lookahead(&mut self, comment: &Comment, stats: &mut CombineStats) {
        match self.classify(comment, stats) {
            Classified::Ignored => self.emit_ignored(comment),
            Classified::Deleted => {}
            Classified::Mergeable(member) => {
                self.evict_expired(comment.time_ms);
                if let Some(member) = self.try_join(member, stats) {
                    debug!(
                        id = member.comment.id,
                        time_ms = member.comment.time_ms,
                        "lookahead comment matched no open cluster, discarding"
                    );
                }
            }
        }
    }

    /// Flush all remaining open clusters in FIFO order and return every
    /// finalized cluster of this chunk.
    pub fn finish(mut self) -> Vec<FinalCluster> {
        while let Some(cluster) = self.open.pop_front() {
            let finalized = finalize(cluster);
            self.finalized.push(finalized);
        }
        self.finalized
    }

    fn classify(&self, comment: &Comment, stats: &mut CombineStats) -> Classified {
        // Effect-category modes and whitelist hits never enter the merge
        // algorithm; blacklist hits (for mergeable modes) are removed.
        if comment.mode.is_effect() {
            return Classified::Ignored;
        }
        if self.rules.whitelist_match(&comment.text) {
            stats.whitelist_hits += 1;
            return Classified::Ignored;
        }
        if let Some(pattern) = self.rules.blacklist_match(&comment.text) {
            stats.blacklist_hits += 1;
            debug!(
                id = comment.id,
                pattern, "comment deleted by blacklist rule"
            );
            return Classified::Deleted;
        }

        let normalizer = Normalizer::new(&self.config.normalize, self.rules);
        let normalized = normalizer.normalize(&comment.text);
        if normalized.forced {
            stats.forcelist_hits += 1;
        }

        let fingerprint = Fingerprint::build(&normalized.text, self.fingerprint_options);
        Classified::Mergeable(Member {
            comment: comment.clone(),
            normalized: normalized.text,
            fingerprint,
            join_reason: None,
        })
    }

    /// Finalize open clusters that fell behind the sliding window.
    fn evict_expired(&mut self, now_ms: f64) {
        let threshold_ms = self.config.threshold_ms();
        while let Some(front) = self.open.front() {
            if now_ms - front.opened_ms > threshold_ms {
                let cluster = self.open.pop_front().expect("front checked above");
                self.finalized.push(finalize(cluster));
            } else {
                break;
            }
        }
    }

    /// Scan open clusters newest-first and join the first match. Returns
    /// the member back if nothing matched.
    fn try_join(&mut self, mut member: Member, stats: &mut CombineStats) -> Option<Member> {
        for idx in (0..self.open.len()).rev() {
            let cluster = &self.open[idx];
            let last = cluster.members.last().expect("open clusters are non-empty");
            let reason = self.comparator.decide(
                &member.fingerprint,
                member.comment.mode,
                cluster.members.iter().map(|m| &m.fingerprint),
                &last.fingerprint,
                last.comment.mode,
            );
            if let Some(reason) = reason {
                stats.record_merge(reason);
                member.join_reason = Some(reason);
                self.open[idx].members.push(member);
                return None;
            }
        }
        Some(member)
    }

    fn emit_ignored(&mut self, comment: &Comment) {
        self.finalized.push(FinalCluster {
            chosen_text: comment.text.clone(),
            members: vec![Member {
                comment: comment.clone(),
                normalized: comment.text.clone(),
                fingerprint: Fingerprint::build(&comment.text, self.fingerprint_options),
                join_reason: None,
            }],
            ignored: true,
        });
    }
}

enum Classified {
    Ignored,
    Deleted,
    Mergeable(Member),
}

fn finalize(cluster: OpenCluster) -> FinalCluster {
    let chosen_text = choose_text(&cluster.members);
    FinalCluster {
        members: cluster.members,
        chosen_text,
        ignored: false,
    }
}

/// Pick the most frequent normalized variant; break ties with the variant
/// of median length (stable: tied variants sorted by length then content).
fn choose_text(members: &[Member]) -> String {
    let mut counts: HashMap<&str, u32> = HashMap::new();
    for member in members {
        *counts.entry(member.normalized.as_str()).or_insert(0) += 1;
    }

    let max_count = counts.values().copied().max().unwrap_or(0);
    let mut tied: Vec<&str> = counts
        .iter()
        .filter(|(_, &count)| count == max_count)
        .map(|(&text, _)| text)
        .collect();
    tied.sort_by_key(|text| (text.chars().count(), *text));
    tied[tied.len() / 2].to_string()
}
