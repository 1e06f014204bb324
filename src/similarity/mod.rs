//! Layered approximate-match decision between a candidate and a cluster
//!
//! Layers are evaluated in order and the first hit wins: exact character
//! multiset equality (scans all members, bypasses the mode gate), the mode
//! gate, approximate edit distance, phonetic distance, and bigram cosine.
//! Every layer except the identical scan compares against the most recently
//! appended member only (a recency heuristic).

use crate::comment::CommentMode;
use crate::config::CombineSection;
use crate::fingerprint::Fingerprint;
use crate::stats::MergeReason;

/// Merge decision engine for one configuration.
#[derive(Debug, Clone)]
pub struct Comparator {
    max_distance: u32,
    max_cosine: u32,
    use_pinyin: bool,
    cross_mode: bool,
}

impl Comparator {
    pub fn from_config(combine: &CombineSection) -> Self {
        Self {
            max_distance: combine.max_distance,
            max_cosine: combine.max_cosine,
            use_pinyin: combine.use_pinyin,
            cross_mode: combine.cross_mode,
        }
    }

    /// Decide whether the candidate merges into a cluster.
    ///
    /// `all_members` feeds the identical scan; `last`/`last_mode` belong to
    /// the most recently appended member.
    pub fn decide<'a>(
        &self,
        candidate: &Fingerprint,
        candidate_mode: CommentMode,
        all_members: impl IntoIterator<Item = &'a Fingerprint>,
        last: &Fingerprint,
        last_mode: CommentMode,
    ) -> Option<MergeReason> {
        // Layer 1: exact character multiset equality, unconditional merge
        if all_members
            .into_iter()
            .any(|m| m.chars.same_counts(&candidate.chars))
        {
            return Some(MergeReason::Identical);
        }

        // Layer 2: mode gate
        if !self.cross_mode && candidate_mode != last_mode {
            return None;
        }

        // Layer 3: approximate edit distance over character multisets,
        // behind a cheap length pre-filter
        let len_sum = candidate.chars.total() + last.chars.total();
        let char_distance = candidate.chars.l1_distance(&last.chars);
        if candidate.chars.total().abs_diff(last.chars.total()) <= self.max_distance
            && self.within_distance(char_distance, len_sum)
        {
            return Some(MergeReason::EditDistance);
        }

        // Layer 4: same test shape over phonetic multisets
        if self.use_pinyin {
            if let (Some(p), Some(q)) = (&candidate.phonetics, &last.phonetics) {
                if p.total().abs_diff(q.total()) <= self.max_distance
                    && self.within_distance(p.l1_distance(q), p.total() + q.total())
                {
                    return Some(MergeReason::Pinyin);
                }
            }
        }

        // Layer 5: bigram cosine, skipped when the edit-distance result was
        // already clearly dissimilar
        if self.max_cosine <= 100 && char_distance < len_sum {
            if let (Some(a), Some(b)) = (&candidate.bigrams, &last.bigrams) {
                if a.cosine_score(b) >= self.max_cosine {
                    return Some(MergeReason::Cosine);
                }
            }
        }

        None
    }

    /// Distance acceptance: proportional below `2 * max_distance` combined
    /// length, absolute otherwise.
    fn within_distance(&self, distance: u32, len_sum: u32) -> bool {
        if len_sum < 2 * self.max_distance {
            (distance as f64)
                < (self.max_distance as f64) * (len_sum as f64)
                    / (2.0 * self.max_distance as f64)
        } else {
            distance <= self.max_distance
        }
    }
}
