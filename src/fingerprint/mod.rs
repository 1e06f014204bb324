//! Comment fingerprints: comparable multisets derived from normalized text
//!
//! A fingerprint carries up to three multisets: character counts, phonetic
//! component counts, and bigram-hash counts. Each multiset caches its total
//! cardinality for cheap length-based pre-filtering. Fingerprints are
//! deterministic functions of (normalized text, options) and never mutate.

use ahash::{HashMap, HashMapExt};

pub mod phonetic;

/// Modulus for the bigram pair hash.
const BIGRAM_MOD: u32 = 1007;

/// A key -> occurrence-count multiset with cached total cardinality.
#[derive(Debug, Clone, Default)]
pub struct Multiset {
    counts: HashMap<u32, u32>,
    total: u32,
}

impl Multiset {
    fn add(&mut self, key: u32) {
        *self.counts.entry(key).or_insert(0) += 1;
        self.total += 1;
    }

    /// Total cardinality (sum of all counts).
    pub fn total(&self) -> u32 {
        self.total
    }

    /// Exact multiset equality.
    pub fn same_counts(&self, other: &Multiset) -> bool {
        self.counts == other.counts
    }

    /// L1 distance: sum over all keys of |count_a - count_b|.
    pub fn l1_distance(&self, other: &Multiset) -> u32 {
        let mut distance = 0u32;
        for (key, &count) in &self.counts {
            distance += count.abs_diff(other.counts.get(key).copied().unwrap_or(0));
        }
        for (key, &count) in &other.counts {
            if !self.counts.contains_key(key) {
                distance += count;
            }
        }
        distance
    }

    /// Squared-cosine score scaled to 0..=100: `dot^2 / (|a|^2 * |b|^2) * 100`.
    pub fn cosine_score(&self, other: &Multiset) -> u32 {
        let mut dot = 0u64;
        let mut norm_a = 0u64;
        let mut norm_b = 0u64;

        for (key, &count) in &self.counts {
            let c = count as u64;
            norm_a += c * c;
            if let Some(&other_count) = other.counts.get(key) {
                dot += c * other_count as u64;
            }
        }
        for &count in other.counts.values() {
            let c = count as u64;
            norm_b += c * c;
        }

        if norm_a == 0 || norm_b == 0 {
            return 0;
        }
        let score = (dot as f64 * dot as f64) / (norm_a as f64 * norm_b as f64) * 100.0;
        score as u32
    }
}

/// Which optional multisets to build.
#[derive(Debug, Clone, Copy)]
pub struct FingerprintOptions {
    pub use_pinyin: bool,
    pub use_bigrams: bool,
}

/// Derived, immutable fingerprint of one normalized comment text.
#[derive(Debug, Clone)]
pub struct Fingerprint {
    /// Character code point counts
    pub chars: Multiset,
    /// Phonetic component counts, present when pinyin comparison is on
    pub phonetics: Option<Multiset>,
    /// Adjacent-pair hash counts, present when cosine comparison is on
    pub bigrams: Option<Multiset>,
}

impl Fingerprint {
    /// Build a fingerprint from normalized text.
    pub fn build(text: &str, options: FingerprintOptions) -> Self {
        let mut chars = Multiset::default();
        for c in text.chars() {
            chars.add(c as u32);
        }

        let phonetics = options.use_pinyin.then(|| {
            let table = phonetic::table();
            let mut set = Multiset::default();
            for c in text.chars() {
                let (first, second) = table.codes(c);
                set.add(first);
                if let Some(second) = second {
                    set.add(second);
                }
            }
            set
        });

        let bigrams = options.use_bigrams.then(|| {
            let mut set = Multiset::default();
            let mut prev: Option<u32> = None;
            for c in text.chars() {
                let cur = c as u32;
                if let Some(prev) = prev {
                    set.add((prev % BIGRAM_MOD) * BIGRAM_MOD + cur % BIGRAM_MOD);
                }
                prev = Some(cur);
            }
            set
        });

        Self {
            chars,
            phonetics,
            bigrams,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn all_options() -> FingerprintOptions {
        FingerprintOptions {
            use_pinyin: true,
            use_bigrams: true,
        }
    }

    #[test]
    fn test_char_multiset_counts() {
        let fp = Fingerprint::build("aab", all_options());
        assert_eq!(fp.chars.total(), 3);
        assert_eq!(fp.chars.counts[&('a' as u32)], 2);
        assert_eq!(fp.chars.counts[&('b' as u32)], 1);
    }

    #[test]
    fn test_anagrams_share_char_multiset() {
        let a = Fingerprint::build("abc", all_options());
        let b = Fingerprint::build("cba", all_options());
        assert!(a.chars.same_counts(&b.chars));
        // But their bigram sets differ
        let (ba, bb) = (a.bigrams.unwrap(), b.bigrams.unwrap());
        assert!(!ba.same_counts(&bb));
    }

    #[test]
    fn test_l1_distance() {
        let a = Fingerprint::build("hello", all_options());
        let b = Fingerprint::build("hallo", all_options());
        // 'e' vs 'a': one removed, one added
        assert_eq!(a.chars.l1_distance(&b.chars), 2);
        assert_eq!(a.chars.l1_distance(&a.chars), 0);
    }

    #[test]
    fn test_l1_distance_symmetric() {
        let a = Fingerprint::build("abcd", all_options());
        let b = Fingerprint::build("xy", all_options());
        assert_eq!(a.chars.l1_distance(&b.chars), b.chars.l1_distance(&a.chars));
        assert_eq!(a.chars.l1_distance(&b.chars), 6);
    }

    #[test]
    fn test_cosine_score_bounds() {
        let a = Fingerprint::build("hello world", all_options());
        let b = Fingerprint::build("hello world", all_options());
        let c = Fingerprint::build("zzzzqqqq", all_options());

        let same = a.bigrams.as_ref().unwrap();
        assert_eq!(same.cosine_score(b.bigrams.as_ref().unwrap()), 100);
        assert_eq!(same.cosine_score(c.bigrams.as_ref().unwrap()), 0);
    }

    #[test]
    fn test_bigram_count() {
        let fp = Fingerprint::build("abcd", all_options());
        // Three adjacent pairs
        assert_eq!(fp.bigrams.unwrap().total(), 3);
        let single = Fingerprint::build("a", all_options());
        assert_eq!(single.bigrams.unwrap().total(), 0);
    }

    #[test]
    fn test_options_gate_optional_sets() {
        let fp = Fingerprint::build(
            "abc",
            FingerprintOptions {
                use_pinyin: false,
                use_bigrams: false,
            },
        );
        assert!(fp.phonetics.is_none());
        assert!(fp.bigrams.is_none());
    }

    #[test]
    fn test_phonetic_merge_of_homophones() {
        let a = Fingerprint::build("草", all_options());
        let b = Fingerprint::build("槽", all_options());
        // Different characters, same phonetic components
        assert!(!a.chars.same_counts(&b.chars));
        assert!(a
            .phonetics
            .as_ref()
            .unwrap()
            .same_counts(b.phonetics.as_ref().unwrap()));
    }
}
