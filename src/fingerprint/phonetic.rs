// Static phonetic component table, loaded once from the bundled resource
use ahash::{HashMap, HashMapExt};
use std::sync::OnceLock;

static TABLE: OnceLock<PhoneticTable> = OnceLock::new();

// Component codes start above the Unicode scalar range so they can never
// collide with fallback code points.
const COMPONENT_BASE: u32 = 0x0011_0000;

/// Character to phonetic-component-code lookup.
///
/// Each covered character maps to one or two component codes (initial and
/// final). Characters without an entry fall back to their own lower-cased
/// code point as a pseudo-key, so uncovered text still fingerprints
/// deterministically.
pub struct PhoneticTable {
    entries: HashMap<char, (u32, Option<u32>)>,
}

impl PhoneticTable {
    fn parse(data: &str) -> Self {
        let mut components: HashMap<String, u32> = HashMap::new();
        let mut entries = HashMap::new();

        for line in data.lines() {
            let line = line.trim();
            if line.is_empty() || line.starts_with('#') {
                continue;
            }
            let mut parts = line.split('\t');
            let Some(ch) = parts.next().and_then(|s| s.chars().next()) else {
                continue;
            };
            let Some(first) = parts.next().filter(|s| !s.is_empty()) else {
                continue;
            };
            let second = parts.next().filter(|s| !s.is_empty());

            let c1 = intern(&mut components, first);
            let c2 = second.map(|s| intern(&mut components, s));
            entries.insert(ch, (c1, c2));
        }

        Self { entries }
    }

    /// Component codes for a character, with the lower-cased code point
    /// fallback for uncovered characters.
    pub fn codes(&self, c: char) -> (u32, Option<u32>) {
        match self.entries.get(&c) {
            Some(&codes) => codes,
            None => {
                let lower = c.to_lowercase().next().unwrap_or(c);
                (lower as u32, None)
            }
        }
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

fn intern(components: &mut HashMap<String, u32>, component: &str) -> u32 {
    let next = COMPONENT_BASE + components.len() as u32;
    *components.entry(component.to_string()).or_insert(next)
}

/// Access the bundled phonetic table, parsing it on first use.
pub fn table() -> &'static PhoneticTable {
    TABLE.get_or_init(|| PhoneticTable::parse(include_str!("../../data/phonetics.tsv")))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_table_loads() {
        let t = table();
        assert!(!t.is_empty());
    }

    #[test]
    fn test_known_character_has_components() {
        let t = table();
        let (first, second) = t.codes('的');
        assert!(first >= COMPONENT_BASE);
        assert!(second.is_some());
    }

    #[test]
    fn test_no_initial_syllable_has_single_component() {
        let t = table();
        let (_, second) = t.codes('啊');
        assert!(second.is_none());
    }

    #[test]
    fn test_homophones_share_components() {
        let t = table();
        // 他 and 她 are both "ta"
        assert_eq!(t.codes('他'), t.codes('她'));
        // 草 and 槽 are both "cao"
        assert_eq!(t.codes('草'), t.codes('槽'));
    }

    #[test]
    fn test_fallback_is_lowercased_code_point() {
        let t = table();
        assert_eq!(t.codes('A'), ('a' as u32, None));
        assert_eq!(t.codes('z'), ('z' as u32, None));
        // Fallbacks never collide with component codes
        let (code, _) = t.codes('€');
        assert!(code < COMPONENT_BASE);
    }
}
