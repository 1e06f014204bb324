//! Rule compilation for whitelist/blacklist/forcelist filtering
//!
//! Rule lists arrive as raw JSON encodings and compile into matcher sets:
//! - whitelist/blacklist: `[[is_regex, pattern], ...]`
//! - forcelist: `[[pattern, replacement], ...]`
//! - source blacklist: `["source", ...]`
//!
//! Compilation never fails. A malformed document degrades to an empty list,
//! a malformed entry or invalid regex is skipped with a warning, so a bad
//! rule set means "no filtering effect" rather than an aborted run.

use crate::config::RuleListsSection;
use regex::{Regex, RegexBuilder};
use serde_json::Value;
use std::collections::HashSet;
use std::sync::{Arc, Mutex};
use tracing::{debug, warn};

/// One compiled whitelist or blacklist rule.
#[derive(Debug, Clone)]
pub struct TextRule {
    /// Original pattern text, reported on blacklist hits
    pub pattern: String,
    matcher: TextMatcher,
}

#[derive(Debug, Clone)]
enum TextMatcher {
    /// Lower-cased literal, matched as a case-insensitive substring
    Literal(String),
    Regex(Regex),
}

impl TextRule {
    fn matches(&self, text: &str) -> bool {
        match &self.matcher {
            TextMatcher::Literal(needle) => text.to_lowercase().contains(needle),
            TextMatcher::Regex(re) => re.is_match(text),
        }
    }
}

/// One compiled forcelist rule: first match rewrites the text.
#[derive(Debug, Clone)]
pub struct ForceRule {
    pub pattern: String,
    regex: Regex,
    replacement: String,
}

/// Immutable compiled rule set, shared read-only across comparator calls.
#[derive(Debug, Clone, Default)]
pub struct CompiledRules {
    whitelist: Vec<TextRule>,
    blacklist: Vec<TextRule>,
    forcelist: Vec<ForceRule>,
    black_sources: HashSet<String>,
}

impl CompiledRules {
    /// Compile the four raw rule lists. Never fails; bad input degrades.
    pub fn compile(lists: &RuleListsSection) -> Self {
        // Whitelist/forcelist regexes are case-insensitive, blacklist
        // regexes case-sensitive; literals always match case-insensitively.
        Self {
            whitelist: compile_text_rules(&lists.whitelist, "whitelist", true),
            blacklist: compile_text_rules(&lists.blacklist, "blacklist", false),
            forcelist: compile_force_rules(&lists.forcelist),
            black_sources: compile_source_list(&lists.black_source_list),
        }
    }

    /// Content-hash signature over the raw rule lists.
    pub fn signature(lists: &RuleListsSection) -> String {
        let mut hasher = blake3::Hasher::new();
        for raw in [
            &lists.whitelist,
            &lists.blacklist,
            &lists.forcelist,
            &lists.black_source_list,
        ] {
            hasher.update(raw.as_bytes());
            hasher.update(&[0x1f]);
        }
        hasher.finalize().to_hex().to_string()
    }

    /// Does any whitelist rule match this text?
    pub fn whitelist_match(&self, text: &str) -> bool {
        self.whitelist.iter().any(|r| r.matches(text))
    }

    /// First blacklist rule matching this text, as its pattern source.
    pub fn blacklist_match(&self, text: &str) -> Option<&str> {
        self.blacklist
            .iter()
            .find(|r| r.matches(text))
            .map(|r| r.pattern.as_str())
    }

    /// Apply the forcelist in list order; the first matching rule
    /// substitutes and wins.
    pub fn apply_forcelist(&self, text: &str) -> Option<String> {
        for rule in &self.forcelist {
            if rule.regex.is_match(text) {
                return Some(rule.regex.replace_all(text, rule.replacement.as_str()).into_owned());
            }
        }
        None
    }

    /// Is this source tag blacklisted?
    pub fn source_blacklisted(&self, source: &str) -> bool {
        self.black_sources.contains(source)
    }

    pub fn is_empty(&self) -> bool {
        self.whitelist.is_empty()
            && self.blacklist.is_empty()
            && self.forcelist.is_empty()
            && self.black_sources.is_empty()
    }
}

fn parse_entries(raw: &str, list_name: &str) -> Vec<Value> {
    if raw.trim().is_empty() {
        return Vec::new();
    }
    match serde_json::from_str::<Value>(raw) {
        Ok(Value::Array(entries)) => entries,
        Ok(_) => {
            warn!(list = list_name, "rule list is not a JSON array, treating as empty");
            Vec::new()
        }
        Err(e) => {
            warn!(list = list_name, error = %e, "malformed rule list JSON, treating as empty");
            Vec::new()
        }
    }
}

fn compile_text_rules(raw: &str, list_name: &str, case_insensitive: bool) -> Vec<TextRule> {
    let mut rules = Vec::new();
    for entry in parse_entries(raw, list_name) {
        let Some(pair) = entry.as_array() else {
            warn!(list = list_name, "skipping non-array rule entry");
            continue;
        };
        let (Some(is_regex), Some(pattern)) =
            (pair.first().and_then(Value::as_bool), pair.get(1).and_then(Value::as_str))
        else {
            warn!(list = list_name, "skipping malformed rule entry");
            continue;
        };

        let matcher = if is_regex {
            match RegexBuilder::new(pattern)
                .case_insensitive(case_insensitive)
                .build()
            {
                Ok(re) => TextMatcher::Regex(re),
                Err(e) => {
                    // One bad regex never aborts compilation of the rest
                    warn!(list = list_name, pattern, error = %e, "skipping invalid regex rule");
                    continue;
                }
            }
        } else {
            TextMatcher::Literal(pattern.to_lowercase())
        };

        rules.push(TextRule {
            pattern: pattern.to_string(),
            matcher,
        });
    }
    rules
}

fn compile_force_rules(raw: &str) -> Vec<ForceRule> {
    let mut rules = Vec::new();
    for entry in parse_entries(raw, "forcelist") {
        let Some(pair) = entry.as_array() else {
            warn!(list = "forcelist", "skipping non-array rule entry");
            continue;
        };
        let (Some(pattern), Some(replacement)) =
            (pair.first().and_then(Value::as_str), pair.get(1).and_then(Value::as_str))
        else {
            warn!(list = "forcelist", "skipping malformed rule entry");
            continue;
        };

        match RegexBuilder::new(pattern).case_insensitive(true).build() {
            Ok(regex) => rules.push(ForceRule {
                pattern: pattern.to_string(),
                regex,
                replacement: replacement.to_string(),
            }),
            Err(e) => {
                warn!(list = "forcelist", pattern, error = %e, "skipping invalid regex rule");
            }
        }
    }
    rules
}

fn compile_source_list(raw: &str) -> HashSet<String> {
    parse_entries(raw, "black_source_list")
        .into_iter()
        .filter_map(|v| v.as_str().map(str::to_string))
        .collect()
}

/// Caller-owned cache of the compiled rule set.
///
/// Keyed by a blake3 content hash over the raw lists; the compiled set is
/// only rebuilt when the signature changes and is swapped wholesale, so
/// concurrent readers always see a complete set.
#[derive(Debug, Default)]
pub struct RuleCache {
    slot: Mutex<Option<(String, Arc<CompiledRules>)>>,
}

impl RuleCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Return the compiled set for these lists, recompiling only when the
    /// content signature has changed.
    pub fn get_or_compile(&self, lists: &RuleListsSection) -> Arc<CompiledRules> {
        let signature = CompiledRules::signature(lists);
        let mut slot = self.slot.lock().unwrap();

        if let Some((cached_sig, compiled)) = slot.as_ref() {
            if *cached_sig == signature {
                return Arc::clone(compiled);
            }
        }

        debug!(signature = %signature, "compiling rule lists");
        let compiled = Arc::new(CompiledRules::compile(lists));
        *slot = Some((signature, Arc::clone(&compiled)));
        compiled
    }
}
