//! Text normalization applied before fingerprinting
//!
//! Normalization runs in a fixed order: trailing filler trim, full-width to
//! half-width folding, whitespace collapsing, then forcelist substitution.
//! A forcelist hit replaces the text and ends normalization.

use crate::config::NormalizeSection;
use crate::rules::CompiledRules;

/// Sentence-ending and filler characters trimmed from comment tails.
const ENDING_CHARS: &str =
    ".,!?;:~-_*@#&^ \u{3000}。，、！？；：…‥～〜ー―—＿＊♪↑↓←→⇑⇓⇐⇒⬆⬇⬅➡";

/// Result of normalizing one comment text.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Normalized {
    pub text: String,
    /// A forcelist rule rewrote the text
    pub forced: bool,
}

/// Text normalizer for one compiled rule set and option set.
pub struct Normalizer<'a> {
    options: &'a NormalizeSection,
    rules: &'a CompiledRules,
}

impl<'a> Normalizer<'a> {
    pub fn new(options: &'a NormalizeSection, rules: &'a CompiledRules) -> Self {
        Self { options, rules }
    }

    /// Normalize raw comment text.
    pub fn normalize(&self, text: &str) -> Normalized {
        let mut result = text.to_string();

        if self.options.trim_ending {
            result = trim_ending(&result);
        }
        if self.options.trim_width {
            result = fold_width(&result);
        }
        if self.options.trim_space {
            result = collapse_spaces(&result);
        }

        if let Some(forced) = self.rules.apply_forcelist(&result) {
            return Normalized {
                text: forced,
                forced: true,
            };
        }

        Normalized {
            text: result,
            forced: false,
        }
    }
}

/// Drop trailing filler characters, but never trim a string to nothing.
fn trim_ending(text: &str) -> String {
    let trimmed = text.trim_end_matches(|c| ENDING_CHARS.contains(c));
    if trimmed.is_empty() {
        text.to_string()
    } else {
        trimmed.to_string()
    }
}

/// Map full-width ASCII forms and the ideographic space to half-width.
fn fold_width(text: &str) -> String {
    text.chars()
        .map(|c| match c {
            '\u{ff01}'..='\u{ff5e}' => {
                char::from_u32(c as u32 - 0xfee0).unwrap_or(c)
            }
            '\u{3000}' => ' ',
            _ => c,
        })
        .collect()
}

fn is_space(c: char) -> bool {
    c == ' ' || c == '\u{3000}' || c == '\t'
}

fn is_cjk(c: char) -> bool {
    matches!(c as u32, 0x3400..=0x4dbf | 0x4e00..=0x9fff | 0xf900..=0xfaff)
}

/// Collapse space runs to one space and drop a single space strictly
/// between two adjacent CJK characters.
fn collapse_spaces(text: &str) -> String {
    let mut collapsed: Vec<char> = Vec::with_capacity(text.len());
    let mut in_run = false;
    for c in text.chars() {
        if is_space(c) {
            if !in_run {
                collapsed.push(' ');
                in_run = true;
            }
        } else {
            collapsed.push(c);
            in_run = false;
        }
    }

    let mut result = String::with_capacity(collapsed.len());
    for (i, &c) in collapsed.iter().enumerate() {
        if c == ' ' && i > 0 && i + 1 < collapsed.len() {
            let prev = collapsed[i - 1];
            let next = collapsed[i + 1];
            if is_cjk(prev) && is_cjk(next) {
                continue;
            }
        }
        result.push(c);
    }
    result
}
