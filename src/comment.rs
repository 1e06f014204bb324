// Core data model: raw comments and output representatives
use serde::de::Deserializer;
use serde::{Deserialize, Serialize};

/// Display mode of a danmaku comment.
///
/// `Scroll`/`Reverse`/`Top`/`Bottom` are mergeable; `Special`/`Code`/`Bas`
/// are effect-category modes that bypass clustering entirely.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum CommentMode {
    #[default]
    Scroll,
    Reverse,
    Top,
    Bottom,
    Special,
    Code,
    Bas,
}

impl CommentMode {
    /// Parse from the conventional numeric wire code.
    pub fn from_code(code: i64) -> Option<Self> {
        match code {
            1..=3 => Some(Self::Scroll),
            4 => Some(Self::Bottom),
            5 => Some(Self::Top),
            6 => Some(Self::Reverse),
            7 => Some(Self::Special),
            8 => Some(Self::Code),
            9 => Some(Self::Bas),
            _ => None,
        }
    }

    /// Parse from a lowercase mode name.
    pub fn from_name(name: &str) -> Option<Self> {
        match name {
            "scroll" => Some(Self::Scroll),
            "reverse" => Some(Self::Reverse),
            "top" => Some(Self::Top),
            "bottom" => Some(Self::Bottom),
            "special" => Some(Self::Special),
            "code" => Some(Self::Code),
            "bas" => Some(Self::Bas),
            _ => None,
        }
    }

    /// Effect-category modes never enter the clustering algorithm.
    pub fn is_effect(self) -> bool {
        matches!(self, Self::Special | Self::Code | Self::Bas)
    }

    /// Fixed-position modes are candidates for scroll conversion.
    pub fn is_fixed(self) -> bool {
        matches!(self, Self::Top | Self::Bottom)
    }
}

impl<'de> Deserialize<'de> for CommentMode {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        // Accept a mode name, a numeric wire code, or anything else (which
        // degrades to the default scroll mode rather than aborting the batch).
        let value = serde_json::Value::deserialize(deserializer)?;
        Ok(match &value {
            serde_json::Value::String(s) => Self::from_name(s).unwrap_or_default(),
            serde_json::Value::Number(n) => n
                .as_i64()
                .and_then(Self::from_code)
                .unwrap_or_default(),
            _ => Self::default(),
        })
    }
}

/// A single raw danmaku comment, immutable once parsed.
///
/// Every field is deserialized leniently: a missing or type-mismatched field
/// becomes its default instead of failing the whole input set.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Comment {
    #[serde(default, deserialize_with = "lenient_i64")]
    pub id: i64,
    /// Playback offset in milliseconds.
    #[serde(default, deserialize_with = "lenient_f64")]
    pub time_ms: f64,
    #[serde(default)]
    pub mode: CommentMode,
    /// RGB color, 0..=0xFFFFFF.
    #[serde(default, deserialize_with = "lenient_u32")]
    pub color: u32,
    #[serde(default)]
    pub user_tag: String,
    #[serde(default)]
    pub text: String,
    /// Identifier of the feed this comment came from.
    #[serde(default)]
    pub source_tag: String,
    #[serde(default = "default_font_size", deserialize_with = "lenient_font")]
    pub font_size: u32,
    #[serde(default, deserialize_with = "lenient_i32")]
    pub weight: i32,
}

fn default_font_size() -> u32 {
    25
}

impl Default for Comment {
    fn default() -> Self {
        Self {
            id: 0,
            time_ms: 0.0,
            mode: CommentMode::default(),
            color: 0xFFFFFF,
            user_tag: String::new(),
            text: String::new(),
            source_tag: String::new(),
            font_size: default_font_size(),
            weight: 0,
        }
    }
}

/// The chosen display stand-in for one finalized cluster.
///
/// A representative is a composition: it copies the template fields of the
/// cluster's first member and layers cluster-derived fields on top. It is
/// never a subtype of `Comment`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Representative {
    pub time_ms: f64,
    pub mode: CommentMode,
    pub color: u32,
    pub user_tag: String,
    pub source_tag: String,
    /// Chosen display text (most frequent normalized variant).
    pub text: String,
    pub font_size: u32,
    pub weight: i32,
    /// Number of merged member comments.
    pub mark_count: usize,
    /// Human-readable rationale for each transform applied.
    #[serde(default)]
    pub descriptions: Vec<String>,
}

impl Representative {
    /// Build a representative inheriting the template comment's fields.
    pub fn from_template(template: &Comment) -> Self {
        Self {
            time_ms: template.time_ms,
            mode: template.mode,
            color: template.color,
            user_tag: template.user_tag.clone(),
            source_tag: template.source_tag.clone(),
            text: template.text.clone(),
            font_size: template.font_size,
            weight: template.weight,
            mark_count: 1,
            descriptions: Vec::new(),
        }
    }
}

fn lenient_f64<'de, D: Deserializer<'de>>(deserializer: D) -> Result<f64, D::Error> {
    let value = serde_json::Value::deserialize(deserializer)?;
    Ok(match &value {
        serde_json::Value::Number(n) => n.as_f64().unwrap_or(0.0),
        serde_json::Value::String(s) => s.trim().parse().unwrap_or(0.0),
        _ => 0.0,
    })
}

fn lenient_i64<'de, D: Deserializer<'de>>(deserializer: D) -> Result<i64, D::Error> {
    let value = serde_json::Value::deserialize(deserializer)?;
    Ok(match &value {
        serde_json::Value::Number(n) => n.as_i64().unwrap_or(0),
        serde_json::Value::String(s) => s.trim().parse().unwrap_or(0),
        _ => 0,
    })
}

fn lenient_i32<'de, D: Deserializer<'de>>(deserializer: D) -> Result<i32, D::Error> {
    lenient_i64(deserializer).map(|v| v.clamp(i32::MIN as i64, i32::MAX as i64) as i32)
}

fn lenient_u32<'de, D: Deserializer<'de>>(deserializer: D) -> Result<u32, D::Error> {
    lenient_i64(deserializer).map(|v| v.clamp(0, u32::MAX as i64) as u32)
}

fn lenient_font<'de, D: Deserializer<'de>>(deserializer: D) -> Result<u32, D::Error> {
    lenient_i64(deserializer).map(|v| {
        if v <= 0 {
            default_font_size()
        } else {
            v.min(u32::MAX as i64) as u32
        }
    })
}

/// Parse a JSON array of comments, tolerating unknown fields and bad values.
pub fn parse_comments(json: &str) -> crate::Result<Vec<Comment>> {
    serde_json::from_str(json).map_err(|e| crate::DanmergeError::Json {
        source: e,
        context: "Failed to parse comment list".to_string(),
    })
}
