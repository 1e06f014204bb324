//! Configuration management for danmerge
//!
//! This module handles loading, validation, and defaults for the combining
//! engine configuration. Every recognized option of the engine lives here;
//! rule lists are carried as raw JSON encodings and compiled separately by
//! the `rules` module.

use crate::error::{DanmergeError, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;

mod validator;

pub use validator::ConfigValidator;

/// Main configuration structure
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CombineConfig {
    #[serde(default)]
    pub combine: CombineSection,
    #[serde(default)]
    pub normalize: NormalizeSection,
    #[serde(default)]
    pub display: DisplaySection,
    #[serde(default)]
    pub heatmap: HeatmapSection,
    #[serde(default)]
    pub rules: RuleListsSection,
}

/// Clustering and similarity options
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CombineSection {
    /// Master switch; when false the engine is an identity pass-through
    pub enable_combine: bool,
    /// Sliding-window length in seconds; a cluster never spans more
    pub threshold_seconds: f64,
    /// Maximum approximate edit distance for a merge
    pub max_distance: u32,
    /// Minimum cosine score (0-100) for a bigram-vector merge; >100 disables
    pub max_cosine: u32,
    /// Compare phonetic fingerprints in addition to characters
    pub use_pinyin: bool,
    /// Allow merging comments with different display modes
    pub cross_mode: bool,
    /// Number of comments per processing chunk
    pub max_chunk_size: usize,
}

impl Default for CombineSection {
    fn default() -> Self {
        Self {
            enable_combine: true,
            threshold_seconds: 15.0,
            max_distance: 5,
            max_cosine: 60,
            use_pinyin: true,
            cross_mode: true,
            max_chunk_size: 1000,
        }
    }
}

/// Text normalization options
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NormalizeSection {
    /// Trim trailing sentence-ending/filler characters
    pub trim_ending: bool,
    /// Fold full-width forms to half-width equivalents
    pub trim_width: bool,
    /// Collapse whitespace runs and drop single spaces between CJK chars
    pub trim_space: bool,
}

impl Default for NormalizeSection {
    fn default() -> Self {
        Self {
            trim_ending: true,
            trim_width: true,
            trim_space: true,
        }
    }
}

/// Display-fairness transform options
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DisplaySection {
    /// Elevate merged mode: bottom beats top beats default
    pub mode_elevation: bool,
    /// Enlarge representatives of popular clusters
    pub enlarge: bool,
    /// Estimated pixel width above which fixed comments scroll; 0 disables
    pub scroll_threshold: u32,
    /// Running density above which fonts shrink; 0 disables
    pub shrink_threshold: u32,
    /// Running density above which representatives drop; 0 disables
    pub drop_threshold: u32,
}

impl Default for DisplaySection {
    fn default() -> Self {
        Self {
            mode_elevation: true,
            enlarge: true,
            scroll_threshold: 0,
            shrink_threshold: 0,
            drop_threshold: 0,
        }
    }
}

/// Which comment set feeds the heatmap
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum HeatmapMode {
    Off,
    #[default]
    Combined,
    Original,
}

/// Heatmap aggregation options
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HeatmapSection {
    pub mode: HeatmapMode,
    /// Bucket width in seconds
    pub interval_seconds: u32,
}

impl Default for HeatmapSection {
    fn default() -> Self {
        Self {
            mode: HeatmapMode::default(),
            interval_seconds: 5,
        }
    }
}

/// Raw rule-list encodings, compiled lazily by the `rules` module.
///
/// Whitelist/blacklist entries are `[[is_regex, pattern], ...]`, forcelist
/// entries are `[[pattern, replacement], ...]`, and the source blacklist is
/// a plain JSON string array. Malformed encodings degrade to empty lists.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RuleListsSection {
    #[serde(default)]
    pub whitelist: String,
    #[serde(default)]
    pub blacklist: String,
    #[serde(default)]
    pub forcelist: String,
    #[serde(default)]
    pub black_source_list: String,
}

impl CombineConfig {
    /// Load configuration from a TOML file
    pub fn load(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Err(DanmergeError::ConfigNotFound {
                path: path.to_path_buf(),
            });
        }

        let content = std::fs::read_to_string(path).map_err(|e| DanmergeError::Io {
            source: e,
            context: format!("Failed to read config file: {:?}", path),
        })?;
        let config: CombineConfig = toml::from_str(&content)?;

        ConfigValidator::validate(&config)?;

        Ok(config)
    }

    /// Save configuration to a TOML file
    pub fn save(&self, path: &Path) -> Result<()> {
        let content = toml::to_string_pretty(self)?;
        std::fs::write(path, content).map_err(|e| DanmergeError::Io {
            source: e,
            context: format!("Failed to write config file: {:?}", path),
        })?;
        Ok(())
    }

    /// Whether the cosine comparison layer is active
    pub fn cosine_enabled(&self) -> bool {
        self.combine.max_cosine <= 100
    }

    /// Whether any density-based transform is active
    pub fn density_enabled(&self) -> bool {
        self.display.scroll_threshold > 0
            || self.display.shrink_threshold > 0
            || self.display.drop_threshold > 0
    }

    /// Sliding window length in milliseconds
    pub fn threshold_ms(&self) -> f64 {
        self.combine.threshold_seconds * 1000.0
    }
}
