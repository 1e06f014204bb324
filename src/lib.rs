//! Danmerge - Danmaku Deduplication and Declutter Engine
//!
//! A batch engine that clusters near-duplicate timed overlay comments
//! ("danmaku"), selects one representative per cluster, and applies
//! display-fairness transforms: enlarging popular merges, shrinking or
//! dropping representatives under on-screen density pressure, and converting
//! overflowing fixed-position comments to scrolling ones. Input batches are
//! time-sorted and processed in bounded chunks, with a lookahead pass that
//! lets clusters absorb the leading edge of the following chunk.

pub mod cli;
pub mod cluster;
pub mod comment;
pub mod config;
pub mod error;
pub mod fingerprint;
pub mod heatmap;
pub mod normalize;
pub mod pipeline;
pub mod postprocess;
pub mod rules;
pub mod similarity;
pub mod stats;

pub use comment::{Comment, CommentMode, Representative};
pub use config::CombineConfig;
pub use error::{DanmergeError, Result};
pub use pipeline::{combine, CombineOutput};
pub use rules::RuleCache;
