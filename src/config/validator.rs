use crate::config::CombineConfig;
use crate::error::{DanmergeError, Result, ValidationError};

/// Configuration validator
pub struct ConfigValidator;

impl ConfigValidator {
    /// Validate the configuration
    pub fn validate(config: &CombineConfig) -> Result<()> {
        let mut errors = Vec::new();

        Self::validate_combine(config, &mut errors);
        Self::validate_heatmap(config, &mut errors);

        if errors.is_empty() {
            Ok(())
        } else {
            Err(DanmergeError::ConfigValidation { errors })
        }
    }

    fn validate_combine(config: &CombineConfig, errors: &mut Vec<ValidationError>) {
        let combine = &config.combine;

        if !combine.threshold_seconds.is_finite() || combine.threshold_seconds <= 0.0 {
            errors.push(ValidationError::new(
                "combine.threshold_seconds",
                "Threshold must be a positive number of seconds",
            ));
        }

        if combine.max_chunk_size == 0 {
            errors.push(ValidationError::new(
                "combine.max_chunk_size",
                "Chunk size must be greater than 0",
            ));
        }
    }

    fn validate_heatmap(config: &CombineConfig, errors: &mut Vec<ValidationError>) {
        if config.heatmap.interval_seconds == 0 {
            errors.push(ValidationError::new(
                "heatmap.interval_seconds",
                "Heatmap interval must be greater than 0",
            ));
        }
    }
}
