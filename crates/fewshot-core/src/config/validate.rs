//! Configuration validation with range checks.

use crate::classifier::CentroidMode;
use crate::error::ConfigError;

use super::Config;

impl Config {
    /// Validate configuration values are within acceptable ranges.
    pub(crate) fn validate(&self) -> Result<(), ConfigError> {
        CentroidMode::parse(&self.classifier.mode)?;
        if self.classifier.temperature <= 0.0 {
            return Err(ConfigError::ValidationError(
                "classifier.temperature must be > 0".into(),
            ));
        }
        if self.classifier.beta < 0.0 {
            return Err(ConfigError::ValidationError(
                "classifier.beta must be >= 0".into(),
            ));
        }
        if self.classifier.gamma < 0.0 {
            return Err(ConfigError::ValidationError(
                "classifier.gamma must be >= 0".into(),
            ));
        }
        if self.inference.batch_size == 0 {
            return Err(ConfigError::ValidationError(
                "inference.batch_size must be > 0".into(),
            ));
        }
        Ok(())
    }
}
