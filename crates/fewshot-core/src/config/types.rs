//! Sub-configuration structs with defaults.

use serde::{Deserialize, Serialize};

use crate::classifier::ClassifierParams;
use crate::inference::InferenceOptions;

/// Classifier hyperparameter settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ClassifierConfig {
    /// Centroid-computation variant ("mean" or "rocchio")
    pub mode: String,

    /// Rocchio weight on the target class mean
    pub beta: f32,

    /// Rocchio weight on the subtracted opposite-class mean
    pub gamma: f32,

    /// Score sharpness; smaller values saturate confidences faster
    pub temperature: f32,
}

impl Default for ClassifierConfig {
    fn default() -> Self {
        let params = ClassifierParams::default();
        Self {
            mode: params.mode,
            beta: params.beta,
            gamma: params.gamma,
            temperature: params.temperature,
        }
    }
}

impl ClassifierConfig {
    /// Convert to the classifier's parameter struct.
    pub fn to_params(&self) -> ClassifierParams {
        ClassifierParams {
            mode: self.mode.clone(),
            beta: self.beta,
            gamma: self.gamma,
            temperature: self.temperature,
        }
    }
}

/// Batch inference settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct InferenceConfig {
    /// Samples per inference batch
    pub batch_size: usize,

    /// Concurrent batch workers; 0 means fully sequential
    pub num_workers: usize,

    /// Omit samples whose embedding cannot be retrieved instead of
    /// aborting the run
    pub skip_failures: bool,
}

impl Default for InferenceConfig {
    fn default() -> Self {
        Self {
            batch_size: 1024,
            num_workers: 0,
            skip_failures: true,
        }
    }
}

impl InferenceConfig {
    /// Convert to the engine's option struct.
    pub fn to_options(&self) -> InferenceOptions {
        InferenceOptions {
            batch_size: self.batch_size,
            num_workers: self.num_workers,
            skip_failures: self.skip_failures,
        }
    }
}

/// Logging settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Log level: error, warn, info, debug, trace
    pub level: String,

    /// Log format: "pretty" or "json"
    pub format: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            format: "pretty".to_string(),
        }
    }
}
