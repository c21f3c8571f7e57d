use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::{FeatureGeneratorError, Result};

pub const DEFAULT_LOCALIZATION_CHANNEL: &str = "/apollo/localization/pose";
pub const DEFAULT_CHASSIS_CHANNEL: &str = "/apollo/canbus/chassis";

/// Shard encoding, handed through to the shard writer
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OutputEncoding {
    #[default]
    Binary,
    Text,
}

impl OutputEncoding {
    pub fn extension(&self) -> &'static str {
        match self {
            OutputEncoding::Binary => "bin",
            OutputEncoding::Text => "txt",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FeatureGeneratorConfig {
    /// Number of localization messages that make up one label window (default: 100).
    pub label_sample_interval: usize,
    /// Number of frames written per shard (default: 100).
    pub frames_per_shard: usize,
    /// Stride between window samples turned into label points (default: 10).
    pub trajectory_point_sample_interval: usize,
    /// Oldest window entries dropped after each label (default: 5).
    pub window_step: usize,
    pub output_encoding: OutputEncoding,
    /// Directory shards are written into (default: "data").
    pub data_dir: PathBuf,
    pub localization_channel: String,
    pub chassis_channel: String,
}

impl Default for FeatureGeneratorConfig {
    fn default() -> Self {
        Self {
            label_sample_interval: 100,
            frames_per_shard: 100,
            trajectory_point_sample_interval: 10,
            window_step: 5,
            output_encoding: OutputEncoding::Binary,
            data_dir: PathBuf::from("data"),
            localization_channel: DEFAULT_LOCALIZATION_CHANNEL.to_string(),
            chassis_channel: DEFAULT_CHASSIS_CHANNEL.to_string(),
        }
    }
}

impl FeatureGeneratorConfig {
    /// Load a JSON config file. Missing fields keep their defaults.
    pub fn load(path: &Path) -> Result<Self> {
        let text = fs::read_to_string(path)?;
        let config: FeatureGeneratorConfig = serde_json::from_str(&text).map_err(|e| {
            FeatureGeneratorError::InvalidConfig(format!("{}: {}", path.display(), e))
        })?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        let positive = [
            ("label_sample_interval", self.label_sample_interval),
            ("frames_per_shard", self.frames_per_shard),
            (
                "trajectory_point_sample_interval",
                self.trajectory_point_sample_interval,
            ),
            ("window_step", self.window_step),
        ];
        for (name, value) in positive {
            if value == 0 {
                return Err(FeatureGeneratorError::InvalidConfig(format!(
                    "{name} must be greater than zero"
                )));
            }
        }

        if self.window_step > self.label_sample_interval {
            return Err(FeatureGeneratorError::InvalidConfig(format!(
                "window_step ({}) must not exceed label_sample_interval ({})",
                self.window_step, self.label_sample_interval
            )));
        }

        if self.localization_channel == self.chassis_channel {
            return Err(FeatureGeneratorError::InvalidConfig(
                "localization and chassis channels must differ".to_string(),
            ));
        }

        Ok(())
    }
}
