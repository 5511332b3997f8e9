//! JSON configuration file.
//!
//! Every field is optional; missing fields keep their defaults.
//!
//! ```json
//! {
//!   "budget": 1500,
//!   "workers": 4,
//!   "rate": "130%",
//!   "polly": { "voice": "Brian", "region": "us-east-1" },
//!   "player": { "program": "/usr/bin/afplay", "args": ["-q", "1"] }
//! }
//! ```

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::SayError;
#[cfg(feature = "polly")]
use crate::engines::polly::PollyConfig;
use crate::markup::DEFAULT_RATE;
use crate::output::DEFAULT_EXTENSION;
use crate::pipeline::{PipelineConfig, PipelineConfigBuilder};
use crate::playback::Player;
use crate::pool::{DEFAULT_QUEUE_CAPACITY, DEFAULT_WORKERS};
use crate::segment::DEFAULT_BUDGET;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SayConfig {
    pub budget: usize,
    pub workers: usize,
    pub queue_capacity: usize,
    pub rate: String,
    pub out_dir: PathBuf,
    pub extension: String,
    #[cfg(feature = "polly")]
    pub polly: PollyConfig,
    pub player: Player,
}

impl Default for SayConfig {
    fn default() -> Self {
        Self {
            budget: DEFAULT_BUDGET,
            workers: DEFAULT_WORKERS,
            queue_capacity: DEFAULT_QUEUE_CAPACITY,
            rate: DEFAULT_RATE.to_string(),
            out_dir: PathBuf::from("."),
            extension: DEFAULT_EXTENSION.to_string(),
            #[cfg(feature = "polly")]
            polly: PollyConfig::default(),
            player: Player::default(),
        }
    }
}

impl SayConfig {
    pub fn load(path: &Path) -> Result<Self, SayError> {
        let content = std::fs::read_to_string(path)?;
        let config = Self::from_json(&content).map_err(|source| SayError::ConfigParse {
            path: path.to_path_buf(),
            source,
        })?;
        log::info!("Loaded configuration from {}", path.display());
        Ok(config)
    }

    pub fn from_json(content: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(content)
    }

    /// Pipeline settings for a run whose files start with `prefix`.
    pub fn pipeline(&self, prefix: &str) -> Result<PipelineConfig, SayError> {
        Ok(PipelineConfigBuilder::default()
            .budget(self.budget)
            .workers(self.workers)
            .queue_capacity(self.queue_capacity)
            .rate(self.rate.as_str())
            .out_dir(self.out_dir.as_path())
            .prefix(prefix)
            .extension(self.extension.as_str())
            .build()?)
    }
}

#[cfg(test)]
mod tests {
    use super::SayConfig;
    use crate::error::SayError;

    #[test]
    fn empty_object_keeps_defaults() {
        assert_eq!(SayConfig::from_json("{}").unwrap(), SayConfig::default());
    }

    #[test]
    fn overrides_selected_fields() {
        let config = SayConfig::from_json(
            r#"{ "workers": 8, "budget": 900, "player": { "program": "mpg123", "args": [] } }"#,
        )
        .unwrap();
        assert_eq!(config.workers, 8);
        assert_eq!(config.budget, 900);
        assert_eq!(config.player.program, std::path::PathBuf::from("mpg123"));
        assert!(config.player.args.is_empty());
        assert_eq!(config.rate, SayConfig::default().rate);
    }

    #[test]
    fn builds_pipeline_config() {
        let config = SayConfig {
            workers: 2,
            ..SayConfig::default()
        };
        let pipeline = config.pipeline("book").unwrap();
        assert_eq!(pipeline.workers, 2);
        assert_eq!(pipeline.prefix, "book");
        assert_eq!(pipeline.budget, 1500);
    }

    #[test]
    fn invalid_values_surface_as_config_errors() {
        let config = SayConfig {
            workers: 0,
            ..SayConfig::default()
        };
        assert!(matches!(config.pipeline(""), Err(SayError::Config(_))));
    }

    #[test]
    fn load_reports_the_offending_path() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("say.json");
        std::fs::write(&path, "{ not json").unwrap();
        match SayConfig::load(&path) {
            Err(SayError::ConfigParse { path: reported, .. }) => assert_eq!(reported, path),
            other => panic!("expected parse error, got {other:?}"),
        }
    }
}
