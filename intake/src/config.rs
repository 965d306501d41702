use std::path::Path;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use shared::{FacingMode, MediaType};

use crate::error::ConfigError;

pub const DEFAULT_MAX_FILE_BYTES: u64 = 10 * 1024 * 1024;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct IntakeConfig {
    pub accept: AcceptPolicy,
    pub camera: CameraConfig,
    pub detection: DetectionConfig,
}

/// Acceptance constraints applied to every selected file.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AcceptPolicy {
    pub allowed_types: Vec<MediaType>,
    pub max_file_bytes: u64,
}

impl Default for AcceptPolicy {
    fn default() -> Self {
        Self {
            allowed_types: vec![MediaType::Jpeg, MediaType::Png, MediaType::Webp],
            max_file_bytes: DEFAULT_MAX_FILE_BYTES,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CameraConfig {
    pub facing: FacingMode,
    /// JPEG quality used when a captured frame becomes a candidate.
    pub capture_quality: u8,
}

impl Default for CameraConfig {
    fn default() -> Self {
        Self {
            facing: FacingMode::Environment,
            capture_quality: 90,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DetectionConfig {
    pub endpoint: String,
    pub request_timeout_ms: u64,
    pub live_interval_ms: u32,
}

impl Default for DetectionConfig {
    fn default() -> Self {
        Self {
            endpoint: "/api/analyze".to_string(),
            request_timeout_ms: 30_000,
            live_interval_ms: 1_500,
        }
    }
}

impl DetectionConfig {
    pub fn request_timeout(&self) -> Duration {
        Duration::from_millis(self.request_timeout_ms)
    }
}

impl IntakeConfig {
    pub fn from_yaml_str(source: &str) -> Result<Self, ConfigError> {
        let config: IntakeConfig = serde_yaml::from_str(source)?;
        config.validate()?;
        Ok(config)
    }

    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let config_str = std::fs::read_to_string(path)?;
        Self::from_yaml_str(&config_str)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.accept.allowed_types.is_empty() {
            return Err(ConfigError::Invalid(
                "accept.allowed_types must name at least one format".into(),
            ));
        }
        if self.accept.max_file_bytes == 0 {
            return Err(ConfigError::Invalid("accept.max_file_bytes must be positive".into()));
        }
        if !(1..=100).contains(&self.camera.capture_quality) {
            return Err(ConfigError::Invalid(format!(
                "camera.capture_quality must be within 1..=100, got {}",
                self.camera.capture_quality
            )));
        }
        if self.detection.request_timeout_ms == 0 || self.detection.live_interval_ms == 0 {
            return Err(ConfigError::Invalid(
                "detection timeout and live interval must be positive".into(),
            ));
        }
        Ok(())
    }
}
