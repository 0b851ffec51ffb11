use std::path::Path;
use std::time::Duration;

use kvstream_crypto::DigestAlgorithm;
use kvstream_io::{SinkOptions, SourceOptions, DEFAULT_WINDOW_SIZE};
use serde::{Deserialize, Serialize};

use crate::error::{ConfigError, ConfigResult};

/// Defaults shared by every source and sink a [`StreamStore`](crate::StreamStore) opens.
///
/// ```toml
/// window_size = 65536
/// max_bytes = 10485760
/// ttl_seconds = 3600
/// digest = "sha256"
/// ```
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct StreamConfig {
    pub window_size: usize,
    pub max_bytes: Option<u64>,
    pub ttl_seconds: Option<u64>,
    pub digest: Option<DigestAlgorithm>,
}

impl Default for StreamConfig {
    fn default() -> Self {
        Self {
            window_size: DEFAULT_WINDOW_SIZE,
            max_bytes: None,
            ttl_seconds: None,
            digest: None,
        }
    }
}

impl StreamConfig {
    /// Parse and validate a TOML document.
    pub fn from_toml_str(text: &str) -> ConfigResult<Self> {
        let config: Self = toml::from_str(text).map_err(|e| ConfigError::Parse(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Read, parse and validate a TOML file.
    pub fn load(path: impl AsRef<Path>) -> ConfigResult<Self> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path)?;
        let config = Self::from_toml_str(&text)?;
        tracing::debug!(path = %path.display(), ?config, "loaded stream config");
        Ok(config)
    }

    pub fn validate(&self) -> ConfigResult<()> {
        if self.window_size == 0 {
            return Err(ConfigError::Invalid("window_size must be greater than zero".into()));
        }
        if self.ttl_seconds == Some(0) {
            return Err(ConfigError::Invalid("ttl_seconds must be greater than zero".into()));
        }
        Ok(())
    }

    pub fn source_options(&self) -> SourceOptions {
        SourceOptions {
            window_size: self.window_size,
        }
    }

    pub fn sink_options(&self) -> SinkOptions {
        SinkOptions {
            window_size: self.window_size,
            max_bytes: self.max_bytes,
            ttl: self.ttl_seconds.map(Duration::from_secs),
            digest: self.digest,
            batch: None,
        }
    }
}
