//! # Bridge Configuration
//!
//! YAML configuration files and the broker section every bridge shares.

use crate::topics::TopicLayout;
use crate::transport::Credentials;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Errors loading a configuration file.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Invalid config file {path}: {message}")]
    Parse { path: PathBuf, message: String },
}

/// Read and deserialize a YAML file.
pub fn load_config<T: DeserializeOwned>(path: impl AsRef<Path>) -> Result<T, ConfigError> {
    let path = path.as_ref();
    let contents = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    serde_yaml::from_str(&contents).map_err(|e| ConfigError::Parse {
        path: path.to_path_buf(),
        message: e.to_string(),
    })
}

/// Broker connection settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct BrokerConfig {
    pub uri: String,
    pub top_level_topic: String,
    pub username: Option<String>,
    pub password: Option<String>,
    /// Buffer size of the transport channel.
    pub channel_capacity: usize,
}

impl Default for BrokerConfig {
    fn default() -> Self {
        Self {
            uri: "tcp://localhost:1883".to_string(),
            top_level_topic: "statehub".to_string(),
            username: None,
            password: None,
            channel_capacity: crate::DEFAULT_CHANNEL_CAPACITY,
        }
    }
}

impl BrokerConfig {
    #[must_use]
    pub fn topics(&self) -> TopicLayout {
        TopicLayout::new(self.top_level_topic.clone())
    }

    #[must_use]
    pub fn credentials(&self) -> Credentials {
        Credentials {
            username: self.username.clone(),
            password: self.password.clone(),
        }
    }
}
