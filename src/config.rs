use crate::adapters::outbound::SimulationSettings;
use crate::domains::coordination::CoordinatorSettings;
use crate::domains::traversal::EngineSettings;
use anyhow::Result;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub engine: EngineSettings,
    pub coordinator: CoordinatorSettings,
    pub logging: LoggingConfig,
    pub areas: AreasConfig,
    pub journal: JournalConfig,
    pub simulation: SimulationSettings,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Run history file. Console only when unset.
    pub file: Option<String>,
    pub level: String,
    /// Queue size of the buffered logger. 0 logs synchronously.
    pub buffer_capacity: usize,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            file: None,
            level: "info".to_string(),
            buffer_capacity: 256,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AreasConfig {
    pub directory: PathBuf,
}

impl Default for AreasConfig {
    fn default() -> Self {
        Self {
            directory: PathBuf::from("resources/areas"),
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct JournalConfig {
    /// Directory for JSON Lines run history. Disabled when unset.
    pub directory: Option<PathBuf>,
}

impl Config {
    pub async fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = tokio::fs::read_to_string(path).await?;
        Self::from_str(&content)
    }

    #[allow(clippy::should_implement_trait)]
    pub fn from_str(content: &str) -> Result<Self> {
        let config: Config = toml::from_str(content)?;
        Ok(config)
    }
}
