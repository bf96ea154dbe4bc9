use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::error::ConfigError;
use crate::orchestrator::RunMode;

pub const CONFIG_PATH_ENV: &str = "API_COMPAT_CONFIG";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Timeouts {
    pub login_secs: u64,
    pub request_secs: u64,
    pub setup_secs: u64,
}

impl Timeouts {
    pub fn login(&self) -> Duration {
        Duration::from_secs(self.login_secs)
    }

    pub fn request(&self) -> Duration {
        Duration::from_secs(self.request_secs)
    }

    pub fn setup(&self) -> Duration {
        Duration::from_secs(self.setup_secs)
    }
}

impl Default for Timeouts {
    fn default() -> Self {
        Timeouts {
            login_secs: 10,
            request_secs: 15,
            setup_secs: 30,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CompatConfig {
    pub core_url: String,
    pub legacy_url: String,
    pub manifest_path: PathBuf,
    pub golden_dir: PathBuf,
    pub output_path: PathBuf,
    pub csv_output_path: Option<PathBuf>,
    pub mode: RunMode,
    pub filter: Vec<String>,
    pub setup_data: bool,
    pub timeouts: Timeouts,
}

impl Default for CompatConfig {
    fn default() -> Self {
        CompatConfig {
            core_url: "http://localhost:8080".to_string(),
            legacy_url: "http://localhost:8081".to_string(),
            manifest_path: PathBuf::from("tests/contracts/api-endpoints-manifest.yaml"),
            golden_dir: PathBuf::from("tests/contracts/golden"),
            output_path: PathBuf::from("api-compatibility-results.json"),
            csv_output_path: None,
            mode: RunMode::Compare,
            filter: Vec::new(),
            setup_data: false,
            timeouts: Timeouts::default(),
        }
    }
}

impl CompatConfig {
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let text = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_yaml(&text)
    }

    pub fn from_yaml(text: &str) -> Result<Self, ConfigError> {
        Ok(serde_yaml::from_str(text)?)
    }

    /// File named by `API_COMPAT_CONFIG` (or defaults), then `API_COMPAT_*`
    /// environment overrides.
    pub fn load() -> Result<Self, ConfigError> {
        let base = match std::env::var_os(CONFIG_PATH_ENV) {
            Some(path) => Self::from_file(Path::new(&path))?,
            None => Self::default(),
        };
        base.with_overrides(|key| std::env::var(key).ok())
    }

    pub fn with_overrides<F>(mut self, lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(url) = lookup("API_COMPAT_CORE_URL") {
            self.core_url = url;
        }
        if let Some(url) = lookup("API_COMPAT_LEGACY_URL") {
            self.legacy_url = url;
        }
        if let Some(mode) = lookup("API_COMPAT_MODE") {
            self.mode = mode.parse()?;
        }
        if let Some(filter) = lookup("API_COMPAT_FILTER") {
            self.filter = filter
                .split(',')
                .map(str::trim)
                .filter(|id| !id.is_empty())
                .map(str::to_string)
                .collect();
        }
        if let Some(output) = lookup("API_COMPAT_OUTPUT") {
            self.output_path = PathBuf::from(output);
        }
        Ok(self)
    }
}
