use std::env;
use std::fs;
use std::path::Path;

use anyhow::{Context, Result};
use serde::Deserialize;

use panel_scan::ScanConfig;
use solar_output::ClientConfig;

const DEFAULT_STATE_PATH: &str = "solar-monitor.sqlite";
const MAX_SCAN_DELAY_MS: u64 = 60_000;

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct MonitorConfig {
    pub scan: ScanConfig,
    pub solar: ClientConfig,
    /// SQLite file holding the persisted customer identity.
    pub state_path: String,
}

impl MonitorConfig {
    pub fn load() -> Result<Self> {
        Self::load_with_path(None)
    }

    pub fn load_with_path(config_path: Option<String>) -> Result<Self> {
        let mut config = Self::default();

        if let Some(file_config) = load_file_config(config_path.as_deref())? {
            apply_file_config(&mut config, file_config);
        }

        apply_env_overrides(&mut config);
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        solar_output::overview_url(&self.solar.base_url, "0", &self.solar.api_key)
            .map_err(|err| anyhow::anyhow!("solar.base_url must be an http(s) url: {err}"))?;
        if self.solar.api_key.trim().is_empty() {
            anyhow::bail!("solar.api_key must be non-empty");
        }
        if self.solar.timeout_ms == 0 {
            anyhow::bail!("solar.timeout_ms must be >= 1");
        }
        if self.state_path.trim().is_empty() {
            anyhow::bail!("state.path must be non-empty");
        }
        if self.scan.scan_delay_ms > MAX_SCAN_DELAY_MS {
            anyhow::bail!("scan.scan_delay_ms must be <= {MAX_SCAN_DELAY_MS}");
        }
        if let Some(ref identifier) = self.scan.panel_identifier {
            if identifier.trim().is_empty() {
                anyhow::bail!("scan.panel_identifier must be non-empty when set");
            }
        }

        Ok(())
    }
}

impl Default for MonitorConfig {
    fn default() -> Self {
        Self {
            scan: ScanConfig::default(),
            solar: ClientConfig::default(),
            state_path: DEFAULT_STATE_PATH.to_string(),
        }
    }
}

fn apply_env_overrides(config: &mut MonitorConfig) {
    if let Ok(value) = env::var("SOLAR_MONITOR_PANEL_NAME") {
        config.scan.panel_name = Some(value);
    }

    if let Ok(value) = env::var("SOLAR_MONITOR_PANEL_ID") {
        config.scan.panel_identifier = Some(value);
    }

    if let Some(delay_ms) = parse_env_u64("SOLAR_MONITOR_SCAN_DELAY_MS") {
        config.scan.scan_delay_ms = delay_ms;
    }

    if let Ok(value) = env::var("SOLAR_MONITOR_BASE_URL") {
        config.solar.base_url = value;
    }

    if let Ok(value) = env::var("SOLAR_MONITOR_API_KEY") {
        config.solar.api_key = value;
    }

    if let Some(timeout_ms) = parse_env_u64("SOLAR_MONITOR_TIMEOUT_MS") {
        config.solar.timeout_ms = timeout_ms;
    }

    if let Ok(value) = env::var("SOLAR_MONITOR_STATE_PATH") {
        config.state_path = value;
    }
}

#[derive(Debug, Deserialize)]
struct FileConfig {
    scan: Option<FileScanConfig>,
    solar: Option<FileSolarConfig>,
    state: Option<FileStateConfig>,
}

#[derive(Debug, Deserialize)]
struct FileScanConfig {
    panel_name: Option<String>,
    panel_identifier: Option<String>,
    scan_delay_ms: Option<u64>,
}

#[derive(Debug, Deserialize)]
struct FileSolarConfig {
    base_url: Option<String>,
    api_key: Option<String>,
    timeout_ms: Option<u64>,
}

#[derive(Debug, Deserialize)]
struct FileStateConfig {
    path: Option<String>,
}

fn load_file_config(config_path: Option<&str>) -> Result<Option<FileConfig>> {
    let path = match config_path {
        Some(path) => path.to_string(),
        None => match env::var("SOLAR_MONITOR_CONFIG") {
            Ok(value) => value,
            Err(_) => return Ok(None),
        },
    };

    let content = fs::read_to_string(&path).with_context(|| format!("read config file {path}"))?;
    let ext = Path::new(&path).extension().and_then(|value| value.to_str());

    let config = match ext {
        Some("json") => serde_json::from_str(&content).context("parse json config")?,
        _ => toml::from_str(&content).context("parse toml config")?,
    };

    Ok(Some(config))
}

fn apply_file_config(config: &mut MonitorConfig, file: FileConfig) {
    if let Some(scan) = file.scan {
        if let Some(name) = scan.panel_name {
            config.scan.panel_name = Some(name);
        }
        if let Some(identifier) = scan.panel_identifier {
            config.scan.panel_identifier = Some(identifier);
        }
        if let Some(delay_ms) = scan.scan_delay_ms {
            config.scan.scan_delay_ms = delay_ms;
        }
    }

    if let Some(solar) = file.solar {
        if let Some(base_url) = solar.base_url {
            config.solar.base_url = base_url;
        }
        if let Some(api_key) = solar.api_key {
            config.solar.api_key = api_key;
        }
        if let Some(timeout_ms) = solar.timeout_ms {
            config.solar.timeout_ms = timeout_ms;
        }
    }

    if let Some(state) = file.state {
        if let Some(path) = state.path {
            config.state_path = path;
        }
    }
}

fn parse_env_u64(key: &str) -> Option<u64> {
    env::var(key).ok().and_then(|value| value.parse().ok())
}
