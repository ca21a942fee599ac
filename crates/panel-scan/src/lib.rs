use futures::stream::{BoxStream, StreamExt};
use thiserror::Error;
use tokio::time::{sleep, Duration};
use tracing::{debug, info};

use types::PanelInfo;

/// Panels found by one scan, in discovery order. The stream does nothing until
/// polled and ends once the scan window closes.
pub type PanelStream = BoxStream<'static, Result<PanelInfo, ScanError>>;

#[derive(Debug, Error)]
pub enum ScanError {
    #[error("bluetooth adapter unavailable")]
    Unavailable,
    #[error("bluetooth adapter error: {0}")]
    Adapter(String),
}

/// The hardware capability the application scans through.
pub trait PanelScanner: Send + Sync {
    fn scan_for_nearby_panel(&self) -> PanelStream;

    /// Text shown once a panel has been found.
    fn found_message(&self, panel: &PanelInfo) -> String {
        format!("{} found!", panel.name)
    }
}

#[cfg_attr(feature = "config", derive(serde::Serialize, serde::Deserialize))]
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScanConfig {
    pub panel_name: Option<String>,
    pub panel_identifier: Option<String>,
    pub scan_delay_ms: u64,
}

impl Default for ScanConfig {
    fn default() -> Self {
        Self {
            panel_name: None,
            panel_identifier: None,
            scan_delay_ms: 250,
        }
    }
}

impl ScanConfig {
    pub fn configured_panel(&self) -> Option<PanelInfo> {
        let identifier = self.panel_identifier.as_deref()?.trim();
        if identifier.is_empty() {
            return None;
        }
        let name = self
            .panel_name
            .as_deref()
            .map(str::trim)
            .filter(|name| !name.is_empty())
            .unwrap_or("Solar panel");
        Some(PanelInfo::new(name, identifier))
    }
}

/// Listens for the advertisement of the installation named in [`ScanConfig`].
///
/// There is no radio behind this yet: the configured panel is reported once
/// the scan window elapses.
#[derive(Debug, Clone)]
pub struct BeaconPanelScanner {
    config: ScanConfig,
}

impl BeaconPanelScanner {
    pub fn new(config: ScanConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &ScanConfig {
        &self.config
    }
}

impl PanelScanner for BeaconPanelScanner {
    fn scan_for_nearby_panel(&self) -> PanelStream {
        let panel = self.config.configured_panel();
        let window = Duration::from_millis(self.config.scan_delay_ms);

        async_stream::stream! {
            debug!(window_ms = window.as_millis(), "panel scan started");
            if !window.is_zero() {
                sleep(window).await;
            }
            match panel {
                Some(panel) => {
                    info!(name = %panel.name, identifier = %panel.identifier, "panel beacon found");
                    yield Ok(panel);
                }
                None => info!("no panel beacon in range"),
            }
        }
        .boxed()
    }
}

/// Collects every panel a scan reports, stopping at the first error.
pub async fn collect_panels(mut stream: PanelStream) -> Result<Vec<PanelInfo>, ScanError> {
    let mut panels = Vec::new();
    while let Some(next) = stream.next().await {
        panels.push(next?);
    }
    Ok(panels)
}
