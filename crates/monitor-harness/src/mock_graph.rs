use std::sync::Arc;

use futures::stream::{self, StreamExt};
use tracing::info;

use panel_scan::{PanelScanner, PanelStream};
use solar_monitor::{ObjectGraph, SolarMonitorApp};
use solar_output::{ClientConfig, SolarOutputClient};
use types::PanelInfo;

use crate::error::HarnessError;

pub const MOCK_FOUND_MESSAGE: &str = "mock bluetooth found!";

/// Scanner double: reports its panels immediately, in order, then completes.
#[derive(Debug, Clone)]
pub struct MockPanelScanner {
    panels: Vec<PanelInfo>,
}

impl MockPanelScanner {
    pub fn new(panels: Vec<PanelInfo>) -> Self {
        Self { panels }
    }

    pub fn single(panel: PanelInfo) -> Self {
        Self::new(vec![panel])
    }

    pub fn empty() -> Self {
        Self::new(Vec::new())
    }

    pub fn panels(&self) -> &[PanelInfo] {
        &self.panels
    }
}

impl Default for MockPanelScanner {
    fn default() -> Self {
        Self::single(PanelInfo::new("Nicks Solar Panels", "11111111"))
    }
}

impl PanelScanner for MockPanelScanner {
    fn scan_for_nearby_panel(&self) -> PanelStream {
        stream::iter(self.panels.clone().into_iter().map(Ok)).boxed()
    }

    fn found_message(&self, _panel: &PanelInfo) -> String {
        MOCK_FOUND_MESSAGE.to_string()
    }
}

/// Alternate object graphs for tests: the installed graph with the hardware
/// layer, and optionally the endpoint, swapped out.
pub struct MockObjectGraph;

impl MockObjectGraph {
    pub fn build(app: &SolarMonitorApp) -> ObjectGraph {
        Self::build_with(app, MockPanelScanner::default())
    }

    pub fn build_with(app: &SolarMonitorApp, scanner: MockPanelScanner) -> ObjectGraph {
        app.object_graph()
            .clone()
            .with_panel_scanner(Arc::new(scanner))
    }

    /// Points the real network client at `base_url`, keeping the installed
    /// client's api key and timeout.
    pub fn with_endpoint(graph: ObjectGraph, base_url: &str) -> Result<ObjectGraph, HarnessError> {
        let installed = graph.solar_output();
        let config = ClientConfig {
            base_url: base_url.to_string(),
            api_key: installed.api_key().to_string(),
            timeout_ms: installed.timeout_ms(),
        };
        let client = SolarOutputClient::new(config)?;
        Ok(graph.with_solar_output(Arc::new(client)))
    }

    pub fn install(app: &mut SolarMonitorApp, graph: ObjectGraph) {
        info!("mock object graph installed");
        app.set_object_graph(graph);
    }
}
