use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use futures::StreamExt;
use tracing::{debug, info, warn};

use types::GetOverviewResponse;

use crate::graph::ObjectGraph;
use crate::scheduling::Lane;

pub const DISCOVERY_PROMPT: &str = "Click to find nearby Solar panel.";
pub const SCAN_FAILED: &str = "Unable to find nearby Solar panel.";
pub const OUTPUT_FAILED: &str = "Unable to retrieve solar output.";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ViewId {
    PanelFound,
    DiscoveryPrompt,
    SolarOutput,
    LifetimeOutput,
    ErrorMessage,
    ScanControl,
    RefreshControl,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Control {
    Scan,
    Refresh,
}

impl Control {
    pub fn view_id(self) -> ViewId {
        match self {
            Control::Scan => ViewId::ScanControl,
            Control::Refresh => ViewId::RefreshControl,
        }
    }
}

/// One rendered element of the screen.
#[derive(Debug, Clone, PartialEq)]
pub struct ViewNode {
    pub id: ViewId,
    pub text: Option<String>,
    pub visible: bool,
}

#[derive(Debug, Default)]
struct ScreenState {
    found_message: Option<String>,
    found_visible: bool,
    solar_output: Option<String>,
    lifetime_output: Option<String>,
    error: Option<&'static str>,
    refresh_enabled: bool,
}

impl ScreenState {
    fn panel_found(&mut self, message: String) {
        self.found_message = Some(message);
        self.found_visible = true;
        self.refresh_enabled = true;
        self.error = None;
    }

    fn output_received(&mut self, solar_output: String, lifetime_output: String) {
        self.found_visible = false;
        self.solar_output = Some(solar_output);
        self.lifetime_output = Some(lifetime_output);
        self.error = None;
    }
}

/// Headless main screen: prompts for a scan, shows the panel it found and
/// renders the output fetched on refresh.
#[derive(Clone)]
pub struct MainScreen {
    graph: ObjectGraph,
    state: Arc<Mutex<ScreenState>>,
}

impl MainScreen {
    pub fn new(graph: ObjectGraph) -> Self {
        info!("main screen launched");
        Self {
            graph,
            state: Arc::default(),
        }
    }

    pub fn graph(&self) -> &ObjectGraph {
        &self.graph
    }

    /// Views from top to bottom.
    pub fn render(&self) -> Vec<ViewNode> {
        let state = lock(&self.state);
        vec![
            ViewNode {
                id: ViewId::PanelFound,
                text: state.found_message.clone(),
                visible: state.found_visible,
            },
            ViewNode {
                id: ViewId::DiscoveryPrompt,
                text: Some(DISCOVERY_PROMPT.to_string()),
                visible: true,
            },
            ViewNode {
                id: ViewId::SolarOutput,
                text: state.solar_output.clone(),
                visible: state.solar_output.is_some(),
            },
            ViewNode {
                id: ViewId::LifetimeOutput,
                text: state.lifetime_output.clone(),
                visible: state.lifetime_output.is_some(),
            },
            ViewNode {
                id: ViewId::ErrorMessage,
                text: state.error.map(str::to_string),
                visible: state.error.is_some(),
            },
            ViewNode {
                id: ViewId::ScanControl,
                text: None,
                visible: true,
            },
            ViewNode {
                id: ViewId::RefreshControl,
                text: None,
                visible: state.refresh_enabled,
            },
        ]
    }

    pub fn is_displayed(&self, id: ViewId) -> bool {
        self.render()
            .into_iter()
            .any(|node| node.id == id && node.visible)
    }

    /// Dispatches the control's action and returns without waiting for it.
    /// A hidden control ignores the press and `false` is returned.
    pub fn press(&self, control: Control) -> bool {
        if !self.is_displayed(control.view_id()) {
            debug!(?control, "press ignored on hidden control");
            return false;
        }

        match control {
            Control::Scan => self.scan(),
            Control::Refresh => self.refresh(),
        }
        true
    }

    fn scan(&self) {
        metrics::counter!("solar_monitor_scans_total").increment(1);

        let scanner = self.graph.panel_scanner().clone();
        let store = self.graph.customer_store().clone();
        let state = self.state.clone();

        self.graph.schedulers().spawn(Lane::NewThread, async move {
            let mut panels = scanner.scan_for_nearby_panel();
            let mut found = 0usize;

            while let Some(next) = panels.next().await {
                let panel = match next {
                    Ok(panel) => panel,
                    Err(err) => {
                        warn!(error = %err, "panel scan failed");
                        lock(&state).error = Some(SCAN_FAILED);
                        return;
                    }
                };

                if let Err(err) = store.set(&panel.identifier).await {
                    warn!(identifier = %panel.identifier, error = %err, "customer id store failed");
                    lock(&state).error = Some(SCAN_FAILED);
                    return;
                }

                found += 1;
                info!(name = %panel.name, identifier = %panel.identifier, "panel discovered");
                lock(&state).panel_found(scanner.found_message(&panel));
            }

            if found == 0 {
                info!("scan finished without finding a panel");
            }
        });
    }

    fn refresh(&self) {
        metrics::counter!("solar_monitor_refresh_total").increment(1);

        let provider = self.graph.solar_output().clone();
        let store = self.graph.customer_store().clone();
        let schedulers = self.graph.schedulers().clone();
        let state = self.state.clone();

        self.graph.schedulers().spawn(Lane::Io, async move {
            let customer_id = match store.get().await {
                Ok(Some(customer_id)) => customer_id,
                Ok(None) => {
                    warn!("refresh requested before a panel was found");
                    refresh_failed(&state);
                    return;
                }
                Err(err) => {
                    warn!(error = %err, "customer id lookup failed");
                    refresh_failed(&state);
                    return;
                }
            };

            match provider.get_overview(&customer_id).await {
                Ok(response) => {
                    schedulers.spawn(Lane::Computation, async move {
                        let (solar_output, lifetime_output) = output_text(&response);
                        info!(%customer_id, %solar_output, "solar output updated");
                        lock(&state).output_received(solar_output, lifetime_output);
                    });
                }
                Err(err) => {
                    warn!(%customer_id, error = %err, "solar output fetch failed");
                    refresh_failed(&state);
                }
            }
        });
    }
}

fn refresh_failed(state: &Mutex<ScreenState>) {
    metrics::counter!("solar_monitor_refresh_failures_total").increment(1);
    lock(state).error = Some(OUTPUT_FAILED);
}

fn lock(state: &Mutex<ScreenState>) -> MutexGuard<'_, ScreenState> {
    state.lock().unwrap_or_else(PoisonError::into_inner)
}

fn output_text(response: &GetOverviewResponse) -> (String, String) {
    (
        format!("{} watts", format_quantity(response.power())),
        format!("{} watt hours lifetime", format_quantity(response.energy())),
    )
}

/// Whole numbers keep one decimal place: `123.0`, `87.5`. Values outside
/// `1e-3..1e15` print in plain decimal rather than scientific notation.
pub fn format_quantity(value: f64) -> String {
    if value.is_finite() && value.fract() == 0.0 && value.abs() < 1e15 {
        format!("{value:.1}")
    } else {
        format!("{value}")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn whole_numbers_render_with_one_decimal() {
        assert_eq!(format_quantity(123.0), "123.0");
        assert_eq!(format_quantity(0.0), "0.0");
        assert_eq!(format_quantity(-4.0), "-4.0");
    }

    #[test]
    fn fractions_render_as_is() {
        assert_eq!(format_quantity(87.5), "87.5");
        assert_eq!(format_quantity(0.25), "0.25");
    }

    #[test]
    fn small_values_stay_in_plain_decimal() {
        assert_eq!(format_quantity(0.00001), "0.00001");
    }

    #[test]
    fn output_text_names_units() {
        let (power, energy) = output_text(&GetOverviewResponse::new(123.0, 456.0));
        assert_eq!(power, "123.0 watts");
        assert_eq!(energy, "456.0 watt hours lifetime");
    }
}
