use std::fmt;
use std::future::Future;

use thiserror::Error;
use tracing::info;

use customer_store::CustomerIdStore;
use solar_monitor::{
    Control, MainScreen, MonitorConfig, ObjectGraph, SolarMonitorApp, ViewId, ViewNode,
};
use types::GetOverviewResponse;

use crate::error::HarnessError;
use crate::mock_graph::{MockObjectGraph, MockPanelScanner};
use crate::mock_server::MockSolarOutputServer;
use crate::scheduler_rule::{ActiveScheduler, DeterministicScheduler, SchedulerConfig};

#[derive(Debug, Clone)]
pub struct HarnessConfig {
    /// Configuration of the production graph the environment starts from.
    pub monitor: MonitorConfig,
    pub scheduler: SchedulerConfig,
}

impl Default for HarnessConfig {
    fn default() -> Self {
        let mut monitor = MonitorConfig::default();
        monitor.solar.api_key = "test-api-key".to_string();
        monitor.state_path = ":memory:".to_string();
        monitor.scan.scan_delay_ms = 0;
        Self {
            monitor,
            scheduler: SchedulerConfig::default(),
        }
    }
}

/// A view predicate that did not hold, with the screen as it was rendered.
#[derive(Debug, Error)]
#[error("{expected}\nrendered views:\n{rendered}")]
pub struct AssertionFailure {
    pub expected: String,
    pub rendered: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum ViewMatcher {
    Text(String),
    Id(ViewId),
}

impl ViewMatcher {
    fn matches(&self, node: &ViewNode) -> bool {
        match self {
            ViewMatcher::Text(text) => node.text.as_deref() == Some(text.as_str()),
            ViewMatcher::Id(id) => node.id == *id,
        }
    }
}

impl fmt::Display for ViewMatcher {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ViewMatcher::Text(text) => write!(f, "with text {text:?}"),
            ViewMatcher::Id(id) => write!(f, "with id {id:?}"),
        }
    }
}

/// Assertions against the first view matching a text or id.
pub struct ViewInteraction<'a> {
    screen: &'a MainScreen,
    matcher: ViewMatcher,
}

pub fn on_text<'a>(screen: &'a MainScreen, text: &str) -> ViewInteraction<'a> {
    ViewInteraction {
        screen,
        matcher: ViewMatcher::Text(text.to_string()),
    }
}

pub fn on_id(screen: &MainScreen, id: ViewId) -> ViewInteraction<'_> {
    ViewInteraction {
        screen,
        matcher: ViewMatcher::Id(id),
    }
}

impl<'a> ViewInteraction<'a> {
    pub fn is_displayed(self) -> Result<Self, AssertionFailure> {
        let views = self.screen.render();
        let (_, node) = self.find(&views)?;
        if !node.visible {
            return Err(self.failure(&views, "to be displayed"));
        }
        Ok(self)
    }

    pub fn is_not_displayed(self) -> Result<Self, AssertionFailure> {
        let views = self.screen.render();
        let (_, node) = self.find(&views)?;
        if node.visible {
            return Err(self.failure(&views, "not to be displayed"));
        }
        Ok(self)
    }

    pub fn has_text(self, text: &str) -> Result<Self, AssertionFailure> {
        let views = self.screen.render();
        let (_, node) = self.find(&views)?;
        if node.text.as_deref() != Some(text) {
            return Err(self.failure(&views, &format!("to have text {text:?}")));
        }
        Ok(self)
    }

    /// Holds when this view is rendered above the view with text `other`.
    pub fn is_above(self, other: &str) -> Result<Self, AssertionFailure> {
        let views = self.screen.render();
        let (position, _) = self.find(&views)?;
        let below = ViewMatcher::Text(other.to_string());
        let other_position = views
            .iter()
            .position(|node| below.matches(node))
            .ok_or_else(|| no_match(&below, &views))?;
        if position >= other_position {
            return Err(self.failure(&views, &format!("to be above view {below}")));
        }
        Ok(self)
    }

    fn find<'v>(&self, views: &'v [ViewNode]) -> Result<(usize, &'v ViewNode), AssertionFailure> {
        views
            .iter()
            .enumerate()
            .find(|(_, node)| self.matcher.matches(node))
            .ok_or_else(|| no_match(&self.matcher, views))
    }

    fn failure(&self, views: &[ViewNode], predicate: &str) -> AssertionFailure {
        AssertionFailure {
            expected: format!("expected view {} {predicate}", self.matcher),
            rendered: describe(views),
        }
    }
}

fn no_match(matcher: &ViewMatcher, views: &[ViewNode]) -> AssertionFailure {
    AssertionFailure {
        expected: format!("no view matches {matcher}"),
        rendered: describe(views),
    }
}

fn describe(views: &[ViewNode]) -> String {
    views
        .iter()
        .map(|node| format!("  {:?} visible={} text={:?}", node.id, node.visible, node.text))
        .collect::<Vec<_>>()
        .join("\n")
}

/// Everything one scenario holds: the active scheduler, the application and
/// an optional mock endpoint. Teardown happens on drop, server first.
pub struct TestEnvironment {
    server: Option<MockSolarOutputServer>,
    app: SolarMonitorApp,
    scheduler: ActiveScheduler,
}

impl TestEnvironment {
    /// Activates the scheduler, builds the production graph on it and clears
    /// the persisted customer id. Any failure aborts before the scenario runs.
    pub fn set_up(config: HarnessConfig) -> Result<Self, HarnessError> {
        let scheduler = DeterministicScheduler::activate(config.scheduler.clone())?;
        let graph = scheduler.block_on(ObjectGraph::production(
            &config.monitor,
            scheduler.schedulers(),
        ))?;
        let app = SolarMonitorApp::new(graph);

        let identity = app.solar_customer_id();
        scheduler.block_on(identity.delete())?;
        info!("test environment ready");

        Ok(Self {
            server: None,
            app,
            scheduler,
        })
    }

    pub fn app(&self) -> &SolarMonitorApp {
        &self.app
    }

    pub fn app_mut(&mut self) -> &mut SolarMonitorApp {
        &mut self.app
    }

    pub fn scheduler(&self) -> &ActiveScheduler {
        &self.scheduler
    }

    pub fn server(&self) -> Option<&MockSolarOutputServer> {
        self.server.as_ref()
    }

    pub fn block_on<F: Future>(&self, future: F) -> F::Output {
        self.scheduler.block_on(future)
    }

    /// Installs a graph whose panel scanner is `scanner`.
    pub fn use_mock_hardware(&mut self, scanner: MockPanelScanner) {
        let graph = MockObjectGraph::build_with(&self.app, scanner);
        MockObjectGraph::install(&mut self.app, graph);
    }

    /// Starts a mock endpoint serving `response` to `(customer_id, api_key)`
    /// and repoints the installed graph's network client at it.
    pub fn use_mock_endpoint(
        &mut self,
        response: &GetOverviewResponse,
        customer_id: &str,
        api_key: &str,
    ) -> Result<String, HarnessError> {
        let mut server = MockSolarOutputServer::new();
        server.enqueue_response(response, customer_id, api_key)?;
        let url = self.scheduler.block_on(server.start())?;
        self.server = Some(server);

        let graph = MockObjectGraph::with_endpoint(self.app.object_graph().clone(), &url)?;
        MockObjectGraph::install(&mut self.app, graph);
        Ok(url)
    }

    /// The api key of the installed network client.
    pub fn api_key(&self) -> String {
        self.app.object_graph().solar_output().api_key().to_string()
    }

    pub fn launch(&self) -> MainScreen {
        self.app.launch()
    }

    /// Clicks a displayed control and waits until the work it dispatched has
    /// settled.
    pub fn perform_click(
        &self,
        screen: &MainScreen,
        control: Control,
    ) -> Result<(), AssertionFailure> {
        on_id(screen, control.view_id()).is_displayed()?;
        screen.press(control);
        self.scheduler.block_on(screen.graph().schedulers().wait_idle());
        Ok(())
    }

    /// Stops the mock endpoint, if any, and releases the scheduler.
    pub fn tear_down(mut self) {
        if let Some(server) = self.server.take() {
            self.scheduler.block_on(server.shutdown());
        }
    }
}
