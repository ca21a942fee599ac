use std::sync::Arc;

use tracing::info;

use customer_store::CustomerIdStore;

use crate::graph::ObjectGraph;
use crate::screen::MainScreen;

/// Application instance. Screens resolve their collaborators from whichever
/// graph is installed when they launch.
pub struct SolarMonitorApp {
    graph: ObjectGraph,
}

impl SolarMonitorApp {
    pub fn new(graph: ObjectGraph) -> Self {
        Self { graph }
    }

    pub fn object_graph(&self) -> &ObjectGraph {
        &self.graph
    }

    /// Screens launched after this call use `graph`; screens already running
    /// keep the graph they launched with.
    pub fn set_object_graph(&mut self, graph: ObjectGraph) {
        info!("object graph replaced");
        self.graph = graph;
    }

    pub fn solar_customer_id(&self) -> Arc<dyn CustomerIdStore> {
        self.graph.customer_store().clone()
    }

    pub fn launch(&self) -> MainScreen {
        MainScreen::new(self.graph.clone())
    }
}
