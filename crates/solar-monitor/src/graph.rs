use std::sync::Arc;

use thiserror::Error;
use tracing::info;

use customer_store::{CustomerIdStore, SqliteCustomerStore, StoreError};
use panel_scan::{BeaconPanelScanner, PanelScanner};
use solar_output::{OutputError, SolarOutputClient, SolarOutputProvider};

use crate::config::MonitorConfig;
use crate::scheduling::Schedulers;

#[derive(Debug, Error)]
pub enum GraphError {
    #[error("solar output client setup failed: {0}")]
    Output(#[from] OutputError),
    #[error("customer store setup failed: {0}")]
    Store(#[from] StoreError),
}

/// The assembled capabilities the application resolves its collaborators from.
///
/// Each field is replaceable on its own, so an alternate graph is the
/// production one with a single capability swapped.
#[derive(Clone)]
pub struct ObjectGraph {
    panel_scanner: Arc<dyn PanelScanner>,
    solar_output: Arc<dyn SolarOutputProvider>,
    customer_store: Arc<dyn CustomerIdStore>,
    schedulers: Schedulers,
}

impl ObjectGraph {
    pub fn new(
        panel_scanner: Arc<dyn PanelScanner>,
        solar_output: Arc<dyn SolarOutputProvider>,
        customer_store: Arc<dyn CustomerIdStore>,
        schedulers: Schedulers,
    ) -> Self {
        Self {
            panel_scanner,
            solar_output,
            customer_store,
            schedulers,
        }
    }

    pub async fn production(
        config: &MonitorConfig,
        schedulers: Schedulers,
    ) -> Result<Self, GraphError> {
        let panel_scanner = BeaconPanelScanner::new(config.scan.clone());
        let solar_output = SolarOutputClient::new(config.solar.clone())?;
        let customer_store = SqliteCustomerStore::open(&config.state_path).await?;

        info!(
            base_url = %config.solar.base_url,
            state_path = %config.state_path,
            "production object graph built"
        );

        Ok(Self::new(
            Arc::new(panel_scanner),
            Arc::new(solar_output),
            Arc::new(customer_store),
            schedulers,
        ))
    }

    pub fn with_panel_scanner(self, panel_scanner: Arc<dyn PanelScanner>) -> Self {
        Self {
            panel_scanner,
            ..self
        }
    }

    pub fn with_solar_output(self, solar_output: Arc<dyn SolarOutputProvider>) -> Self {
        Self {
            solar_output,
            ..self
        }
    }

    pub fn with_customer_store(self, customer_store: Arc<dyn CustomerIdStore>) -> Self {
        Self {
            customer_store,
            ..self
        }
    }

    pub fn with_schedulers(self, schedulers: Schedulers) -> Self {
        Self { schedulers, ..self }
    }

    pub fn panel_scanner(&self) -> &Arc<dyn PanelScanner> {
        &self.panel_scanner
    }

    pub fn solar_output(&self) -> &Arc<dyn SolarOutputProvider> {
        &self.solar_output
    }

    pub fn customer_store(&self) -> &Arc<dyn CustomerIdStore> {
        &self.customer_store
    }

    pub fn schedulers(&self) -> &Schedulers {
        &self.schedulers
    }
}
