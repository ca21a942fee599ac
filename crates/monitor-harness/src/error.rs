use thiserror::Error;

use customer_store::StoreError;
use solar_monitor::GraphError;
use solar_output::OutputError;

use crate::scenario::AssertionFailure;

#[derive(Debug, Error)]
pub enum HarnessError {
    #[error("deterministic scheduler is already active on this thread")]
    AlreadyActive,
    #[error("scheduler runtime build failed: {0}")]
    Runtime(#[source] std::io::Error),
    #[error("mock server bind failed: {0}")]
    Bind(#[source] std::io::Error),
    #[error("mock response encode failed: {0}")]
    Encode(#[from] serde_json::Error),
    #[error("object graph setup failed: {0}")]
    Graph(#[from] GraphError),
    #[error("customer store failed: {0}")]
    Store(#[from] StoreError),
    #[error("solar output client setup failed: {0}")]
    Output(#[from] OutputError),
    #[error(transparent)]
    Assertion(#[from] AssertionFailure),
}
