use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use axum::extract::{Path, Query, State};
use axum::http::{header, StatusCode, Uri};
use axum::response::{IntoResponse, Response};
use axum::routing::any;
use axum::Router;
use tokio::net::TcpListener;
use tokio::sync::oneshot;
use tokio::task::JoinHandle;
use tokio::time::{timeout, Duration};
use tracing::{debug, info, warn};

use types::GetOverviewResponse;

use crate::error::HarnessError;

const SHUTDOWN_GRACE: Duration = Duration::from_secs(5);

#[derive(Debug, Clone)]
struct Expectation {
    customer_id: String,
    api_key: String,
    body: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecordedRequest {
    pub path: String,
    pub query: Option<String>,
}

#[derive(Debug, Default)]
struct ServerState {
    expectation: Mutex<Option<Expectation>>,
    received: Mutex<Vec<RecordedRequest>>,
}

impl ServerState {
    fn record(&self, uri: &Uri) {
        lock(&self.received).push(RecordedRequest {
            path: uri.path().to_string(),
            query: uri.query().map(str::to_string),
        });
    }
}

/// In-process stand-in for the monitoring endpoint. Answers exactly one
/// `(customer_id, api_key)` pair with a canned overview; everything else is
/// `404 Not Found`.
#[derive(Debug, Default)]
pub struct MockSolarOutputServer {
    state: Arc<ServerState>,
    base_url: Option<String>,
    shutdown: Option<oneshot::Sender<()>>,
    task: Option<JoinHandle<()>>,
}

impl MockSolarOutputServer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Replaces any earlier expectation.
    pub fn enqueue_response(
        &self,
        response: &GetOverviewResponse,
        customer_id: &str,
        api_key: &str,
    ) -> Result<(), HarnessError> {
        let body = serde_json::to_string(response)?;
        *lock(&self.state.expectation) = Some(Expectation {
            customer_id: customer_id.to_string(),
            api_key: api_key.to_string(),
            body,
        });
        debug!(customer_id, "mock overview enqueued");
        Ok(())
    }

    /// Binds an ephemeral local port and returns the base url to point the
    /// client at. Calling it again returns the running server's url.
    pub async fn start(&mut self) -> Result<String, HarnessError> {
        if let Some(ref url) = self.base_url {
            return Ok(url.clone());
        }

        let listener = TcpListener::bind("127.0.0.1:0")
            .await
            .map_err(HarnessError::Bind)?;
        let addr = listener.local_addr().map_err(HarnessError::Bind)?;

        let router = Router::new()
            .route("/site/:customer_id/overview.json", any(overview))
            .fallback(unmatched)
            .with_state(self.state.clone());

        let (shutdown_tx, shutdown_rx) = oneshot::channel::<()>();
        let task = tokio::spawn(async move {
            let served = axum::serve(listener, router)
                .with_graceful_shutdown(async {
                    let _ = shutdown_rx.await;
                })
                .await;
            if let Err(err) = served {
                warn!(error = %err, "mock solar output server failed");
            }
        });

        let url = format!("http://{addr}");
        info!(%url, "mock solar output server started");
        self.base_url = Some(url.clone());
        self.shutdown = Some(shutdown_tx);
        self.task = Some(task);
        Ok(url)
    }

    pub fn url(&self) -> Option<&str> {
        self.base_url.as_deref()
    }

    /// Requests seen so far, matched or not.
    pub fn received(&self) -> Vec<RecordedRequest> {
        lock(&self.state.received).clone()
    }

    /// Stops accepting connections and waits for the server task to finish.
    pub async fn shutdown(mut self) {
        if let Some(shutdown) = self.shutdown.take() {
            let _ = shutdown.send(());
        }
        if let Some(mut task) = self.task.take() {
            match timeout(SHUTDOWN_GRACE, &mut task).await {
                Ok(Ok(())) => info!("mock solar output server stopped"),
                Ok(Err(err)) => warn!(error = %err, "mock solar output server join failed"),
                Err(_) => {
                    warn!("mock solar output server did not drain in time");
                    task.abort();
                }
            }
        }
        self.base_url = None;
    }
}

impl Drop for MockSolarOutputServer {
    fn drop(&mut self) {
        if let Some(shutdown) = self.shutdown.take() {
            let _ = shutdown.send(());
        }
        if let Some(task) = self.task.take() {
            task.abort();
        }
    }
}

async fn overview(
    State(state): State<Arc<ServerState>>,
    Path(customer_id): Path<String>,
    Query(params): Query<HashMap<String, String>>,
    uri: Uri,
) -> Response {
    state.record(&uri);

    let expectation = lock(&state.expectation).clone();
    match expectation {
        Some(expected)
            if expected.customer_id == customer_id
                && params.get("api_key") == Some(&expected.api_key) =>
        {
            debug!(%customer_id, "mock overview served");
            (
                StatusCode::OK,
                [(header::CONTENT_TYPE, "application/json")],
                expected.body,
            )
                .into_response()
        }
        _ => {
            warn!(%customer_id, "unexpected overview request");
            StatusCode::NOT_FOUND.into_response()
        }
    }
}

async fn unmatched(State(state): State<Arc<ServerState>>, uri: Uri) -> StatusCode {
    state.record(&uri);
    warn!(path = %uri.path(), "unexpected request");
    StatusCode::NOT_FOUND
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}
