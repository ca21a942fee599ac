use std::time::Duration;

use monitor_harness::{MockSolarOutputServer, RecordedRequest};
use solar_output::{ClientConfig, OutputError, SolarOutputClient, SolarOutputProvider};
use types::GetOverviewResponse;

const CUSTOMER: &str = "11111111";
const API_KEY: &str = "test-api-key";

fn client(base_url: &str, api_key: &str) -> SolarOutputClient {
    SolarOutputClient::new(ClientConfig {
        base_url: base_url.to_string(),
        api_key: api_key.to_string(),
        timeout_ms: 2_000,
    })
    .expect("client")
}

async fn started_server() -> (MockSolarOutputServer, String) {
    let mut server = MockSolarOutputServer::new();
    server
        .enqueue_response(&GetOverviewResponse::new(123.0, 456.0), CUSTOMER, API_KEY)
        .expect("enqueue");
    let url = server.start().await.expect("start");
    (server, url)
}

#[tokio::test]
async fn serves_canned_overview_to_the_expected_pair() {
    let (server, url) = started_server().await;

    let overview = client(&url, API_KEY)
        .get_overview(CUSTOMER)
        .await
        .expect("overview");
    assert_eq!(overview, GetOverviewResponse::new(123.0, 456.0));

    assert_eq!(
        server.received(),
        vec![RecordedRequest {
            path: "/site/11111111/overview.json".to_string(),
            query: Some("api_key=test-api-key".to_string()),
        }]
    );
    server.shutdown().await;
}

#[tokio::test]
async fn any_other_pair_is_not_found() {
    let (server, url) = started_server().await;

    let pairs = [
        ("22222222", API_KEY),
        (CUSTOMER, "other-key"),
        ("22222222", "other-key"),
        ("1111111", API_KEY),
        (CUSTOMER, ""),
        ("", API_KEY),
    ];
    for (customer, api_key) in pairs {
        let err = client(&url, api_key)
            .get_overview(customer)
            .await
            .expect_err("unmatched pair");
        match err {
            OutputError::Status { status } => {
                assert_eq!(status.as_u16(), 404, "{customer}/{api_key}")
            }
            other => panic!("unexpected error for {customer}/{api_key}: {other}"),
        }
    }

    assert_eq!(server.received().len(), pairs.len());
    server.shutdown().await;
}

#[tokio::test]
async fn nothing_matches_before_enqueue() {
    let mut server = MockSolarOutputServer::new();
    let url = server.start().await.expect("start");

    let err = client(&url, API_KEY)
        .get_overview(CUSTOMER)
        .await
        .expect_err("nothing enqueued");
    assert!(matches!(err, OutputError::Status { .. }));
    server.shutdown().await;
}

#[tokio::test]
async fn later_enqueue_replaces_the_pattern() {
    let (server, url) = started_server().await;
    server
        .enqueue_response(&GetOverviewResponse::new(5.0, 6.0), "33333333", API_KEY)
        .expect("enqueue");

    let provider = client(&url, API_KEY);
    assert!(provider.get_overview(CUSTOMER).await.is_err());
    let overview = provider.get_overview("33333333").await.expect("overview");
    assert_eq!(overview.power(), 5.0);
    drop(provider);
    server.shutdown().await;
}

#[tokio::test]
async fn unknown_paths_are_recorded_and_rejected() {
    let (server, url) = started_server().await;

    let response = reqwest::Client::builder()
        .no_proxy()
        .build()
        .expect("http client")
        .get(format!("{url}/status"))
        .send()
        .await
        .expect("get");
    assert_eq!(response.status().as_u16(), 404);
    assert_eq!(server.received()[0].path, "/status");
    server.shutdown().await;
}

#[tokio::test]
async fn start_is_idempotent_and_shutdown_frees_the_port() {
    let (mut server, url) = started_server().await;
    assert_eq!(server.start().await.expect("restart"), url);
    assert_eq!(server.url(), Some(url.as_str()));

    server.shutdown().await;

    let addr = url.trim_start_matches("http://").to_string();
    let connect = tokio::time::timeout(
        Duration::from_secs(1),
        tokio::net::TcpStream::connect(addr),
    )
    .await
    .expect("connect attempt");
    assert!(connect.is_err());
}
