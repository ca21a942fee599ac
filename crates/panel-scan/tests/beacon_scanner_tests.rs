use futures::StreamExt;

use panel_scan::{collect_panels, BeaconPanelScanner, PanelScanner, ScanConfig};
use types::PanelInfo;

fn home_config() -> ScanConfig {
    ScanConfig {
        panel_name: Some("Nicks Solar Panels".to_string()),
        panel_identifier: Some("11111111".to_string()),
        scan_delay_ms: 0,
    }
}

#[tokio::test]
async fn configured_panel_is_reported_once() {
    let scanner = BeaconPanelScanner::new(home_config());
    let panels = collect_panels(scanner.scan_for_nearby_panel())
        .await
        .expect("scan");
    assert_eq!(panels, vec![PanelInfo::new("Nicks Solar Panels", "11111111")]);
}

#[tokio::test]
async fn scan_without_configured_panel_completes_empty() {
    let scanner = BeaconPanelScanner::new(ScanConfig {
        scan_delay_ms: 0,
        ..ScanConfig::default()
    });
    let mut stream = scanner.scan_for_nearby_panel();
    assert!(stream.next().await.is_none());
}

#[tokio::test(start_paused = true)]
async fn scan_waits_for_the_scan_window() {
    let mut config = home_config();
    config.scan_delay_ms = 5_000;
    let scanner = BeaconPanelScanner::new(config);

    let started = tokio::time::Instant::now();
    let panels = collect_panels(scanner.scan_for_nearby_panel())
        .await
        .expect("scan");
    assert_eq!(panels.len(), 1);
    assert!(started.elapsed() >= std::time::Duration::from_millis(5_000));
}

#[test]
fn blank_identifier_means_no_panel() {
    let config = ScanConfig {
        panel_name: Some("Roof".to_string()),
        panel_identifier: Some("  ".to_string()),
        scan_delay_ms: 0,
    };
    assert!(config.configured_panel().is_none());
}

#[test]
fn missing_name_falls_back_to_generic_label() {
    let config = ScanConfig {
        panel_name: None,
        panel_identifier: Some("42".to_string()),
        scan_delay_ms: 0,
    };
    let panel = config.configured_panel().expect("panel");
    assert_eq!(panel.name, "Solar panel");

    let scanner = BeaconPanelScanner::new(config);
    assert_eq!(scanner.found_message(&panel), "Solar panel found!");
}
