use std::path::PathBuf;
use std::process::{Command, Output};

const OVERRIDES: [&str; 8] = [
    "SOLAR_MONITOR_CONFIG",
    "SOLAR_MONITOR_PANEL_NAME",
    "SOLAR_MONITOR_PANEL_ID",
    "SOLAR_MONITOR_SCAN_DELAY_MS",
    "SOLAR_MONITOR_BASE_URL",
    "SOLAR_MONITOR_API_KEY",
    "SOLAR_MONITOR_TIMEOUT_MS",
    "SOLAR_MONITOR_STATE_PATH",
];

fn fixture(name: &str) -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR"))
        .join("tests")
        .join("fixtures")
        .join(name)
}

fn run_with_config(name: &str) -> Output {
    let mut command = Command::new(env!("CARGO_BIN_EXE_solar-monitor"));
    command.arg("--config").arg(fixture(name));
    for key in OVERRIDES {
        command.env_remove(key);
    }
    command.output().expect("run solar-monitor")
}

#[test]
fn invalid_config_exits_non_zero() {
    let output = run_with_config("config-invalid.toml");
    assert!(!output.status.success());
}

#[test]
fn missing_config_file_exits_non_zero() {
    let output = run_with_config("does-not-exist.toml");
    assert!(!output.status.success());
}

#[test]
fn run_without_panel_prints_visible_texts() {
    let output = run_with_config("config-no-panel.toml");
    assert!(output.status.success(), "{output:?}");

    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains("Click to find nearby Solar panel."), "{stdout}");
    assert!(!stdout.contains("watts"), "{stdout}");
}
