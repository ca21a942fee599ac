use std::env;

use anyhow::{Context, Result};
use tokio::runtime::Handle;
use tracing::{info, warn};

use solar_monitor::{Control, MonitorConfig, ObjectGraph, Schedulers, SolarMonitorApp, ViewId};

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt::init();

    let config_path = parse_config_arg();
    let config = MonitorConfig::load_with_path(config_path).context("load config failed")?;
    config.validate().context("config validation failed")?;

    let schedulers = Schedulers::production(Handle::current());
    let graph = ObjectGraph::production(&config, schedulers.clone())
        .await
        .context("object graph setup failed")?;
    let app = SolarMonitorApp::new(graph);
    let screen = app.launch();

    screen.press(Control::Scan);
    schedulers.wait_idle().await;

    if screen.is_displayed(ViewId::RefreshControl) {
        screen.press(Control::Refresh);
        schedulers.wait_idle().await;
    } else {
        warn!("no panel found nearby");
    }

    for node in screen.render() {
        if let (true, Some(text)) = (node.visible, node.text) {
            println!("{text}");
        }
    }

    info!("solar monitor finished");
    Ok(())
}

fn parse_config_arg() -> Option<String> {
    let mut args = env::args().skip(1);
    while let Some(arg) = args.next() {
        if arg == "--config" {
            return args.next();
        }
        if let Some(path) = arg.strip_prefix("--config=") {
            return Some(path.to_string());
        }
    }
    None
}
