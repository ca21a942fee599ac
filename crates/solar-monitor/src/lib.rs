pub mod app;
pub mod config;
pub mod graph;
pub mod scheduling;
pub mod screen;

pub use app::SolarMonitorApp;
pub use config::MonitorConfig;
pub use graph::{GraphError, ObjectGraph};
pub use scheduling::{Lane, LaneKind, Schedulers};
pub use screen::{Control, MainScreen, ViewId, ViewNode};
