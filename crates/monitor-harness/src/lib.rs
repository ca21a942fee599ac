//! Deterministic test harness for the solar monitor.
//!
//! A test activates the [`DeterministicScheduler`] so every lane the
//! application dispatches on runs on one bounded pool. It can then swap the
//! panel scanner through [`MockObjectGraph`] and point the network client at a
//! [`MockSolarOutputServer`]. Finally it drives the main screen with
//! `onView`-style assertions from [`scenario`].

pub mod error;
pub mod mock_graph;
pub mod mock_server;
pub mod scenario;
pub mod scheduler_rule;

pub use error::HarnessError;
pub use mock_graph::{MockObjectGraph, MockPanelScanner, MOCK_FOUND_MESSAGE};
pub use mock_server::{MockSolarOutputServer, RecordedRequest};
pub use scenario::{
    on_id, on_text, AssertionFailure, HarnessConfig, TestEnvironment, ViewInteraction,
};
pub use scheduler_rule::{ActiveScheduler, DeterministicScheduler, SchedulerConfig};
