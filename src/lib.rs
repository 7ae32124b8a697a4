#![doc = include_str!("../docs/rustdoc.md")]

/// Bounded exponential reconnect schedule.
pub mod backoff;
/// Command-line argument definitions.
pub mod cli;
/// Reconnecting client handle and its worker loop.
pub mod client;
/// Connection state machine and client counters.
pub mod client_state;
/// Runtime configuration model.
pub mod config;
/// Error types used across the crate.
pub mod error;
/// Bridge from client listeners to the UI event queue.
pub mod events;
/// Terminal output formatters.
pub mod formatter;
/// Ordered listener registries.
pub mod listeners;
/// Prometheus metrics.
pub mod monitoring;
/// Notification feed built from client events.
pub mod notifications;
/// Connection status and state enums.
pub mod status;
/// Tracing/logging initialization.
pub mod tracing_setup;
/// Socket abstraction and the WebSocket implementation.
pub mod transport;
/// Alarm feed wire model.
pub mod types;
/// Dashboard controller and presentation loop.
pub mod ui;

/// Primary crate error type.
pub use error::AlarmFeedError;
