//! Live tail client for the crier event stream.
//!
//! A [`client::StreamClient`] keeps one WebSocket open to the producer,
//! resumes from the last processed id after every reconnect, and renders the
//! stream as host-colored groups with the newest group on top.

pub mod cli;
pub mod client;
pub mod color;
pub mod config;
pub mod error;
pub mod event;
pub mod group;
pub mod render;
pub mod sink;
pub mod telemetry;
pub mod transport;
