//! BioMark firmware library.
//!
//! Exposes the pure-logic modules for integration testing and external
//! inspection. All ESP-IDF-specific code is guarded by
//! `#[cfg(target_os = "espidf")]` within each module.

#![deny(unused_must_use)]

pub mod app;
pub mod channel;
pub mod config;
pub mod dispatcher;
pub mod error;
pub mod feedback;
pub mod heartbeat;
pub mod pins;
pub mod slots;
pub mod workflow;

// The ESP-IDF-only adapters and drivers are exported so the crate compiles on
// both targets; their hardware paths are guarded by cfg attributes inside.
pub mod adapters;
pub mod drivers;
