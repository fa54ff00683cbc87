//! Application core. Domain logic with no direct I/O.
//!
//! This module wires the command engine together: slot pool, dispatcher,
//! the three workflows and the liveness reporter.  All interaction with
//! hardware and the cloud happens through **port traits** defined in
//! [`ports`], keeping this layer fully testable without real peripherals.

pub mod events;
pub mod ports;
pub mod service;
