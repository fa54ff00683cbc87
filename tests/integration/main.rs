//! Integration test driver for `tests/integration/` submodule.
//!
//! Each `mod` below maps to a file that drives one part of the command
//! engine through `AppService::tick` against mock adapters.  All tests run
//! on the host with no sensor, network or display attached.

#![cfg(not(target_os = "espidf"))]

mod attendance_tests;
mod enroll_tests;
mod mock_hw;
mod service_tests;
