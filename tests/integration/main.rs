//! Integration test driver for the `tests/integration/` submodules.
//!
//! Each `mod` below exercises one flow of the plug against recording mock
//! ports. Everything runs on the host; no hardware required.

mod gesture_flow_tests;
mod mock_hw;
mod remote_write_tests;
