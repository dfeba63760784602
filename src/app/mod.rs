//! Application core: pure domain logic, zero I/O.
//!
//! This module contains the business rules for the plug: gesture
//! dispatch, the switch state pipeline, debounced persistence and the
//! background job contracts. All interaction with hardware happens
//! through **port traits** defined in [`ports`], keeping this layer fully
//! testable without real peripherals.

pub mod actions;
pub mod characteristics;
pub mod commands;
pub mod controller;
pub mod dispatcher;
pub mod events;
pub mod jobs;
pub mod persist;
pub mod ports;
pub mod service;
