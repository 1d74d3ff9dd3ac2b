//! Application core: pure domain logic, zero I/O.
//!
//! This module holds the business rules of the rig: tick orchestration,
//! command handling, and the contract with observers.  All interaction
//! with hardware and files happens through **port traits** defined in
//! [`ports`], keeping this layer testable without real peripherals.

pub mod commands;
pub mod events;
pub mod ports;
pub mod queue;
pub mod service;
