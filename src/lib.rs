//! Biomass furnace controller library.
//!
//! Exposes the control core and its adapters for integration testing
//! and for the `furnace` binary.  Raspberry Pi peripheral wiring is
//! behind the `rpi` feature; everything else builds on any host.

#![deny(unused_must_use)]

pub mod adapters;
pub mod app;
pub mod config;
pub mod driver;
pub mod drivers;
pub mod error;
pub mod fsm;
pub mod sensors;
pub mod settings;
pub mod state;
