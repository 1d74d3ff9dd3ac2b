//! Actuator drivers.  Generic over `embedded-hal` pins so the same code
//! drives rppal GPIO on the rig and recording mocks in tests.

pub mod relay;
pub mod stepper;
