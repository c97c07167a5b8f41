//! hwlit-curator library interface
//!
//! Exposes the services and pipeline stages for the binary and for
//! integration testing.

pub mod services;
pub mod workflow;
