//! Shared E2E test helpers.
//!
//! Provides the fake appliance and a harness that wires a logged-in
//! navigator, a remote session (or its absence), the verifier and the
//! orchestrator together.

pub mod appliance;
pub mod harness;
