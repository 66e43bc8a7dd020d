//! E2E tests for vigil-orchestrator.
//!
//! These tests drive complete update, rollback and batch operations against
//! a fake appliance that serves both the console (frame driver) and the
//! remote shell from one shared state.
//!
//! # Test Structure
//!
//! - `helpers/` -- fake appliance and harness builder
//! - `scenarios/` -- test files organized by scenario
//!
//! # Running
//!
//! ```bash
//! cargo test -p vigil-orchestrator --test e2e
//! ```

mod helpers;
mod scenarios;
