//! E2E test scenarios.

mod batch;
mod degraded;
mod inspection;
mod policy;
mod timeouts;
mod update_flow;
