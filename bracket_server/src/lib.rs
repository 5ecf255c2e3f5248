//! HTTP front end for the bracket engine.
//!
//! The binary in `main.rs` wires these modules together; they are exposed as a
//! library so the router can be exercised from integration tests.

pub mod api;
pub mod config;
pub mod logging;
