//! Function-runtime integration for the acceleration helper.
//!
//! This crate owns the HTTP adapter, the operation dispatcher and its
//! workflows, subprocess execution and process-context capture. Pure request
//! and filesystem primitives come from `accel_helper_core`.

pub mod adapters;
pub mod config;
pub mod handlers;
pub mod logging;
