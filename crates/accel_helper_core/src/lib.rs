//! Runtime-free primitives for the acceleration helper function.
//!
//! This crate owns the request contract, the filesystem helpers behind the
//! read-only operations, and the client side of the archive transfer
//! protocol. It intentionally excludes the function runtime and any
//! subprocess execution; those live in `accel_helper_lambda`.

pub mod contract;
pub mod diagnostics;
pub mod error;
pub mod listing;
pub mod range;
pub mod transfer;

pub use contract::{parse_body, Operation, RequestFields};
pub use error::HelperError;
