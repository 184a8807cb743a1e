//! Command and query handlers.
//!
//! Each handler owns the port handles it needs and exposes a single
//! `handle` method taking a command or query struct.

pub mod subscription;

pub use subscription::*;
