//! Domain layer containing business logic and domain types.
//!
//! # Module Organization
//!
//! - `foundation` - Shared domain primitives (IDs, timestamp, errors)
//! - `catalog` - Read-only cities, plans and user profiles
//! - `subscription` - City subscription purchase lifecycle

pub mod catalog;
pub mod foundation;
pub mod subscription;
