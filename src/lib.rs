//! Citypass - City subscription purchase and payment confirmation
//!
//! This crate opens gateway charges for city subscriptions, confirms paid
//! charges into time-limited grants and keeps the payment ledger.

pub mod adapters;
pub mod application;
pub mod config;
pub mod domain;
pub mod ports;
