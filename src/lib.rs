//! VOID — Prediction-market divergence dashboard synchronizer
//!
//! Library crate exposing all modules for use by integration tests
//! and the binary entry point.

pub mod api;
pub mod config;
pub mod dashboard;
pub mod forms;
pub mod grid;
pub mod metrics;
pub mod sync;
pub mod types;
