//! Educational census dashboard
//!
//! Loads INEP school census extracts, derives per-school totals, aggregates them
//! by municipality, dependency and location, and serves the resulting tables
//! from a process-wide cache that falls back to a synthetic dataset.

pub mod charts;
pub mod config;
pub mod data;
pub mod export;
pub mod gui;
pub mod service;
pub mod stats;
