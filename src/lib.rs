//! Soaktrace - offline analysis of on-device soak-test traces
//!
//! This library parses JSONL stage traces, derives per-run metrics (latency
//! percentiles, throughput, drift, memory slope, thermal and battery
//! behaviour), evaluates six stability hypotheses against configurable
//! thresholds, and keeps a longitudinal record of experiments.

pub mod backend;
pub mod charts;
pub mod cli;
pub mod error;
pub mod experiment;
pub mod hypothesis;
pub mod metrics;
pub mod report;
pub mod revision;
pub mod stats;
pub mod trace;
