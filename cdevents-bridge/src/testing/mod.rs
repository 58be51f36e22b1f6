//! Testing utilities for code embedding the bridge.
//!
//! This module provides:
//! - Fixture runs and steps
//! - Sinks that fail or count on demand
//! - A log capture for asserting on emitted warnings

mod fixtures;
mod logs;
mod sinks;

pub use fixtures::{sample_run, sample_step, TestHarness};
pub use logs::LogCapture;
pub use sinks::FailingEventSink;
