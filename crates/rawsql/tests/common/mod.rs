//! Shared test utilities for rawsql integration tests.
//!
//! This module provides:
//! - `TestHarness` wiring an orchestrator to scripted collaborators
//! - Scripted `Processor` / `Uploader` / `Exporter` fakes
//! - Builder patterns for creating test configurations programmatically
//! - A manual clock for session expiry

pub mod builders;
pub mod clock;
pub mod fakes;
pub mod harness;

pub use builders::*;
pub use clock::ManualClock;
pub use fakes::*;
pub use harness::TestHarness;
