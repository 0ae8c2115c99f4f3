//! This module provides reusable test utilities:
//! - In-memory test databases with seeded sites and monitors
//! - Stub check executors (fixed, scripted, gated, panicking)
//! - A fully wired engine and an event recorder
//! - Common test data

// Not every test binary uses every fixture
#![allow(dead_code)]
#![allow(unused_imports)]

pub mod events;
pub mod executors;
pub mod test_data;
pub mod test_database;
pub mod test_engine;

// Re-export commonly used items
pub use events::EventRecorder;
pub use executors::*;
pub use test_data::*;
pub use test_database::TestDatabase;
pub use test_engine::TestEngine;
