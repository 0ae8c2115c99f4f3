//! HTTP request handlers for the monitor API.
//!
//! This module is organized by domain:
//! - `common` - Response envelope, query structs, and error mapping
//! - `monitors` - Monitor listing, details, history and manual checks
//! - `monitoring` - Start/stop monitoring and site deletion
//! - `operations` - In-flight operation inspection
//! - `events` - Server-sent event stream

pub mod common;
pub mod events;
pub mod monitoring;
pub mod monitors;
pub mod operations;

// Re-export all public handler functions for convenience
pub use events::*;
pub use monitoring::*;
pub use monitors::*;
pub use operations::*;
