//! Roster Common
//!
//! Infrastructure shared by the Roster crates and binaries.

pub mod logging;

pub use logging::{init_logging, LogFormat};
