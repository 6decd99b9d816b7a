//! High-level operations that correspond to CLI commands
//!
//! These modules contain the core business logic for each extupdate operation,
//! separated from CLI concerns like argument parsing and output formatting.

pub mod convert;
pub mod history;
pub mod scan;

pub use convert::convert_operation;
pub use history::{clear_history_operation, history_operation};
pub use scan::scan_operation;
