//! Utility functions for display formatting and list handling.

pub mod format;

pub use format::{distinct, format_age, format_timestamp, truncate_string};
