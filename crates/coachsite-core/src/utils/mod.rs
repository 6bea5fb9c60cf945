//! Utility functions for display formatting.

pub mod format;

// Re-export commonly used functions at module level
pub use format::{
    format_date, format_optional, format_phone, format_price, format_value, truncate_string,
};
