//! Utility modules for DON.

pub mod datetime;

pub use datetime::{
    format_date, format_datetime, format_duration, format_time, parse_date, parse_datetime,
    parse_duration, parse_time, DateTimeParseError,
};
