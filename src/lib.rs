//! Small tracker for what you are physically doing throughout the day: sitting, standing,
//! laying down or walking. One activity is timed at a time, finished activities are logged to a
//! local store and can be summarized over a date range.
//!

pub mod cli;
pub mod session;
pub mod storage;
pub mod utils;
