//! Lifecycle of a tracked activity: nothing running, an activity being timed, and back once the
//! activity is logged. [controller::SessionController] is the only place that moves between
//! those states.

pub mod controller;
pub mod error;
