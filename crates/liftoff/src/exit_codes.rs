//! Exit codes for failures outside the dispatcher
//!
//! Dispatcher failures exit with `LiftoffError::exit_code`.

/// General error (bad arguments, unreadable files, failed checks)
pub const ERROR: i32 = 1;
