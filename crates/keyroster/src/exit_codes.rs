//! Exit codes for the CLI

/// Success
pub const SUCCESS: i32 = 0;

/// General error
pub const ERROR: i32 = 1;

/// Configuration error
pub const CONFIG_ERROR: i32 = 2;

/// Roster failed to parse or validate
pub const VALIDATION_ERROR: i32 = 5;
