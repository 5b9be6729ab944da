//! Standard exit codes (BSD sysexits.h compatible)

/// Successful termination
pub const OK: i32 = 0;

/// Command line usage error
pub const USAGE: i32 = 64;

/// Data format error (rejected token fields or dates)
pub const DATAERR: i32 = 65;

/// Cannot open input (token not found)
pub const NOINPUT: i32 = 66;

/// Service unavailable (network failure)
pub const UNAVAILABLE: i32 = 69;

/// Internal software error (unexpected response)
pub const SOFTWARE: i32 = 70;

/// Input/output error
pub const IOERR: i32 = 74;

/// Permission denied (admin credential rejected)
pub const NOPERM: i32 = 77;

/// Configuration error
pub const CONFIG: i32 = 78;
