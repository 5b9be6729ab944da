//! Domain layer: token payloads, validation, expiry parsing
//!
//! This layer is independent of external concerns (no I/O, no CLI, no config loading).

pub mod entities;
pub mod error;
pub mod expiry;
pub mod secret;

pub use entities::*;
pub use error::DomainError;
pub use expiry::{ensure_future, format_expiry, parse_expiry};
pub use secret::AdminToken;
