//! Application services
//!
//! Concrete service implementations that orchestrate domain logic.
//! Services depend on I/O boundary traits (FileSystem, TokenApi)
//! but are themselves concrete structs, not traits.

mod token;

pub use token::TokenService;
