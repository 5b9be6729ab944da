//! tokenadm: admin client for a remote access-token service
//!
//! Layers, innermost first:
//! - `domain`: token payloads, validation, expiry parsing (no I/O)
//! - `application`: use-case services over the `TokenApi` seam
//! - `infrastructure`: HTTP client, filesystem, DI container
//! - `config`: layered endpoint resolution
//! - `cli`: argument parsing, dispatch, terminal output

pub mod application;
pub mod cli;
pub mod config;
pub mod domain;
pub mod exitcode;
pub mod infrastructure;
pub mod util;
