//! I/O boundary traits for testability
//!
//! These traits abstract external I/O operations, allowing services
//! to be tested with mock implementations.

use std::io;
use std::path::Path;

use async_trait::async_trait;

use crate::domain::{AuthStatus, NewToken, TokenRecord, TokenUpdate};
use crate::infrastructure::InfraResult;

/// Filesystem abstraction for testability.
pub trait FileSystem: Send + Sync {
    /// Read file contents to string.
    fn read_to_string(&self, path: &Path) -> io::Result<String>;

    /// Write string content to file.
    fn write(&self, path: &Path, content: &str) -> io::Result<()>;

    /// Check if path exists.
    fn exists(&self, path: &Path) -> bool;

    /// Check if path is a file.
    fn is_file(&self, path: &Path) -> bool;

    /// Check if path is a directory.
    fn is_dir(&self, path: &Path) -> bool;

    /// Create directory and all parent directories.
    fn create_dir_all(&self, path: &Path) -> io::Result<()>;
}

/// Remote token administration API.
///
/// One method per request variant; each call is exactly one logical
/// round trip (reads may be retried on transport failure, mutations never).
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait TokenApi: Send + Sync {
    async fn create(&self, token: &NewToken) -> InfraResult<TokenRecord>;

    async fn get(&self, token_id: &str) -> InfraResult<TokenRecord>;

    async fn update(&self, update: &TokenUpdate) -> InfraResult<TokenRecord>;

    async fn revoke(&self, token_id: &str) -> InfraResult<Option<TokenRecord>>;

    async fn list(&self) -> InfraResult<Vec<TokenRecord>>;

    /// Verify the admin credential against the auth endpoint.
    async fn check_auth(&self) -> InfraResult<AuthStatus>;
}

// ============================================================
// REAL IMPLEMENTATIONS
// ============================================================

/// Real filesystem implementation.
#[derive(Debug, Default)]
pub struct RealFileSystem;

impl FileSystem for RealFileSystem {
    fn read_to_string(&self, path: &Path) -> io::Result<String> {
        std::fs::read_to_string(path)
    }

    fn write(&self, path: &Path, content: &str) -> io::Result<()> {
        std::fs::write(path, content)
    }

    fn exists(&self, path: &Path) -> bool {
        path.exists()
    }

    fn is_file(&self, path: &Path) -> bool {
        path.is_file()
    }

    fn is_dir(&self, path: &Path) -> bool {
        path.is_dir()
    }

    fn create_dir_all(&self, path: &Path) -> io::Result<()> {
        std::fs::create_dir_all(path)
    }
}
