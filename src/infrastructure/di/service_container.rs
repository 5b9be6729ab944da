//! Service container for dependency injection
//!
//! Wires up the config loader and token service with their dependencies.

use std::path::PathBuf;
use std::sync::Arc;

use crate::application::services::TokenService;
use crate::application::ApplicationResult;
use crate::config::{default_config_dir, ConfigLoader, EndpointConfig};
use crate::infrastructure::traits::{FileSystem, RealFileSystem};
use crate::infrastructure::{ClientOptions, HttpTokenClient};

/// Container holding the shared dependencies of one invocation.
///
/// The token service is built only after configuration has been resolved.
pub struct ServiceContainer {
    /// Filesystem abstraction
    pub fs: Arc<dyn FileSystem>,

    /// Transport tuning for the HTTP client
    pub client_options: ClientOptions,

    /// Directory searched when no `--config-dir` is given
    pub default_config_dir: Option<PathBuf>,
}

impl ServiceContainer {
    /// Create a new service container with real implementations.
    pub fn new(client_options: ClientOptions) -> Self {
        Self::with_deps(Arc::new(RealFileSystem), client_options)
    }

    /// Create a service container with custom dependencies (for testing).
    pub fn with_deps(fs: Arc<dyn FileSystem>, client_options: ClientOptions) -> Self {
        Self {
            fs,
            client_options,
            default_config_dir: default_config_dir(),
        }
    }

    /// Replace the fallback config directory (tests point this at a temp dir).
    pub fn with_default_config_dir(mut self, dir: Option<PathBuf>) -> Self {
        self.default_config_dir = dir;
        self
    }

    pub fn config_loader(&self) -> ConfigLoader {
        ConfigLoader::with_default_dir(Arc::clone(&self.fs), self.default_config_dir.clone())
    }

    /// Build a token service talking to `endpoint`.
    pub fn token_service(&self, endpoint: EndpointConfig) -> ApplicationResult<TokenService> {
        let client = HttpTokenClient::new(endpoint, self.client_options)?;
        Ok(TokenService::new(Arc::new(client)))
    }
}
