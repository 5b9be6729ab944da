//! Endpoint configuration with layered resolution
//!
//! Precedence (lowest to highest), applied field by field:
//! 1. Compiled defaults (`auth_path`, `admin_path`)
//! 2. Stored config top-level fields: `<config_dir>/config.toml` (or `config.json`)
//! 3. Selected profile in the stored config (`--profile`, else `default_profile`)
//! 4. Explicit options: command-line flags and their `TOKENADM_*` env fallbacks
//!
//! Within each layer empty strings count as "not set".

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use directories::ProjectDirs;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};
use url::Url;

use crate::application::{ApplicationError, ApplicationResult, IoResultExt};
use crate::domain::AdminToken;
use crate::infrastructure::traits::FileSystem;
use crate::util::path::expand_path;

pub const APP_NAME: &str = "tokenadm";
pub const CONFIG_FILE_TOML: &str = "config.toml";
pub const CONFIG_FILE_JSON: &str = "config.json";
pub const DEFAULT_AUTH_PATH: &str = "/auth";
pub const DEFAULT_ADMIN_PATH: &str = "/admin/tokens";

/// Possibly-partial options supplied on one invocation.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RawOptions {
    /// `--endpoint` / `--url`
    pub endpoint: Option<String>,
    pub admin_token: Option<AdminToken>,
    pub auth_path: Option<String>,
    pub admin_path: Option<String>,
    /// Directory holding the config file
    pub config_dir: Option<PathBuf>,
    /// Named profile in the stored config
    pub profile: Option<String>,
}

impl RawOptions {
    fn as_partial(&self) -> PartialEndpoint {
        PartialEndpoint {
            endpoint_url: self.endpoint.clone(),
            admin_token: self.admin_token.clone(),
            auth_path: self.auth_path.clone(),
            admin_path: self.admin_path.clone(),
        }
    }
}

/// One configuration source: every field optional.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct PartialEndpoint {
    #[serde(
        alias = "endpointUrl",
        alias = "endpoint",
        alias = "url",
        skip_serializing_if = "Option::is_none"
    )]
    pub endpoint_url: Option<String>,
    #[serde(alias = "adminToken", skip_serializing_if = "Option::is_none")]
    pub admin_token: Option<AdminToken>,
    #[serde(alias = "authPath", skip_serializing_if = "Option::is_none")]
    pub auth_path: Option<String>,
    #[serde(alias = "adminPath", skip_serializing_if = "Option::is_none")]
    pub admin_path: Option<String>,
}

impl PartialEndpoint {
    /// Built-in defaults: conventional service paths, no endpoint, no token.
    pub fn defaults() -> Self {
        Self {
            endpoint_url: None,
            admin_token: None,
            auth_path: Some(DEFAULT_AUTH_PATH.to_string()),
            admin_path: Some(DEFAULT_ADMIN_PATH.to_string()),
        }
    }

    /// Merge `overlay` onto self: per field, a non-empty overlay value wins.
    pub fn overlay(self, overlay: PartialEndpoint) -> Self {
        Self {
            endpoint_url: non_empty(overlay.endpoint_url).or(self.endpoint_url),
            admin_token: overlay
                .admin_token
                .filter(|token| !token.is_empty())
                .or(self.admin_token),
            auth_path: non_empty(overlay.auth_path).or(self.auth_path),
            admin_path: non_empty(overlay.admin_path).or(self.admin_path),
        }
    }

    /// Fold sources ordered lowest to highest precedence.
    pub fn merge_all(sources: impl IntoIterator<Item = PartialEndpoint>) -> Self {
        sources
            .into_iter()
            .fold(PartialEndpoint::default(), PartialEndpoint::overlay)
    }
}

fn non_empty(value: Option<String>) -> Option<String> {
    value.filter(|v| !v.trim().is_empty())
}

/// Persisted defaults, optionally with named profiles.
///
/// ```toml
/// endpoint_url = "https://tokens.example.com"
/// default_profile = "staging"
///
/// [profiles.staging]
/// endpoint_url = "https://tokens.staging.example.com"
/// admin_token = "..."
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct StoredConfig {
    #[serde(
        alias = "endpointUrl",
        alias = "endpoint",
        alias = "url",
        skip_serializing_if = "Option::is_none"
    )]
    pub endpoint_url: Option<String>,
    #[serde(alias = "adminToken", skip_serializing_if = "Option::is_none")]
    pub admin_token: Option<AdminToken>,
    #[serde(alias = "authPath", skip_serializing_if = "Option::is_none")]
    pub auth_path: Option<String>,
    #[serde(alias = "adminPath", skip_serializing_if = "Option::is_none")]
    pub admin_path: Option<String>,
    #[serde(alias = "defaultProfile", skip_serializing_if = "Option::is_none")]
    pub default_profile: Option<String>,
    #[serde(skip_serializing_if = "BTreeMap::is_empty")]
    pub profiles: BTreeMap<String, PartialEndpoint>,
}

impl StoredConfig {
    /// Top-level (profile-independent) fields.
    pub fn base(&self) -> PartialEndpoint {
        PartialEndpoint {
            endpoint_url: self.endpoint_url.clone(),
            admin_token: self.admin_token.clone(),
            auth_path: self.auth_path.clone(),
            admin_path: self.admin_path.clone(),
        }
    }

    /// Profile named by `requested`, else `default_profile`, else none.
    pub fn select_profile(
        &self,
        requested: Option<&str>,
        source: &Path,
    ) -> ApplicationResult<Option<(String, PartialEndpoint)>> {
        let Some(name) = requested.or(self.default_profile.as_deref()) else {
            return Ok(None);
        };
        match self.profiles.get(name) {
            Some(profile) => Ok(Some((name.to_string(), profile.clone()))),
            None => {
                let available: Vec<&str> = self.profiles.keys().map(String::as_str).collect();
                Err(ApplicationError::config(format!(
                    "profile '{}' not found in {} (available: {})",
                    name,
                    source.display(),
                    if available.is_empty() {
                        "none".to_string()
                    } else {
                        available.join(", ")
                    }
                )))
            }
        }
    }

    /// Parse file content; the format follows the file extension.
    pub fn parse(content: &str, path: &Path) -> ApplicationResult<Self> {
        let is_json = path
            .extension()
            .is_some_and(|ext| ext.eq_ignore_ascii_case("json"));
        if is_json {
            serde_json::from_str(content).map_err(|e| {
                ApplicationError::config(format!("parse {}: {}", path.display(), e))
            })
        } else {
            toml::from_str(content).map_err(|e| {
                ApplicationError::config(format!("parse {}: {}", path.display(), e))
            })
        }
    }

    pub fn to_toml(&self) -> ApplicationResult<String> {
        toml::to_string_pretty(self)
            .map_err(|e| ApplicationError::config(format!("serialize config: {e}")))
    }

    /// Generate a template config file.
    pub fn template() -> String {
        format!(
            r#"# {APP_NAME} configuration
#
# Precedence (lowest to highest), per field:
#   built-in defaults < top-level values here < selected profile < command-line flags
#
# Flags: --endpoint/--url, --admin-token, --auth-path, --admin-path, --profile
# Env:   TOKENADM_ENDPOINT, TOKENADM_ADMIN_TOKEN, TOKENADM_AUTH_PATH, TOKENADM_ADMIN_PATH

# Base URL of the token service
# endpoint_url = "https://tokens.example.com"

# Bearer credential for admin operations
# admin_token = ""

# auth_path = "{DEFAULT_AUTH_PATH}"
# admin_path = "{DEFAULT_ADMIN_PATH}"

# Profile used when --profile is not given
# default_profile = "staging"

# [profiles.staging]
# endpoint_url = "https://tokens.staging.example.com"
# admin_token = ""
"#
        )
    }
}

/// Fully resolved endpoint: the only input an HTTP client accepts.
///
/// `endpoint_url` has no trailing slash; both paths start with exactly one `/`
/// and have no trailing slash.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EndpointConfig {
    endpoint_url: String,
    admin_token: AdminToken,
    auth_path: String,
    admin_path: String,
}

impl EndpointConfig {
    /// Validate and normalize an endpoint.
    ///
    /// The admin token may be empty here; `HttpTokenClient::new` rejects that.
    pub fn new(
        endpoint_url: &str,
        admin_token: AdminToken,
        auth_path: &str,
        admin_path: &str,
    ) -> ApplicationResult<Self> {
        Ok(Self {
            endpoint_url: normalize_endpoint_url(endpoint_url)?,
            admin_token,
            auth_path: normalize_path("auth-path", auth_path)?,
            admin_path: normalize_path("admin-path", admin_path)?,
        })
    }

    pub fn endpoint_url(&self) -> &str {
        &self.endpoint_url
    }

    pub fn admin_token(&self) -> &AdminToken {
        &self.admin_token
    }

    pub fn auth_path(&self) -> &str {
        &self.auth_path
    }

    pub fn admin_path(&self) -> &str {
        &self.admin_path
    }

    /// Render as TOML with the admin token masked.
    pub fn to_redacted_toml(&self) -> ApplicationResult<String> {
        let view = StoredConfig {
            endpoint_url: Some(self.endpoint_url.clone()),
            admin_token: (!self.admin_token.is_empty())
                .then(|| AdminToken::new(self.admin_token.redacted())),
            auth_path: Some(self.auth_path.clone()),
            admin_path: Some(self.admin_path.clone()),
            ..StoredConfig::default()
        };
        view.to_toml()
    }
}

fn normalize_endpoint_url(raw: &str) -> ApplicationResult<String> {
    let trimmed = raw.trim();
    let url = Url::parse(trimmed).map_err(|e| {
        ApplicationError::config(format!("invalid endpoint URL '{trimmed}': {e}"))
    })?;
    if !matches!(url.scheme(), "http" | "https") {
        return Err(ApplicationError::config(format!(
            "invalid endpoint URL '{trimmed}': scheme must be http or https"
        )));
    }
    if url.host_str().is_none() {
        return Err(ApplicationError::config(format!(
            "invalid endpoint URL '{trimmed}': missing host"
        )));
    }
    if url.query().is_some() || url.fragment().is_some() {
        return Err(ApplicationError::config(format!(
            "invalid endpoint URL '{trimmed}': must not contain a query or fragment"
        )));
    }
    Ok(trimmed.trim_end_matches('/').to_string())
}

fn normalize_path(name: &str, raw: &str) -> ApplicationResult<String> {
    let segments = raw.trim().trim_matches('/');
    if segments.is_empty() {
        return Err(ApplicationError::config(format!(
            "{name} must name at least one path segment, got '{raw}'"
        )));
    }
    Ok(format!("/{segments}"))
}

/// What the command about to run needs from the resolved endpoint.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Requirement {
    /// Privileged call: the admin token must be non-empty.
    AdminToken,
    /// Inspection only (e.g. `config show`).
    EndpointOnly,
}

/// Where the stored config lives for one invocation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConfigLocation {
    pub dir: Option<PathBuf>,
    /// The file that will be read, if any
    pub file: Option<PathBuf>,
    /// Directory came from `--config-dir`
    pub explicit: bool,
}

/// Get the platform config directory for tokenadm.
pub fn default_config_dir() -> Option<PathBuf> {
    ProjectDirs::from("", "", APP_NAME).map(|dirs| dirs.config_dir().to_path_buf())
}

/// Resolves exactly one `EndpointConfig` per invocation.
///
/// Reads at most one file; performs no writes and no network I/O.
pub struct ConfigLoader {
    fs: Arc<dyn FileSystem>,
    default_dir: Option<PathBuf>,
}

impl ConfigLoader {
    /// Loader falling back to the platform config directory.
    pub fn new(fs: Arc<dyn FileSystem>) -> Self {
        Self::with_default_dir(fs, default_config_dir())
    }

    pub fn with_default_dir(fs: Arc<dyn FileSystem>, default_dir: Option<PathBuf>) -> Self {
        Self { fs, default_dir }
    }

    /// Find the config file for these options without reading it.
    ///
    /// An explicit `config_dir` must exist and contain a config file;
    /// the default directory may be absent or empty.
    pub fn locate(&self, options: &RawOptions) -> ApplicationResult<ConfigLocation> {
        if let Some(raw_dir) = &options.config_dir {
            let dir = expand_path(raw_dir);
            if !self.fs.exists(&dir) {
                return Err(ApplicationError::config(format!(
                    "config dir does not exist: {}",
                    dir.display()
                )));
            }
            if !self.fs.is_dir(&dir) {
                return Err(ApplicationError::config(format!(
                    "config dir is not a directory: {}",
                    dir.display()
                )));
            }
            let file = self.find_config_file(&dir).ok_or_else(|| {
                ApplicationError::config(format!(
                    "no {CONFIG_FILE_TOML} or {CONFIG_FILE_JSON} in {}",
                    dir.display()
                ))
            })?;
            return Ok(ConfigLocation {
                dir: Some(dir),
                file: Some(file),
                explicit: true,
            });
        }

        let file = self
            .default_dir
            .as_deref()
            .and_then(|dir| self.find_config_file(dir));
        Ok(ConfigLocation {
            dir: self.default_dir.clone(),
            file,
            explicit: false,
        })
    }

    fn find_config_file(&self, dir: &Path) -> Option<PathBuf> {
        [CONFIG_FILE_TOML, CONFIG_FILE_JSON]
            .iter()
            .map(|name| dir.join(name))
            .find(|path| self.fs.is_file(path))
    }

    /// Read and parse the stored config, if there is one.
    pub fn load_stored(
        &self,
        options: &RawOptions,
    ) -> ApplicationResult<Option<(PathBuf, StoredConfig)>> {
        let location = self.locate(options)?;
        let Some(path) = location.file else {
            debug!("load_stored: no config file found");
            return Ok(None);
        };
        debug!("load_stored: reading {}", path.display());
        let content = self
            .fs
            .read_to_string(&path)
            .with_config_context("read", &path)?;
        let stored = StoredConfig::parse(&content, &path)?;
        Ok(Some((path, stored)))
    }

    /// Resolve the endpoint for this invocation.
    ///
    /// Fails when no endpoint can be resolved, when an explicit config dir
    /// or its file is unusable, when a requested profile is missing, or when
    /// `requirement` is `AdminToken` and no admin token was resolved.
    pub fn resolve(
        &self,
        options: &RawOptions,
        requirement: Requirement,
    ) -> ApplicationResult<EndpointConfig> {
        let stored = self.load_stored(options)?;

        let (file_layer, profile_layer) = match &stored {
            Some((path, config)) => {
                let profile = config.select_profile(options.profile.as_deref(), path)?;
                if let Some((name, _)) = &profile {
                    debug!("resolve: using profile '{name}'");
                }
                (
                    config.base(),
                    profile.map(|(_, layer)| layer).unwrap_or_default(),
                )
            }
            None => {
                if let Some(name) = &options.profile {
                    return Err(ApplicationError::config(format!(
                        "profile '{name}' requested but no config file was found"
                    )));
                }
                (PartialEndpoint::default(), PartialEndpoint::default())
            }
        };

        let merged = PartialEndpoint::merge_all([
            PartialEndpoint::defaults(),
            file_layer,
            profile_layer,
            options.as_partial(),
        ]);

        let endpoint = Self::finish(merged, requirement)?;
        let source = stored
            .as_ref()
            .map(|(path, _)| path.display().to_string())
            .unwrap_or_else(|| "flags only".to_string());
        info!(endpoint = endpoint.endpoint_url(), %source, "resolved endpoint");
        Ok(endpoint)
    }

    fn finish(merged: PartialEndpoint, requirement: Requirement) -> ApplicationResult<EndpointConfig> {
        let endpoint_url = merged.endpoint_url.ok_or_else(|| {
            ApplicationError::config(
                "no endpoint configured: pass --endpoint/--url, set TOKENADM_ENDPOINT, \
                 or add endpoint_url to the config file",
            )
        })?;

        let admin_token = merged.admin_token.unwrap_or_default();
        if requirement == Requirement::AdminToken && admin_token.is_empty() {
            return Err(ApplicationError::config(
                "no admin token configured: pass --admin-token, set TOKENADM_ADMIN_TOKEN, \
                 or add admin_token to the config file",
            ));
        }

        EndpointConfig::new(
            &endpoint_url,
            admin_token,
            merged.auth_path.as_deref().unwrap_or(DEFAULT_AUTH_PATH),
            merged.admin_path.as_deref().unwrap_or(DEFAULT_ADMIN_PATH),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    fn partial(url: Option<&str>, token: Option<&str>) -> PartialEndpoint {
        PartialEndpoint {
            endpoint_url: url.map(str::to_string),
            admin_token: token.map(AdminToken::new),
            auth_path: None,
            admin_path: None,
        }
    }

    #[test]
    fn given_layers_when_merging_then_last_non_empty_wins_per_field() {
        let merged = PartialEndpoint::merge_all([
            PartialEndpoint::defaults(),
            partial(Some("https://file.example.com"), Some("file-token")),
            partial(None, Some("flag-token")),
        ]);

        assert_eq!(
            merged.endpoint_url.as_deref(),
            Some("https://file.example.com")
        );
        assert_eq!(merged.admin_token, Some(AdminToken::new("flag-token")));
        assert_eq!(merged.auth_path.as_deref(), Some(DEFAULT_AUTH_PATH));
        assert_eq!(merged.admin_path.as_deref(), Some(DEFAULT_ADMIN_PATH));
    }

    #[test]
    fn given_empty_overlay_values_when_merging_then_ignored() {
        let merged = PartialEndpoint::merge_all([
            partial(Some("https://a.example.com"), Some("token")),
            partial(Some("  "), Some("")),
        ]);

        assert_eq!(merged.endpoint_url.as_deref(), Some("https://a.example.com"));
        assert_eq!(merged.admin_token, Some(AdminToken::new("token")));
    }

    #[test]
    fn given_no_sources_when_merging_then_everything_unset() {
        assert_eq!(
            PartialEndpoint::merge_all(Vec::new()),
            PartialEndpoint::default()
        );
    }

    #[rstest]
    #[case("https://tokens.example.com", "https://tokens.example.com")]
    #[case("https://tokens.example.com/", "https://tokens.example.com")]
    #[case(" http://localhost:8080/api/ ", "http://localhost:8080/api")]
    fn given_valid_url_when_normalizing_then_trailing_slash_removed(
        #[case] raw: &str,
        #[case] expected: &str,
    ) {
        assert_eq!(normalize_endpoint_url(raw).unwrap(), expected);
    }

    #[rstest]
    #[case("tokens.example.com")]
    #[case("ftp://tokens.example.com")]
    #[case("https://tokens.example.com/?x=1")]
    #[case("not a url")]
    fn given_invalid_url_when_normalizing_then_config_error(#[case] raw: &str) {
        assert!(matches!(
            normalize_endpoint_url(raw),
            Err(ApplicationError::Config { .. })
        ));
    }

    #[rstest]
    #[case("admin", "/admin")]
    #[case("/admin/tokens/", "/admin/tokens")]
    #[case("//v1/auth", "/v1/auth")]
    fn given_path_when_normalizing_then_single_leading_slash(
        #[case] raw: &str,
        #[case] expected: &str,
    ) {
        assert_eq!(normalize_path("admin-path", raw).unwrap(), expected);
    }

    #[test]
    fn given_root_path_when_normalizing_then_rejected() {
        assert!(normalize_path("admin-path", "/").is_err());
    }

    #[test]
    fn given_merged_without_endpoint_when_finishing_then_error_names_endpoint() {
        let err = ConfigLoader::finish(PartialEndpoint::defaults(), Requirement::EndpointOnly)
            .unwrap_err();
        assert!(err.to_string().contains("endpoint"), "{err}");
    }

    #[test]
    fn given_missing_token_when_admin_required_then_error_names_admin_token() {
        let merged = PartialEndpoint::merge_all([
            PartialEndpoint::defaults(),
            partial(Some("https://a.example.com"), None),
        ]);

        let err = ConfigLoader::finish(merged.clone(), Requirement::AdminToken).unwrap_err();
        assert!(err.to_string().contains("admin-token"), "{err}");

        let endpoint = ConfigLoader::finish(merged, Requirement::EndpointOnly).unwrap();
        assert!(endpoint.admin_token().is_empty());
    }

    #[test]
    fn given_stored_config_when_toml_round_trip_then_lossless() {
        let mut profiles = BTreeMap::new();
        profiles.insert(
            "staging".to_string(),
            partial(Some("https://staging.example.com"), Some("stg")),
        );
        let config = StoredConfig {
            endpoint_url: Some("https://tokens.example.com".into()),
            admin_token: Some(AdminToken::new("adm")),
            auth_path: Some("/v1/auth".into()),
            admin_path: Some("/v1/admin".into()),
            default_profile: Some("staging".into()),
            profiles,
        };

        let toml = config.to_toml().unwrap();
        let parsed = StoredConfig::parse(&toml, Path::new("config.toml")).unwrap();

        assert_eq!(parsed, config);
    }

    #[test]
    fn given_stored_config_when_json_round_trip_then_lossless() {
        let config = StoredConfig {
            endpoint_url: Some("https://tokens.example.com".into()),
            admin_token: Some(AdminToken::new("adm")),
            auth_path: Some("/v1/auth".into()),
            admin_path: Some("/v1/admin".into()),
            ..StoredConfig::default()
        };

        let json = serde_json::to_string(&config).unwrap();
        let parsed = StoredConfig::parse(&json, Path::new("config.json")).unwrap();

        assert_eq!(parsed, config);
    }

    #[test]
    fn given_camel_case_json_when_parsing_then_fields_resolved() {
        let json = r#"{
            "endpointUrl": "https://tokens.example.com",
            "adminToken": "adm",
            "authPath": "/auth",
            "adminPath": "/admin"
        }"#;
        let parsed = StoredConfig::parse(json, Path::new("config.json")).unwrap();
        assert_eq!(parsed.endpoint_url.as_deref(), Some("https://tokens.example.com"));
        assert_eq!(parsed.admin_token, Some(AdminToken::new("adm")));
        assert_eq!(parsed.admin_path.as_deref(), Some("/admin"));
    }

    #[test]
    fn given_unknown_key_when_parsing_then_config_error_names_file() {
        let err = StoredConfig::parse("endpont_url = \"x\"", Path::new("/cfg/config.toml"))
            .unwrap_err();
        assert!(err.to_string().contains("/cfg/config.toml"), "{err}");
    }

    #[test]
    fn given_endpoint_when_rendering_redacted_then_token_hidden() {
        let endpoint = EndpointConfig::new(
            "https://tokens.example.com",
            AdminToken::new("adm_super_secret_value"),
            "/auth",
            "/admin/tokens",
        )
        .unwrap();

        let rendered = endpoint.to_redacted_toml().unwrap();

        assert!(!rendered.contains("super_secret"));
        assert!(rendered.contains("adm_********"));
    }

    #[test]
    fn given_template_when_parsing_then_valid_empty_config() {
        let parsed = StoredConfig::parse(&StoredConfig::template(), Path::new("config.toml"))
            .unwrap();
        assert_eq!(parsed, StoredConfig::default());
    }
}
