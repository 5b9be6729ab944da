//! HTTP client for the remote token administration API
//!
//! All request variants share one transport helper: build the URL, attach
//! the admin bearer credential, send, retry idempotent reads on transient
//! failures, and map the response status onto `InfraError`.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::header::ACCEPT;
use reqwest::{Client, Method, Response, StatusCode};
use serde::de::DeserializeOwned;
use serde::Deserialize;
use tracing::{debug, instrument, warn};

use crate::config::EndpointConfig;
use crate::domain::{AuthStatus, NewToken, TokenRecord, TokenUpdate};
use crate::infrastructure::traits::TokenApi;
use crate::infrastructure::{InfraError, InfraResult};

pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);
pub const DEFAULT_READ_RETRIES: u32 = 2;
pub const DEFAULT_RETRY_BACKOFF: Duration = Duration::from_millis(250);

/// Transport tuning for `HttpTokenClient`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ClientOptions {
    /// Per-request timeout
    pub timeout: Duration,
    /// Extra attempts for idempotent reads; mutations are never retried
    pub read_retries: u32,
    /// Base delay between read attempts, multiplied by the attempt number
    pub retry_backoff: Duration,
}

impl Default for ClientOptions {
    fn default() -> Self {
        Self {
            timeout: DEFAULT_TIMEOUT,
            read_retries: DEFAULT_READ_RETRIES,
            retry_backoff: DEFAULT_RETRY_BACKOFF,
        }
    }
}

/// The closed set of requests the admin API understands.
#[derive(Debug, Clone, Copy)]
pub enum TokenRequest<'a> {
    Create(&'a NewToken),
    List,
    Get(&'a str),
    Update(&'a TokenUpdate),
    Revoke(&'a str),
    CheckAuth,
}

impl TokenRequest<'_> {
    pub fn method(&self) -> Method {
        match self {
            TokenRequest::Create(_) => Method::POST,
            TokenRequest::List | TokenRequest::Get(_) | TokenRequest::CheckAuth => Method::GET,
            TokenRequest::Update(_) => Method::PATCH,
            TokenRequest::Revoke(_) => Method::DELETE,
        }
    }

    /// Path below the endpoint URL, token ids percent-encoded.
    pub fn path(&self, endpoint: &EndpointConfig) -> String {
        let admin = endpoint.admin_path();
        match self {
            TokenRequest::Create(_) | TokenRequest::List => admin.to_string(),
            TokenRequest::Get(id) | TokenRequest::Revoke(id) => {
                format!("{admin}/{}", urlencoding::encode(id))
            }
            TokenRequest::Update(update) => {
                format!("{admin}/{}", urlencoding::encode(&update.token_id))
            }
            TokenRequest::CheckAuth => endpoint.auth_path().to_string(),
        }
    }

    pub fn url(&self, endpoint: &EndpointConfig) -> String {
        format!("{}{}", endpoint.endpoint_url(), self.path(endpoint))
    }

    /// Safe to repeat without changing server state.
    pub fn is_idempotent(&self) -> bool {
        matches!(
            self,
            TokenRequest::List | TokenRequest::Get(_) | TokenRequest::CheckAuth
        )
    }

    /// What a 404 refers to, for the error message.
    fn resource(&self, endpoint: &EndpointConfig) -> String {
        match self {
            TokenRequest::Get(id) | TokenRequest::Revoke(id) => format!("token '{id}'"),
            TokenRequest::Update(update) => format!("token '{}'", update.token_id),
            TokenRequest::Create(_) | TokenRequest::List | TokenRequest::CheckAuth => {
                format!("endpoint {}", self.url(endpoint))
            }
        }
    }
}

/// Authenticated client for the token administration API.
#[derive(Debug, Clone)]
pub struct HttpTokenClient {
    endpoint: EndpointConfig,
    options: ClientOptions,
    http: Client,
}

impl HttpTokenClient {
    /// Create a client for a fully resolved endpoint.
    ///
    /// Fails when the endpoint carries no admin token.
    pub fn new(endpoint: EndpointConfig, options: ClientOptions) -> InfraResult<Self> {
        if endpoint.admin_token().is_empty() {
            return Err(InfraError::Client {
                message: "admin token is empty".to_string(),
            });
        }
        let http = Client::builder()
            .timeout(options.timeout)
            .user_agent(concat!("tokenadm/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| InfraError::Client {
                message: e.to_string(),
            })?;

        Ok(Self {
            endpoint,
            options,
            http,
        })
    }

    pub fn endpoint(&self) -> &EndpointConfig {
        &self.endpoint
    }

    /// Send `request`, retrying idempotent reads on transient failures.
    /// Returns the response only if its status is a success.
    #[instrument(level = "debug", skip(self))]
    async fn execute(&self, request: TokenRequest<'_>) -> InfraResult<Response> {
        let url = request.url(&self.endpoint);
        let max_attempts = if request.is_idempotent() {
            self.options.read_retries + 1
        } else {
            1
        };

        let mut attempt = 1;
        loop {
            debug!(%url, attempt, "sending request");
            let result = self.send_once(&request, &url).await;

            let transient = match &result {
                Ok(response) => is_transient_status(response.status()),
                Err(e) => e.is_transient(),
            };
            if !transient || attempt >= max_attempts {
                return match result {
                    Ok(response) => check_status(&request, &self.endpoint, response).await,
                    Err(e) => Err(e),
                };
            }

            warn!(%url, attempt, "transient failure, retrying read");
            tokio::time::sleep(self.options.retry_backoff * attempt).await;
            attempt += 1;
        }
    }

    async fn send_once(&self, request: &TokenRequest<'_>, url: &str) -> InfraResult<Response> {
        let builder = self
            .http
            .request(request.method(), url)
            .bearer_auth(self.endpoint.admin_token().expose())
            .header(ACCEPT, "application/json");

        let builder = match request {
            TokenRequest::Create(token) => builder.json(token),
            TokenRequest::Update(update) => builder.json(update),
            _ => builder,
        };

        builder.send().await.map_err(|source| InfraError::Network {
            context: format!("{} {}", request.method(), url),
            source,
        })
    }

    async fn fetch<T: DeserializeOwned>(&self, request: TokenRequest<'_>) -> InfraResult<T> {
        let response = self.execute(request).await?;
        let status = response.status().as_u16();
        let body = read_body(&request, response).await?;
        serde_json::from_str(&body).map_err(|e| InfraError::UnexpectedResponse {
            status,
            message: format!("cannot decode response body: {e}"),
        })
    }
}

#[async_trait]
impl TokenApi for HttpTokenClient {
    async fn create(&self, token: &NewToken) -> InfraResult<TokenRecord> {
        self.fetch(TokenRequest::Create(token)).await
    }

    async fn get(&self, token_id: &str) -> InfraResult<TokenRecord> {
        self.fetch(TokenRequest::Get(token_id)).await
    }

    async fn update(&self, update: &TokenUpdate) -> InfraResult<TokenRecord> {
        self.fetch(TokenRequest::Update(update)).await
    }

    async fn revoke(&self, token_id: &str) -> InfraResult<Option<TokenRecord>> {
        let request = TokenRequest::Revoke(token_id);
        let response = self.execute(request).await?;
        let status = response.status();
        let body = read_body(&request, response).await?;
        if status == StatusCode::NO_CONTENT || body.trim().is_empty() {
            return Ok(None);
        }
        serde_json::from_str(&body)
            .map(Some)
            .map_err(|e| InfraError::UnexpectedResponse {
                status: status.as_u16(),
                message: format!("cannot decode response body: {e}"),
            })
    }

    /// Accepts a bare JSON array or an object with a `tokens` array.
    async fn list(&self) -> InfraResult<Vec<TokenRecord>> {
        let body: ListBody = self.fetch(TokenRequest::List).await?;
        Ok(match body {
            ListBody::Bare(tokens) | ListBody::Wrapped { tokens } => tokens,
        })
    }

    async fn check_auth(&self) -> InfraResult<AuthStatus> {
        let request = TokenRequest::CheckAuth;
        let response = self.execute(request).await?;
        let status = response.status().as_u16();
        let body = read_body(&request, response).await?;
        if body.trim().is_empty() {
            return Ok(AuthStatus::default());
        }
        serde_json::from_str(&body).map_err(|e| InfraError::UnexpectedResponse {
            status,
            message: format!("cannot decode response body: {e}"),
        })
    }
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum ListBody {
    Bare(Vec<TokenRecord>),
    Wrapped { tokens: Vec<TokenRecord> },
}

fn is_transient_status(status: StatusCode) -> bool {
    matches!(
        status,
        StatusCode::BAD_GATEWAY | StatusCode::SERVICE_UNAVAILABLE | StatusCode::GATEWAY_TIMEOUT
    )
}

async fn read_body(request: &TokenRequest<'_>, response: Response) -> InfraResult<String> {
    let url = response.url().to_string();
    response.text().await.map_err(|source| InfraError::Network {
        context: format!("{} {} (reading body)", request.method(), url),
        source,
    })
}

/// Map a non-success status onto the error taxonomy.
async fn check_status(
    request: &TokenRequest<'_>,
    endpoint: &EndpointConfig,
    response: Response,
) -> InfraResult<Response> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }

    let text = response.text().await.unwrap_or_default();
    let message = remote_message(&text).unwrap_or_else(|| {
        status
            .canonical_reason()
            .unwrap_or("no details")
            .to_string()
    });
    let code = status.as_u16();
    debug!(status = code, %message, "request rejected");

    Err(match status {
        StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => InfraError::Authentication {
            status: code,
            message,
        },
        StatusCode::NOT_FOUND => InfraError::NotFound {
            resource: request.resource(endpoint),
        },
        StatusCode::BAD_REQUEST | StatusCode::CONFLICT | StatusCode::UNPROCESSABLE_ENTITY => {
            InfraError::RemoteValidation {
                status: code,
                message,
            }
        }
        _ => InfraError::UnexpectedResponse {
            status: code,
            message,
        },
    })
}

/// Extract a human-readable message from an error body.
///
/// Looks for `message`, `error` or `detail` in a JSON object, else uses the raw text.
fn remote_message(body: &str) -> Option<String> {
    let trimmed = body.trim();
    if trimmed.is_empty() {
        return None;
    }
    if let Ok(serde_json::Value::Object(map)) = serde_json::from_str(trimmed) {
        for key in ["message", "error", "detail"] {
            if let Some(serde_json::Value::String(message)) = map.get(key) {
                return Some(message.clone());
            }
        }
    }
    Some(trimmed.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::AdminToken;

    fn endpoint() -> EndpointConfig {
        EndpointConfig::new(
            "https://tokens.example.com/",
            AdminToken::new("adm"),
            "auth",
            "/admin/tokens/",
        )
        .unwrap()
    }

    #[test]
    fn given_update_when_routing_then_patch_on_token_path() {
        let update = TokenUpdate::new("t1").with_owner("alice");
        let request = TokenRequest::Update(&update);
        assert_eq!(request.method(), Method::PATCH);
        assert_eq!(
            request.url(&endpoint()),
            "https://tokens.example.com/admin/tokens/t1"
        );
        assert!(!request.is_idempotent());
    }

    #[test]
    fn given_token_id_with_reserved_chars_when_routing_then_percent_encoded() {
        let request = TokenRequest::Get("team/a b");
        assert_eq!(request.path(&endpoint()), "/admin/tokens/team%2Fa%20b");
    }

    #[test]
    fn given_each_variant_when_routing_then_method_and_path_match_table() {
        let endpoint = endpoint();
        let new_token = NewToken {
            token_id: "t1".into(),
            owner: "alice".into(),
            is_admin: false,
            secret_phc: "$argon2id$v=19$abc".into(),
            expires_at: None,
        };
        let cases = [
            (TokenRequest::Create(&new_token), Method::POST, "/admin/tokens"),
            (TokenRequest::List, Method::GET, "/admin/tokens"),
            (TokenRequest::Get("t1"), Method::GET, "/admin/tokens/t1"),
            (TokenRequest::Revoke("t1"), Method::DELETE, "/admin/tokens/t1"),
            (TokenRequest::CheckAuth, Method::GET, "/auth"),
        ];
        for (request, method, path) in cases {
            assert_eq!(request.method(), method);
            assert_eq!(request.path(&endpoint), path);
        }
    }

    #[test]
    fn given_only_reads_when_checking_idempotency_then_true() {
        assert!(TokenRequest::Get("t1").is_idempotent());
        assert!(TokenRequest::List.is_idempotent());
        assert!(TokenRequest::CheckAuth.is_idempotent());
        assert!(!TokenRequest::Revoke("t1").is_idempotent());
    }

    #[test]
    fn given_json_error_body_when_extracting_message_then_prefers_message_key() {
        assert_eq!(
            remote_message(r#"{"error":"bad","message":"owner is malformed"}"#),
            Some("owner is malformed".to_string())
        );
        assert_eq!(
            remote_message(r#"{"error":"bad owner"}"#),
            Some("bad owner".to_string())
        );
        assert_eq!(remote_message("plain text"), Some("plain text".to_string()));
        assert_eq!(remote_message("  "), None);
    }

    #[test]
    fn given_empty_admin_token_when_building_client_then_rejected() {
        let endpoint = EndpointConfig::new(
            "https://tokens.example.com",
            AdminToken::default(),
            "/auth",
            "/admin/tokens",
        )
        .unwrap();
        let err = HttpTokenClient::new(endpoint, ClientOptions::default()).unwrap_err();
        assert!(matches!(err, InfraError::Client { .. }));
    }
}
