//! Domain entities: token payloads and the canonical token record

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::domain::DomainError;

/// Canonical token state as reported by the remote service.
///
/// Never carries the secret hash; the service only accepts it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TokenRecord {
    pub token_id: String,
    #[serde(default)]
    pub owner: String,
    #[serde(default)]
    pub is_admin: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub expires_at: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_at: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub updated_at: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub revoked_at: Option<i64>,
}

/// Identity behind the admin credential, as reported by the auth endpoint.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AuthStatus {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub subject: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub is_admin: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub expires_at: Option<i64>,
}

/// Mutable token fields, addressable by name.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TokenField {
    Owner,
    IsAdmin,
    SecretPhc,
    ExpiresAt,
}

impl TokenField {
    pub const ALL: [TokenField; 4] = [
        TokenField::Owner,
        TokenField::IsAdmin,
        TokenField::SecretPhc,
        TokenField::ExpiresAt,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            TokenField::Owner => "owner",
            TokenField::IsAdmin => "is-admin",
            TokenField::SecretPhc => "secret-phc",
            TokenField::ExpiresAt => "expires-at",
        }
    }
}

impl fmt::Display for TokenField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for TokenField {
    type Err = DomainError;

    /// Accepts kebab-case, snake_case and the camelCase wire names.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim() {
            "owner" => Ok(TokenField::Owner),
            "is-admin" | "is_admin" | "isAdmin" | "admin" => Ok(TokenField::IsAdmin),
            "secret-phc" | "secret_phc" | "secretPhc" => Ok(TokenField::SecretPhc),
            "expires-at" | "expires_at" | "expiresAt" => Ok(TokenField::ExpiresAt),
            other => Err(DomainError::UnknownField(other.to_string())),
        }
    }
}

/// Partial update of a single token (PATCH semantics).
///
/// Only fields that are `Some` are serialized. `expires_at` is tri-state:
/// `None` leaves the expiry untouched, `Some(None)` is sent as an explicit
/// `null` and clears it, `Some(Some(ts))` sets it.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TokenUpdate {
    #[serde(skip)]
    pub token_id: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub owner: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub is_admin: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub secret_phc: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub expires_at: Option<Option<i64>>,
}

impl TokenUpdate {
    pub fn new(token_id: impl Into<String>) -> Self {
        Self {
            token_id: token_id.into(),
            ..Self::default()
        }
    }

    pub fn with_owner(mut self, owner: impl Into<String>) -> Self {
        self.owner = Some(owner.into());
        self
    }

    pub fn with_admin(mut self, is_admin: bool) -> Self {
        self.is_admin = Some(is_admin);
        self
    }

    pub fn with_secret_phc(mut self, secret_phc: impl Into<String>) -> Self {
        self.secret_phc = Some(secret_phc.into());
        self
    }

    /// `None` clears the expiry server-side.
    pub fn with_expires_at(mut self, expires_at: Option<i64>) -> Self {
        self.expires_at = Some(expires_at);
        self
    }

    /// Fields this update touches, in declaration order.
    pub fn fields(&self) -> Vec<TokenField> {
        TokenField::ALL
            .into_iter()
            .filter(|field| match field {
                TokenField::Owner => self.owner.is_some(),
                TokenField::IsAdmin => self.is_admin.is_some(),
                TokenField::SecretPhc => self.secret_phc.is_some(),
                TokenField::ExpiresAt => self.expires_at.is_some(),
            })
            .collect()
    }

    pub fn is_empty(&self) -> bool {
        self.fields().is_empty()
    }

    /// Check the update before it leaves the process.
    pub fn validate(&self) -> Result<(), DomainError> {
        validate_token_id(&self.token_id)?;
        if self.is_empty() {
            return Err(DomainError::NoUpdates);
        }
        if let Some(owner) = &self.owner {
            validate_owner(owner)?;
        }
        if let Some(phc) = &self.secret_phc {
            validate_phc(phc)?;
        }
        Ok(())
    }
}

/// Payload for issuing a new token.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct NewToken {
    pub token_id: String,
    pub owner: String,
    pub is_admin: bool,
    pub secret_phc: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub expires_at: Option<i64>,
}

impl NewToken {
    pub fn validate(&self) -> Result<(), DomainError> {
        validate_token_id(&self.token_id)?;
        validate_owner(&self.owner)?;
        validate_phc(&self.secret_phc)
    }
}

pub fn validate_token_id(token_id: &str) -> Result<(), DomainError> {
    if token_id.trim().is_empty() {
        return Err(DomainError::EmptyTokenId);
    }
    Ok(())
}

fn validate_owner(owner: &str) -> Result<(), DomainError> {
    if owner.trim().is_empty() {
        return Err(DomainError::invalid_field("owner", "must not be empty"));
    }
    Ok(())
}

/// Validate that `phc` looks like a PHC string (`$<id>[$<segment>...]`).
///
/// Guards against a plaintext secret being sent where a hash is expected.
/// The hash itself is opaque to this client.
pub fn validate_phc(phc: &str) -> Result<(), DomainError> {
    let invalid = |message: &str| DomainError::invalid_field("secret-phc", message);

    let rest = phc
        .strip_prefix('$')
        .ok_or_else(|| invalid("expected a PHC string starting with '$' (a hash, not a plaintext secret)"))?;

    if phc.chars().any(char::is_whitespace) {
        return Err(invalid("must not contain whitespace"));
    }

    let mut segments = rest.split('$');
    let id = segments.next().unwrap_or_default();
    let id_ok = !id.is_empty()
        && id.len() <= 32
        && id
            .chars()
            .all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || c == '-');
    if !id_ok {
        return Err(invalid("algorithm identifier must be 1-32 chars of [a-z0-9-]"));
    }

    let remaining: Vec<&str> = segments.collect();
    if remaining.is_empty() {
        return Err(invalid("missing hash segment"));
    }
    if remaining.iter().any(|segment| segment.is_empty()) {
        return Err(invalid("contains an empty segment"));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    const PHC: &str = "$argon2id$v=19$m=65536,t=3,p=4$c2FsdHNhbHQ$aGFzaGhhc2g";

    #[test]
    fn given_owner_only_when_serializing_then_only_owner_is_sent() {
        let update = TokenUpdate::new("t1").with_owner("alice");
        let json = serde_json::to_value(&update).unwrap();
        assert_eq!(json, serde_json::json!({ "owner": "alice" }));
    }

    #[test]
    fn given_cleared_expiry_when_serializing_then_sends_explicit_null() {
        let update = TokenUpdate::new("t1").with_expires_at(None);
        let json = serde_json::to_string(&update).unwrap();
        assert_eq!(json, r#"{"expiresAt":null}"#);
    }

    #[test]
    fn given_all_fields_when_serializing_then_uses_camel_case_keys() {
        let update = TokenUpdate::new("t1")
            .with_owner("bob")
            .with_admin(true)
            .with_secret_phc(PHC)
            .with_expires_at(Some(1_700_000_000));
        let json = serde_json::to_value(&update).unwrap();
        assert_eq!(json["isAdmin"], true);
        assert_eq!(json["secretPhc"], PHC);
        assert_eq!(json["expiresAt"], 1_700_000_000);
        assert!(json.get("tokenId").is_none());
    }

    #[test]
    fn given_no_fields_when_validating_then_no_updates() {
        let update = TokenUpdate::new("t1");
        assert!(update.is_empty());
        assert_eq!(update.validate(), Err(DomainError::NoUpdates));
    }

    #[test]
    fn given_blank_token_id_when_validating_then_rejected_before_field_check() {
        let update = TokenUpdate::new("  ");
        assert_eq!(update.validate(), Err(DomainError::EmptyTokenId));
    }

    #[test]
    fn given_blank_owner_when_validating_then_invalid_field() {
        let update = TokenUpdate::new("t1").with_owner(" ");
        assert!(matches!(
            update.validate(),
            Err(DomainError::InvalidField { ref field, .. }) if field == "owner"
        ));
    }

    #[test]
    fn given_update_when_listing_fields_then_in_declaration_order() {
        let update = TokenUpdate::new("t1")
            .with_expires_at(None)
            .with_owner("alice");
        assert_eq!(update.fields(), vec![TokenField::Owner, TokenField::ExpiresAt]);
    }

    #[rstest]
    #[case("owner", TokenField::Owner)]
    #[case("is-admin", TokenField::IsAdmin)]
    #[case("isAdmin", TokenField::IsAdmin)]
    #[case("secret_phc", TokenField::SecretPhc)]
    #[case("expiresAt", TokenField::ExpiresAt)]
    fn given_known_field_name_when_parsing_then_resolves(
        #[case] name: &str,
        #[case] expected: TokenField,
    ) {
        assert_eq!(name.parse::<TokenField>().unwrap(), expected);
    }

    #[test]
    fn given_unknown_field_name_when_parsing_then_rejected() {
        let err = "colour".parse::<TokenField>().unwrap_err();
        assert_eq!(err, DomainError::UnknownField("colour".into()));
    }

    #[rstest]
    #[case(PHC)]
    #[case("$pbkdf2-sha256$29000$N2ZjUw$abcdef")]
    #[case("$scrypt$ln=16,r=8,p=1$aM15713r3Xsvxbi31lqr1Q$nFNh2CVHVjNldFVKDHDlm4CbdRSCdEBsjjJxD+iCs5E")]
    fn given_phc_string_when_validating_then_accepted(#[case] phc: &str) {
        assert!(validate_phc(phc).is_ok(), "{phc} should be accepted");
    }

    #[rstest]
    #[case("hunter2")]
    #[case("$argon2id")]
    #[case("$Argon2$abc")]
    #[case("$argon2id$$hash")]
    #[case("$argon2id$v=19 $hash")]
    fn given_non_phc_string_when_validating_then_rejected(#[case] phc: &str) {
        assert!(validate_phc(phc).is_err(), "{phc} should be rejected");
    }

    #[test]
    fn given_record_json_when_deserializing_then_optional_fields_default() {
        let record: TokenRecord =
            serde_json::from_str(r#"{"tokenId":"t1","owner":"alice"}"#).unwrap();
        assert_eq!(record.token_id, "t1");
        assert!(!record.is_admin);
        assert_eq!(record.expires_at, None);
    }
}
