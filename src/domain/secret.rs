//! Admin bearer credential

use std::fmt;

use serde::{Deserialize, Serialize};
use zeroize::Zeroize;

/// Bearer credential for privileged calls.
///
/// Debug output is redacted and the buffer is zeroed on drop.
#[derive(Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct AdminToken(String);

impl AdminToken {
    pub fn new(token: impl Into<String>) -> Self {
        Self(token.into())
    }

    pub fn expose(&self) -> &str {
        &self.0
    }

    pub fn is_empty(&self) -> bool {
        self.0.trim().is_empty()
    }

    /// Short form safe for display: first four characters, rest masked.
    pub fn redacted(&self) -> String {
        if self.0.chars().count() < 12 {
            return "********".to_string();
        }
        let head: String = self.0.chars().take(4).collect();
        format!("{head}********")
    }
}

impl fmt::Debug for AdminToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("AdminToken(**redacted**)")
    }
}

impl Drop for AdminToken {
    fn drop(&mut self) {
        self.0.zeroize();
    }
}
