//! Terminal output formatting with colors
//!
//! Respects NO_COLOR, CLICOLOR, CLICOLOR_FORCE automatically.

use colored::Colorize;

use crate::domain::{format_expiry, AuthStatus, TokenRecord};

/// Print error (red bold "error:" prefix) to stderr
pub fn error(msg: &(impl std::fmt::Display + ?Sized)) {
    eprintln!("{}: {}", "error".red().bold(), msg);
}

/// Print warning (yellow "Warning:" prefix) to stderr
pub fn warning(msg: &(impl std::fmt::Display + ?Sized)) {
    eprintln!("{}: {}", "Warning".yellow(), msg);
}

/// Print success status (green checkmark)
pub fn success(msg: &(impl std::fmt::Display + ?Sized)) {
    println!("{} {}", "✓".green(), msg);
}

/// Print section header (cyan bold)
pub fn header(msg: &(impl std::fmt::Display + ?Sized)) {
    println!("{}", msg.to_string().cyan().bold());
}

/// Print indented label/value pair
pub fn field(label: &str, value: &(impl std::fmt::Display + ?Sized)) {
    println!("  {:<11} {}", format!("{label}:").dimmed(), value);
}

/// Print plain output (no color, for data meant to be piped)
pub fn info(msg: &(impl std::fmt::Display + ?Sized)) {
    println!("{}", msg);
}

/// Render an optional timestamp for humans.
pub fn timestamp(value: Option<i64>) -> String {
    value.map(format_expiry).unwrap_or_else(|| "-".to_string())
}

/// Print one token as a labelled block.
pub fn token(record: &TokenRecord) {
    header(&record.token_id);
    field("owner", &record.owner);
    field("admin", &record.is_admin);
    field("expires", &timestamp(record.expires_at));
    if record.created_at.is_some() {
        field("created", &timestamp(record.created_at));
    }
    if record.updated_at.is_some() {
        field("updated", &timestamp(record.updated_at));
    }
    if let Some(revoked_at) = record.revoked_at {
        field("revoked", &format_expiry(revoked_at).red());
    }
}

/// One line per token, for `token list`.
pub fn token_line(record: &TokenRecord) -> String {
    let admin = if record.is_admin { "admin" } else { "-" };
    let state = if record.revoked_at.is_some() {
        "revoked".red().to_string()
    } else {
        timestamp(record.expires_at)
    };
    format!("{:<32} {:<20} {:<5} {}", record.token_id, record.owner, admin, state)
}

pub fn auth_status(status: &AuthStatus) {
    success("admin token accepted");
    if let Some(subject) = &status.subject {
        field("subject", subject);
    }
    if let Some(is_admin) = status.is_admin {
        field("admin", &is_admin);
    }
    if status.expires_at.is_some() {
        field("expires", &timestamp(status.expires_at));
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn given_missing_timestamp_when_rendering_then_dash() {
        assert_eq!(timestamp(None), "-");
        assert_eq!(timestamp(Some(0)), "1970-01-01T00:00:00Z");
    }

    #[test]
    fn given_record_when_rendering_line_then_contains_id_and_owner() {
        colored::control::set_override(false);
        let record = TokenRecord {
            token_id: "t1".into(),
            owner: "alice".into(),
            is_admin: true,
            expires_at: None,
            created_at: None,
            updated_at: None,
            revoked_at: None,
        };

        let line = token_line(&record);

        assert!(line.starts_with("t1 "));
        assert!(line.contains("alice"));
        assert!(line.contains("admin"));
    }
}
