//! User domain types.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Minimum accepted display-name length.
pub const MIN_NAME_LEN: usize = 2;

/// Minimum accepted password length.
pub const MIN_PASSWORD_LEN: usize = 8;

/// A registered user.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct User {
    /// Unique identifier.
    pub id: Uuid,
    /// Email address, unique across the system.
    pub email: String,
    /// Display name.
    pub name: String,
    /// Inactive accounts cannot authenticate.
    pub is_active: bool,
    pub is_staff: bool,
    /// Argon2id PHC hash, never serialized.
    #[serde(skip)]
    pub password_hash: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl User {
    /// Create a new active, non-staff user.
    pub fn new(email: String, name: String, password_hash: String) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4(),
            email,
            name,
            is_active: true,
            is_staff: false,
            password_hash,
            created_at: now,
            updated_at: now,
        }
    }
}

/// Lowercase the domain part of an email address.
pub fn normalize_email(email: &str) -> String {
    match email.rsplit_once('@') {
        Some((local, domain)) => format!("{}@{}", local, domain.to_lowercase()),
        None => email.to_string(),
    }
}

/// Validate an email address shape.
pub fn validate_email(email: &str) -> Result<(), String> {
    let valid = matches!(
        email.rsplit_once('@'),
        Some((local, domain)) if !local.is_empty() && domain.contains('.') && !domain.starts_with('.') && !domain.ends_with('.')
    );
    if !valid {
        return Err("Enter a valid email address".to_string());
    }
    Ok(())
}

/// Validate a display name.
pub fn validate_name(name: &str) -> Result<(), String> {
    if name.trim().chars().count() < MIN_NAME_LEN {
        return Err(format!(
            "Name must be at least {} characters long",
            MIN_NAME_LEN
        ));
    }
    Ok(())
}

/// Validate a plaintext password.
pub fn validate_password(password: &str) -> Result<(), String> {
    if password.chars().count() < MIN_PASSWORD_LEN {
        return Err(format!(
            "Password must be at least {} characters long",
            MIN_PASSWORD_LEN
        ));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_user_is_active_non_staff() {
        let user = User::new(
            "alice@example.com".to_string(),
            "Alice".to_string(),
            "$argon2id$stub".to_string(),
        );
        assert!(user.is_active);
        assert!(!user.is_staff);
    }

    #[test]
    fn test_password_hash_not_serialized() {
        let user = User::new(
            "alice@example.com".to_string(),
            "Alice".to_string(),
            "$argon2id$stub".to_string(),
        );
        let json = serde_json::to_string(&user).unwrap();
        assert!(!json.contains("argon2id"));
        assert!(!json.contains("password_hash"));
    }

    #[test]
    fn test_normalize_email_lowercases_domain_only() {
        assert_eq!(
            normalize_email("Alice.B@EXAMPLE.Com"),
            "Alice.B@example.com"
        );
        assert_eq!(normalize_email("no-at-sign"), "no-at-sign");
    }

    #[test]
    fn test_email_validation() {
        assert!(validate_email("alice@example.com").is_ok());
        assert!(validate_email("a@b.co").is_ok());
        assert!(validate_email("alice").is_err());
        assert!(validate_email("@example.com").is_err());
        assert!(validate_email("alice@nodot").is_err());
        assert!(validate_email("alice@.com").is_err());
    }

    #[test]
    fn test_name_validation() {
        assert!(validate_name("Al").is_ok());
        assert!(validate_name("A").is_err());
        assert!(validate_name(" A ").is_err());
    }

    #[test]
    fn test_password_validation() {
        assert!(validate_password("12345678").is_ok());
        assert!(validate_password("1234567").is_err());
    }
}
