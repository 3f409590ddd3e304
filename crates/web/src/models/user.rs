//! User domain types.

use chrono::{DateTime, Utc};

use delicious_core::{Email, UserId};

/// A registered user (domain type).
#[derive(Debug, Clone)]
pub struct User {
    /// Unique user ID.
    pub id: UserId,
    /// User's email address, normalized.
    pub email: Email,
    /// Display name shown on reviews.
    pub name: String,
    /// When the user was created.
    pub created_at: DateTime<Utc>,
    /// When the user was last updated.
    pub updated_at: DateTime<Utc>,
}

impl User {
    /// Gravatar URL for the user's avatar.
    ///
    /// Gravatar hashes the trimmed, lowercased address; [`Email`] is already
    /// normalized that way.
    #[must_use]
    pub fn gravatar_url(&self) -> String {
        gravatar_url(&self.email)
    }
}

/// Gravatar URL for an email address.
#[must_use]
pub fn gravatar_url(email: &Email) -> String {
    use sha2::{Digest, Sha256};
    let hash = hex::encode(Sha256::digest(email.as_str().as_bytes()));
    format!("https://gravatar.com/avatar/{hash}?s=200&d=retro")
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_gravatar_url_is_stable_per_email() {
        let user = |email: &str| User {
            id: UserId::new(1),
            email: Email::parse(email).unwrap(),
            name: "Wes".to_owned(),
            created_at: Utc::now(),
            updated_at: Utc::now(),
        };
        let a = user("wes@example.com").gravatar_url();
        let b = user("  WES@example.com ").gravatar_url();
        assert_eq!(a, b);
        assert!(a.starts_with("https://gravatar.com/avatar/"));
    }
}
