//! Session-related types.
//!
//! Types stored in the session for authentication state.

use serde::{Deserialize, Serialize};

use delicious_core::{Email, UserId};

/// Session-stored user identity.
///
/// Minimal data stored in the session to identify the logged-in user.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CurrentUser {
    /// User's database ID.
    pub id: UserId,
    /// User's email address.
    pub email: Email,
    /// User's display name.
    pub name: String,
}

impl CurrentUser {
    /// Avatar shown in the navigation bar.
    #[must_use]
    pub fn gravatar_url(&self) -> String {
        super::user::gravatar_url(&self.email)
    }
}

impl From<&super::User> for CurrentUser {
    fn from(user: &super::User) -> Self {
        Self {
            id: user.id,
            email: user.email.clone(),
            name: user.name.clone(),
        }
    }
}

/// Session keys.
pub mod keys {
    /// Key for storing the current logged-in user.
    pub const CURRENT_USER: &str = "current_user";

    /// Key for pending flash messages.
    pub const FLASHES: &str = "flashes";
}
