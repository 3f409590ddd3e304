//! Authentication service.
//!
//! Password registration and login, account edits and the password reset
//! token flow.

mod error;

pub use error::AuthError;

use argon2::{
    Argon2,
    password_hash::{PasswordHash, PasswordHasher, PasswordVerifier, SaltString, rand_core::OsRng},
};
use chrono::{DateTime, Duration, Utc};
use rand::Rng;
use serde::Deserialize;
use sqlx::PgPool;
use tracing::instrument;

use delicious_core::{Email, UserId, ValidationErrors};

use crate::db::RepositoryError;
use crate::db::users::UserRepository;
use crate::models::User;

/// Minimum password length.
const MIN_PASSWORD_LENGTH: usize = 8;

/// Random bytes in a reset token (hex encoded to twice as many characters).
const RESET_TOKEN_BYTES: usize = 20;

/// How long a reset token stays valid.
const RESET_TOKEN_TTL_HOURS: i64 = 1;

/// Registration form fields.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct RegistrationForm {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub password: String,
    #[serde(default, rename = "password-confirm")]
    pub password_confirm: String,
}

/// A registration that passed validation.
#[derive(Debug)]
struct ValidRegistration {
    name: String,
    email: Email,
}

/// Account form fields.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct AccountForm {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub email: String,
}

/// Authentication service.
pub struct AuthService<'a> {
    users: UserRepository<'a>,
}

impl<'a> AuthService<'a> {
    /// Create a new authentication service.
    #[must_use]
    pub const fn new(pool: &'a PgPool) -> Self {
        Self {
            users: UserRepository::new(pool),
        }
    }

    /// Register a new user.
    ///
    /// # Errors
    ///
    /// Returns `AuthError::Validation` listing every bad field, including an
    /// email that is already registered.
    #[instrument(skip(self, form), fields(email = %form.email))]
    pub async fn register(&self, form: &RegistrationForm) -> Result<User, AuthError> {
        let valid = validate_registration(form)?;
        let password_hash = hash_password(&form.password)?;

        let user = self
            .users
            .create(&valid.email, &valid.name, &password_hash)
            .await
            .map_err(|e| match e {
                RepositoryError::Conflict(_) => AuthError::Validation(ValidationErrors::single(
                    "email",
                    "An account with that email already exists!",
                )),
                other => AuthError::Repository(other),
            })?;

        tracing::info!(user_id = %user.id, "User registered");
        Ok(user)
    }

    /// Login with email and password.
    ///
    /// # Errors
    ///
    /// Returns `AuthError::InvalidCredentials` if the email/password is wrong.
    pub async fn login(&self, email: &str, password: &str) -> Result<User, AuthError> {
        let email = Email::parse(email).map_err(|_| AuthError::InvalidCredentials)?;

        let (user, password_hash) = self
            .users
            .get_with_password_hash(&email)
            .await?
            .ok_or(AuthError::InvalidCredentials)?;

        verify_password(password, &password_hash)?;

        Ok(user)
    }

    /// Update the logged-in user's name and email.
    ///
    /// # Errors
    ///
    /// Returns `AuthError::Validation` for a blank name, a bad email or an
    /// email that belongs to someone else.
    #[instrument(skip(self, form))]
    pub async fn update_account(&self, id: UserId, form: &AccountForm) -> Result<User, AuthError> {
        let mut errors = ValidationErrors::new();
        let name = form.name.trim();
        if name.is_empty() {
            errors.push("name", "You must supply a name!");
        }
        let email = Email::parse(&form.email)
            .map_err(|_| errors.push("email", "That Email is not valid!"))
            .ok();

        let email = match email {
            Some(email) if errors.is_empty() => email,
            _ => return Err(AuthError::Validation(errors)),
        };

        self.users
            .update_profile(id, name, &email)
            .await
            .map_err(|e| match e {
                RepositoryError::Conflict(_) => AuthError::Validation(ValidationErrors::single(
                    "email",
                    "An account with that email already exists!",
                )),
                RepositoryError::NotFound => AuthError::UserNotFound,
                other => AuthError::Repository(other),
            })
    }

    /// Start a password reset.
    ///
    /// Returns the user and a fresh token when the email belongs to an
    /// account, `None` otherwise. Callers must respond the same way in both
    /// cases.
    ///
    /// # Errors
    ///
    /// Returns `AuthError::Repository` if the database operation fails.
    #[instrument(skip(self))]
    pub async fn request_password_reset(
        &self,
        email: &str,
    ) -> Result<Option<(User, String)>, AuthError> {
        let Ok(email) = Email::parse(email) else {
            return Ok(None);
        };
        let Some(user) = self.users.get_by_email(&email).await? else {
            return Ok(None);
        };

        let token = generate_reset_token();
        self.users
            .set_reset_token(user.id, &token, reset_token_expiry(Utc::now()))
            .await?;

        Ok(Some((user, token)))
    }

    /// Look up the user holding an unexpired reset token.
    ///
    /// # Errors
    ///
    /// Returns `AuthError::InvalidResetToken` if the token is unknown or expired.
    pub async fn user_for_reset_token(&self, token: &str) -> Result<User, AuthError> {
        self.users
            .get_by_reset_token(token)
            .await?
            .ok_or(AuthError::InvalidResetToken)
    }

    /// Finish a password reset: set the new password and clear the token.
    ///
    /// # Errors
    ///
    /// Returns `AuthError::Validation` if the passwords are too short or differ.
    /// Returns `AuthError::InvalidResetToken` if the token is unknown or expired.
    #[instrument(skip_all)]
    pub async fn reset_password(
        &self,
        token: &str,
        password: &str,
        password_confirm: &str,
    ) -> Result<User, AuthError> {
        let mut errors = ValidationErrors::new();
        check_passwords(password, password_confirm, &mut errors);
        if !errors.is_empty() {
            return Err(AuthError::Validation(errors));
        }

        let password_hash = hash_password(password)?;
        let user = self
            .users
            .reset_password(token, &password_hash)
            .await?
            .ok_or(AuthError::InvalidResetToken)?;

        tracing::info!(user_id = %user.id, "Password reset");
        Ok(user)
    }
}

/// Check every registration field, collecting all problems.
fn validate_registration(form: &RegistrationForm) -> Result<ValidRegistration, ValidationErrors> {
    let mut errors = ValidationErrors::new();

    let name = form.name.trim();
    if name.is_empty() {
        errors.push("name", "You must supply a name!");
    }

    let email = Email::parse(&form.email)
        .map_err(|_| errors.push("email", "That Email is not valid!"))
        .ok();

    check_passwords(&form.password, &form.password_confirm, &mut errors);

    match email {
        Some(email) if errors.is_empty() => Ok(ValidRegistration {
            name: name.to_owned(),
            email,
        }),
        _ => Err(errors),
    }
}

fn check_passwords(password: &str, confirm: &str, errors: &mut ValidationErrors) {
    if password.is_empty() {
        errors.push("password", "Password cannot be blank!");
    } else if password.len() < MIN_PASSWORD_LENGTH {
        errors.push(
            "password",
            format!("Password must be at least {MIN_PASSWORD_LENGTH} characters!"),
        );
    }
    if confirm.is_empty() {
        errors.push("password-confirm", "Confirmed Password cannot be blank!");
    } else if confirm != password {
        errors.push("password-confirm", "Oops! Your passwords do not match");
    }
}

/// Random hex token for password reset links.
fn generate_reset_token() -> String {
    let mut bytes = [0u8; RESET_TOKEN_BYTES];
    rand::rng().fill(&mut bytes);
    hex::encode(bytes)
}

fn reset_token_expiry(now: DateTime<Utc>) -> DateTime<Utc> {
    now + Duration::hours(RESET_TOKEN_TTL_HOURS)
}

/// Hash a password using Argon2id.
///
/// # Errors
///
/// Returns `AuthError::PasswordHash` if hashing fails.
pub fn hash_password(password: &str) -> Result<String, AuthError> {
    let salt = SaltString::generate(&mut OsRng);
    let argon2 = Argon2::default();

    argon2
        .hash_password(password.as_bytes(), &salt)
        .map(|hash| hash.to_string())
        .map_err(|_| AuthError::PasswordHash)
}

/// Verify a password against a hash.
fn verify_password(password: &str, hash: &str) -> Result<(), AuthError> {
    let parsed_hash = PasswordHash::new(hash).map_err(|_| AuthError::InvalidCredentials)?;
    let argon2 = Argon2::default();

    argon2
        .verify_password(password.as_bytes(), &parsed_hash)
        .map_err(|_| AuthError::InvalidCredentials)
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn form() -> RegistrationForm {
        RegistrationForm {
            name: " Wes ".to_owned(),
            email: "Wes@Example.com".to_owned(),
            password: "correct horse".to_owned(),
            password_confirm: "correct horse".to_owned(),
        }
    }

    fn fields(errors: &ValidationErrors) -> Vec<&'static str> {
        errors.fields().iter().map(|e| e.field).collect()
    }

    #[test]
    fn test_validate_registration_normalizes() {
        let valid = validate_registration(&form()).unwrap();
        assert_eq!(valid.name, "Wes");
        assert_eq!(valid.email.as_str(), "wes@example.com");
    }

    #[test]
    fn test_validate_registration_collects_all_errors() {
        let errors = validate_registration(&RegistrationForm::default()).unwrap_err();
        assert_eq!(
            fields(&errors),
            vec!["name", "email", "password", "password-confirm"]
        );
    }

    #[test]
    fn test_validate_registration_password_mismatch() {
        let errors = validate_registration(&RegistrationForm {
            password_confirm: "something else".to_owned(),
            ..form()
        })
        .unwrap_err();
        assert_eq!(errors.messages(), vec!["Oops! Your passwords do not match"]);
    }

    #[test]
    fn test_validate_registration_short_password() {
        let errors = validate_registration(&RegistrationForm {
            password: "short".to_owned(),
            password_confirm: "short".to_owned(),
            ..form()
        })
        .unwrap_err();
        assert_eq!(fields(&errors), vec!["password"]);
    }

    #[test]
    fn test_hash_and_verify_password() {
        let hash = hash_password("correct horse").unwrap();
        assert!(verify_password("correct horse", &hash).is_ok());
        assert!(matches!(
            verify_password("wrong horse", &hash),
            Err(AuthError::InvalidCredentials)
        ));
    }

    #[test]
    fn test_verify_password_rejects_garbage_hash() {
        assert!(matches!(
            verify_password("anything", "not-a-hash"),
            Err(AuthError::InvalidCredentials)
        ));
    }

    #[test]
    fn test_reset_token_shape() {
        let a = generate_reset_token();
        let b = generate_reset_token();
        assert_eq!(a.len(), RESET_TOKEN_BYTES * 2);
        assert!(a.chars().all(|c| c.is_ascii_hexdigit()));
        assert_ne!(a, b);
    }

    #[test]
    fn test_reset_token_expires_in_an_hour() {
        let now = Utc::now();
        assert_eq!(reset_token_expiry(now) - now, Duration::hours(1));
    }
}
