use lazy_static::lazy_static;
use regex::Regex;
use tracing::{info, warn};

use super::dto::SignupRequest;
use super::jwt::JwtKeys;
use super::password::{burn_verify, hash_password, verify_password};
use crate::db::UserRepo;
use crate::error::{AppError, AppResult};
use crate::users::repo_types::{NewUser, User};
use crate::users::services::{non_empty, validate_bio};

const INVALID_CREDENTIALS: &str = "Invalid credentials";

pub(crate) fn is_valid_email(email: &str) -> bool {
    lazy_static! {
        static ref EMAIL_RE: Regex = Regex::new(r"^[^@\s]+@[^@\s]+\.[^@\s]+$").unwrap();
    }
    EMAIL_RE.is_match(email)
}

/// Lookup form of an address: trimmed and lowercased, nothing rejected.
pub(crate) fn canonical_email(raw: &str) -> String {
    raw.trim().to_lowercase()
}

/// Canonical and shape-checked; used where a new address is stored.
pub(crate) fn normalize_email(raw: &str) -> AppResult<String> {
    let email = canonical_email(raw);
    if !is_valid_email(&email) {
        return Err(AppError::bad_request("Invalid email"));
    }
    Ok(email)
}

/// Checks credentials and issues a bearer token.
///
/// Unknown email and wrong password produce the same `Unauthorized` error.
pub async fn login(
    users: &dyn UserRepo,
    keys: &JwtKeys,
    email: &str,
    password: &str,
) -> AppResult<(String, User)> {
    let email = canonical_email(email);

    let Some(user) = users.find_by_email(&email).await? else {
        burn_verify(password);
        warn!(email = %email, "login unknown email");
        return Err(AppError::Unauthorized(INVALID_CREDENTIALS.into()));
    };

    if !verify_password(password, &user.password_hash)? {
        warn!(user_id = %user.id, "login invalid password");
        return Err(AppError::Unauthorized(INVALID_CREDENTIALS.into()));
    }

    let token = keys.sign(user.id, &user.email)?;
    info!(user_id = %user.id, "user logged in");
    Ok((token, user))
}

/// Registers a user; only the Argon2 hash of the password is stored.
pub async fn signup(users: &dyn UserRepo, req: SignupRequest) -> AppResult<User> {
    let (Some(name), Some(email), Some(password), Some(confirm)) = (
        non_empty(req.name),
        non_empty(req.email),
        req.password.filter(|p| !p.is_empty()),
        req.confirm_password.filter(|p| !p.is_empty()),
    ) else {
        return Err(AppError::bad_request("Missing required fields"));
    };

    if password != confirm {
        return Err(AppError::bad_request("Passwords do not match"));
    }

    let email = normalize_email(&email)?;
    let bio = non_empty(req.bio);
    validate_bio(bio.as_deref())?;

    if users.find_by_email(&email).await?.is_some() {
        warn!(email = %email, "email already registered");
        return Err(AppError::conflict("Email already registered"));
    }

    let password_hash = hash_password(&password)?;
    let user = users
        .create(NewUser {
            name,
            username: non_empty(req.username),
            email,
            bio,
            password_hash,
        })
        .await?;

    info!(user_id = %user.id, "user registered");
    Ok(user)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::JwtConfig;
    use crate::db::memory::MemoryStore;

    fn keys() -> JwtKeys {
        JwtKeys::from(&JwtConfig {
            secret: "test".into(),
            issuer: "test-issuer".into(),
            audience: "test-aud".into(),
            ttl_minutes: 60 * 24,
        })
    }

    fn signup_req(email: &str, password: &str, confirm: &str) -> SignupRequest {
        SignupRequest {
            name: Some("A".into()),
            username: None,
            email: Some(email.into()),
            bio: None,
            password: Some(password.into()),
            confirm_password: Some(confirm.into()),
        }
    }

    #[test]
    fn email_shape() {
        assert!(is_valid_email("a@x.com"));
        assert!(!is_valid_email("a@x"));
        assert!(!is_valid_email("a x@y.com"));
        assert_eq!(normalize_email("  A@X.com ").unwrap(), "a@x.com");
        assert!(normalize_email("chef@localhost").is_err());
        assert_eq!(canonical_email(" Chef@LocalHost "), "chef@localhost");
    }

    #[tokio::test]
    async fn login_does_not_shape_check_the_email() {
        let store = MemoryStore::default();
        let err = login(&store, &keys(), "chef@localhost", "wrong").await.unwrap_err();
        assert!(matches!(err, AppError::Unauthorized(ref m) if m == "Invalid credentials"));

        let err = login(&store, &keys(), "not an email", "wrong").await.unwrap_err();
        assert!(matches!(err, AppError::Unauthorized(_)));
    }

    #[tokio::test]
    async fn signup_then_login() {
        let store = MemoryStore::default();
        let user = signup(&store, signup_req("a@x.com", "p1", "p1")).await.unwrap();
        assert_ne!(user.password_hash, "p1");

        let (token, logged_in) = login(&store, &keys(), "a@x.com", "p1").await.unwrap();
        assert_eq!(logged_in.id, user.id);
        let claims = keys().verify(&token).unwrap();
        assert_eq!(claims.sub, user.id);
        assert_eq!(claims.email, "a@x.com");
    }

    #[tokio::test]
    async fn wrong_password_and_unknown_email_look_the_same() {
        let store = MemoryStore::default();
        signup(&store, signup_req("a@x.com", "p1", "p1")).await.unwrap();

        let wrong = login(&store, &keys(), "a@x.com", "wrong").await.unwrap_err();
        let unknown = login(&store, &keys(), "b@x.com", "p1").await.unwrap_err();
        assert!(matches!(wrong, AppError::Unauthorized(_)));
        assert!(matches!(unknown, AppError::Unauthorized(_)));
        assert_eq!(wrong.to_string(), unknown.to_string());
    }

    #[tokio::test]
    async fn signup_validation() {
        let store = MemoryStore::default();

        let err = signup(&store, signup_req("a@x.com", "p1", "p2")).await.unwrap_err();
        assert!(matches!(err, AppError::BadRequest(ref m) if m == "Passwords do not match"));

        let mut missing = signup_req("a@x.com", "p1", "p1");
        missing.name = Some("   ".into());
        let err = signup(&store, missing).await.unwrap_err();
        assert!(matches!(err, AppError::BadRequest(_)));

        let mut long_bio = signup_req("a@x.com", "p1", "p1");
        long_bio.bio = Some("x".repeat(161));
        let err = signup(&store, long_bio).await.unwrap_err();
        assert!(matches!(err, AppError::BadRequest(_)));

        assert!(store.find_by_email("a@x.com").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn duplicate_signup_conflicts_without_touching_record() {
        let store = MemoryStore::default();
        let original = signup(&store, signup_req("a@x.com", "p1", "p1")).await.unwrap();

        let err = signup(&store, signup_req("A@x.com", "other", "other"))
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::Conflict(_)));

        let stored = store.find_by_email("a@x.com").await.unwrap().unwrap();
        assert_eq!(stored, original);
        assert!(login(&store, &keys(), "a@x.com", "p1").await.is_ok());
    }
}
