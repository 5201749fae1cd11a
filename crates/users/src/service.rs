use crate::models::{RawRegisterRequest, RegisterRequest, User, normalize_username};
use crate::repository::UserRepository;
use argon2::{
    Argon2,
    password_hash::{Error as PasswordHashError, PasswordHash, PasswordHasher, PasswordVerifier, SaltString},
};
use common::ValidationErrors;
use database::{Database, RepositoryError};
use rand::rngs::OsRng;
use std::sync::LazyLock;
use tracing::instrument;

#[derive(Debug, thiserror::Error)]
pub enum UserError {
    #[error("Invalid input: {0}")]
    Validation(ValidationErrors),
    #[error("Username already exists")]
    Conflict,
    #[error("Invalid username or password")]
    InvalidCredentials,
    #[error("User not found")]
    NotFound,
    #[error("Database error: {0}")]
    Infrastructure(String),
}

impl From<RepositoryError> for UserError {
    fn from(err: RepositoryError) -> Self {
        match err {
            RepositoryError::NotFound => UserError::NotFound,
            RepositoryError::UniqueViolation(_) => UserError::Conflict,
            RepositoryError::Infrastructure(e) => UserError::Infrastructure(e.to_string()),
            _ => UserError::Infrastructure(err.to_string()),
        }
    }
}

fn hash_password(password: &str) -> Result<String, UserError> {
    let salt = SaltString::generate(&mut OsRng);
    Argon2::default()
        .hash_password(password.as_bytes(), &salt)
        .map(|hash| hash.to_string())
        .map_err(|e| UserError::Infrastructure(format!("Failed to hash password: {e}")))
}

fn verify_password(candidate: &str, stored: &str) -> Result<(), UserError> {
    let parsed = PasswordHash::new(stored)
        .map_err(|e| UserError::Infrastructure(format!("Stored password hash is invalid: {e}")))?;
    Argon2::default()
        .verify_password(candidate.as_bytes(), &parsed)
        .map_err(|err| match err {
            PasswordHashError::Password => UserError::InvalidCredentials,
            other => UserError::Infrastructure(format!("Password verification failed: {other}")),
        })
}

/// Verified against when the username is unknown, so both failure paths pay
/// for one argon2 verification.
static DUMMY_HASH: LazyLock<Option<String>> =
    LazyLock::new(|| hash_password("unknown-user-placeholder").ok());

pub struct UserService;

impl UserService {
    #[instrument(skip(db, raw), fields(username = %raw.username))]
    pub async fn register(db: &Database, raw: RawRegisterRequest) -> Result<User, UserError> {
        let req = RegisterRequest::new(raw).map_err(UserError::Validation)?;
        let password_hash = hash_password(req.password())?;

        let mut uow = db.begin().await?;
        let mut repo = UserRepository::new(uow.connection());

        let id = repo
            .create(req.username(), &password_hash, chrono::Utc::now())
            .await?;
        let user = repo.find_by_id(id).await?.ok_or(UserError::NotFound)?;

        uow.commit().await?;

        tracing::info!(user_id = user.id, "Registered user");
        Ok(user)
    }

    /// Unknown usernames and wrong passwords produce the same error.
    #[instrument(skip(db, password))]
    pub async fn authenticate(db: &Database, username: &str, password: &str) -> Result<User, UserError> {
        let username = normalize_username(username);

        let mut uow = db.begin().await?;
        let mut repo = UserRepository::new(uow.connection());

        let Some(creds) = repo.find_credentials(&username).await? else {
            if let Some(hash) = DUMMY_HASH.as_deref() {
                let _ = verify_password(password, hash);
            }
            return Err(UserError::InvalidCredentials);
        };

        verify_password(password, &creds.password_hash)?;
        Ok(creds.user)
    }

    #[instrument(skip(db))]
    pub async fn get_user(db: &Database, id: i64) -> Result<User, UserError> {
        let mut uow = db.begin().await?;
        let mut repo = UserRepository::new(uow.connection());

        repo.find_by_id(id).await?.ok_or(UserError::NotFound)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use database::get_test_db;

    fn raw(username: &str, password: &str) -> RawRegisterRequest {
        RawRegisterRequest {
            username: username.to_string(),
            password: password.to_string(),
            confirm_password: password.to_string(),
        }
    }

    #[tokio::test]
    async fn test_register_then_authenticate() {
        let db = get_test_db().await;

        let user = UserService::register(&db, raw("TestUser", "TestPass123!")).await.unwrap();
        assert_eq!(user.username, "testuser");

        let logged_in = UserService::authenticate(&db, "  TESTUSER ", "TestPass123!").await.unwrap();
        assert_eq!(logged_in.id, user.id);
    }

    #[tokio::test]
    async fn test_password_is_not_stored_in_plaintext() {
        let db = get_test_db().await;
        UserService::register(&db, raw("testuser", "TestPass123!")).await.unwrap();

        let stored: String = sqlx::query_scalar("SELECT password_hash FROM users WHERE username = 'testuser'")
            .fetch_one(&db.pool)
            .await
            .unwrap();
        assert_ne!(stored, "TestPass123!");
        assert!(stored.starts_with("$argon2"));
    }

    #[tokio::test]
    async fn test_wrong_password_and_unknown_user_look_the_same() {
        let db = get_test_db().await;
        UserService::register(&db, raw("testuser", "TestPass123!")).await.unwrap();

        let wrong = UserService::authenticate(&db, "testuser", "WrongPass123!").await.unwrap_err();
        let unknown = UserService::authenticate(&db, "nobody", "TestPass123!").await.unwrap_err();
        assert!(matches!(wrong, UserError::InvalidCredentials));
        assert!(matches!(unknown, UserError::InvalidCredentials));
    }

    #[test]
    fn test_dummy_hash_is_verifiable() {
        let hash = DUMMY_HASH.as_deref().expect("dummy hash");
        assert!(hash.starts_with("$argon2"));
        assert!(matches!(
            verify_password("TestPass123!", hash),
            Err(UserError::InvalidCredentials)
        ));
    }

    #[tokio::test]
    async fn test_duplicate_username_conflicts_case_insensitively() {
        let db = get_test_db().await;
        UserService::register(&db, raw("testuser", "TestPass123!")).await.unwrap();

        let err = UserService::register(&db, raw("TestUser", "TestPass123!")).await.unwrap_err();
        assert!(matches!(err, UserError::Conflict));
    }

    #[tokio::test]
    async fn test_invalid_registration_writes_nothing() {
        let db = get_test_db().await;
        let err = UserService::register(&db, raw("x", "weak")).await.unwrap_err();
        assert!(matches!(err, UserError::Validation(_)));

        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM users")
            .fetch_one(&db.pool)
            .await
            .unwrap();
        assert_eq!(count, 0);
    }
}
