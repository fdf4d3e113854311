//! Signup and login over the user tables.

use super::{hash_password, verify_password, AuthError, TokenService};
use crate::storage::models::UserRecord;
use crate::storage::Database;

/// Register a new account. Fails with [`AuthError::EmailExists`] if `email`
/// (compared exactly) already belongs to an account.
pub async fn signup(
    db: &Database,
    name: &str,
    email: &str,
    password: &str,
) -> Result<UserRecord, AuthError> {
    let password = password.to_string();
    let password_hash = tokio::task::spawn_blocking(move || hash_password(&password))
        .await
        .map_err(|e| AuthError::Hash(e.to_string()))??;

    let (name, email) = (name.to_string(), email.to_string());
    let user = db
        .run(move |db| db.create_user(&name, &email, &password_hash))
        .await?
        .ok_or(AuthError::EmailExists)?;

    tracing::info!(user_id = user.id, "Created user");
    Ok(user)
}

/// Check credentials and issue a session token.
///
/// Unknown email and wrong password both produce
/// [`AuthError::InvalidCredentials`].
pub async fn login(
    db: &Database,
    tokens: &TokenService,
    email: &str,
    password: &str,
) -> Result<String, AuthError> {
    let email = email.to_string();
    let user = db
        .run(move |db| db.get_user_by_email(&email))
        .await?
        .ok_or(AuthError::InvalidCredentials)?;

    let password = password.to_string();
    let password_hash = user.password_hash.clone();
    let matches =
        tokio::task::spawn_blocking(move || verify_password(&password, &password_hash))
            .await
            .map_err(|e| AuthError::Hash(e.to_string()))??;

    if !matches {
        return Err(AuthError::InvalidCredentials);
    }

    tracing::debug!(user_id = user.id, "User logged in");
    tokens.issue(user.id)
}
