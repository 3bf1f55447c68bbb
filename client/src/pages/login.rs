//! Login page flow: validate, authenticate, persist, update the session.

#[cfg(test)]
#[path = "login_test.rs"]
mod login_test;

use crate::net::api::AuthApi;
use crate::net::error::{LoginError, LoginField};
use crate::net::types::{LoginForm, User};
use crate::state::auth::AuthStore;
use crate::util::storage;

/// Trim the identifier and require both fields.
///
/// # Errors
///
/// A `FieldError` for the first empty field, identifier before password.
pub fn validate_login_form(username_or_email: &str, password: &str) -> Result<LoginForm, LoginError> {
    let username_or_email = username_or_email.trim();
    if username_or_email.is_empty() {
        return Err(LoginError::field(LoginField::UsernameOrEmail, "Enter your username or email"));
    }
    if password.is_empty() {
        return Err(LoginError::field(LoginField::Password, "Enter your password"));
    }
    Ok(LoginForm { username_or_email: username_or_email.to_owned(), password: password.to_owned() })
}

/// Where to go after login: the `from` value when it is a same-site path,
/// otherwise home. Protocol-relative `//host` targets are rejected.
pub fn return_url(from: Option<&str>) -> String {
    match from.map(str::trim) {
        Some(target) if target.starts_with('/') && !target.starts_with("//") && !target.starts_with("/\\") => {
            target.to_owned()
        }
        _ => "/".to_owned(),
    }
}

/// Run the login flow against `api`.
///
/// On success the token and user snapshot are persisted to the store's
/// storage and the store is told about the new user. On failure the store is
/// left untouched.
///
/// # Errors
///
/// Field errors from validation, form errors from the backend, network
/// errors from the transport, or a form error when the credentials cannot be
/// persisted.
pub async fn submit_login<A>(api: &A, store: &AuthStore, username_or_email: &str, password: &str) -> Result<User, LoginError>
where
    A: AuthApi + ?Sized,
{
    let form = validate_login_form(username_or_email, password)?;
    let response = api.login(&form).await?;

    storage::save_credentials(store.storage(), &response.access_token, &response.user).map_err(|e| {
        tracing::error!(error = %e, "could not persist credentials");
        LoginError::form(format!("Could not save your session: {e}"))
    })?;

    if !response.message.is_empty() {
        tracing::info!(message = %response.message, "backend accepted login");
    }
    store.login(response.user.clone());
    Ok(response.user)
}
