//! Per-process session wiring for the terminal client.
//!
//! SYSTEM CONTEXT
//! ==============
//! Each CLI invocation is one client process: it builds the auth store over
//! the credential file, initializes it once, and routes every admin command
//! through a route guard for the matching site path. A 401 from the backend
//! ends the local session the same way a logout does.

#[cfg(test)]
#[path = "session_test.rs"]
mod session_test;

use std::cell::RefCell;
use std::rc::Rc;

use client::net::api::ApiClient;
use client::net::error::{ApiError, LoginError};
use client::net::types::User;
use client::pages::login;
use client::state::auth::AuthStore;
use client::util::auth::{Decision, GuardRequirement, RouteGuard, return_url};
use client::util::storage::{CredentialStorage, load_token};

use crate::CliError;

pub struct Session {
    store: Rc<AuthStore>,
    api: ApiClient,
}

impl Session {
    /// Build the store over `storage`, read persisted credentials once, and
    /// attach the stored token to the API client when the session is valid.
    pub fn open(storage: Rc<dyn CredentialStorage>, api_url: &str) -> Self {
        let store = Rc::new(AuthStore::new(storage));
        store.initialize();

        let mut api = ApiClient::new(api_url);
        if store.is_authenticated() {
            api.set_token(load_token(store.storage()));
        }
        Self { store, api }
    }

    pub fn api(&self) -> &ApiClient {
        &self.api
    }

    pub fn user(&self) -> Option<User> {
        self.store.snapshot().user
    }

    /// Check the route guard for a protected site path before running an
    /// admin command.
    ///
    /// # Errors
    ///
    /// `CliError::LoginRequired` when no user is signed in.
    pub fn require_login(&self, path: &str, query: &str) -> Result<(), CliError> {
        let navigation = Rc::new(RefCell::new(None::<String>));
        let sink = Rc::clone(&navigation);
        let guard = RouteGuard::install(&self.store, GuardRequirement::protected(path).with_query(query), move |location| {
            *sink.borrow_mut() = Some(location.to_owned());
        });

        match guard.view() {
            Decision::ShowContent => Ok(()),
            Decision::ShowUnauthorizedPrompt { login_href } => Err(CliError::LoginRequired {
                location: navigation.take().unwrap_or(login_href),
                from: return_url(path, query),
            }),
            Decision::ShowLoading | Decision::RedirectToLogin { .. } => Err(CliError::SessionUnavailable),
        }
    }

    /// Run the login flow and point the API client at the new token.
    ///
    /// # Errors
    ///
    /// Returns the `LoginError` produced by validation or the backend.
    pub async fn login(&mut self, username_or_email: &str, password: &str) -> Result<User, LoginError> {
        let user = login::submit_login(&self.api, &self.store, username_or_email, password).await?;
        self.api.set_token(load_token(self.store.storage()));
        Ok(user)
    }

    pub fn logout(&mut self) {
        self.store.logout();
        self.api.set_token(None);
    }

    /// Translate an API failure, ending the local session on a 401.
    pub fn api_error(&mut self, err: ApiError) -> CliError {
        if err.is_unauthorized() {
            tracing::warn!("backend rejected the stored token; signing out locally");
            self.logout();
            return CliError::SessionExpired;
        }
        CliError::Api(err)
    }
}
