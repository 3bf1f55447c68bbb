//! REST API client for the blog backend.
//!
//! SYSTEM CONTEXT
//! ==============
//! Every backend call goes through `ApiClient`, which attaches the bearer
//! token (when the session has one) as `Authorization: Bearer <token>`.
//!
//! ERROR HANDLING
//! ==============
//! Nothing is retried and no timeout is set beyond reqwest's defaults. The
//! login call returns a `LoginError` ready for the form; every other call
//! returns an `ApiError` and leaves the presentation to the caller.

#[cfg(test)]
#[path = "api_test.rs"]
mod api_test;

use async_trait::async_trait;
use reqwest::{Method, RequestBuilder};
use serde::de::DeserializeOwned;

use super::error::{ApiError, LOGIN_RETRY_MESSAGE, LoginError, api_failure, login_failure};
use super::types::{Article, ArticlesResponse, AuthResponse, Category, CreateArticle, LoginForm, Repository};

/// Join a base URL and an absolute endpoint path without doubling slashes.
fn join_url(base_url: &str, path: &str) -> String {
    format!("{}/{}", base_url.trim_end_matches('/'), path.trim_start_matches('/'))
}

fn article_endpoint(id: i64) -> String {
    format!("/articles/{id}")
}

// =============================================================================
// AUTH SEAM
// =============================================================================

/// The login call, split out so the login flow can run against a fake backend.
#[async_trait(?Send)]
pub trait AuthApi {
    /// Exchange credentials for a bearer token and user identity.
    async fn login(&self, form: &LoginForm) -> Result<AuthResponse, LoginError>;
}

// =============================================================================
// CLIENT
// =============================================================================

#[derive(Clone, Debug)]
pub struct ApiClient {
    base_url: String,
    token: Option<String>,
    http: reqwest::Client,
}

impl ApiClient {
    #[must_use]
    pub fn new(base_url: &str) -> Self {
        Self { base_url: base_url.trim_end_matches('/').to_owned(), token: None, http: reqwest::Client::new() }
    }

    /// Attach a bearer token to every subsequent request.
    #[must_use]
    pub fn with_token(mut self, token: impl Into<String>) -> Self {
        self.token = Some(token.into());
        self
    }

    pub fn set_token(&mut self, token: Option<String>) {
        self.token = token;
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub fn has_token(&self) -> bool {
        self.token.is_some()
    }

    fn request(&self, method: Method, path: &str) -> RequestBuilder {
        let request = self.http.request(method, join_url(&self.base_url, path));
        match &self.token {
            Some(token) => request.bearer_auth(token),
            None => request,
        }
    }

    async fn send_json<T: DeserializeOwned>(request: RequestBuilder) -> Result<T, ApiError> {
        let resp = request.send().await?;
        let status = resp.status();
        let body = resp.text().await?;
        if !status.is_success() {
            tracing::warn!(status = status.as_u16(), "backend request failed");
            return Err(api_failure(status.as_u16(), &body));
        }
        Ok(serde_json::from_str(&body)?)
    }

    /// `POST /auth/login`.
    ///
    /// # Errors
    ///
    /// `LoginError::Network` when the backend is unreachable, otherwise a
    /// `FormError` describing the rejected credentials or malformed input.
    pub async fn authenticate(&self, form: &LoginForm) -> Result<AuthResponse, LoginError> {
        let resp = self
            .request(Method::POST, "/auth/login")
            .json(form)
            .send()
            .await
            .map_err(|e| LoginError::Network(e.to_string()))?;
        let status = resp.status();
        let body = resp.text().await.map_err(|e| LoginError::Network(e.to_string()))?;
        if !status.is_success() {
            tracing::info!(status = status.as_u16(), "login rejected");
            return Err(login_failure(status.as_u16(), &body));
        }
        serde_json::from_str(&body).map_err(|e| {
            tracing::error!(error = %e, "login response did not match the expected shape");
            LoginError::form(LOGIN_RETRY_MESSAGE)
        })
    }

    /// `GET /articles`.
    ///
    /// # Errors
    ///
    /// Returns an `ApiError` on transport, status, or decode failure.
    pub async fn list_articles(&self) -> Result<ArticlesResponse, ApiError> {
        Self::send_json(self.request(Method::GET, "/articles")).await
    }

    /// `GET /articles/{id}`.
    ///
    /// # Errors
    ///
    /// `ApiError::NotFound` for an unknown id; other failures as for every call.
    pub async fn get_article(&self, id: i64) -> Result<Article, ApiError> {
        Self::send_json(self.request(Method::GET, &article_endpoint(id))).await
    }

    /// `POST /articles`. Requires a bearer token.
    ///
    /// # Errors
    ///
    /// `ApiError::Unauthorized` when the token is missing or stale.
    pub async fn create_article(&self, article: &CreateArticle) -> Result<Article, ApiError> {
        Self::send_json(self.request(Method::POST, "/articles").json(article)).await
    }

    /// `DELETE /articles/{id}`. Requires a bearer token.
    ///
    /// # Errors
    ///
    /// `ApiError::Unauthorized` when the token is missing or stale.
    pub async fn delete_article(&self, id: i64) -> Result<(), ApiError> {
        let resp = self.request(Method::DELETE, &article_endpoint(id)).send().await?;
        let status = resp.status();
        if status.is_success() {
            return Ok(());
        }
        let body = resp.text().await.unwrap_or_default();
        Err(api_failure(status.as_u16(), &body))
    }

    /// `GET /categories`.
    ///
    /// # Errors
    ///
    /// Returns an `ApiError` on transport, status, or decode failure.
    pub async fn list_categories(&self) -> Result<Vec<Category>, ApiError> {
        Self::send_json(self.request(Method::GET, "/categories")).await
    }

    /// `GET /github/repositories`.
    ///
    /// # Errors
    ///
    /// Returns an `ApiError` on transport, status, or decode failure.
    pub async fn list_repositories(&self) -> Result<Vec<Repository>, ApiError> {
        Self::send_json(self.request(Method::GET, "/github/repositories")).await
    }
}

#[async_trait(?Send)]
impl AuthApi for ApiClient {
    async fn login(&self, form: &LoginForm) -> Result<AuthResponse, LoginError> {
        self.authenticate(form).await
    }
}
