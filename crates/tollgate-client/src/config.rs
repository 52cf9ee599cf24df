//! Client configuration.
//!
//! [`ApiConfig`] is usually built in code with the `with_*` methods. The
//! serializable part (base URL, access type, cookie, headers, timeout and
//! routes) can also be loaded from TOML:
//!
//! ```toml
//! base_url = "https://api.example.com"
//! token_access_type = "Bearer"
//! timeout_seconds = 30
//!
//! [cookie]
//! name = "_session"
//!
//! [cookie.options]
//! max_age_seconds = 86400
//! secure = true
//!
//! [headers]
//! Accept = "application/json"
//!
//! [route]
//! posts = "/posts"
//! post = "/posts/:id"
//! ```
//!
//! Hooks and the cookie store cannot be expressed in TOML and are attached
//! afterwards.

use std::collections::HashMap;
use std::fmt;
use std::fs;
use std::future::Future;
use std::path::Path;
use std::str::FromStr;
use std::sync::Arc;

use futures::future::BoxFuture;
use reqwest::header::{HeaderMap, HeaderName, HeaderValue};
use serde::{Deserialize, Serialize};
use tollgate_common::{
    CookieConfig, CookieOptions, CookieStore, MemoryCookieStore, Routes, Token, TokenAccessType,
};

use crate::context::{RequestContext, RequestState, ResponseContext};
use crate::error::ApiError;

/// Hook run on every outgoing request. Must resolve to `Some(request)`.
pub type RequestHook = Arc<
    dyn Fn(RequestContext) -> BoxFuture<'static, anyhow::Result<Option<RequestContext>>>
        + Send
        + Sync,
>;

/// Hook run on every successful response. Must resolve to `Some(response)`.
pub type ResponseHook = Arc<
    dyn Fn(ResponseContext) -> BoxFuture<'static, anyhow::Result<Option<ResponseContext>>>
        + Send
        + Sync,
>;

/// Hook that exchanges an expired token for a new one. Must resolve to a
/// non-empty `Some(token)`.
pub type RefreshTokenHook = Arc<
    dyn Fn(Token, RequestState) -> BoxFuture<'static, anyhow::Result<Option<Token>>>
        + Send
        + Sync,
>;

/// Configuration shared by the public and private clients.
#[derive(Clone, Default, Serialize, Deserialize)]
pub struct ApiConfig {
    /// Base URL that relative request URLs are joined onto.
    #[serde(default)]
    pub base_url: Option<String>,
    /// Scheme placed in front of the token (default `Bearer`).
    #[serde(default)]
    pub token_access_type: TokenAccessType,
    /// Cookie holding the token (default name `_token`).
    #[serde(default)]
    pub cookie: CookieConfig,
    /// Headers added to every request before the interceptors run.
    #[serde(default)]
    pub headers: HashMap<String, String>,
    /// Request timeout in seconds.
    #[serde(default)]
    pub timeout_seconds: Option<u64>,
    /// Route table passed through to [`crate::Api::route`].
    #[serde(default)]
    pub route: Option<Routes>,
    /// Route table passed through to [`crate::Api::endpoint`].
    #[serde(default)]
    pub endpoint: Option<Routes>,
    /// Token refresh hook used by the private client on 401.
    #[serde(skip)]
    pub refresh_token: Option<RefreshTokenHook>,
    /// Request hook.
    #[serde(skip)]
    pub request: Option<RequestHook>,
    /// Response hook.
    #[serde(skip)]
    pub response: Option<ResponseHook>,
    /// Cookie store; the process-wide [`MemoryCookieStore`] when unset.
    #[serde(skip)]
    pub cookie_store: Option<Arc<dyn CookieStore>>,
}

impl fmt::Debug for ApiConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ApiConfig")
            .field("base_url", &self.base_url)
            .field("token_access_type", &self.token_access_type)
            .field("cookie", &self.cookie)
            .field("headers", &self.headers.keys().collect::<Vec<_>>())
            .field("timeout_seconds", &self.timeout_seconds)
            .field("route", &self.route)
            .field("endpoint", &self.endpoint)
            .field("refresh_token", &self.refresh_token.is_some())
            .field("request", &self.request.is_some())
            .field("response", &self.response.is_some())
            .field("cookie_store", &self.cookie_store.is_some())
            .finish()
    }
}

impl ApiConfig {
    /// Creates a configuration with the given base URL and defaults elsewhere.
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: Some(base_url.into()),
            ..Default::default()
        }
    }

    /// Parses the serializable part of a configuration from TOML.
    ///
    /// # Errors
    ///
    /// Returns an error if the document is not valid TOML or a field has
    /// the wrong shape (for example an unknown `token_access_type`).
    pub fn from_toml_str(contents: &str) -> Result<Self, ApiError> {
        Ok(toml::from_str(contents)?)
    }

    /// Loads the serializable part of a configuration from a TOML file.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or parsed.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ApiError> {
        let contents = fs::read_to_string(path.as_ref())?;
        Self::from_toml_str(&contents)
    }

    /// Sets the base URL.
    #[must_use]
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = Some(base_url.into());
        self
    }

    /// Sets the authorization scheme.
    #[must_use]
    pub fn with_token_access_type(mut self, token_access_type: TokenAccessType) -> Self {
        self.token_access_type = token_access_type;
        self
    }

    /// Sets the token cookie name.
    #[must_use]
    pub fn with_cookie_name(mut self, name: impl Into<String>) -> Self {
        self.cookie.name = name.into();
        self
    }

    /// Sets the attributes used when the token cookie is written or removed.
    #[must_use]
    pub fn with_cookie_options(mut self, options: CookieOptions) -> Self {
        self.cookie.options = options;
        self
    }

    /// Adds a default header.
    #[must_use]
    pub fn with_header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.insert(name.into(), value.into());
        self
    }

    /// Sets the request timeout.
    #[must_use]
    pub fn with_timeout_seconds(mut self, timeout_seconds: u64) -> Self {
        self.timeout_seconds = Some(timeout_seconds);
        self
    }

    /// Sets the `route` table.
    #[must_use]
    pub fn with_route(mut self, route: Routes) -> Self {
        self.route = Some(route);
        self
    }

    /// Sets the `endpoint` table.
    #[must_use]
    pub fn with_endpoint(mut self, endpoint: Routes) -> Self {
        self.endpoint = Some(endpoint);
        self
    }

    /// Uses the given cookie store instead of the process-wide one.
    #[must_use]
    pub fn with_cookie_store(mut self, store: Arc<dyn CookieStore>) -> Self {
        self.cookie_store = Some(store);
        self
    }

    /// Registers the request hook.
    ///
    /// # Examples
    ///
    /// ```
    /// use tollgate_client::ApiConfig;
    /// use reqwest::header::HeaderValue;
    ///
    /// let config = ApiConfig::new("https://api.example.com")
    ///     .with_request_hook(|mut req| async move {
    ///         req.headers_mut()
    ///             .insert("x-client", HeaderValue::from_static("tollgate"));
    ///         Ok(Some(req))
    ///     });
    /// assert!(config.request.is_some());
    /// ```
    #[must_use]
    pub fn with_request_hook<F, Fut>(mut self, hook: F) -> Self
    where
        F: Fn(RequestContext) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = anyhow::Result<Option<RequestContext>>> + Send + 'static,
    {
        self.request = Some(Arc::new(move |request| Box::pin(hook(request))));
        self
    }

    /// Registers the response hook.
    #[must_use]
    pub fn with_response_hook<F, Fut>(mut self, hook: F) -> Self
    where
        F: Fn(ResponseContext) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = anyhow::Result<Option<ResponseContext>>> + Send + 'static,
    {
        self.response = Some(Arc::new(move |response| Box::pin(hook(response))));
        self
    }

    /// Registers the token refresh hook.
    ///
    /// The hook receives the expired token and the state of the request that
    /// was rejected, and returns the replacement token.
    ///
    /// # Examples
    ///
    /// ```
    /// use tollgate_client::ApiConfig;
    /// use tollgate_common::Token;
    ///
    /// let config = ApiConfig::new("https://api.example.com")
    ///     .with_refresh_token(|_expired, _state| async { Ok(Some(Token::new("fresh-token"))) });
    /// assert!(config.refresh_token.is_some());
    /// ```
    #[must_use]
    pub fn with_refresh_token<F, Fut>(mut self, hook: F) -> Self
    where
        F: Fn(Token, RequestState) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = anyhow::Result<Option<Token>>> + Send + 'static,
    {
        self.refresh_token = Some(Arc::new(move |token, state| Box::pin(hook(token, state))));
        self
    }

    /// The configured cookie store, or the process-wide one.
    pub fn resolved_cookie_store(&self) -> Arc<dyn CookieStore> {
        self.cookie_store
            .clone()
            .unwrap_or_else(|| MemoryCookieStore::shared() as Arc<dyn CookieStore>)
    }

    /// Converts the default headers into a [`HeaderMap`].
    ///
    /// # Errors
    ///
    /// Returns a configuration error for invalid header names or values.
    pub fn header_map(&self) -> Result<HeaderMap, ApiError> {
        let mut headers = HeaderMap::with_capacity(self.headers.len());
        for (name, value) in &self.headers {
            let header_name = HeaderName::from_str(name).map_err(|e| {
                ApiError::ConfigurationError(format!("Invalid header name '{name}': {e}"))
            })?;
            let header_value = HeaderValue::from_str(value).map_err(|e| {
                ApiError::ConfigurationError(format!("Invalid value for header '{name}': {e}"))
            })?;
            headers.insert(header_name, header_value);
        }
        Ok(headers)
    }
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used)]
    #![allow(clippy::expect_used)]

    use std::io::Write;

    use super::*;

    #[test]
    fn test_defaults() {
        let config = ApiConfig::default();
        assert_eq!(config.base_url, None);
        assert_eq!(config.token_access_type, TokenAccessType::Bearer);
        assert_eq!(config.cookie.name, "_token");
        assert!(config.refresh_token.is_none());
        assert!(config.request.is_none());
        assert!(config.response.is_none());
    }

    #[test]
    fn test_from_toml() {
        let config = ApiConfig::from_toml_str(
            r#"
            base_url = "https://api.example.com"
            token_access_type = "Basic"
            timeout_seconds = 15

            [cookie]
            name = "_session"

            [cookie.options]
            max_age_seconds = 60

            [headers]
            Accept = "application/json"

            [endpoint]
            users = "/users/:id"
            "#,
        )
        .unwrap();

        assert_eq!(config.base_url.as_deref(), Some("https://api.example.com"));
        assert_eq!(config.token_access_type, TokenAccessType::Basic);
        assert_eq!(config.timeout_seconds, Some(15));
        assert_eq!(config.cookie.name, "_session");
        assert_eq!(config.cookie.options.max_age_seconds, Some(60));
        assert_eq!(config.header_map().unwrap()["accept"], "application/json");
        assert!(config.route.is_none());
        assert_eq!(
            config.endpoint.as_ref().and_then(|e| e.path("users")),
            Some("/users/:id")
        );
    }

    #[test]
    fn test_from_toml_rejects_unknown_access_type() {
        let result = ApiConfig::from_toml_str("token_access_type = \"Digest\"\n");
        assert!(matches!(result, Err(ApiError::Toml(_))));
    }

    #[test]
    fn test_load_from_file() {
        let mut file = tempfile::NamedTempFile::new().expect("temp file");
        writeln!(file, "base_url = \"http://localhost:8080\"").unwrap();

        let config = ApiConfig::load(file.path()).unwrap();
        assert_eq!(config.base_url.as_deref(), Some("http://localhost:8080"));
        assert_eq!(config.cookie.name, "_token");
    }

    #[test]
    fn test_load_missing_file() {
        let result = ApiConfig::load("/nonexistent/tollgate.toml");
        assert!(matches!(result, Err(ApiError::Io(_))));
    }

    #[test]
    fn test_invalid_header_is_configuration_error() {
        let config = ApiConfig::default().with_header("bad header", "value");
        assert!(matches!(
            config.header_map(),
            Err(ApiError::ConfigurationError(_))
        ));
    }

    #[test]
    fn test_debug_hides_header_values() {
        let config = ApiConfig::default()
            .with_header("Authorization", "Bearer secret-value")
            .with_refresh_token(|_, _| async { Ok(None) });
        let debug_str = format!("{config:?}");
        assert!(debug_str.contains("Authorization"));
        assert!(!debug_str.contains("secret-value"));
        assert!(debug_str.contains("refresh_token: true"));
    }
}
