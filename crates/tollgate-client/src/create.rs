//! Composition root: builds the public and private clients from one
//! [`ApiConfig`].

use std::time::Duration;

use log::debug;
use reqwest_middleware::ClientBuilder;
use tollgate_common::Routes;
use url::Url;

use crate::config::ApiConfig;
use crate::cookie::CookieAccessor;
use crate::error::ApiError;
use crate::instance::ApiInstance;
use crate::interceptor::{PrivateInterceptor, PublicInterceptor};

/// The clients and helpers built by [`create_api`].
#[derive(Debug, Clone)]
pub struct Api {
    /// Client without authentication.
    pub public: ApiInstance,
    /// Client that sends the cookie token and refreshes it on 401.
    pub private: ApiInstance,
    /// Accessor for the token cookie both clients are bound to.
    pub cookie: CookieAccessor,
    /// The `route` table, when one was configured.
    pub route: Option<Routes>,
    /// The `endpoint` table, when one was configured.
    pub endpoint: Option<Routes>,
}

/// Builds the public and private clients.
///
/// # Examples
///
/// ```no_run
/// use tollgate_client::{ApiConfig, create_api};
///
/// # async fn example() -> Result<(), tollgate_client::ApiError> {
/// let api = create_api(ApiConfig::new("https://api.example.com"))?;
///
/// api.cookie.set("token-from-login");
/// let me: serde_json::Value = api.private.get("/me", None).await?.data;
/// println!("{me}");
/// # Ok(())
/// # }
/// ```
///
/// # Errors
///
/// Returns an error if the base URL or a default header is invalid, or if a
/// `reqwest` client cannot be built.
pub fn create_api(mut config: ApiConfig) -> Result<Api, ApiError> {
    let route = config.route.take();
    let endpoint = config.endpoint.take();

    let base_url = config
        .base_url
        .as_deref()
        .map(|url| {
            Url::parse(url).map_err(|e| {
                ApiError::ConfigurationError(format!("Invalid base URL '{url}': {e}"))
            })
        })
        .transpose()?;
    let default_headers = config.header_map()?;
    let cookie_store = config.resolved_cookie_store();
    config.cookie_store = Some(cookie_store.clone());

    let public = ClientBuilder::new(http_client(config.timeout_seconds)?)
        .with(PublicInterceptor::new(&config))
        .build();
    let private = ClientBuilder::new(http_client(config.timeout_seconds)?)
        .with(PrivateInterceptor::new(&config))
        .build();

    debug!(
        "Created API clients (base_url: {:?}, token_access_type: {}, cookie: {})",
        config.base_url, config.token_access_type, config.cookie.name
    );

    Ok(Api {
        public: ApiInstance::new(public, base_url.clone(), default_headers.clone()),
        private: ApiInstance::new(private, base_url, default_headers),
        cookie: CookieAccessor::new(cookie_store, config.cookie),
        route,
        endpoint,
    })
}

/// [`create_api`] with the default configuration: no base URL, `Bearer`
/// tokens in the `_token` cookie of the process-wide cookie store.
///
/// # Errors
///
/// Returns an error if a `reqwest` client cannot be built.
pub fn create_default_api() -> Result<Api, ApiError> {
    create_api(ApiConfig::default())
}

fn http_client(timeout_seconds: Option<u64>) -> Result<reqwest::Client, ApiError> {
    // None means no timeout
    let client = match timeout_seconds {
        Some(timeout) => reqwest::Client::builder()
            .timeout(Duration::from_secs(timeout))
            .build()?,
        None => reqwest::Client::builder().build()?,
    };
    Ok(client)
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used)]

    use std::sync::Arc;
    use std::sync::atomic::{AtomicUsize, Ordering};

    use serde_json::{Value, json};
    use tollgate_common::{CookieStore, MemoryCookieStore, Token, TokenAccessType};
    use wiremock::matchers::{header, header_exists, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    use super::*;

    fn config(server: &MockServer, store: &Arc<MemoryCookieStore>) -> ApiConfig {
        ApiConfig::new(server.uri()).with_cookie_store(store.clone())
    }

    #[test]
    fn test_default_api_uses_token_cookie() {
        let api = create_default_api().unwrap();
        assert_eq!(api.cookie.name(), "_token");
        assert!(api.route.is_none());
        assert!(api.endpoint.is_none());
        assert!(api.public.base_url().is_none());

        api.cookie.set("default-factory-token");
        assert_eq!(
            MemoryCookieStore::shared().get("_token").as_deref(),
            Some("default-factory-token")
        );
        api.cookie.remove();
        assert_eq!(api.cookie.get(), None);
    }

    #[test]
    fn test_routes_are_passed_through() {
        let api = create_api(
            ApiConfig::new("https://api.example.com")
                .with_cookie_store(Arc::new(MemoryCookieStore::new()))
                .with_route(Routes::new().with("post", "/posts/:id")),
        )
        .unwrap();

        assert_eq!(
            api.route.as_ref().and_then(|r| r.path("post")),
            Some("/posts/:id")
        );
        assert!(api.endpoint.is_none());
    }

    #[test]
    fn test_invalid_base_url_is_configuration_error() {
        let result = create_api(ApiConfig::new("not a url"));
        assert!(matches!(result, Err(ApiError::ConfigurationError(_))));
    }

    #[tokio::test]
    async fn test_public_client_sends_no_token() {
        let mock_server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/posts"))
            .and(header_exists("authorization"))
            .respond_with(ResponseTemplate::new(500))
            .expect(0)
            .mount(&mock_server)
            .await;
        Mock::given(method("GET"))
            .and(path("/posts"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!([])))
            .expect(1)
            .mount(&mock_server)
            .await;

        let store = Arc::new(MemoryCookieStore::new());
        let api = create_api(config(&mock_server, &store)).unwrap();
        api.cookie.set("abc123");

        let response = api.public.get::<Value>("/posts", None).await.unwrap();
        assert_eq!(response.data, json!([]));
    }

    #[tokio::test]
    async fn test_private_without_token_never_reaches_server() {
        let mock_server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(200))
            .expect(0)
            .mount(&mock_server)
            .await;

        let store = Arc::new(MemoryCookieStore::new());
        let api = create_api(config(&mock_server, &store)).unwrap();

        let error = api.private.get::<Value>("/me", None).await.unwrap_err();
        assert!(error.is_unauthenticated());
        assert_eq!(error.status(), Some(401));
    }

    #[tokio::test]
    async fn test_private_non_401_error_is_http_status() {
        let mock_server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(header("authorization", "Bearer abc123"))
            .respond_with(ResponseTemplate::new(403).set_body_string("forbidden"))
            .expect(1)
            .mount(&mock_server)
            .await;

        let store = Arc::new(MemoryCookieStore::new());
        let calls = Arc::new(AtomicUsize::new(0));
        let hook_calls = Arc::clone(&calls);
        let api = create_api(config(&mock_server, &store).with_refresh_token(move |_, _| {
            hook_calls.fetch_add(1, Ordering::SeqCst);
            async { Ok(Some(Token::new("newtoken"))) }
        }))
        .unwrap();
        api.cookie.set("abc123");

        let error = api.private.get::<Value>("/me", None).await.unwrap_err();
        assert!(matches!(
            error,
            ApiError::HttpStatus { status, .. } if status == reqwest::StatusCode::FORBIDDEN
        ));
        assert_eq!(calls.load(Ordering::SeqCst), 0);
        assert_eq!(api.cookie.get(), Some(Token::new("abc123")));
    }

    #[tokio::test]
    async fn test_private_refresh_updates_cookie_and_retries() {
        let mock_server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/posts"))
            .and(header("authorization", "Bearer expired"))
            .respond_with(ResponseTemplate::new(401))
            .expect(1)
            .mount(&mock_server)
            .await;
        Mock::given(method("POST"))
            .and(path("/posts"))
            .and(header("authorization", "Bearer newtoken"))
            .respond_with(ResponseTemplate::new(201).set_body_json(json!({"id": 3})))
            .expect(1)
            .mount(&mock_server)
            .await;

        let store = Arc::new(MemoryCookieStore::new());
        let api = create_api(
            config(&mock_server, &store)
                .with_refresh_token(|_, _| async { Ok(Some(Token::new("newtoken"))) }),
        )
        .unwrap();
        api.cookie.set("expired");

        let response = api
            .private
            .post::<Value, _>("/posts", Some(&json!({"title": "hello"})), None)
            .await
            .unwrap();

        assert_eq!(response.status, reqwest::StatusCode::CREATED);
        assert_eq!(response.data, json!({"id": 3}));
        assert_eq!(api.cookie.get(), Some(Token::new("newtoken")));
    }

    #[tokio::test]
    async fn test_static_authorization_header_skips_cookie() {
        let mock_server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(header("authorization", "Basic c2VydmljZQ=="))
            .respond_with(ResponseTemplate::new(200))
            .expect(1)
            .mount(&mock_server)
            .await;

        let store = Arc::new(MemoryCookieStore::new());
        let api = create_api(
            config(&mock_server, &store)
                .with_token_access_type(TokenAccessType::Basic)
                .with_header("Authorization", "Basic c2VydmljZQ=="),
        )
        .unwrap();

        api.private.get::<()>("/health", None).await.unwrap();
    }
}
