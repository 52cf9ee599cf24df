//! The request facade shared by the public and private clients.
//!
//! [`ApiInstance`] wraps an interceptor-configured [`ClientWithMiddleware`]
//! and exposes `request`, `get`, `post`, `put`, `patch` and `delete`, each
//! typed on the response body.

use std::fmt;
use std::time::Duration;

use log::{debug, warn};
use reqwest::header::{CONTENT_TYPE, HeaderMap, HeaderValue};
use reqwest::{Method, StatusCode};
use reqwest_middleware::ClientWithMiddleware;
use serde::Serialize;
use serde::de::DeserializeOwned;
use serde_json::Value;
use typed_builder::TypedBuilder;
use url::Url;

use crate::error::ApiError;

/// Per-request settings.
///
/// # Examples
///
/// ```
/// use std::time::Duration;
/// use tollgate_client::RequestOptions;
///
/// let options = RequestOptions::builder()
///     .query(vec![("page".to_string(), "2".to_string())])
///     .timeout(Duration::from_secs(5))
///     .build();
/// assert_eq!(options.query.len(), 1);
/// ```
#[derive(Debug, Clone, Default, TypedBuilder)]
pub struct RequestOptions {
    /// Headers for this request; they replace default headers of the same name.
    #[builder(default)]
    pub headers: HeaderMap,
    /// Query string parameters.
    #[builder(default)]
    pub query: Vec<(String, String)>,
    /// Timeout for this request, overriding the client timeout.
    #[builder(default, setter(strip_option))]
    pub timeout: Option<Duration>,
}

/// A fully described request for [`ApiInstance::request`].
#[derive(Debug, Clone)]
pub struct ApiRequest {
    pub method: Method,
    /// Absolute URL, or a path relative to the base URL.
    pub url: String,
    /// JSON body.
    pub data: Option<Value>,
    pub options: RequestOptions,
}

impl ApiRequest {
    pub fn new(method: Method, url: impl Into<String>) -> Self {
        Self {
            method,
            url: url.into(),
            data: None,
            options: RequestOptions::default(),
        }
    }

    #[must_use]
    pub fn with_data(mut self, data: Value) -> Self {
        self.data = Some(data);
        self
    }

    #[must_use]
    pub fn with_options(mut self, options: RequestOptions) -> Self {
        self.options = options;
        self
    }
}

/// A successful response with its decoded body.
#[derive(Debug, Clone)]
pub struct ApiResponse<T> {
    pub data: T,
    pub status: StatusCode,
    pub headers: HeaderMap,
    /// The final URL, after redirects.
    pub url: Url,
}

/// One of the two preconfigured clients.
///
/// Cloning is cheap; clones share the connection pool and interceptors.
#[derive(Clone)]
pub struct ApiInstance {
    client: ClientWithMiddleware,
    base_url: Option<Url>,
    default_headers: HeaderMap,
}

impl ApiInstance {
    pub(crate) const fn new(
        client: ClientWithMiddleware,
        base_url: Option<Url>,
        default_headers: HeaderMap,
    ) -> Self {
        Self {
            client,
            base_url,
            default_headers,
        }
    }

    /// The base URL relative request URLs are joined onto.
    pub const fn base_url(&self) -> Option<&Url> {
        self.base_url.as_ref()
    }

    /// The underlying middleware client.
    pub const fn client(&self) -> &ClientWithMiddleware {
        &self.client
    }

    /// Sends a fully described request.
    ///
    /// # Errors
    ///
    /// Returns an error if the URL cannot be resolved, the pipeline or the
    /// transport fails, the server answers with a non-success status, or the
    /// body cannot be decoded as `T`.
    pub async fn request<T: DeserializeOwned>(
        &self,
        request: ApiRequest,
    ) -> Result<ApiResponse<T>, ApiError> {
        self.send(
            request.method,
            &request.url,
            request.data.as_ref(),
            request.options,
        )
        .await
    }

    /// Sends a `GET` request.
    ///
    /// # Errors
    ///
    /// See [`ApiInstance::request`].
    pub async fn get<T: DeserializeOwned>(
        &self,
        url: &str,
        options: Option<RequestOptions>,
    ) -> Result<ApiResponse<T>, ApiError> {
        self.send::<T, ()>(Method::GET, url, None, options.unwrap_or_default())
            .await
    }

    /// Sends a `POST` request with an optional JSON body.
    ///
    /// # Errors
    ///
    /// See [`ApiInstance::request`].
    pub async fn post<T: DeserializeOwned, B: Serialize + ?Sized>(
        &self,
        url: &str,
        data: Option<&B>,
        options: Option<RequestOptions>,
    ) -> Result<ApiResponse<T>, ApiError> {
        self.send(Method::POST, url, data, options.unwrap_or_default())
            .await
    }

    /// Sends a `PUT` request with an optional JSON body.
    ///
    /// # Errors
    ///
    /// See [`ApiInstance::request`].
    pub async fn put<T: DeserializeOwned, B: Serialize + ?Sized>(
        &self,
        url: &str,
        data: Option<&B>,
        options: Option<RequestOptions>,
    ) -> Result<ApiResponse<T>, ApiError> {
        self.send(Method::PUT, url, data, options.unwrap_or_default())
            .await
    }

    /// Sends a `PATCH` request with an optional JSON body.
    ///
    /// # Errors
    ///
    /// See [`ApiInstance::request`].
    pub async fn patch<T: DeserializeOwned, B: Serialize + ?Sized>(
        &self,
        url: &str,
        data: Option<&B>,
        options: Option<RequestOptions>,
    ) -> Result<ApiResponse<T>, ApiError> {
        self.send(Method::PATCH, url, data, options.unwrap_or_default())
            .await
    }

    /// Sends a `DELETE` request.
    ///
    /// # Errors
    ///
    /// See [`ApiInstance::request`].
    pub async fn delete<T: DeserializeOwned>(
        &self,
        url: &str,
        options: Option<RequestOptions>,
    ) -> Result<ApiResponse<T>, ApiError> {
        self.send::<T, ()>(Method::DELETE, url, None, options.unwrap_or_default())
            .await
    }

    async fn send<T: DeserializeOwned, B: Serialize + ?Sized>(
        &self,
        method: Method,
        url: &str,
        data: Option<&B>,
        options: RequestOptions,
    ) -> Result<ApiResponse<T>, ApiError> {
        let url = self.resolve(url)?;
        debug!("{method} {url}");

        // Default headers go on the request itself so the interceptors see them.
        let mut builder = self
            .client
            .request(method.clone(), url)
            .headers(self.default_headers.clone())
            .headers(options.headers);

        if !options.query.is_empty() {
            builder = builder.query(&options.query);
        }
        if let Some(timeout) = options.timeout {
            builder = builder.timeout(timeout);
        }
        if let Some(data) = data {
            builder = builder
                .header(CONTENT_TYPE, HeaderValue::from_static("application/json"))
                .body(serde_json::to_vec(data)?);
        }

        let response = builder.send().await?;
        let status = response.status();
        let headers = response.headers().clone();
        let url = response.url().clone();

        if !status.is_success() {
            warn!("{method} {url} failed with status {status}");
            let body = response.text().await.map_err(|e| {
                warn!("Failed to read error response body: {e}");
                ApiError::NetworkError(e)
            })?;
            return Err(ApiError::HttpStatus {
                status,
                url,
                headers,
                body,
            });
        }

        let text = response.text().await?;
        Ok(ApiResponse {
            data: decode(&text)?,
            status,
            headers,
            url,
        })
    }

    fn resolve(&self, url: &str) -> Result<Url, ApiError> {
        if let Ok(absolute) = Url::parse(url) {
            return Ok(absolute);
        }

        let Some(base) = &self.base_url else {
            return Err(ApiError::ConfigurationError(format!(
                "Relative URL '{url}' requires a base_url"
            )));
        };
        if url.is_empty() {
            return Ok(base.clone());
        }

        let joined = format!(
            "{}/{}",
            base.as_str().trim_end_matches('/'),
            url.trim_start_matches('/')
        );
        Url::parse(&joined)
            .map_err(|e| ApiError::ConfigurationError(format!("Invalid URL '{joined}': {e}")))
    }
}

impl fmt::Debug for ApiInstance {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ApiInstance")
            .field("base_url", &self.base_url.as_ref().map(Url::as_str))
            .field(
                "default_headers",
                &self.default_headers.keys().collect::<Vec<_>>(),
            )
            .finish_non_exhaustive()
    }
}

/// Decodes a response body. An empty body is JSON `null`; a body that is not
/// JSON is tried as a plain string.
fn decode<T: DeserializeOwned>(text: &str) -> Result<T, ApiError> {
    if text.trim().is_empty() {
        return Ok(serde_json::from_value(Value::Null)?);
    }
    match serde_json::from_str(text) {
        Ok(data) => Ok(data),
        Err(error) => {
            serde_json::from_value(Value::String(text.to_string())).map_err(|_| error.into())
        }
    }
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used)]
    #![allow(clippy::panic)]

    use std::sync::Arc;

    use reqwest::header::HeaderName;
    use reqwest_middleware::ClientBuilder;
    use serde::Deserialize;
    use serde_json::json;
    use tokio::io::{AsyncReadExt, AsyncWriteExt};
    use tollgate_common::MemoryCookieStore;
    use wiremock::matchers::{body_json, header, method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    use super::*;
    use crate::config::ApiConfig;
    use crate::interceptor::PublicInterceptor;

    #[derive(Debug, Deserialize, PartialEq)]
    struct Post {
        id: i64,
        title: String,
    }

    fn instance(base_url: Option<&str>, default_headers: HeaderMap) -> ApiInstance {
        let config = ApiConfig::default().with_cookie_store(Arc::new(MemoryCookieStore::new()));
        let client = ClientBuilder::new(reqwest::Client::new())
            .with(PublicInterceptor::new(&config))
            .build();
        ApiInstance::new(
            client,
            base_url.map(|url| Url::parse(url).unwrap()),
            default_headers,
        )
    }

    #[test]
    fn test_resolve_joins_relative_urls() {
        let api = instance(Some("https://api.example.com/v1/"), HeaderMap::new());
        assert_eq!(
            api.resolve("/posts").unwrap().as_str(),
            "https://api.example.com/v1/posts"
        );
        assert_eq!(
            api.resolve("posts/1").unwrap().as_str(),
            "https://api.example.com/v1/posts/1"
        );
        assert_eq!(
            api.resolve("").unwrap().as_str(),
            "https://api.example.com/v1/"
        );
        assert_eq!(
            api.resolve("https://other.example.com/x").unwrap().as_str(),
            "https://other.example.com/x"
        );
    }

    #[test]
    fn test_relative_url_without_base_is_configuration_error() {
        let api = instance(None, HeaderMap::new());
        assert!(matches!(
            api.resolve("/posts"),
            Err(ApiError::ConfigurationError(_))
        ));
    }

    #[test]
    fn test_decode() {
        assert_eq!(decode::<Option<i64>>("").unwrap(), None);
        decode::<()>("  ").unwrap();
        assert_eq!(decode::<String>("plain text").unwrap(), "plain text");
        assert_eq!(decode::<Value>("{\"a\":1}").unwrap(), json!({"a": 1}));
        assert!(matches!(
            decode::<i64>("not a number"),
            Err(ApiError::SerializationError(_))
        ));
    }

    #[tokio::test]
    async fn test_get_decodes_json() {
        let mock_server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/posts/1"))
            .respond_with(
                ResponseTemplate::new(200).set_body_json(json!({"id": 1, "title": "hello"})),
            )
            .expect(1)
            .mount(&mock_server)
            .await;

        let api = instance(Some(&mock_server.uri()), HeaderMap::new());
        let response = api.get::<Post>("/posts/1", None).await.unwrap();

        assert_eq!(response.status, StatusCode::OK);
        assert_eq!(
            response.data,
            Post {
                id: 1,
                title: "hello".to_string()
            }
        );
        assert_eq!(response.url.path(), "/posts/1");
    }

    #[tokio::test]
    async fn test_post_sends_json_body() {
        let mock_server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/posts"))
            .and(header("content-type", "application/json"))
            .and(body_json(json!({"title": "new"})))
            .respond_with(
                ResponseTemplate::new(201).set_body_json(json!({"id": 7, "title": "new"})),
            )
            .expect(1)
            .mount(&mock_server)
            .await;

        let api = instance(Some(&mock_server.uri()), HeaderMap::new());
        let response = api
            .post::<Post, _>("posts", Some(&json!({"title": "new"})), None)
            .await
            .unwrap();

        assert_eq!(response.status, StatusCode::CREATED);
        assert_eq!(response.data.id, 7);
    }

    #[tokio::test]
    async fn test_default_headers_are_overridden_per_request() {
        let mock_server = MockServer::start().await;
        Mock::given(method("DELETE"))
            .and(path("/posts/1"))
            .and(header("x-tenant", "override"))
            .and(header("accept", "application/json"))
            .and(query_param("hard", "true"))
            .respond_with(ResponseTemplate::new(204))
            .expect(1)
            .mount(&mock_server)
            .await;

        let mut defaults = HeaderMap::new();
        defaults.insert("x-tenant", HeaderValue::from_static("default"));
        defaults.insert("accept", HeaderValue::from_static("application/json"));
        let api = instance(Some(&mock_server.uri()), defaults);

        let mut headers = HeaderMap::new();
        headers.insert(
            HeaderName::from_static("x-tenant"),
            HeaderValue::from_static("override"),
        );
        let options = RequestOptions::builder()
            .headers(headers)
            .query(vec![("hard".to_string(), "true".to_string())])
            .build();

        let response = api.delete::<()>("/posts/1", Some(options)).await.unwrap();
        assert_eq!(response.status, StatusCode::NO_CONTENT);
    }

    #[tokio::test]
    async fn test_error_status_becomes_http_status_error() {
        let mock_server = MockServer::start().await;
        Mock::given(method("PUT"))
            .respond_with(ResponseTemplate::new(404).set_body_string("missing"))
            .mount(&mock_server)
            .await;

        let api = instance(Some(&mock_server.uri()), HeaderMap::new());
        let error = api
            .put::<Value, _>("/posts/9", Some(&json!({"title": "x"})), None)
            .await
            .unwrap_err();

        match error {
            ApiError::HttpStatus { status, body, .. } => {
                assert_eq!(status, StatusCode::NOT_FOUND);
                assert_eq!(body, "missing");
            }
            other => panic!("Expected HttpStatus, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_truncated_error_body_is_network_error() {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let server = tokio::spawn(async move {
            let (mut socket, _) = listener.accept().await.unwrap();
            let mut buf = [0u8; 1024];
            socket.read(&mut buf).await.unwrap();
            // Promises 100 bytes, sends 5, then closes.
            let response: &[u8] = b"HTTP/1.1 500 Internal Server Error\r\n\
                content-length: 100\r\n\r\nshort";
            socket.write_all(response).await.unwrap();
        });

        let api = instance(Some(&format!("http://{addr}")), HeaderMap::new());
        let error = api.get::<Value>("/posts/1", None).await.unwrap_err();

        assert!(matches!(error, ApiError::NetworkError(_)));
        server.await.unwrap();
    }

    #[tokio::test]
    async fn test_request_with_api_request() {
        let mock_server = MockServer::start().await;
        Mock::given(method("PATCH"))
            .and(path("/posts/1"))
            .and(body_json(json!({"title": "patched"})))
            .respond_with(ResponseTemplate::new(200).set_body_string("ok"))
            .expect(1)
            .mount(&mock_server)
            .await;

        let api = instance(Some(&mock_server.uri()), HeaderMap::new());
        let request =
            ApiRequest::new(Method::PATCH, "/posts/1").with_data(json!({"title": "patched"}));
        let response = api.request::<String>(request).await.unwrap();
        assert_eq!(response.data, "ok");
    }
}
