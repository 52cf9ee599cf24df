//! Request and response contexts handed to hooks.
//!
//! A [`RequestContext`] wraps the outgoing [`reqwest::Request`] together with
//! the access type and cookie settings of the client that is sending it, so
//! hooks can read them without holding on to the configuration. Once the
//! request is dispatched it is summarized as a [`RequestState`], which is
//! what the response hook and the refresh hook receive.

use std::fmt;

use reqwest::header::{AUTHORIZATION, HeaderMap, HeaderValue};
use reqwest::{Method, Request, Response, StatusCode};
use tollgate_common::{CookieConfig, StructuredError, Token, TokenAccessType};
use url::Url;

/// Outcome of the private client's cookie lookup for a request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum CredentialLookup {
    /// The cookie has not been consulted (public client, or the request
    /// already carried an `Authorization` header).
    #[default]
    NotChecked,
    /// The cookie was consulted and held no token.
    Missing,
    /// The token from the cookie was attached to the request.
    Attached,
}

/// An outgoing request as seen by the request hook.
pub struct RequestContext {
    request: Request,
    token_access_type: TokenAccessType,
    cookie: CookieConfig,
    credentials: CredentialLookup,
}

impl RequestContext {
    pub(crate) const fn new(
        request: Request,
        token_access_type: TokenAccessType,
        cookie: CookieConfig,
    ) -> Self {
        Self {
            request,
            token_access_type,
            cookie,
            credentials: CredentialLookup::NotChecked,
        }
    }

    /// The underlying request.
    pub const fn request(&self) -> &Request {
        &self.request
    }

    /// Mutable access to the underlying request.
    pub const fn request_mut(&mut self) -> &mut Request {
        &mut self.request
    }

    /// Request headers.
    pub fn headers(&self) -> &HeaderMap {
        self.request.headers()
    }

    /// Mutable request headers.
    pub fn headers_mut(&mut self) -> &mut HeaderMap {
        self.request.headers_mut()
    }

    pub fn method(&self) -> &Method {
        self.request.method()
    }

    pub fn url(&self) -> &Url {
        self.request.url()
    }

    /// The `Authorization` header, if it is set to a non-empty value.
    pub fn authorization(&self) -> Option<&str> {
        authorization(self.headers())
    }

    pub const fn token_access_type(&self) -> TokenAccessType {
        self.token_access_type
    }

    /// The cookie the client reads its token from.
    pub const fn cookie(&self) -> &CookieConfig {
        &self.cookie
    }

    pub const fn credential_lookup(&self) -> CredentialLookup {
        self.credentials
    }

    /// Unwraps the context into the request to dispatch.
    pub fn into_request(self) -> Request {
        self.request
    }

    /// A snapshot of the request for the response side of the pipeline.
    pub fn state(&self) -> RequestState {
        RequestState {
            method: self.method().clone(),
            url: self.url().clone(),
            headers: self.headers().clone(),
            token_access_type: self.token_access_type,
            cookie: self.cookie.clone(),
            sent: false,
            updated_token: None,
        }
    }

    /// Sets `Authorization` to `"<type> <token>"`.
    pub(crate) fn attach_token(&mut self, token: &Token) -> Result<(), StructuredError> {
        let value = authorization_value(token, self.token_access_type)?;
        self.headers_mut().insert(AUTHORIZATION, value);
        self.credentials = CredentialLookup::Attached;
        Ok(())
    }

    pub(crate) const fn mark_credentials_missing(&mut self) {
        self.credentials = CredentialLookup::Missing;
    }
}

impl fmt::Debug for RequestContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RequestContext")
            .field("method", self.method())
            .field("url", &self.url().as_str())
            .field("headers", &header_names(self.headers()))
            .field("token_access_type", &self.token_access_type)
            .field("cookie", &self.cookie.name)
            .field("credentials", &self.credentials)
            .finish_non_exhaustive()
    }
}

/// What the response side knows about the request it is handling.
///
/// `sent` and `updated_token` are set by the private client's refresh
/// protocol: once `sent` is `true` a further 401 is surfaced instead of
/// triggering another refresh.
#[derive(Clone)]
pub struct RequestState {
    pub method: Method,
    pub url: Url,
    pub headers: HeaderMap,
    pub token_access_type: TokenAccessType,
    pub cookie: CookieConfig,
    /// A token refresh was already attempted for this request.
    pub sent: bool,
    /// The token obtained by the refresh, if any.
    pub updated_token: Option<Token>,
}

impl RequestState {
    /// The `Authorization` header, if it is set to a non-empty value.
    pub fn authorization(&self) -> Option<&str> {
        authorization(&self.headers)
    }
}

impl fmt::Debug for RequestState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RequestState")
            .field("method", &self.method)
            .field("url", &self.url.as_str())
            .field("headers", &header_names(&self.headers))
            .field("token_access_type", &self.token_access_type)
            .field("cookie", &self.cookie.name)
            .field("sent", &self.sent)
            .field("updated_token", &self.updated_token)
            .finish()
    }
}

/// A successful response as seen by the response hook.
#[derive(Debug)]
pub struct ResponseContext {
    pub response: Response,
    /// The request this response answers.
    pub config: RequestState,
}

impl ResponseContext {
    pub const fn new(response: Response, config: RequestState) -> Self {
        Self { response, config }
    }

    pub fn status(&self) -> StatusCode {
        self.response.status()
    }

    pub fn into_response(self) -> Response {
        self.response
    }
}

/// Builds a sensitive `Authorization` value for `token`.
pub(crate) fn authorization_value(
    token: &Token,
    access_type: TokenAccessType,
) -> Result<HeaderValue, StructuredError> {
    let mut value = HeaderValue::from_str(&token.authorization(access_type))
        .map_err(|_| StructuredError::validation("Authorization header is invalid"))?;
    value.set_sensitive(true);
    Ok(value)
}

fn authorization(headers: &HeaderMap) -> Option<&str> {
    headers
        .get(AUTHORIZATION)
        .and_then(|value| value.to_str().ok())
        .filter(|value| !value.is_empty())
}

fn header_names(headers: &HeaderMap) -> Vec<&str> {
    headers.keys().map(reqwest::header::HeaderName::as_str).collect()
}
