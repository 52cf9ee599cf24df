use async_trait::async_trait;
use http::Extensions;
use log::{debug, warn};
use reqwest::header::AUTHORIZATION;
use reqwest::{Request, Response, StatusCode};
use reqwest_middleware::{Middleware, Next};
use tollgate_common::{CookieStore, StructuredError, Token, TokenAccessType};

use super::{Pipeline, rejection};
use crate::config::ApiConfig;
use crate::context::{RequestContext, RequestState, authorization_value};

const UNAUTHENTICATED: &str = "Unauthenticated user cannot perform private API requests";
const INVALID_AUTHORIZATION: &str = "Authorization header is invalid";
const EMPTY_REFRESHED_TOKEN: &str = "The token returned from the refresh_token hook is empty";

/// Why a dispatch attempt did not produce a successful response.
enum Failure {
    /// No credentials after the request hook; nothing was sent.
    NoToken,
    /// The server answered with a non-success status.
    Status(Response),
    /// The transport (or an inner middleware) failed.
    Transport(reqwest_middleware::Error),
}

impl Failure {
    fn into_outcome(self) -> reqwest_middleware::Result<Response> {
        match self {
            Self::NoToken => Err(rejection(StructuredError::unauthenticated(UNAUTHENTICATED))),
            Self::Status(response) => Ok(response),
            Self::Transport(error) => Err(error),
        }
    }
}

/// What to do after a failure.
enum Recovery {
    /// Dispatch `request` again; `state.sent` is set.
    Retry {
        request: Request,
        state: RequestState,
    },
    /// Hand this outcome to the caller.
    Surface(reqwest_middleware::Result<Response>),
}

/// Middleware for the private client.
///
/// Each request moves through `Authorizing -> Dispatching -> Fulfilled`, or
/// from `Authorizing` or `Dispatching` into `Failed`. A failed request is
/// retried at most once, after a token refresh triggered by a 401; any other
/// failure, or a second 401, is surfaced as it is.
#[derive(Debug)]
pub struct PrivateInterceptor {
    pipeline: Pipeline,
}

impl PrivateInterceptor {
    /// Creates the interceptor from the token, cookie and hook settings in
    /// `config`.
    pub fn new(config: &ApiConfig) -> Self {
        Self {
            pipeline: Pipeline::from_config(config),
        }
    }

    /// Attaches the cookie token unless the request already carries
    /// credentials, then runs the request hook.
    async fn authorize(&self, request: Request) -> reqwest_middleware::Result<RequestContext> {
        let mut context = self.pipeline.context(request);

        if context.authorization().is_none() {
            let token = self
                .pipeline
                .cookie_store
                .get(&self.pipeline.cookie.name)
                .map(Token::from)
                .filter(|token| !token.is_empty());

            match token {
                Some(token) => context.attach_token(&token).map_err(rejection)?,
                None => {
                    debug!(
                        "No token in cookie '{}' for {} {}",
                        self.pipeline.cookie.name,
                        context.method(),
                        context.url()
                    );
                    context.mark_credentials_missing();
                }
            }
        }

        self.pipeline.run_request_hook(context).await
    }

    /// The token-refresh protocol.
    ///
    /// `replay` is `None` only when the request body is a stream that
    /// cannot be cloned. A 401 on such a request is surfaced as it is,
    /// before the refresh hook runs.
    async fn recover(
        &self,
        failure: Failure,
        replay: Option<Request>,
        mut state: RequestState,
    ) -> Recovery {
        let Some(header) = state.authorization() else {
            return Recovery::Surface(Err(rejection(StructuredError::unauthenticated(
                UNAUTHENTICATED,
            ))));
        };
        let Some(token) = credential(header, state.token_access_type) else {
            return Recovery::Surface(Err(rejection(StructuredError::validation(
                INVALID_AUTHORIZATION,
            ))));
        };

        let response = match failure {
            Failure::Status(response)
                if response.status() == StatusCode::UNAUTHORIZED && !state.sent =>
            {
                response
            }
            other => return Recovery::Surface(other.into_outcome()),
        };

        let Some(mut request) = replay else {
            warn!(
                "Request body for {} {} cannot be replayed, skipping token refresh",
                state.method, state.url
            );
            return Recovery::Surface(Ok(response));
        };

        state.sent = true;

        let Some(refresh_token) = &self.pipeline.refresh_token else {
            debug!(
                "Retrying {} {} after 401 without a refresh_token hook",
                state.method, state.url
            );
            return Recovery::Retry { request, state };
        };

        debug!("Refreshing token after 401 from {} {}", state.method, state.url);
        let fresh = match refresh_token(token, state.clone()).await {
            Ok(Some(fresh)) if !fresh.is_empty() => fresh,
            Ok(_) => {
                return Recovery::Surface(Err(rejection(StructuredError::validation(
                    EMPTY_REFRESHED_TOKEN,
                ))));
            }
            Err(error) => {
                return Recovery::Surface(Err(reqwest_middleware::Error::Middleware(error)));
            }
        };
        let value = match authorization_value(&fresh, state.token_access_type) {
            Ok(value) => value,
            Err(error) => return Recovery::Surface(Err(rejection(error))),
        };

        self.pipeline.cookie_store.set(
            &self.pipeline.cookie.name,
            fresh.expose_secret(),
            &self.pipeline.cookie.options,
        );
        request.headers_mut().insert(AUTHORIZATION, value.clone());
        state.headers.insert(AUTHORIZATION, value);
        state.updated_token = Some(fresh);

        Recovery::Retry { request, state }
    }
}

#[async_trait]
impl Middleware for PrivateInterceptor {
    async fn handle(
        &self,
        req: Request,
        extensions: &mut Extensions,
        next: Next<'_>,
    ) -> reqwest_middleware::Result<Response> {
        let context = self.authorize(req).await?;
        let mut state = context.state();
        let mut request = context.into_request();

        loop {
            let replay = request.try_clone();
            let failure = if state.authorization().is_none() {
                Failure::NoToken
            } else {
                match next.clone().run(request, extensions).await {
                    Ok(response) if response.status().is_success() => {
                        return self.pipeline.run_response_hook(response, state).await;
                    }
                    Ok(response) => Failure::Status(response),
                    Err(error) => Failure::Transport(error),
                }
            };

            match self.recover(failure, replay, state).await {
                Recovery::Retry {
                    request: retry,
                    state: retry_state,
                } => {
                    request = retry;
                    state = retry_state;
                }
                Recovery::Surface(outcome) => return outcome,
            }
        }
    }
}

/// Extracts the credential from an `Authorization` header.
///
/// The header must mention `access_type` and carry a non-empty value after
/// the scheme.
fn credential(header: &str, access_type: TokenAccessType) -> Option<Token> {
    if !header.contains(access_type.as_str()) {
        return None;
    }
    let (_, credential) = header.split_once(' ')?;
    let credential = credential.trim();
    (!credential.is_empty()).then(|| Token::new(credential))
}
