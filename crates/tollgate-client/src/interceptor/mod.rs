//! Interceptor pipeline.
//!
//! The public and private clients differ only in the middleware attached to
//! their `reqwest` client:
//! - [`PublicInterceptor`] runs the request and response hooks.
//! - [`PrivateInterceptor`] additionally attaches the token from the cookie,
//!   rejects requests that have no credentials before they reach the
//!   network, and refreshes the token once when the server answers 401.
//!
//! Failures raised by the pipeline itself are [`StructuredError`]s carried in
//! [`reqwest_middleware::Error::Middleware`]; [`crate::ApiError`] unwraps
//! them again.

use std::fmt;
use std::sync::Arc;

use reqwest::{Request, Response};
use tollgate_common::{CookieConfig, CookieStore, StructuredError, TokenAccessType};

use crate::config::{ApiConfig, RefreshTokenHook, RequestHook, ResponseHook};
use crate::context::{RequestContext, RequestState, ResponseContext};

mod private;
mod public;

pub use private::PrivateInterceptor;
pub use public::PublicInterceptor;

const REQUEST_HOOK_RETURNED_NOTHING: &str =
    "Request hook configured in ApiConfig returned no request";
const RESPONSE_HOOK_RETURNED_NOTHING: &str =
    "Response hook configured in ApiConfig returned no response";

/// Configuration shared by both interceptors.
pub(crate) struct Pipeline {
    pub(crate) token_access_type: TokenAccessType,
    pub(crate) cookie: CookieConfig,
    pub(crate) cookie_store: Arc<dyn CookieStore>,
    pub(crate) refresh_token: Option<RefreshTokenHook>,
    request_hook: Option<RequestHook>,
    response_hook: Option<ResponseHook>,
}

impl Pipeline {
    pub(crate) fn from_config(config: &ApiConfig) -> Self {
        Self {
            token_access_type: config.token_access_type,
            cookie: config.cookie.clone(),
            cookie_store: config.resolved_cookie_store(),
            refresh_token: config.refresh_token.clone(),
            request_hook: config.request.clone(),
            response_hook: config.response.clone(),
        }
    }

    pub(crate) fn context(&self, request: Request) -> RequestContext {
        RequestContext::new(request, self.token_access_type, self.cookie.clone())
    }

    /// Runs the request hook, if any. A hook that yields nothing is a
    /// VALIDATION failure.
    pub(crate) async fn run_request_hook(
        &self,
        context: RequestContext,
    ) -> reqwest_middleware::Result<RequestContext> {
        let Some(hook) = &self.request_hook else {
            return Ok(context);
        };

        match hook(context).await {
            Ok(Some(context)) => Ok(context),
            Ok(None) => Err(rejection(StructuredError::validation(
                REQUEST_HOOK_RETURNED_NOTHING,
            ))),
            Err(error) => Err(reqwest_middleware::Error::Middleware(error)),
        }
    }

    /// Runs the response hook on a successful response.
    ///
    /// Error responses are handed back untouched.
    pub(crate) async fn run_response_hook(
        &self,
        response: Response,
        state: RequestState,
    ) -> reqwest_middleware::Result<Response> {
        let Some(hook) = &self.response_hook else {
            return Ok(response);
        };
        if !response.status().is_success() {
            return Ok(response);
        }

        match hook(ResponseContext::new(response, state)).await {
            Ok(Some(context)) => Ok(context.into_response()),
            Ok(None) => Err(rejection(StructuredError::validation(
                RESPONSE_HOOK_RETURNED_NOTHING,
            ))),
            Err(error) => Err(reqwest_middleware::Error::Middleware(error)),
        }
    }
}

impl fmt::Debug for Pipeline {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Pipeline")
            .field("token_access_type", &self.token_access_type)
            .field("cookie", &self.cookie.name)
            .field("request_hook", &self.request_hook.is_some())
            .field("response_hook", &self.response_hook.is_some())
            .field("refresh_token", &self.refresh_token.is_some())
            .finish_non_exhaustive()
    }
}

/// Wraps a pipeline failure for the middleware chain.
pub(crate) fn rejection(error: StructuredError) -> reqwest_middleware::Error {
    reqwest_middleware::Error::Middleware(anyhow::Error::new(error))
}
