use async_trait::async_trait;
use http::Extensions;
use reqwest::{Request, Response};
use reqwest_middleware::{Middleware, Next};

use super::Pipeline;
use crate::config::ApiConfig;

/// Middleware for the public client: request and response hooks only.
///
/// Transport errors and error responses pass through unchanged.
#[derive(Debug)]
pub struct PublicInterceptor {
    pipeline: Pipeline,
}

impl PublicInterceptor {
    /// Creates the interceptor from the hooks in `config`.
    pub fn new(config: &ApiConfig) -> Self {
        Self {
            pipeline: Pipeline::from_config(config),
        }
    }
}

#[async_trait]
impl Middleware for PublicInterceptor {
    async fn handle(
        &self,
        req: Request,
        extensions: &mut Extensions,
        next: Next<'_>,
    ) -> reqwest_middleware::Result<Response> {
        let context = self
            .pipeline
            .run_request_hook(self.pipeline.context(req))
            .await?;
        let state = context.state();

        let response = next.run(context.into_request(), extensions).await?;
        self.pipeline.run_response_hook(response, state).await
    }
}
