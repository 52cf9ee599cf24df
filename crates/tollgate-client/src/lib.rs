//! # tollgate-client
//!
//! Two preconfigured HTTP clients built on `reqwest` and `reqwest-middleware`:
//! - `public`: runs the configured request and response hooks
//! - `private`: additionally sends the token stored in a cookie, rejects
//!   requests without credentials before they reach the network, and on a
//!   401 refreshes the token once and retries
//!
//! Both are created together by [`create_api`], along with a
//! [`CookieAccessor`] for the token cookie.
//!
//! ## Example
//!
//! ```no_run
//! use serde_json::Value;
//! use tollgate_client::{ApiConfig, create_api};
//! use tollgate_common::Token;
//!
//! # async fn example() -> anyhow::Result<()> {
//! let config = ApiConfig::new("https://api.example.com")
//!     .with_refresh_token(|_expired, _state| async {
//!         // Exchange the expired token at your auth server here.
//!         Ok(Some(Token::new("fresh-token")))
//!     });
//!
//! let api = create_api(config)?;
//!
//! let login: Value = api
//!     .public
//!     .post("/login", Some(&serde_json::json!({"user": "ada"})), None)
//!     .await?
//!     .data;
//! if let Some(token) = login["token"].as_str() {
//!     api.cookie.set(token);
//! }
//!
//! let me: Value = api.private.get("/me", None).await?.data;
//! println!("{me}");
//! # Ok(())
//! # }
//! ```

pub mod config;
pub mod context;
pub mod cookie;
pub mod create;
pub mod error;
pub mod instance;
pub mod interceptor;

pub use config::{ApiConfig, RefreshTokenHook, RequestHook, ResponseHook};
pub use context::{CredentialLookup, RequestContext, RequestState, ResponseContext};
pub use cookie::CookieAccessor;
pub use create::{Api, create_api, create_default_api};
pub use error::ApiError;
pub use instance::{ApiInstance, ApiRequest, ApiResponse, RequestOptions};
pub use interceptor::{PrivateInterceptor, PublicInterceptor};
