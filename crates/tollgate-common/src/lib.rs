//! # tollgate-common
//!
//! Transport-agnostic building blocks shared by the tollgate client:
//! - Access tokens and the `Authorization` scheme they are sent with
//! - Cookie configuration and the cookie storage collaborator
//! - Structured errors with canonical status text
//! - Named route templates
//!
//! ## Example
//!
//! ```
//! use tollgate_common::{CookieConfig, CookieStore, MemoryCookieStore, Token, TokenAccessType};
//!
//! let cookie = CookieConfig::default();
//! let store = MemoryCookieStore::new();
//!
//! store.set(&cookie.name, "abc123", &cookie.options);
//!
//! let token = store.get(&cookie.name).map(Token::from);
//! assert_eq!(
//!     token.map(|t| t.authorization(TokenAccessType::Bearer)).as_deref(),
//!     Some("Bearer abc123")
//! );
//! ```

/// Cookie configuration and storage.
///
/// Provides the [`CookieStore`] collaborator trait and its in-memory implementation.
pub mod cookie;
/// Structured errors and the status text lookup.
pub mod error;
/// Named route templates with `:param` substitution.
pub mod routes;
/// Access tokens and authorization schemes.
pub mod token;

pub use cookie::{
    CookieConfig, CookieOptions, CookieStore, DEFAULT_COOKIE_NAME, MemoryCookieStore, SameSite,
};
pub use error::{ErrorKind, StructuredError, create_error, status_text};
pub use routes::{ParamValue, Routes};
pub use token::{Token, TokenAccessType};
