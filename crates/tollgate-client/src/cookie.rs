use std::fmt;
use std::sync::Arc;

use tollgate_common::{CookieConfig, CookieOptions, CookieStore, Token};

/// Reads and writes the token cookie configured for an [`crate::Api`].
///
/// Typically used to store the token after a login and to clear it on
/// logout; the private client reads the same cookie on every request.
#[derive(Clone)]
pub struct CookieAccessor {
    store: Arc<dyn CookieStore>,
    config: CookieConfig,
}

impl CookieAccessor {
    pub fn new(store: Arc<dyn CookieStore>, config: CookieConfig) -> Self {
        Self { store, config }
    }

    /// Stores `token` under the configured name and options.
    pub fn set(&self, token: impl Into<Token>) {
        let token = token.into();
        self.store
            .set(&self.config.name, token.expose_secret(), &self.config.options);
    }

    pub fn get(&self) -> Option<Token> {
        self.store.get(&self.config.name).map(Token::from)
    }

    pub fn remove(&self) {
        self.store.remove(&self.config.name, &self.config.options);
    }

    /// The cookie name.
    pub fn name(&self) -> &str {
        &self.config.name
    }

    pub const fn options(&self) -> &CookieOptions {
        &self.config.options
    }
}

impl fmt::Debug for CookieAccessor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CookieAccessor")
            .field("name", &self.config.name)
            .field("options", &self.config.options)
            .finish_non_exhaustive()
    }
}
