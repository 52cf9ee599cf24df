//! Cookie configuration and the cookie storage collaborator.
//!
//! The token lives in a named cookie. How cookies are physically stored is
//! behind the [`CookieStore`] trait; [`MemoryCookieStore`] is the
//! in-process implementation used by default.

use std::fmt;
use std::sync::{Arc, LazyLock};

use chrono::{DateTime, Duration as ChronoDuration, Utc};
use dashmap::DashMap;
use log::debug;
use serde::{Deserialize, Serialize};
use typed_builder::TypedBuilder;

/// Cookie name used when none is configured.
pub const DEFAULT_COOKIE_NAME: &str = "_token";

/// `SameSite` cookie attribute.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SameSite {
    /// Only sent for same-site requests.
    Strict,
    /// Sent for same-site requests and top-level navigations.
    Lax,
    /// Sent for all requests (requires `secure`).
    None,
}

/// Attributes applied when writing or removing the token cookie.
///
/// # Examples
///
/// ```
/// use tollgate_common::{CookieOptions, SameSite};
///
/// let options = CookieOptions::builder()
///     .max_age_seconds(Some(3600))
///     .path(Some("/".to_string()))
///     .secure(true)
///     .same_site(Some(SameSite::Strict))
///     .build();
///
/// assert_eq!(options.max_age_seconds, Some(3600));
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize, TypedBuilder)]
pub struct CookieOptions {
    /// Lifetime of the cookie; `None` means it lives as long as the store.
    #[builder(default)]
    #[serde(default)]
    pub max_age_seconds: Option<u64>,
    /// Path attribute.
    #[builder(default)]
    #[serde(default)]
    pub path: Option<String>,
    /// Domain attribute.
    #[builder(default)]
    #[serde(default)]
    pub domain: Option<String>,
    /// Only send over HTTPS.
    #[builder(default)]
    #[serde(default)]
    pub secure: bool,
    /// `SameSite` attribute.
    #[builder(default)]
    #[serde(default)]
    pub same_site: Option<SameSite>,
}

/// Which cookie holds the token, and how it is written.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CookieConfig {
    /// Cookie name (defaults to `_token`).
    #[serde(default = "default_cookie_name")]
    pub name: String,
    /// Attributes used for `set` and `remove`.
    #[serde(default)]
    pub options: CookieOptions,
}

fn default_cookie_name() -> String {
    DEFAULT_COOKIE_NAME.to_string()
}

impl Default for CookieConfig {
    fn default() -> Self {
        Self {
            name: default_cookie_name(),
            options: CookieOptions::default(),
        }
    }
}

impl CookieConfig {
    /// A cookie config with the given name and default attributes.
    pub fn named(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            options: CookieOptions::default(),
        }
    }

    /// Replaces the cookie attributes.
    #[must_use]
    pub fn with_options(mut self, options: CookieOptions) -> Self {
        self.options = options;
        self
    }
}

/// Storage for named cookies.
///
/// Implementations must be usable from any task; all calls are synchronous
/// and treated as atomic by callers.
pub trait CookieStore: Send + Sync {
    /// Reads the cookie value, if present.
    fn get(&self, name: &str) -> Option<String>;

    /// Writes the cookie value with the given attributes.
    fn set(&self, name: &str, value: &str, options: &CookieOptions);

    /// Removes the cookie.
    fn remove(&self, name: &str, options: &CookieOptions);
}

#[derive(Debug, Clone)]
struct StoredCookie {
    value: String,
    expires_at: Option<DateTime<Utc>>,
}

impl StoredCookie {
    fn is_expired(&self, now: DateTime<Utc>) -> bool {
        self.expires_at.is_some_and(|expires_at| expires_at <= now)
    }
}

static SHARED_STORE: LazyLock<Arc<MemoryCookieStore>> =
    LazyLock::new(|| Arc::new(MemoryCookieStore::new()));

/// In-memory [`CookieStore`].
///
/// Honors `max_age_seconds`: an expired cookie reads as absent and is
/// dropped on the next access. Path and domain attributes are recorded by
/// callers but do not partition the store; cookies are keyed by name.
#[derive(Default)]
pub struct MemoryCookieStore {
    cookies: DashMap<String, StoredCookie>,
}

impl MemoryCookieStore {
    /// Creates an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// The process-wide store shared by every default configuration.
    pub fn shared() -> Arc<Self> {
        Arc::clone(&SHARED_STORE)
    }

    /// Number of live (non-expired) cookies.
    pub fn len(&self) -> usize {
        let now = Utc::now();
        self.cookies
            .iter()
            .filter(|entry| !entry.value().is_expired(now))
            .count()
    }

    /// `true` when no live cookie is stored.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl CookieStore for MemoryCookieStore {
    fn get(&self, name: &str) -> Option<String> {
        let now = Utc::now();
        if let Some(cookie) = self.cookies.get(name) {
            if !cookie.is_expired(now) {
                return Some(cookie.value.clone());
            }
        } else {
            return None;
        }

        debug!("Cookie '{name}' expired, dropping it");
        self.cookies.remove_if(name, |_, cookie| cookie.is_expired(now));
        None
    }

    fn set(&self, name: &str, value: &str, options: &CookieOptions) {
        // An unrepresentable expiry is treated as no expiry.
        let expires_at = options.max_age_seconds.and_then(|seconds| {
            let delta = ChronoDuration::try_seconds(i64::try_from(seconds).ok()?)?;
            Utc::now().checked_add_signed(delta)
        });

        self.cookies.insert(
            name.to_string(),
            StoredCookie {
                value: value.to_string(),
                expires_at,
            },
        );
    }

    fn remove(&self, name: &str, _options: &CookieOptions) {
        self.cookies.remove(name);
    }
}

// Values are credentials; only names are shown.
impl fmt::Debug for MemoryCookieStore {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let names: Vec<String> = self.cookies.iter().map(|e| e.key().clone()).collect();
        f.debug_struct("MemoryCookieStore")
            .field("cookies", &names)
            .finish()
    }
}
