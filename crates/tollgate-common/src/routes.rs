//! Named route templates.
//!
//! A [`Routes`] table maps names to path templates such as `/posts/:id`.
//! Templates are filled in with [`Routes::resolve`].

use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::StructuredError;

/// A value substituted into a `:param` segment.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ParamValue {
    /// A text segment.
    Text(String),
    /// A numeric segment.
    Number(i64),
}

impl fmt::Display for ParamValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Text(text) => f.write_str(text),
            Self::Number(number) => write!(f, "{number}"),
        }
    }
}

impl From<&str> for ParamValue {
    fn from(value: &str) -> Self {
        Self::Text(value.to_string())
    }
}

impl From<String> for ParamValue {
    fn from(value: String) -> Self {
        Self::Text(value)
    }
}

impl From<i64> for ParamValue {
    fn from(value: i64) -> Self {
        Self::Number(value)
    }
}

/// Named path templates, passed through on the built API as `route` or
/// `endpoint`.
///
/// # Examples
///
/// ```
/// use tollgate_common::Routes;
///
/// let routes = Routes::new()
///     .with("posts", "/posts")
///     .with("post", "/posts/:id");
///
/// assert_eq!(routes.path("posts"), Some("/posts"));
/// assert_eq!(routes.resolve("post", [("id", 42_i64)]).unwrap(), "/posts/42");
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Routes(BTreeMap<String, String>);

impl Routes {
    /// An empty table.
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds (or replaces) a named template.
    #[must_use]
    pub fn with(mut self, name: impl Into<String>, template: impl Into<String>) -> Self {
        self.insert(name, template);
        self
    }

    /// Adds (or replaces) a named template in place.
    pub fn insert(&mut self, name: impl Into<String>, template: impl Into<String>) {
        self.0.insert(name.into(), template.into());
    }

    /// The raw template for `name`.
    pub fn path(&self, name: &str) -> Option<&str> {
        self.0.get(name).map(String::as_str)
    }

    /// Iterates over `(name, template)` pairs in name order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.0.iter().map(|(name, path)| (name.as_str(), path.as_str()))
    }

    /// Number of templates.
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// `true` when no template is registered.
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Fills the `:param` segments of the template named `name`.
    ///
    /// Parameters that the template does not mention are ignored.
    ///
    /// # Errors
    ///
    /// Returns a validation error if the route is unknown or a segment has
    /// no matching parameter.
    pub fn resolve<K, V, I>(&self, name: &str, params: I) -> Result<String, StructuredError>
    where
        K: AsRef<str>,
        V: Into<ParamValue>,
        I: IntoIterator<Item = (K, V)>,
    {
        let template = self
            .path(name)
            .ok_or_else(|| StructuredError::validation(format!("Unknown route: {name}")))?;

        let params: Vec<(K, ParamValue)> = params
            .into_iter()
            .map(|(key, value)| (key, value.into()))
            .collect();

        let segments = template
            .split('/')
            .map(|segment| {
                segment.strip_prefix(':').map_or_else(
                    || Ok(segment.to_string()),
                    |param| {
                        params
                            .iter()
                            .find(|(key, _)| key.as_ref() == param)
                            .map(|(_, value)| value.to_string())
                            .ok_or_else(|| {
                                StructuredError::validation(format!(
                                    "Missing parameter '{param}' for route '{name}'"
                                ))
                            })
                    },
                )
            })
            .collect::<Result<Vec<_>, _>>()?;

        Ok(segments.join("/"))
    }
}

impl FromIterator<(String, String)> for Routes {
    fn from_iter<T: IntoIterator<Item = (String, String)>>(iter: T) -> Self {
        Self(iter.into_iter().collect())
    }
}
