use std::fmt;
use std::str::FromStr;

use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};

use crate::error::StructuredError;

/// Authorization scheme placed in front of the token.
///
/// Serialized exactly as it appears on the wire (`"Bearer"` / `"Basic"`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum TokenAccessType {
    /// `Authorization: Bearer <token>`
    #[default]
    Bearer,
    /// `Authorization: Basic <token>`
    Basic,
}

impl TokenAccessType {
    /// The scheme name as written in the header.
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Bearer => "Bearer",
            Self::Basic => "Basic",
        }
    }
}

impl fmt::Display for TokenAccessType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for TokenAccessType {
    type Err = StructuredError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "Bearer" => Ok(Self::Bearer),
            "Basic" => Ok(Self::Basic),
            _ => Err(StructuredError::validation(format!(
                "Unknown token access type: {s}"
            ))),
        }
    }
}

/// An access token as stored in the cookie.
///
/// The value is held in a [`SecretString`] so it never shows up in debug
/// output or logs; call [`Token::expose_secret`] to read it.
#[derive(Clone)]
pub struct Token(SecretString);

impl Token {
    /// Wraps a raw token value.
    pub fn new(value: impl Into<String>) -> Self {
        Self(SecretString::new(value.into().into()))
    }

    /// Returns the raw token value.
    pub fn expose_secret(&self) -> &str {
        self.0.expose_secret()
    }

    /// `true` when the token carries no characters at all.
    pub fn is_empty(&self) -> bool {
        self.expose_secret().is_empty()
    }

    /// Formats the value of an `Authorization` header for this token.
    ///
    /// # Examples
    ///
    /// ```
    /// use tollgate_common::{Token, TokenAccessType};
    ///
    /// let token = Token::new("abc123");
    /// assert_eq!(token.authorization(TokenAccessType::Bearer), "Bearer abc123");
    /// ```
    pub fn authorization(&self, access_type: TokenAccessType) -> String {
        format!("{access_type} {}", self.expose_secret())
    }
}

impl fmt::Debug for Token {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("Token([REDACTED])")
    }
}

impl PartialEq for Token {
    fn eq(&self, other: &Self) -> bool {
        self.expose_secret() == other.expose_secret()
    }
}

impl Eq for Token {}

impl From<String> for Token {
    fn from(value: String) -> Self {
        Self::new(value)
    }
}

impl From<&str> for Token {
    fn from(value: &str) -> Self {
        Self::new(value)
    }
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used)]

    use super::*;

    #[test]
    fn test_access_type_defaults_to_bearer() {
        assert_eq!(TokenAccessType::default(), TokenAccessType::Bearer);
    }

    #[test]
    fn test_access_type_parse() {
        assert_eq!(
            "Basic".parse::<TokenAccessType>().ok(),
            Some(TokenAccessType::Basic)
        );
        assert!("Digest".parse::<TokenAccessType>().is_err());
    }

    #[test]
    fn test_access_type_serde_names() {
        let json = serde_json::to_string(&TokenAccessType::Basic).unwrap();
        assert_eq!(json, "\"Basic\"");
        let parsed: TokenAccessType = serde_json::from_str("\"Bearer\"").unwrap();
        assert_eq!(parsed, TokenAccessType::Bearer);
    }

    #[test]
    fn test_debug_redacts_token() {
        let token = Token::new("super-secret");
        let debug_str = format!("{token:?}");
        assert!(debug_str.contains("[REDACTED]"));
        assert!(!debug_str.contains("super-secret"));
    }

    #[test]
    fn test_authorization_header_value() {
        let token = Token::from("xyz");
        assert_eq!(token.authorization(TokenAccessType::Basic), "Basic xyz");
        assert!(!token.is_empty());
        assert!(Token::new("").is_empty());
    }
}
