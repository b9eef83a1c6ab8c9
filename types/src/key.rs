//! Validated names for remote resources.
//!
//! A [`RequestKey`] names a value fetched through an async channel (`values`,
//! `delayedvalues`); a [`ResourceName`] names a POST target. Both end up as a
//! path relative to the server's base URL, so they share one validation rule:
//! non-empty, no whitespace or control characters, none of `?`, `#`, `:` or
//! `\`, no leading `/`, and no `.` or `..` segments.

use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum KeyError {
    #[error("{kind} must not be empty")]
    Empty { kind: &'static str },
    #[error("{kind} {value:?} contains invalid character {ch:?}")]
    InvalidChar {
        kind: &'static str,
        value: String,
        ch: char,
    },
    #[error("{kind} {value:?} contains a {segment:?} path segment")]
    DotSegment {
        kind: &'static str,
        value: String,
        segment: String,
    },
}

fn validate(kind: &'static str, raw: &str) -> Result<(), KeyError> {
    if raw.is_empty() {
        return Err(KeyError::Empty { kind });
    }
    let invalid = raw.chars().enumerate().find(|&(i, c)| {
        c.is_whitespace()
            || c.is_control()
            || matches!(c, '?' | '#' | ':' | '\\')
            || (i == 0 && c == '/')
    });
    if let Some((_, ch)) = invalid {
        return Err(KeyError::InvalidChar {
            kind,
            value: raw.to_string(),
            ch,
        });
    }
    if let Some(segment) = raw.split('/').find(|s| is_dot_segment(s)) {
        return Err(KeyError::DotSegment {
            kind,
            value: raw.to_string(),
            segment: segment.to_string(),
        });
    }
    Ok(())
}

/// `.` or `..`, including the percent-encoded spellings URL parsers honour.
fn is_dot_segment(segment: &str) -> bool {
    let lowered = segment.to_ascii_lowercase().replace("%2e", ".");
    matches!(lowered.as_str(), "." | "..")
}

/// Key of a value requested through an async channel.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct RequestKey(String);

impl RequestKey {
    pub fn new(value: impl Into<String>) -> Result<Self, KeyError> {
        let value = value.into();
        validate("request key", &value)?;
        Ok(Self(value))
    }

    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

/// Target resource of a POST.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct ResourceName(String);

impl ResourceName {
    pub fn new(value: impl Into<String>) -> Result<Self, KeyError> {
        let value = value.into();
        validate("resource name", &value)?;
        Ok(Self(value))
    }

    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

macro_rules! string_newtype_impls {
    ($ty:ident) => {
        impl TryFrom<String> for $ty {
            type Error = KeyError;

            fn try_from(value: String) -> Result<Self, Self::Error> {
                Self::new(value)
            }
        }

        impl TryFrom<&str> for $ty {
            type Error = KeyError;

            fn try_from(value: &str) -> Result<Self, Self::Error> {
                Self::new(value)
            }
        }

        impl From<$ty> for String {
            fn from(value: $ty) -> Self {
                value.0
            }
        }

        impl AsRef<str> for $ty {
            fn as_ref(&self) -> &str {
                &self.0
            }
        }

        impl std::fmt::Display for $ty {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                f.write_str(&self.0)
            }
        }
    };
}

string_newtype_impls!(RequestKey);
string_newtype_impls!(ResourceName);
