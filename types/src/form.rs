//! `application/x-www-form-urlencoded` parameter lists.

use std::fmt;

use thiserror::Error;
use url::form_urlencoded;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum FormParseError {
    #[error("form parameter name must not be empty (in {pair:?})")]
    EmptyName { pair: String },
}

/// Ordered list of `name=value` pairs sent as a POST body.
///
/// Order is preserved and duplicate names are allowed, matching what a
/// browser form submission produces.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FormParams {
    pairs: Vec<(String, String)>,
}

impl FormParams {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Parse an encoded body such as `name=pouet&value=pouetvalue`.
    ///
    /// Empty segments (`a=1&&b=2`) are skipped. A segment without `=` is a
    /// name with an empty value.
    pub fn parse(encoded: &str) -> Result<Self, FormParseError> {
        let mut pairs = Vec::new();
        for segment in encoded.split('&').filter(|s| !s.is_empty()) {
            let mut decoded = form_urlencoded::parse(segment.as_bytes());
            let Some((name, value)) = decoded.next() else {
                continue;
            };
            if name.is_empty() {
                return Err(FormParseError::EmptyName {
                    pair: segment.to_string(),
                });
            }
            pairs.push((name.into_owned(), value.into_owned()));
        }
        Ok(Self { pairs })
    }

    #[must_use]
    pub fn with(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.push(name, value);
        self
    }

    pub fn push(&mut self, name: impl Into<String>, value: impl Into<String>) {
        self.pairs.push((name.into(), value.into()));
    }

    /// First value for `name`.
    #[must_use]
    pub fn get(&self, name: &str) -> Option<&str> {
        self.pairs
            .iter()
            .find(|(n, _)| n == name)
            .map(|(_, v)| v.as_str())
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.pairs.iter().map(|(n, v)| (n.as_str(), v.as_str()))
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.pairs.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.pairs.is_empty()
    }

    #[must_use]
    pub fn encode(&self) -> String {
        form_urlencoded::Serializer::new(String::new())
            .extend_pairs(self.pairs.iter())
            .finish()
    }
}

impl fmt::Display for FormParams {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.encode())
    }
}

impl<N, V> FromIterator<(N, V)> for FormParams
where
    N: Into<String>,
    V: Into<String>,
{
    fn from_iter<I: IntoIterator<Item = (N, V)>>(iter: I) -> Self {
        Self {
            pairs: iter
                .into_iter()
                .map(|(n, v)| (n.into(), v.into()))
                .collect(),
        }
    }
}
