//! Represents the HTTP request method token.

use std::fmt::{Display, Formatter};

/// A validated HTTP method token: non-empty, no ASCII whitespace, compared
/// byte-for-byte (case-sensitive). Not a closed enum — the dispatch core
/// must accept arbitrary verbs, not just the handful of well-known ones.
#[derive(Clone, Debug, Eq, PartialEq, Ord, PartialOrd, Hash)]
pub struct HttpMethod(String);

/// Error returned when a method token fails validation.
#[derive(Clone, Debug, Eq, PartialEq)]
pub enum HttpMethodError {
  /// The token was empty.
  Empty,
  /// The token contained an ASCII whitespace byte.
  ContainsWhitespace,
}

impl Display for HttpMethodError {
  fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
    match self {
      HttpMethodError::Empty => f.write_str("method token is empty"),
      HttpMethodError::ContainsWhitespace => f.write_str("method token contains whitespace"),
    }
  }
}

impl std::error::Error for HttpMethodError {}

impl HttpMethod {
  /// `GET`
  pub const GET: &'static str = "GET";
  /// `POST`
  pub const POST: &'static str = "POST";
  /// `PUT`
  pub const PUT: &'static str = "PUT";
  /// `PATCH`
  pub const PATCH: &'static str = "PATCH";
  /// `DELETE`
  pub const DELETE: &'static str = "DELETE";
  /// `HEAD`
  pub const HEAD: &'static str = "HEAD";
  /// `OPTIONS`
  pub const OPTIONS: &'static str = "OPTIONS";

  /// Validates and constructs a method token.
  pub fn new(value: impl Into<String>) -> Result<Self, HttpMethodError> {
    let value = value.into();
    if value.is_empty() {
      return Err(HttpMethodError::Empty);
    }

    if value.bytes().any(|b| b.is_ascii_whitespace()) {
      return Err(HttpMethodError::ContainsWhitespace);
    }

    Ok(HttpMethod(value))
  }

  /// The method token as a str.
  pub fn as_str(&self) -> &str {
    self.0.as_str()
  }

  /// Shorthand for `HttpMethod::new("GET")`.
  pub fn get() -> Self {
    HttpMethod(Self::GET.to_string())
  }
  /// Shorthand for `HttpMethod::new("POST")`.
  pub fn post() -> Self {
    HttpMethod(Self::POST.to_string())
  }
  /// Shorthand for `HttpMethod::new("PUT")`.
  pub fn put() -> Self {
    HttpMethod(Self::PUT.to_string())
  }
  /// Shorthand for `HttpMethod::new("PATCH")`.
  pub fn patch() -> Self {
    HttpMethod(Self::PATCH.to_string())
  }
  /// Shorthand for `HttpMethod::new("DELETE")`.
  pub fn delete() -> Self {
    HttpMethod(Self::DELETE.to_string())
  }
  /// Shorthand for `HttpMethod::new("HEAD")`.
  pub fn head() -> Self {
    HttpMethod(Self::HEAD.to_string())
  }
  /// Shorthand for `HttpMethod::new("OPTIONS")`.
  pub fn options() -> Self {
    HttpMethod(Self::OPTIONS.to_string())
  }

  /// True if this is the `OPTIONS` method.
  pub fn is_options(&self) -> bool {
    self.0 == Self::OPTIONS
  }
}

impl AsRef<str> for HttpMethod {
  fn as_ref(&self) -> &str {
    self.0.as_str()
  }
}

impl Display for HttpMethod {
  fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
    f.write_str(self.0.as_str())
  }
}

impl TryFrom<&str> for HttpMethod {
  type Error = HttpMethodError;
  fn try_from(value: &str) -> Result<Self, Self::Error> {
    HttpMethod::new(value)
  }
}

impl TryFrom<String> for HttpMethod {
  type Error = HttpMethodError;
  fn try_from(value: String) -> Result<Self, Self::Error> {
    HttpMethod::new(value)
  }
}

#[cfg(test)]
mod test {
  use super::*;

  #[test]
  fn rejects_empty() {
    assert_eq!(HttpMethod::new(""), Err(HttpMethodError::Empty));
  }

  #[test]
  fn rejects_whitespace() {
    assert_eq!(HttpMethod::new("GE T"), Err(HttpMethodError::ContainsWhitespace));
  }

  #[test]
  fn is_case_sensitive() {
    let get = HttpMethod::new("GET").unwrap();
    let get_lower = HttpMethod::new("get").unwrap();
    assert_ne!(get, get_lower);
  }

  #[test]
  fn accepts_arbitrary_verb() {
    assert!(HttpMethod::new("PROPFIND").is_ok());
  }
}
