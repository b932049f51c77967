//! The response contract the dispatch core writes to the channel.

use crate::headers::{HeaderName, Headers};
use crate::status::StatusCode;

/// A response the dispatcher (or a handler) commits to the channel. Body
/// handling beyond a minimal in-memory payload is out of scope for this
/// core (see Non-goals); a handler that needs streaming owns the channel
/// directly.
#[derive(Clone, Debug)]
pub struct Response {
  status: StatusCode,
  headers: Headers,
  body: Vec<u8>,
}

impl Response {
  /// A response with the given status, no body, no headers beyond defaults.
  pub fn new(status: StatusCode) -> Self {
    Response { status, headers: Headers::new(), body: Vec::new() }
  }

  /// A 200 OK carrying `body` with a `Content-Type` header.
  pub fn ok(body: impl Into<Vec<u8>>, content_type: impl Into<String>) -> Self {
    Response::new(StatusCode::OK).with_body(body).with_header(HeaderName::CONTENT_TYPE, content_type)
  }

  /// A response with no body and an empty content length, e.g. 204/304.
  pub fn no_body(status: StatusCode) -> Self {
    Response::new(status)
  }

  /// Sets the body, replacing any previous one.
  pub fn with_body(mut self, body: impl Into<Vec<u8>>) -> Self {
    self.body = body.into();
    self
  }

  /// Appends a header.
  pub fn with_header(mut self, name: impl Into<HeaderName>, value: impl Into<String>) -> Self {
    self.headers.push(name, value);
    self
  }

  /// Sets (replacing) a header.
  pub fn set_header(mut self, name: impl Into<HeaderName>, value: impl Into<String>) -> Self {
    self.headers.set(name, value);
    self
  }

  /// Appends `Connection: close`, signaling the protocol layer to close the
  /// connection after this response.
  pub fn with_connection_close(self) -> Self {
    self.set_header(HeaderName::CONNECTION, "close")
  }

  /// Sets the `Allow:` header from a sorted, comma-joined method list.
  pub fn with_allow(self, methods: impl IntoIterator<Item = impl AsRef<str>>) -> Self {
    let joined = methods.into_iter().map(|m| m.as_ref().to_string()).collect::<Vec<_>>().join(", ");
    self.set_header(HeaderName::ALLOW, joined)
  }

  /// The status code.
  pub fn status(&self) -> &StatusCode {
    &self.status
  }

  /// The header collection.
  pub fn headers(&self) -> &Headers {
    &self.headers
  }

  /// The body bytes.
  pub fn body(&self) -> &[u8] {
    &self.body
  }

  /// True if this response's status is in the 1xx range.
  pub fn is_informational(&self) -> bool {
    self.status.is_informational()
  }
}
