//! HTTP status codes.

use std::fmt::{Display, Formatter};

/// An HTTP status code. Well-known codes are named variants with their
/// canonical reason phrase; anything else is carried as a raw numeric code
/// with a caller-supplied reason phrase.
#[derive(Clone, Debug, Eq, PartialEq)]
#[non_exhaustive]
pub enum StatusCode {
  Continue,
  SwitchingProtocols,
  OK,
  Created,
  Accepted,
  NoContent,
  PartialContent,
  MovedPermanently,
  Found,
  SeeOther,
  NotModified,
  TemporaryRedirect,
  PermanentRedirect,
  BadRequest,
  Unauthorized,
  Forbidden,
  NotFound,
  MethodNotAllowed,
  NotAcceptable,
  RequestTimeout,
  Conflict,
  Gone,
  LengthRequired,
  PayloadTooLarge,
  URITooLong,
  UnsupportedMediaType,
  RangeNotSatisfiable,
  ExpectationFailed,
  UpgradeRequired,
  TooManyRequests,
  InternalServerError,
  NotImplemented,
  BadGateway,
  ServiceUnavailable,
  GatewayTimeout,
  HTTPVersionNotSupported,
  /// A status code this crate does not name, with an owned reason phrase.
  CustomString(u16, String),
  /// A status code this crate does not name, with a `'static` reason phrase.
  CustomStr(u16, &'static str),
}

impl StatusCode {
  /// Constructs a well-known status from its numeric code, or `None` if it
  /// is not one of the named variants.
  pub fn from_well_known_code(code: u16) -> Option<Self> {
    Some(match code {
      100 => StatusCode::Continue,
      101 => StatusCode::SwitchingProtocols,
      200 => StatusCode::OK,
      201 => StatusCode::Created,
      202 => StatusCode::Accepted,
      204 => StatusCode::NoContent,
      206 => StatusCode::PartialContent,
      301 => StatusCode::MovedPermanently,
      302 => StatusCode::Found,
      303 => StatusCode::SeeOther,
      304 => StatusCode::NotModified,
      307 => StatusCode::TemporaryRedirect,
      308 => StatusCode::PermanentRedirect,
      400 => StatusCode::BadRequest,
      401 => StatusCode::Unauthorized,
      403 => StatusCode::Forbidden,
      404 => StatusCode::NotFound,
      405 => StatusCode::MethodNotAllowed,
      406 => StatusCode::NotAcceptable,
      408 => StatusCode::RequestTimeout,
      409 => StatusCode::Conflict,
      410 => StatusCode::Gone,
      411 => StatusCode::LengthRequired,
      413 => StatusCode::PayloadTooLarge,
      414 => StatusCode::URITooLong,
      415 => StatusCode::UnsupportedMediaType,
      416 => StatusCode::RangeNotSatisfiable,
      417 => StatusCode::ExpectationFailed,
      426 => StatusCode::UpgradeRequired,
      429 => StatusCode::TooManyRequests,
      500 => StatusCode::InternalServerError,
      501 => StatusCode::NotImplemented,
      502 => StatusCode::BadGateway,
      503 => StatusCode::ServiceUnavailable,
      504 => StatusCode::GatewayTimeout,
      505 => StatusCode::HTTPVersionNotSupported,
      _ => return None,
    })
  }

  /// Constructs a status from a numeric code, falling back to a `Custom*`
  /// variant with the given reason phrase if it is not well known.
  pub fn from_code_or_custom(code: u16, reason: &'static str) -> Self {
    Self::from_well_known_code(code).unwrap_or(StatusCode::CustomStr(code, reason))
  }

  /// The numeric status code.
  pub fn code(&self) -> u16 {
    match self {
      StatusCode::Continue => 100,
      StatusCode::SwitchingProtocols => 101,
      StatusCode::OK => 200,
      StatusCode::Created => 201,
      StatusCode::Accepted => 202,
      StatusCode::NoContent => 204,
      StatusCode::PartialContent => 206,
      StatusCode::MovedPermanently => 301,
      StatusCode::Found => 302,
      StatusCode::SeeOther => 303,
      StatusCode::NotModified => 304,
      StatusCode::TemporaryRedirect => 307,
      StatusCode::PermanentRedirect => 308,
      StatusCode::BadRequest => 400,
      StatusCode::Unauthorized => 401,
      StatusCode::Forbidden => 403,
      StatusCode::NotFound => 404,
      StatusCode::MethodNotAllowed => 405,
      StatusCode::NotAcceptable => 406,
      StatusCode::RequestTimeout => 408,
      StatusCode::Conflict => 409,
      StatusCode::Gone => 410,
      StatusCode::LengthRequired => 411,
      StatusCode::PayloadTooLarge => 413,
      StatusCode::URITooLong => 414,
      StatusCode::UnsupportedMediaType => 415,
      StatusCode::RangeNotSatisfiable => 416,
      StatusCode::ExpectationFailed => 417,
      StatusCode::UpgradeRequired => 426,
      StatusCode::TooManyRequests => 429,
      StatusCode::InternalServerError => 500,
      StatusCode::NotImplemented => 501,
      StatusCode::BadGateway => 502,
      StatusCode::ServiceUnavailable => 503,
      StatusCode::GatewayTimeout => 504,
      StatusCode::HTTPVersionNotSupported => 505,
      StatusCode::CustomString(code, _) | StatusCode::CustomStr(code, _) => *code,
    }
  }

  /// The canonical (or caller-supplied) reason phrase.
  pub fn reason_phrase(&self) -> &str {
    match self {
      StatusCode::Continue => "Continue",
      StatusCode::SwitchingProtocols => "Switching Protocols",
      StatusCode::OK => "OK",
      StatusCode::Created => "Created",
      StatusCode::Accepted => "Accepted",
      StatusCode::NoContent => "No Content",
      StatusCode::PartialContent => "Partial Content",
      StatusCode::MovedPermanently => "Moved Permanently",
      StatusCode::Found => "Found",
      StatusCode::SeeOther => "See Other",
      StatusCode::NotModified => "Not Modified",
      StatusCode::TemporaryRedirect => "Temporary Redirect",
      StatusCode::PermanentRedirect => "Permanent Redirect",
      StatusCode::BadRequest => "Bad Request",
      StatusCode::Unauthorized => "Unauthorized",
      StatusCode::Forbidden => "Forbidden",
      StatusCode::NotFound => "Not Found",
      StatusCode::MethodNotAllowed => "Method Not Allowed",
      StatusCode::NotAcceptable => "Not Acceptable",
      StatusCode::RequestTimeout => "Request Timeout",
      StatusCode::Conflict => "Conflict",
      StatusCode::Gone => "Gone",
      StatusCode::LengthRequired => "Length Required",
      StatusCode::PayloadTooLarge => "Payload Too Large",
      StatusCode::URITooLong => "URI Too Long",
      StatusCode::UnsupportedMediaType => "Unsupported Media Type",
      StatusCode::RangeNotSatisfiable => "Range Not Satisfiable",
      StatusCode::ExpectationFailed => "Expectation Failed",
      StatusCode::UpgradeRequired => "Upgrade Required",
      StatusCode::TooManyRequests => "Too Many Requests",
      StatusCode::InternalServerError => "Internal Server Error",
      StatusCode::NotImplemented => "Not Implemented",
      StatusCode::BadGateway => "Bad Gateway",
      StatusCode::ServiceUnavailable => "Service Unavailable",
      StatusCode::GatewayTimeout => "Gateway Timeout",
      StatusCode::HTTPVersionNotSupported => "HTTP Version Not Supported",
      StatusCode::CustomString(_, reason) => reason.as_str(),
      StatusCode::CustomStr(_, reason) => reason,
    }
  }

  /// `"{code} {reason}"`, as it appears in the status line.
  pub fn status_line(&self) -> String {
    format!("{} {}", self.code(), self.reason_phrase())
  }

  /// True for status codes in the 1xx range.
  pub fn is_informational(&self) -> bool {
    (100..200).contains(&self.code())
  }
}

impl Display for StatusCode {
  fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
    f.write_str(&self.status_line())
  }
}

#[cfg(test)]
mod test {
  use super::*;

  #[test]
  fn well_known_round_trips_code() {
    assert_eq!(StatusCode::NotFound.code(), 404);
    assert_eq!(StatusCode::from_well_known_code(404), Some(StatusCode::NotFound));
  }

  #[test]
  fn unknown_code_falls_back_to_custom() {
    assert_eq!(StatusCode::from_well_known_code(499), None);
    let custom = StatusCode::from_code_or_custom(499, "Client Closed Request");
    assert_eq!(custom.code(), 499);
    assert_eq!(custom.reason_phrase(), "Client Closed Request");
  }

  #[test]
  fn informational_range() {
    assert!(StatusCode::Continue.is_informational());
    assert!(!StatusCode::OK.is_informational());
  }

  #[test]
  fn status_line_format() {
    assert_eq!(StatusCode::OK.status_line(), "200 OK");
  }
}
