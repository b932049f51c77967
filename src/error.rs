//! The exception taxonomy surfaced at the dispatch core's boundary.

use crate::method::HttpMethod;
use crate::mime::MediaType;
use std::error::Error;
use std::fmt::{Display, Formatter};

/// Convenience alias used throughout the crate.
pub type TiiResult<T> = Result<T, TiiError>;

/// The required HTTP version named by an `HttpVersionTooOld` exception.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct RequiredVersion(pub String);

impl Display for RequiredVersion {
  fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
    f.write_str(&self.0)
  }
}

/// Why a response was rejected by the channel/protocol layer.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
#[non_exhaustive]
pub enum ResponseRejectedReason {
  /// The client's protocol support is unknown but the response needs it (e.g. an
  /// informational response on a connection whose HTTP version hasn't been
  /// negotiated yet).
  ClientProtocolUnknownButNeeded,
  /// The client's negotiated protocol is known to not support the response
  /// (e.g. 1xx responses on pre-HTTP/1.1 connections).
  ClientProtocolDoesNotSupport,
}

/// The full exception taxonomy this dispatch core can raise or receive from
/// the (out-of-scope) protocol layer. `non_exhaustive` so new kinds can be
/// added without an API break; unrecognized causes from outside the crate
/// fall into `Other`.
#[derive(Debug)]
#[non_exhaustive]
pub enum TiiError {
  /// Malformed request line.
  RequestLineParse,
  /// Malformed header.
  HeaderParse,
  /// Malformed HTTP version token.
  HttpVersionParse,
  /// Client's HTTP version is older than this server will serve.
  HttpVersionTooOld(RequiredVersion),
  /// Client's HTTP version is newer than this server understands.
  HttpVersionTooNew,
  /// A header value failed validation.
  BadHeader,
  /// Catch-all for otherwise-malformed requests.
  BadRequest,
  /// The request body violated its declared framing or content constraints.
  IllegalRequestBody,
  /// A handler produced a response body that violates framing constraints.
  IllegalResponseBody,
  /// A `Content-Type`/`Accept` media type string failed to parse.
  MediaTypeParse,
  /// A content/transfer decoder failed.
  Decoder,
  /// An unsupported `Transfer-Encoding` was requested.
  UnsupportedTransferCoding,
  /// The connection ended before a complete unit could be read.
  EndOfStream,
  /// The request head exceeded the configured maximum size.
  MaxRequestHeadSize,
  /// The request trailers exceeded the configured maximum size.
  MaxRequestTrailersSize,
  /// The buffered request body exceeded the configured maximum size.
  MaxRequestBodyBufferSize,
  /// Reading the request timed out.
  ReadTimeout,
  /// Writing the response timed out.
  ResponseTimeout,
  /// No route in the registry matched the request path.
  NoRouteFound {
    /// The raw path segments that could not be routed.
    segments: Vec<String>,
  },
  /// Registering a route collided with an existing one. Synchronous only —
  /// never routed through the error-handler chain.
  RouteCollision {
    /// The pattern that could not be registered.
    pattern: String,
  },
  /// Registering a handler collided with an existing one on the same route.
  /// Synchronous only — never routed through the error-handler chain.
  HandlerCollision {
    /// A description of the colliding `(method, consumes, produces)` key.
    key: String,
  },
  /// A route exists but none of its handlers accept the request's method.
  MethodNotAllowed {
    /// The route's pattern string.
    route: String,
    /// The request method that was rejected.
    method: HttpMethod,
    /// The sorted set of methods the route does support, for the `Allow:`
    /// header.
    methods: Vec<HttpMethod>,
  },
  /// A route exists, the method matches, but no handler accepts the
  /// request's `Content-Type`.
  MediaTypeUnsupported {
    /// The request's declared content type, if any.
    content_type: Option<MediaType>,
  },
  /// A route and method match, but no handler's `produces` is compatible
  /// with the request's `Accept` list.
  MediaTypeNotAccepted {
    /// The request's accept list.
    accepts: Vec<MediaType>,
  },
  /// Two or more handlers tied for best match and none could be preferred.
  AmbiguousHandler {
    /// Description of the tied handlers.
    candidates: Vec<String>,
  },
  /// The channel/protocol layer refused to send a response it was handed.
  ResponseRejected {
    /// Why the response was rejected.
    reason: ResponseRejectedReason,
  },
  /// Any cause originating outside this core's own taxonomy.
  Other(Box<dyn Error + Send + Sync>),
}

impl TiiError {
  /// Recursively unwraps this error through library-internal wrapper kinds
  /// (an `Other` wrapping another `TiiError`) down to the innermost
  /// meaningful cause. A foreign, opaque `Box<dyn Error>` is not descended
  /// into further, since its internal structure is unknown to this crate.
  pub fn innermost(&self) -> &TiiError {
    let mut current = self;
    while let TiiError::Other(cause) = current {
      if let Some(inner) = cause.downcast_ref::<TiiError>() {
        current = inner;
        continue;
      }
      break;
    }
    current
  }
}

impl Display for TiiError {
  fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
    match self {
      TiiError::RequestLineParse => f.write_str("malformed request line"),
      TiiError::HeaderParse => f.write_str("malformed header"),
      TiiError::HttpVersionParse => f.write_str("malformed HTTP version"),
      TiiError::HttpVersionTooOld(v) => write!(f, "HTTP version too old, requires {v}"),
      TiiError::HttpVersionTooNew => f.write_str("HTTP version too new"),
      TiiError::BadHeader => f.write_str("invalid header value"),
      TiiError::BadRequest => f.write_str("bad request"),
      TiiError::IllegalRequestBody => f.write_str("illegal request body"),
      TiiError::IllegalResponseBody => f.write_str("illegal response body"),
      TiiError::MediaTypeParse => f.write_str("malformed media type"),
      TiiError::Decoder => f.write_str("decoder failure"),
      TiiError::UnsupportedTransferCoding => f.write_str("unsupported transfer coding"),
      TiiError::EndOfStream => f.write_str("unexpected end of stream"),
      TiiError::MaxRequestHeadSize => f.write_str("request head exceeds maximum size"),
      TiiError::MaxRequestTrailersSize => f.write_str("request trailers exceed maximum size"),
      TiiError::MaxRequestBodyBufferSize => f.write_str("request body exceeds maximum buffered size"),
      TiiError::ReadTimeout => f.write_str("read timed out"),
      TiiError::ResponseTimeout => f.write_str("response timed out"),
      TiiError::NoRouteFound { segments } => write!(f, "no route found for /{}", segments.join("/")),
      TiiError::RouteCollision { pattern } => write!(f, "route collision at '{pattern}'"),
      TiiError::HandlerCollision { key } => write!(f, "handler collision at '{key}'"),
      TiiError::MethodNotAllowed { route, method, .. } => {
        write!(f, "method '{method}' not allowed on route '{route}'")
      }
      TiiError::MediaTypeUnsupported { content_type } => match content_type {
        Some(mt) => write!(f, "unsupported media type '{mt}'"),
        None => f.write_str("unsupported media type"),
      },
      TiiError::MediaTypeNotAccepted { accepts } => {
        write!(f, "no handler can satisfy accept list [{}]", crate::mime::accept_list_to_header_value(accepts))
      }
      TiiError::AmbiguousHandler { candidates } => write!(f, "ambiguous handler among [{}]", candidates.join(", ")),
      TiiError::ResponseRejected { reason } => write!(f, "response rejected: {reason:?}"),
      TiiError::Other(cause) => Display::fmt(cause, f),
    }
  }
}

impl Error for TiiError {
  fn source(&self) -> Option<&(dyn Error + 'static)> {
    match self {
      TiiError::Other(cause) => Some(cause.as_ref()),
      _ => None,
    }
  }
}

impl TiiError {
  /// Wraps any foreign error as a [`TiiError::Other`], or unwraps it in place
  /// if it already is one. Use at the boundary where a downstream crate's
  /// error needs to enter the taxonomy, e.g. `result.map_err(TiiError::wrap)`.
  pub fn wrap<T: Error + Send + Sync + 'static>(value: T) -> Self {
    let boxed: Box<dyn Error + Send + Sync> = Box::new(value);
    match boxed.downcast::<TiiError>() {
      Ok(already) => *already,
      Err(boxed) => TiiError::Other(boxed),
    }
  }
}
