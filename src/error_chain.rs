//! Error-handler Chain (C6): ordered user handlers plus the terminal base
//! handler mapping the exception taxonomy to responses.

use crate::config::Configuration;
use crate::error::{ResponseRejectedReason, TiiError, TiiResult};
use crate::method::HttpMethod;
use crate::request::Request;
use crate::response::Response;
use crate::status::StatusCode;
use crate::{debug_log, error_log};

/// A single error handler in the chain. `Ok(None)` is the Rust equivalent of
/// the source's `chain_handle.proceed()`: the next handler (or the base
/// handler) is tried instead. `Err` raises a *new* exception, restarting the
/// chain from the first handler (bounded by the recovery-attempts cap).
pub trait ErrorHandler: Send + Sync {
  /// Attempts to produce a final response for `error`. `request` is `None`
  /// when the exception occurred before a request could be bound (e.g. a
  /// malformed request line).
  fn handle(&self, error: &TiiError, request: Option<&mut Request>) -> TiiResult<Option<Response>>;
}

impl<F> ErrorHandler for F
where
  F: Fn(&TiiError, Option<&mut Request>) -> TiiResult<Option<Response>> + Send + Sync,
{
  fn handle(&self, error: &TiiError, request: Option<&mut Request>) -> TiiResult<Option<Response>> {
    self(error, request)
  }
}

/// The ordered chain: zero or more user handlers, terminated by the always-
/// present base handler.
#[derive(Default)]
pub struct ErrorChain {
  handlers: Vec<Box<dyn ErrorHandler>>,
}

impl ErrorChain {
  /// An empty chain (base handler only).
  pub fn new() -> Self {
    ErrorChain { handlers: Vec::new() }
  }

  /// Appends a user handler to the end of the chain, before the base handler.
  pub fn push(&mut self, handler: impl ErrorHandler + 'static) {
    self.handlers.push(Box::new(handler));
  }

  /// Runs the chain against `error`. If a user handler returns `Err`, the
  /// chain restarts from the first handler with that new exception, bounded
  /// by `config.max_error_recovery_attempts()`; exceeding the cap yields a
  /// logged 500 from the base handler. `route_methods`, when given, is used
  /// by the base handler to populate the `Allow:` header on
  /// `MethodNotAllowed`.
  pub fn dispatch(
    &self,
    error: TiiError,
    mut request: Option<&mut Request>,
    config: &Configuration,
    route_methods: Option<&[HttpMethod]>,
  ) -> Response {
    let mut current = error;
    let mut attempts = 0usize;

    loop {
      let mut thrown = None;

      for handler in &self.handlers {
        debug_log!("error chain handler invoked for {current}");
        match handler.handle(&current, request.as_deref_mut()) {
          Ok(Some(response)) => return response,
          Ok(None) => continue,
          Err(new_error) => {
            thrown = Some(new_error);
            break;
          }
        }
      }

      match thrown {
        Some(new_error) => {
          attempts += 1;
          if attempts > config.max_error_recovery_attempts() {
            error_log!("error recovery attempts exceeded for {new_error}, giving up with 500");
            return Response::new(StatusCode::InternalServerError);
          }
          current = new_error;
        }
        None => return base_handler(&current, config, route_methods),
      }
    }
  }
}

/// The terminal handler: maps every exception kind in the taxonomy to a
/// response, per spec's base-handler table.
fn base_handler(error: &TiiError, config: &Configuration, route_methods: Option<&[HttpMethod]>) -> Response {
  let error = error.innermost();

  match error {
    TiiError::RequestLineParse
    | TiiError::HeaderParse
    | TiiError::HttpVersionParse
    | TiiError::BadHeader
    | TiiError::BadRequest
    | TiiError::IllegalRequestBody
    | TiiError::Decoder
    | TiiError::EndOfStream => Response::new(StatusCode::BadRequest),

    TiiError::HttpVersionTooOld(required) => {
      Response::new(StatusCode::UpgradeRequired).with_header(crate::headers::HeaderName::new("Upgrade"), required.0.clone())
    }

    TiiError::HttpVersionTooNew => Response::new(StatusCode::HTTPVersionNotSupported),

    TiiError::UnsupportedTransferCoding => Response::new(StatusCode::NotImplemented),

    TiiError::MaxRequestHeadSize | TiiError::MaxRequestTrailersSize | TiiError::MaxRequestBodyBufferSize => {
      error_log!("payload too large: {error}");
      Response::new(StatusCode::PayloadTooLarge)
    }

    TiiError::NoRouteFound { .. } => {
      error_log!("no route found: {error}");
      Response::new(StatusCode::NotFound)
    }

    TiiError::MethodNotAllowed { method, methods, .. } => {
      let methods = route_methods.map(<[HttpMethod]>::to_vec).unwrap_or_else(|| methods.clone());
      if method.is_options() && config.implement_missing_options() {
        let mut allow = vec![HttpMethod::options()];
        allow.extend(methods);
        Response::new(StatusCode::NoContent).with_allow(allow.iter().map(HttpMethod::as_str))
      } else {
        error_log!("method not allowed: {error}");
        Response::new(StatusCode::MethodNotAllowed).with_allow(methods.iter().map(HttpMethod::as_str))
      }
    }

    TiiError::MediaTypeUnsupported { .. } => {
      error_log!("media type unsupported: {error}");
      Response::new(StatusCode::UnsupportedMediaType)
    }

    TiiError::MediaTypeNotAccepted { .. } => {
      error_log!("media type not accepted: {error}");
      Response::new(StatusCode::NotAcceptable)
    }

    TiiError::MediaTypeParse | TiiError::AmbiguousHandler { .. } | TiiError::IllegalResponseBody => {
      error_log!("internal server error: {error}");
      Response::new(StatusCode::InternalServerError)
    }

    TiiError::ReadTimeout => Response::new(StatusCode::RequestTimeout),

    TiiError::ResponseTimeout => {
      error_log!("response timed out: {error}");
      Response::new(StatusCode::ServiceUnavailable).with_connection_close()
    }

    TiiError::ResponseRejected { reason: ResponseRejectedReason::ClientProtocolUnknownButNeeded } => {
      error_log!("response rejected, protocol support unknown: {error}");
      Response::new(StatusCode::InternalServerError)
    }

    TiiError::ResponseRejected { reason: ResponseRejectedReason::ClientProtocolDoesNotSupport } => {
      Response::new(StatusCode::UpgradeRequired).with_header(crate::headers::HeaderName::new("Upgrade"), "HTTP/1.1")
    }

    // RouteCollision / HandlerCollision never reach the chain (surfaced
    // synchronously from registration APIs); anything else, including
    // those two if misused, falls to the generic 500.
    _ => {
      error_log!("unhandled exception reached base handler: {error}");
      Response::new(StatusCode::InternalServerError)
    }
  }
}

#[cfg(test)]
mod test {
  use super::*;
  use crate::method::HttpMethod;

  #[test]
  fn no_route_found_maps_to_404_and_logs() {
    let chain = ErrorChain::new();
    let config = Configuration::default();
    let response = chain.dispatch(TiiError::NoRouteFound { segments: vec!["x".to_string()] }, None, &config, None);
    assert_eq!(response.status().code(), 404);
  }

  #[test]
  fn method_not_allowed_emits_allow_header() {
    let chain = ErrorChain::new();
    let config = Configuration::default();
    let error =
      TiiError::MethodNotAllowed { route: "/r".to_string(), method: HttpMethod::post(), methods: vec![HttpMethod::get()] };
    let response = chain.dispatch(error, None, &config, None);
    assert_eq!(response.status().code(), 405);
    assert_eq!(response.headers().get(crate::headers::HeaderName::ALLOW), Some("GET"));
  }

  #[test]
  fn options_with_implement_missing_options_yields_204() {
    let chain = ErrorChain::new();
    let config = Configuration::builder().with_implement_missing_options(true).build();
    let error =
      TiiError::MethodNotAllowed { route: "/r".to_string(), method: HttpMethod::options(), methods: vec![HttpMethod::get()] };
    let response = chain.dispatch(error, None, &config, None);
    assert_eq!(response.status().code(), 204);
    assert_eq!(response.headers().get(crate::headers::HeaderName::ALLOW), Some("OPTIONS, GET"));
  }

  #[test]
  fn ambiguous_handler_maps_to_500() {
    let chain = ErrorChain::new();
    let config = Configuration::default();
    let response = chain.dispatch(TiiError::AmbiguousHandler { candidates: vec!["a".to_string()] }, None, &config, None);
    assert_eq!(response.status().code(), 500);
  }

  #[test]
  fn user_handler_can_short_circuit() {
    let mut chain = ErrorChain::new();
    chain.push(|_error: &TiiError, _request: Option<&mut Request>| Ok(Some(Response::new(StatusCode::OK))));
    let config = Configuration::default();
    let response = chain.dispatch(TiiError::BadRequest, None, &config, None);
    assert_eq!(response.status().code(), 200);
  }

  #[test]
  fn user_handler_proceeding_falls_through_to_base_handler() {
    let mut chain = ErrorChain::new();
    chain.push(|_error: &TiiError, _request: Option<&mut Request>| Ok(None));
    let config = Configuration::default();
    let response = chain.dispatch(TiiError::BadRequest, None, &config, None);
    assert_eq!(response.status().code(), 400);
  }

  #[test]
  fn user_handler_throwing_restarts_chain_with_new_exception() {
    let mut chain = ErrorChain::new();
    chain.push(|error: &TiiError, _request: Option<&mut Request>| {
      if matches!(error, TiiError::BadRequest) {
        Err(TiiError::NoRouteFound { segments: vec![] })
      } else {
        Ok(None)
      }
    });
    let config = Configuration::default();
    let response = chain.dispatch(TiiError::BadRequest, None, &config, None);
    assert_eq!(response.status().code(), 404);
  }

  #[test]
  fn recovery_attempts_cap_is_enforced() {
    let mut chain = ErrorChain::new();
    chain.push(|_error: &TiiError, _request: Option<&mut Request>| Err(TiiError::BadRequest));
    let config = Configuration::builder().with_max_error_recovery_attempts(2).build();
    let response = chain.dispatch(TiiError::BadRequest, None, &config, None);
    assert_eq!(response.status().code(), 500);
  }
}
