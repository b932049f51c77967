//! Route (C3) and Handler Selector (C4).

use crate::channel::Channel;
use crate::error::{TiiError, TiiResult};
use crate::method::HttpMethod;
use crate::mime::{Compatibility, Consumes, MediaType};
use crate::path::{self, PathPatternError, Segment};
use crate::request::Request;
use crate::response::Response;
use std::fmt::{Display, Formatter};
use std::sync::Arc;

/// A handler's callable body. Implemented for plain closures via the
/// blanket impl below, mirroring the crate's `HttpEndpoint` convention.
pub trait HandlerLogic: Send + Sync {
  /// Invokes the handler against a bound request and the exchange's channel.
  fn invoke(&self, request: &mut Request, channel: &mut dyn Channel) -> TiiResult<Response>;
}

impl<F> HandlerLogic for F
where
  F: Fn(&mut Request, &mut dyn Channel) -> TiiResult<Response> + Send + Sync,
{
  fn invoke(&self, request: &mut Request, channel: &mut dyn Channel) -> TiiResult<Response> {
    self(request, channel)
  }
}

/// A single registered handler. Equality and hashing only consider
/// `(method, consumes, produces)`; `logic` is opaque.
#[derive(Clone)]
pub struct Handler {
  method: HttpMethod,
  consumes: Consumes,
  produces: MediaType,
  logic: Arc<dyn HandlerLogic>,
}

impl std::fmt::Debug for Handler {
  fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
    f.debug_struct("Handler")
      .field("method", &self.method)
      .field("consumes", &self.consumes)
      .field("produces", &self.produces)
      .finish_non_exhaustive()
  }
}

impl Handler {
  /// Starts a staged builder.
  pub fn builder() -> HandlerBuilder {
    HandlerBuilder::default()
  }

  /// The method this handler is bound to.
  pub fn method(&self) -> &HttpMethod {
    &self.method
  }

  /// The media type (or sentinel) this handler consumes.
  pub fn consumes(&self) -> &Consumes {
    &self.consumes
  }

  /// The media type this handler produces.
  pub fn produces(&self) -> &MediaType {
    &self.produces
  }

  /// Invokes the handler's logic.
  pub fn invoke(&self, request: &mut Request, channel: &mut dyn Channel) -> TiiResult<Response> {
    self.logic.invoke(request, channel)
  }

  fn key_eq(&self, other: &Handler) -> bool {
    self.method == other.method && self.consumes == other.consumes && self.produces == other.produces
  }

  fn key_string(&self) -> String {
    format!("{} {} -> {}", self.method, self.consumes, self.produces)
  }
}

/// Error produced while building a `Handler`: a synchronous, build-time
/// validation failure, never routed through the error chain.
#[derive(Clone, Debug, Eq, PartialEq)]
pub enum HandlerBuildError {
  MissingMethod,
  MissingConsumes,
  MissingProduces,
  ConsumesQualityNotOne,
  ProducesQualityNotOne,
  ProducesIsSentinel,
}

impl Display for HandlerBuildError {
  fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
    match self {
      HandlerBuildError::MissingMethod => f.write_str("handler requires a method"),
      HandlerBuildError::MissingConsumes => f.write_str("handler requires a consumes media type"),
      HandlerBuildError::MissingProduces => f.write_str("handler requires a produces media type"),
      HandlerBuildError::ConsumesQualityNotOne => f.write_str("handler consumes quality must be 1"),
      HandlerBuildError::ProducesQualityNotOne => f.write_str("handler produces quality must be 1"),
      HandlerBuildError::ProducesIsSentinel => f.write_str("handler produces must not be NOTHING or NOTHING_AND_ALL"),
    }
  }
}

impl std::error::Error for HandlerBuildError {}

/// Staged builder for `Handler`: method → consumes → produces → logic.
#[derive(Default)]
pub struct HandlerBuilder {
  method: Option<HttpMethod>,
  consumes: Option<Consumes>,
  produces: Option<MediaType>,
}

impl HandlerBuilder {
  /// Sets the method.
  pub fn method(mut self, method: HttpMethod) -> Self {
    self.method = Some(method);
    self
  }

  /// Sets the consumed media type (or `Consumes::Nothing`/`NothingAndAll`).
  pub fn consumes(mut self, consumes: Consumes) -> Self {
    self.consumes = Some(consumes);
    self
  }

  /// Sets the produced media type.
  pub fn produces(mut self, produces: MediaType) -> Self {
    self.produces = Some(produces);
    self
  }

  /// Finishes the builder, validating and attaching the handler's logic.
  pub fn logic(self, logic: impl HandlerLogic + 'static) -> Result<Handler, HandlerBuildError> {
    let method = self.method.ok_or(HandlerBuildError::MissingMethod)?;
    let consumes = self.consumes.ok_or(HandlerBuildError::MissingConsumes)?;
    let produces = self.produces.ok_or(HandlerBuildError::MissingProduces)?;

    if let Consumes::MediaType(mt) = &consumes {
      if mt.quality() != crate::mime::QValue::MAX {
        return Err(HandlerBuildError::ConsumesQualityNotOne);
      }
    }

    if produces.quality() != crate::mime::QValue::MAX {
      return Err(HandlerBuildError::ProducesQualityNotOne);
    }

    Ok(Handler { method, consumes, produces, logic: Arc::new(logic) })
  }
}

/// A path pattern plus the set of handlers registered against it.
pub struct Route {
  segments: Vec<Segment>,
  pattern: String,
  handlers: Vec<Handler>,
}

impl Route {
  /// Starts a builder for the given pattern string (`/users/:id/file/*path`).
  pub fn builder(pattern: &str) -> Result<RouteBuilder, PathPatternError> {
    let segments = path::parse_pattern(pattern)?;
    Ok(RouteBuilder { segments, pattern: pattern.to_string(), handlers: Vec::new() })
  }

  /// The route's segments.
  pub fn segments(&self) -> &[Segment] {
    &self.segments
  }

  /// The route's canonical pattern string.
  pub fn pattern(&self) -> &str {
    &self.pattern
  }

  /// The sorted, deduplicated set of methods with at least one handler.
  pub fn supported_methods(&self) -> Vec<HttpMethod> {
    let mut methods: Vec<HttpMethod> = self.handlers.iter().map(|h| h.method.clone()).collect();
    methods.sort();
    methods.dedup();
    methods
  }

  /// Runs the Handler Selector (C4) against this route's handler set.
  pub fn select(&self, method: &HttpMethod, content_type: Option<&MediaType>, accept_list: &[MediaType]) -> TiiResult<&Handler> {
    select_handler(&self.pattern, &self.handlers, method, content_type, accept_list)
  }
}

impl Display for Route {
  fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
    f.write_str(&self.pattern)
  }
}

/// Builder accumulating handlers for a `Route`.
pub struct RouteBuilder {
  segments: Vec<Segment>,
  pattern: String,
  handlers: Vec<Handler>,
}

impl RouteBuilder {
  /// Adds a handler. Rejects a `(method, consumes, produces)` collision with
  /// an already-added handler.
  pub fn handler(mut self, handler: Handler) -> TiiResult<Self> {
    if self.handlers.iter().any(|existing| existing.key_eq(&handler)) {
      return Err(TiiError::HandlerCollision { key: handler.key_string() });
    }
    self.handlers.push(handler);
    Ok(self)
  }

  /// Finishes the builder. A route must carry at least one handler.
  pub fn build(self) -> Result<Route, RouteBuildError> {
    if self.handlers.is_empty() {
      return Err(RouteBuildError::NoHandlers);
    }
    Ok(Route { segments: self.segments, pattern: self.pattern, handlers: self.handlers })
  }
}

/// Error produced by `RouteBuilder::build`.
#[derive(Clone, Debug, Eq, PartialEq)]
pub enum RouteBuildError {
  /// No handler was registered before `build()`.
  NoHandlers,
}

impl Display for RouteBuildError {
  fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
    match self {
      RouteBuildError::NoHandlers => f.write_str("a route requires at least one handler"),
    }
  }
}

impl std::error::Error for RouteBuildError {}

struct Candidate<'h> {
  handler: &'h Handler,
  rank: crate::mime::QValue,
  produces_specificity: i64,
  consumes_specificity: i64,
}

fn consumes_passes(consumes: &Consumes, content_type: Option<&MediaType>) -> bool {
  match consumes {
    Consumes::NothingAndAll => true,
    Consumes::Nothing => content_type.is_none(),
    Consumes::MediaType(handler_type) => match content_type {
      Some(ct) => handler_type.compatibility(ct) != Compatibility::Nope,
      None => false,
    },
  }
}

/// The C4 algorithm, exactly per spec §4.3, operating over an already
/// method-and-consumes-filtered or raw handler slice (the route owns the
/// full set; this is also reusable for registry-level testing).
pub fn select_handler<'h>(
  route_pattern: &str,
  handlers: &'h [Handler],
  method: &HttpMethod,
  content_type: Option<&MediaType>,
  accept_list: &[MediaType],
) -> TiiResult<&'h Handler> {
  // Step 1: method filter.
  let by_method: Vec<&Handler> = handlers.iter().filter(|h| &h.method == method).collect();
  if by_method.is_empty() {
    let mut methods: Vec<HttpMethod> = handlers.iter().map(|h| h.method.clone()).collect();
    methods.sort();
    methods.dedup();
    return Err(TiiError::MethodNotAllowed { route: route_pattern.to_string(), method: method.clone(), methods });
  }

  // Step 2: consumes filter.
  let survivors: Vec<&Handler> = by_method.into_iter().filter(|h| consumes_passes(&h.consumes, content_type)).collect();
  if survivors.is_empty() {
    return Err(TiiError::MediaTypeUnsupported { content_type: content_type.cloned() });
  }

  // Step 3: rank against accept_list.
  let mut candidates: Vec<Candidate<'_>> = Vec::new();
  if accept_list.is_empty() {
    for handler in &survivors {
      if !handler.produces.parameters().is_empty() {
        continue;
      }
      candidates.push(Candidate {
        handler,
        rank: crate::mime::QValue::MAX,
        produces_specificity: handler.produces.specificity(),
        consumes_specificity: consumes_specificity(&handler.consumes),
      });
    }
  } else {
    for handler in &survivors {
      let best = accept_list
        .iter()
        .filter(|accept| handler.produces.compatibility(accept) != Compatibility::Nope)
        .min_by_key(|accept| accept.specificity());
      let Some(best) = best else { continue };
      if best.quality().is_zero() {
        continue;
      }
      candidates.push(Candidate {
        handler,
        rank: best.quality(),
        produces_specificity: handler.produces.specificity(),
        consumes_specificity: consumes_specificity(&handler.consumes),
      });
    }
  }

  // Step 4: order by (rank DESC, produces-specificity ASC, consumes-specificity ASC).
  candidates.sort_by(|a, b| {
    b.rank
      .cmp(&a.rank)
      .then(a.produces_specificity.cmp(&b.produces_specificity))
      .then(a.consumes_specificity.cmp(&b.consumes_specificity))
  });

  // Step 5: ambiguity check on the first bucket.
  let Some((best, _)) = candidates.split_first() else {
    return Err(TiiError::MediaTypeNotAccepted { accepts: accept_list.to_vec() });
  };
  let tied: Vec<&Candidate<'_>> = candidates
    .iter()
    .take_while(|c| c.rank == best.rank && c.produces_specificity == best.produces_specificity && c.consumes_specificity == best.consumes_specificity)
    .collect();

  if tied.len() >= 2 {
    return Err(TiiError::AmbiguousHandler { candidates: tied.iter().map(|c| c.handler.key_string()).collect() });
  }

  Ok(best.handler)
}

fn consumes_specificity(consumes: &Consumes) -> i64 {
  match consumes {
    Consumes::Nothing => i64::MIN,
    Consumes::NothingAndAll => i64::MAX,
    Consumes::MediaType(mt) => mt.specificity(),
  }
}

#[cfg(test)]
mod test {
  use super::*;
  use crate::mime::MediaType;

  fn noop_logic(_: &mut Request, _: &mut dyn Channel) -> TiiResult<Response> {
    Ok(Response::new(crate::status::StatusCode::OK))
  }

  fn handler(method: &str, consumes: Consumes, produces: MediaType) -> Handler {
    Handler::builder()
      .method(HttpMethod::new(method).unwrap())
      .consumes(consumes)
      .produces(produces)
      .logic(noop_logic)
      .unwrap()
  }

  #[test]
  fn method_not_allowed_when_no_handler_matches() {
    let handlers = vec![handler("GET", Consumes::NothingAndAll, MediaType::parse("text/plain").unwrap())];
    let err = select_handler("/r", &handlers, &HttpMethod::post(), None, &[]).unwrap_err();
    assert!(matches!(err, TiiError::MethodNotAllowed { .. }));
  }

  #[test]
  fn media_type_unsupported_when_consumes_mismatches() {
    let handlers = vec![handler(
      "POST",
      Consumes::MediaType(MediaType::parse("application/json").unwrap()),
      MediaType::parse("text/plain").unwrap(),
    )];
    let content_type = MediaType::parse("text/plain").unwrap();
    let err = select_handler("/r", &handlers, &HttpMethod::post(), Some(&content_type), &[]).unwrap_err();
    assert!(matches!(err, TiiError::MediaTypeUnsupported { .. }));
  }

  #[test]
  fn empty_accept_excludes_parameterized_produces() {
    let handlers = vec![handler("GET", Consumes::NothingAndAll, MediaType::parse("text/plain;charset=utf-8").unwrap())];
    let err = select_handler("/r", &handlers, &HttpMethod::get(), None, &[]).unwrap_err();
    assert!(matches!(err, TiiError::MediaTypeNotAccepted { .. }));
  }

  #[test]
  fn ambiguous_when_two_handlers_tie() {
    let handlers = vec![
      handler(
        "GET",
        Consumes::MediaType(MediaType::parse("text/plain").unwrap()),
        MediaType::parse("text/plain").unwrap(),
      ),
      handler(
        "GET",
        Consumes::MediaType(MediaType::parse("text/plain").unwrap()),
        MediaType::parse("application/json").unwrap(),
      ),
    ];
    let content_type = MediaType::parse("text/plain").unwrap();
    let accept = MediaType::parse("*/*").unwrap();
    let err = select_handler("/r", &handlers, &HttpMethod::get(), Some(&content_type), &[accept]).unwrap_err();
    assert!(matches!(err, TiiError::AmbiguousHandler { .. }));
  }

  #[test]
  fn method_not_allowed_then_options_with_allow_header_from_route() {
    let route = Route::builder("/r")
      .unwrap()
      .handler(handler(
        "GET",
        Consumes::MediaType(MediaType::parse("application/json").unwrap()),
        MediaType::parse("*/*").unwrap(),
      ))
      .unwrap()
      .build()
      .unwrap();

    let err = route.select(&HttpMethod::post(), None, &[]).unwrap_err();
    assert!(matches!(err, TiiError::MethodNotAllowed { .. }));
    assert_eq!(route.supported_methods(), vec![HttpMethod::get()]);
  }
}
