//! The request contract consumed by handlers and the dispatcher.

use crate::method::HttpMethod;
use crate::mime::MediaType;
use std::any::Any;
use std::collections::HashMap;

/// A request-scoped attribute bag. Lazily allocated since most requests
/// never use it.
#[derive(Default)]
pub struct Attributes(Option<HashMap<String, Box<dyn Any + Send>>>);

impl Attributes {
  /// An empty bag.
  pub fn new() -> Self {
    Attributes(None)
  }

  /// Stores a value under `key`, returning the previous one if present.
  pub fn set(&mut self, key: impl Into<String>, value: impl Any + Send) -> Option<Box<dyn Any + Send>> {
    self.0.get_or_insert_with(HashMap::new).insert(key.into(), Box::new(value))
  }

  /// Retrieves a value previously stored under `key`, downcast to `T`.
  pub fn get<T: Any>(&self, key: &str) -> Option<&T> {
    self.0.as_ref()?.get(key)?.downcast_ref::<T>()
  }

  /// Removes and returns the value stored under `key`, downcast to `T`.
  pub fn remove<T: Any>(&mut self, key: &str) -> Option<Box<T>> {
    let boxed = self.0.as_mut()?.remove(key)?;
    boxed.downcast::<T>().ok()
  }
}

/// The path parameters bound by a registry lookup: raw (still percent-
/// encoded) and decoded forms, keyed by parameter name.
#[derive(Clone, Debug, Default, Eq, PartialEq)]
pub struct PathParams {
  raw: HashMap<String, String>,
  decoded: HashMap<String, String>,
}

impl PathParams {
  /// Builds a `PathParams` from the raw/decoded maps produced by a lookup.
  pub fn new(raw: HashMap<String, String>, decoded: HashMap<String, String>) -> Self {
    PathParams { raw, decoded }
  }

  /// The decoded value bound to `name`.
  pub fn get(&self, name: &str) -> Option<&str> {
    self.decoded.get(name).map(String::as_str)
  }

  /// The raw (still percent-encoded) value bound to `name`.
  pub fn get_raw(&self, name: &str) -> Option<&str> {
    self.raw.get(name).map(String::as_str)
  }
}

/// One exchange's request: the fixed fields a parsed request carries
/// (method, content type, accept list — produced by the out-of-scope
/// protocol layer), the path parameters bound by the registry lookup, and a
/// mutable per-request attribute bag.
pub struct Request {
  method: HttpMethod,
  content_type: Option<MediaType>,
  accept: Vec<MediaType>,
  path_params: PathParams,
  attributes: Attributes,
}

impl Request {
  /// Builds a request from its protocol-layer-supplied fields. Path
  /// parameters are filled in by the dispatcher once a route is matched.
  pub fn new(method: HttpMethod, content_type: Option<MediaType>, accept: Vec<MediaType>) -> Self {
    Request { method, content_type, accept, path_params: PathParams::default(), attributes: Attributes::new() }
  }

  /// The request method.
  pub fn method(&self) -> &HttpMethod {
    &self.method
  }

  /// The request's `Content-Type`, if any.
  pub fn content_type(&self) -> Option<&MediaType> {
    self.content_type.as_ref()
  }

  /// The request's `Accept` list, in the order supplied (possibly empty).
  pub fn accept(&self) -> &[MediaType] {
    &self.accept
  }

  /// The decoded path parameter bound to `name`.
  pub fn path(&self, name: &str) -> Option<&str> {
    self.path_params.get(name)
  }

  /// The raw (percent-encoded) path parameter bound to `name`.
  pub fn path_raw(&self, name: &str) -> Option<&str> {
    self.path_params.get_raw(name)
  }

  /// Called by the dispatcher once a route has matched, to expose its path
  /// parameters to the handler.
  pub fn bind_path_params(&mut self, params: PathParams) {
    self.path_params = params;
  }

  /// The mutable per-request attribute bag.
  pub fn attributes(&mut self) -> &mut Attributes {
    &mut self.attributes
  }
}

#[cfg(test)]
mod test {
  use super::*;

  #[test]
  fn path_params_expose_raw_and_decoded() {
    let mut request = Request::new(HttpMethod::get(), None, Vec::new());
    let mut raw = HashMap::new();
    raw.insert("path".to_string(), "/a/b%20c".to_string());
    let mut decoded = HashMap::new();
    decoded.insert("path".to_string(), "/a/b c".to_string());
    request.bind_path_params(PathParams::new(raw, decoded));

    assert_eq!(request.path_raw("path"), Some("/a/b%20c"));
    assert_eq!(request.path("path"), Some("/a/b c"));
  }

  #[test]
  fn attributes_round_trip_typed_value() {
    let mut request = Request::new(HttpMethod::get(), None, Vec::new());
    request.attributes().set("count", 42u32);
    assert_eq!(request.attributes().get::<u32>("count"), Some(&42));
    assert_eq!(request.attributes().get::<&str>("count"), None);
  }
}
