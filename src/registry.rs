//! Route Registry (C5): a concurrent prefix tree with safe pruning.

use crate::error::{TiiError, TiiResult};
use crate::path::{self, PathPatternError, Segment};
use crate::route::Route;
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, RwLock};

use crate::util::unwrap_poison;

struct Node {
  /// The route registered at exactly this position, if any.
  value: RwLock<Option<Arc<Route>>>,
  /// Per-node reservation lock: writers hold the shared (read) side while
  /// traversing through this node; pruning takes the exclusive (write) side
  /// to guarantee no writer currently has this node reserved.
  reservation: RwLock<()>,
  static_children: Mutex<HashMap<String, Arc<Node>>>,
  single_child: Mutex<Option<Arc<Node>>>,
  catchall_child: Mutex<Option<Arc<Node>>>,
}

impl Node {
  fn new_arc() -> Arc<Node> {
    Arc::new(Node {
      value: RwLock::new(None),
      reservation: RwLock::new(()),
      static_children: Mutex::new(HashMap::new()),
      single_child: Mutex::new(None),
      catchall_child: Mutex::new(None),
    })
  }

  fn is_empty(&self) -> bool {
    unwrap_poison(self.value.read()).is_none()
      && unwrap_poison(self.static_children.lock()).is_empty()
      && unwrap_poison(self.single_child.lock()).is_none()
      && unwrap_poison(self.catchall_child.lock()).is_none()
  }
}

/// The result of a successful registry lookup: the matched route plus its
/// bound path parameters, raw and percent-decoded.
pub struct Match {
  route: Arc<Route>,
  params_raw: HashMap<String, String>,
  params_decoded: HashMap<String, String>,
}

impl Match {
  /// The matched route.
  pub fn route(&self) -> &Route {
    &self.route
  }

  /// Raw (still percent-encoded) path parameter values, by name.
  pub fn params_raw(&self) -> &HashMap<String, String> {
    &self.params_raw
  }

  /// Percent-decoded path parameter values, by name.
  pub fn params_decoded(&self) -> &HashMap<String, String> {
    &self.params_decoded
  }
}

/// Concurrent prefix tree of routes. Safe for `add`/`remove`/`lookup` to run
/// from arbitrarily many threads concurrently.
pub struct Registry {
  root: Arc<Node>,
  dirty: AtomicBool,
  pruning: AtomicBool,
}

impl Default for Registry {
  fn default() -> Self {
    Self::new()
  }
}

impl Registry {
  /// An empty registry.
  pub fn new() -> Self {
    Registry { root: Node::new_arc(), dirty: AtomicBool::new(false), pruning: AtomicBool::new(false) }
  }

  /// Registers `route`. Traverses (creating nodes as needed), failing with
  /// `RouteCollision` if the route's position is already taken or the tree's
  /// structural invariants would be violated.
  pub fn add(&self, route: Route) -> TiiResult<()> {
    let segments = route.segments().to_vec();
    let pattern = route.pattern().to_string();
    self.add_rec(Arc::clone(&self.root), &segments, route, &pattern)
  }

  fn add_rec(&self, node: Arc<Node>, remaining: &[Segment], route: Route, pattern: &str) -> TiiResult<()> {
    let _reservation = unwrap_poison(node.reservation.read());

    match remaining.split_first() {
      None => {
        if unwrap_poison(node.catchall_child.lock()).is_some() {
          return Err(TiiError::RouteCollision { pattern: pattern.to_string() });
        }
        let mut value = unwrap_poison(node.value.write());
        if value.is_some() {
          return Err(TiiError::RouteCollision { pattern: pattern.to_string() });
        }
        *value = Some(Arc::new(route));
        Ok(())
      }
      Some((segment, rest)) => {
        let child = self.get_or_create_child(&node, segment, pattern)?;
        self.add_rec(child, rest, route, pattern)
      }
    }
  }

  fn get_or_create_child(&self, node: &Arc<Node>, segment: &Segment, pattern: &str) -> TiiResult<Arc<Node>> {
    let collision = || TiiError::RouteCollision { pattern: pattern.to_string() };

    match segment {
      Segment::Static(name) => {
        if unwrap_poison(node.single_child.lock()).is_some() || unwrap_poison(node.catchall_child.lock()).is_some() {
          return Err(collision());
        }
        let mut children = unwrap_poison(node.static_children.lock());
        Ok(Arc::clone(children.entry(name.clone()).or_insert_with(Node::new_arc)))
      }
      Segment::Single(_) => {
        if !unwrap_poison(node.static_children.lock()).is_empty() || unwrap_poison(node.catchall_child.lock()).is_some() {
          return Err(collision());
        }
        let mut single = unwrap_poison(node.single_child.lock());
        if single.is_none() {
          *single = Some(Node::new_arc());
        }
        Ok(Arc::clone(single.as_ref().expect("just inserted")))
      }
      Segment::CatchAll(_) => {
        if !unwrap_poison(node.static_children.lock()).is_empty() || unwrap_poison(node.single_child.lock()).is_some() {
          return Err(collision());
        }
        if unwrap_poison(node.value.read()).is_some() {
          return Err(collision());
        }
        let mut catchall = unwrap_poison(node.catchall_child.lock());
        if catchall.is_none() {
          *catchall = Some(Node::new_arc());
        }
        Ok(Arc::clone(catchall.as_ref().expect("just inserted")))
      }
    }
  }

  /// Parses `pattern` and removes whatever route occupies that position, if
  /// any, triggering a lazy prune.
  pub fn remove_pattern(&self, pattern: &str) -> Result<Option<Arc<Route>>, PathPatternError> {
    let segments = path::parse_pattern(pattern)?;
    Ok(self.remove_rec(Arc::clone(&self.root), &segments))
  }

  /// Removes `route` only if a route currently occupies its exact position
  /// (a route's pattern uniquely determines its tree position, so this is
  /// equivalent to removing `route` itself). Returns whether it was removed.
  pub fn remove_route(&self, route: &Route) -> bool {
    self.remove_rec(Arc::clone(&self.root), route.segments()).is_some()
  }

  fn remove_rec(&self, node: Arc<Node>, remaining: &[Segment]) -> Option<Arc<Route>> {
    let _reservation = unwrap_poison(node.reservation.read());

    let result = match remaining.split_first() {
      None => {
        let mut value = unwrap_poison(node.value.write());
        value.take()
      }
      Some((segment, rest)) => {
        let child = match segment {
          Segment::Static(name) => unwrap_poison(node.static_children.lock()).get(name).cloned(),
          Segment::Single(_) => unwrap_poison(node.single_child.lock()).clone(),
          Segment::CatchAll(_) => unwrap_poison(node.catchall_child.lock()).clone(),
        };
        child.and_then(|child| self.remove_rec(child, rest))
      }
    };

    if result.is_some() {
      self.mark_dirty_and_maybe_prune();
    }
    result
  }

  /// Percent-decodes each segment and walks the tree, preferring an exact
  /// static match, then a single-parameter child, then (only once
  /// static/single options are exhausted) a catch-all child.
  pub fn lookup(&self, raw_segments: &[&str]) -> TiiResult<Match> {
    let mut node = Arc::clone(&self.root);
    let mut bindings: Vec<Option<(String, String)>> = Vec::new();
    let mut idx = 0usize;

    let not_found = || TiiError::NoRouteFound { segments: raw_segments.iter().map(|s| s.to_string()).collect() };

    loop {
      if let Some(&raw) = raw_segments.get(idx) {
        let decoded = path::percent_decode_segment(raw).ok_or(TiiError::BadRequest)?;

        let static_next = unwrap_poison(node.static_children.lock()).get(&decoded).cloned();
        if let Some(child) = static_next {
          bindings.push(None);
          node = child;
          idx += 1;
          continue;
        }

        let single_next = unwrap_poison(node.single_child.lock()).clone();
        if let Some(child) = single_next {
          bindings.push(Some((raw.to_string(), decoded)));
          node = child;
          idx += 1;
          continue;
        }

        let catchall_next = unwrap_poison(node.catchall_child.lock()).clone();
        if let Some(child) = catchall_next {
          let remainder = raw_segments.get(idx..).unwrap_or(&[]);
          let raw_join = format!("/{}", remainder.join("/"));
          let mut decoded_parts = Vec::with_capacity(remainder.len());
          for s in remainder {
            decoded_parts.push(path::percent_decode_segment(s).ok_or(TiiError::BadRequest)?);
          }
          let decoded_join = format!("/{}", decoded_parts.join("/"));
          bindings.push(Some((raw_join, decoded_join)));
          node = child;
          break;
        }

        return Err(not_found());
      } else {
        if unwrap_poison(node.value.read()).is_some() {
          break;
        }

        let catchall_next = unwrap_poison(node.catchall_child.lock()).clone();
        if let Some(child) = catchall_next {
          bindings.push(Some(("/".to_string(), "/".to_string())));
          node = child;
          break;
        }

        return Err(not_found());
      }
    }

    let value = unwrap_poison(node.value.read());
    let route = value.as_ref().cloned().ok_or_else(not_found)?;
    drop(value);

    let mut params_raw = HashMap::new();
    let mut params_decoded = HashMap::new();
    for (segment, binding) in route.segments().iter().zip(bindings.iter()) {
      if let (Some(name), Some((raw_v, decoded_v))) = (segment.param_name(), binding) {
        params_raw.insert(name.to_string(), raw_v.clone());
        params_decoded.insert(name.to_string(), decoded_v.clone());
      }
    }

    Ok(Match { route, params_raw, params_decoded })
  }

  fn mark_dirty_and_maybe_prune(&self) {
    self.dirty.store(true, Ordering::SeqCst);
    if self.pruning.compare_exchange(false, true, Ordering::SeqCst, Ordering::SeqCst).is_ok() {
      loop {
        self.dirty.store(false, Ordering::SeqCst);
        Self::prune_subtree(&self.root);
        if !self.dirty.load(Ordering::SeqCst) {
          break;
        }
      }
      self.pruning.store(false, Ordering::SeqCst);
    }
  }

  fn prune_subtree(node: &Arc<Node>) {
    let static_keys: Vec<String> = unwrap_poison(node.static_children.lock()).keys().cloned().collect();
    for key in static_keys {
      let child = unwrap_poison(node.static_children.lock()).get(&key).cloned();
      if let Some(child) = child {
        Self::prune_subtree(&child);
        if Self::try_prune_empty(&child) {
          unwrap_poison(node.static_children.lock()).remove(&key);
        }
      }
    }

    let single = unwrap_poison(node.single_child.lock()).clone();
    if let Some(child) = single {
      Self::prune_subtree(&child);
      if Self::try_prune_empty(&child) {
        *unwrap_poison(node.single_child.lock()) = None;
      }
    }

    let catchall = unwrap_poison(node.catchall_child.lock()).clone();
    if let Some(child) = catchall {
      Self::prune_subtree(&child);
      if Self::try_prune_empty(&child) {
        *unwrap_poison(node.catchall_child.lock()) = None;
      }
    }
  }

  /// Attempts to prune an empty node. Requires the exclusive reservation, so
  /// a node currently reserved by an in-flight writer is left alone — it
  /// will be reconsidered on the next sweep.
  fn try_prune_empty(node: &Arc<Node>) -> bool {
    if !node.is_empty() {
      return false;
    }
    match node.reservation.try_write() {
      Ok(_guard) => node.is_empty(),
      Err(_) => false,
    }
  }
}

#[cfg(test)]
mod test {
  use super::*;
  use crate::channel::Channel;
  use crate::method::HttpMethod;
  use crate::mime::{Consumes, MediaType};
  use crate::request::Request;
  use crate::response::Response;
  use crate::status::StatusCode;

  fn ok_logic(_: &mut Request, _: &mut dyn Channel) -> TiiResult<Response> {
    Ok(Response::new(StatusCode::OK))
  }

  fn route_with_get(pattern: &str) -> Route {
    Route::builder(pattern)
      .unwrap()
      .handler(
        crate::route::Handler::builder()
          .method(HttpMethod::get())
          .consumes(Consumes::NothingAndAll)
          .produces(MediaType::all())
          .logic(ok_logic)
          .unwrap(),
      )
      .unwrap()
      .build()
      .unwrap()
  }

  #[test]
  fn static_sibling_of_single_at_same_parent_collides() {
    // Open Question 1 (spec.md section 9): Static and Single coexisting at
    // the same parent is disallowed here, the stricter of the two
    // historically-attested readings. So /users/new and /users/:id can
    // never both live under /users — this is the same shape as S6, just
    // one segment deeper.
    let registry = Registry::new();
    registry.add(route_with_get("/users/new")).unwrap();
    let err = registry.add(route_with_get("/users/:id")).unwrap_err();
    assert!(matches!(err, TiiError::RouteCollision { .. }));
  }

  #[test]
  fn lookup_binds_single_segment_parameter() {
    let registry = Registry::new();
    registry.add(route_with_get("/users/:id")).unwrap();

    let m = registry.lookup(&["users", "42"]).unwrap();
    assert_eq!(m.route().pattern(), "/users/:id");
    assert_eq!(m.params_decoded().get("id"), Some(&"42".to_string()));
  }

  #[test]
  fn catchall_consumes_remainder_and_defaults_to_slash() {
    let registry = Registry::new();
    registry.add(route_with_get("/src/*path")).unwrap();

    let m = registry.lookup(&["src", "a", "b%20c"]).unwrap();
    assert_eq!(m.params_raw().get("path"), Some(&"/a/b%20c".to_string()));
    assert_eq!(m.params_decoded().get("path"), Some(&"/a/b c".to_string()));

    let m = registry.lookup(&["src"]).unwrap();
    assert_eq!(m.params_decoded().get("path"), Some(&"/".to_string()));
  }

  #[test]
  fn no_route_found_raises() {
    let registry = Registry::new();
    registry.add(route_with_get("/hello")).unwrap();
    assert!(matches!(registry.lookup(&["missing"]), Err(TiiError::NoRouteFound { .. })));
  }

  #[test]
  fn add_add_collides_add_remove_add_succeeds() {
    let registry = Registry::new();
    registry.add(route_with_get("/r")).unwrap();
    assert!(matches!(registry.add(route_with_get("/r")), Err(TiiError::RouteCollision { .. })));

    registry.remove_pattern("/r").unwrap();
    assert!(registry.add(route_with_get("/r")).is_ok());
  }

  #[test]
  fn static_then_single_sibling_collides_but_single_under_bare_static_succeeds() {
    let registry = Registry::new();
    registry.add(route_with_get("/a/b")).unwrap();
    assert!(matches!(registry.add(route_with_get("/a/:x")), Err(TiiError::RouteCollision { .. })));

    let registry = Registry::new();
    registry.add(route_with_get("/a")).unwrap();
    assert!(registry.add(route_with_get("/a/:x")).is_ok());
  }

  #[test]
  fn removed_route_is_not_observed_by_later_lookup() {
    let registry = Registry::new();
    registry.add(route_with_get("/gone")).unwrap();
    assert!(registry.lookup(&["gone"]).is_ok());
    registry.remove_pattern("/gone").unwrap();
    assert!(matches!(registry.lookup(&["gone"]), Err(TiiError::NoRouteFound { .. })));
  }

  #[test]
  fn concurrent_add_and_lookup_is_safe() {
    use std::thread;

    let registry = Arc::new(Registry::new());
    let mut handles = Vec::new();
    for i in 0..8 {
      let registry = Arc::clone(&registry);
      handles.push(thread::spawn(move || {
        registry.add(route_with_get(&format!("/concurrent/{i}"))).unwrap();
      }));
    }
    for handle in handles {
      handle.join().unwrap();
    }

    for i in 0..8 {
      let m = registry.lookup(&["concurrent", &i.to_string()]).unwrap();
      assert_eq!(m.route().pattern(), format!("/concurrent/{i}"));
    }
  }
}
