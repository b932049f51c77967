//! The channel contract the dispatcher writes responses to.
//!
//! Byte-level I/O, framing, and connection lifecycle are deliberately out of
//! scope for this core (see spec §1); this trait is the seam a protocol
//! layer implements, mirroring `functional_traits.rs`'s `Router`/
//! `HttpEndpoint` split between wire layer and dispatch core.

use crate::error::TiiResult;
use crate::response::Response;
use std::any::Any;
use std::collections::HashMap;

/// A connection-scoped attribute bag, analogous to `crate::request::Attributes`
/// but living for the whole connection rather than one exchange.
#[derive(Default)]
pub struct ConnectionAttributes(Option<HashMap<String, Box<dyn Any + Send>>>);

impl ConnectionAttributes {
  /// An empty bag.
  pub fn new() -> Self {
    ConnectionAttributes(None)
  }

  /// Stores a value under `key`, returning the previous one if present.
  pub fn set(&mut self, key: impl Into<String>, value: impl Any + Send) -> Option<Box<dyn Any + Send>> {
    self.0.get_or_insert_with(HashMap::new).insert(key.into(), Box::new(value))
  }

  /// Retrieves a value previously stored under `key`, downcast to `T`.
  pub fn get<T: Any>(&self, key: &str) -> Option<&T> {
    self.0.as_ref()?.get(key)?.downcast_ref::<T>()
  }
}

/// The channel a single exchange is dispatched over. Implemented by the
/// (out-of-scope) protocol layer.
pub trait Channel: Send {
  /// Commits a final response. Implementations should treat a second call
  /// within the same exchange as a logic error in the caller.
  fn write(&mut self, response: Response) -> TiiResult<()>;

  /// Stops reading further request data on this connection (e.g. after a
  /// fatal request error, while still allowing the response to be written).
  fn shutdown_input(&mut self);

  /// Closes the connection entirely, in both directions.
  fn close(&mut self);

  /// Whether the connection can still be read from.
  fn is_input_open(&self) -> bool;

  /// Whether the connection can still be written to.
  fn is_output_open(&self) -> bool;

  /// The connection-scoped attribute bag.
  fn attributes(&mut self) -> &mut ConnectionAttributes;
}

#[cfg(test)]
mod test {
  use super::*;

  struct TestChannel {
    input_open: bool,
    output_open: bool,
    written: Vec<Response>,
    attributes: ConnectionAttributes,
  }

  impl Channel for TestChannel {
    fn write(&mut self, response: Response) -> TiiResult<()> {
      self.written.push(response);
      Ok(())
    }
    fn shutdown_input(&mut self) {
      self.input_open = false;
    }
    fn close(&mut self) {
      self.input_open = false;
      self.output_open = false;
    }
    fn is_input_open(&self) -> bool {
      self.input_open
    }
    fn is_output_open(&self) -> bool {
      self.output_open
    }
    fn attributes(&mut self) -> &mut ConnectionAttributes {
      &mut self.attributes
    }
  }

  #[test]
  fn close_shuts_both_directions() {
    let mut channel =
      TestChannel { input_open: true, output_open: true, written: Vec::new(), attributes: ConnectionAttributes::new() };
    channel.close();
    assert!(!channel.is_input_open());
    assert!(!channel.is_output_open());
  }

  #[test]
  fn attributes_round_trip() {
    let mut channel =
      TestChannel { input_open: true, output_open: true, written: Vec::new(), attributes: ConnectionAttributes::new() };
    channel.attributes().set("tag", "value");
    assert_eq!(channel.attributes().get::<&str>("tag"), Some(&"value"));
  }
}
