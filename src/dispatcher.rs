//! Dispatcher (C7): orchestrates a single exchange.

use crate::channel::Channel;
use crate::config::Configuration;
use crate::error::TiiError;
use crate::error_chain::ErrorChain;
use crate::error_log;
use crate::method::HttpMethod;
use crate::registry::Registry;
use crate::request::{PathParams, Request};
use crate::response::Response;

/// Ties together the route registry, handler selection, and the error
/// chain for one exchange. Does not own the channel; it only writes to it
/// and, on an unrecoverable error, closes it.
pub struct Dispatcher {
  registry: Registry,
  chain: ErrorChain,
  config: Configuration,
}

impl Dispatcher {
  /// Builds a dispatcher from its three components.
  pub fn new(registry: Registry, chain: ErrorChain, config: Configuration) -> Self {
    Dispatcher { registry, chain, config }
  }

  /// The route registry.
  pub fn registry(&self) -> &Registry {
    &self.registry
  }

  /// Runs one exchange: registry lookup, handler selection, handler
  /// invocation, and (on any failure) the error-handler chain — writing
  /// exactly one response to `channel`.
  pub fn dispatch(&self, raw_segments: &[&str], mut request: Request, channel: &mut dyn Channel) {
    match self.try_dispatch(raw_segments, &mut request, channel) {
      Ok(response) => {
        if channel.write(response).is_err() {
          channel.close();
        }
      }
      Err((error, route_methods)) => {
        if !channel.is_output_open() {
          error_log!("channel no longer writable, dropping exception: {error}");
          channel.close();
          return;
        }

        let response = self.chain.dispatch(error, Some(&mut request), &self.config, route_methods.as_deref());
        if channel.write(response).is_err() {
          channel.close();
        }
      }
    }
  }

  fn try_dispatch(
    &self,
    raw_segments: &[&str],
    request: &mut Request,
    channel: &mut dyn Channel,
  ) -> Result<Response, (TiiError, Option<Vec<HttpMethod>>)> {
    let found = self.registry.lookup(raw_segments).map_err(|e| (e, None))?;

    request.bind_path_params(PathParams::new(found.params_raw().clone(), found.params_decoded().clone()));

    let route_methods = found.route().supported_methods();
    let handler = found
      .route()
      .select(request.method(), request.content_type(), request.accept())
      .map_err(|e| (e, Some(route_methods.clone())))?;

    handler.invoke(request, channel).map_err(|e| (e, Some(route_methods)))
  }
}

#[cfg(test)]
mod test {
  use super::*;
  use crate::channel::ConnectionAttributes;
  use crate::method::HttpMethod;
  use crate::mime::{Consumes, MediaType};
  use crate::route::{Handler, Route};
  use crate::status::StatusCode;

  struct TestChannel {
    output_open: bool,
    written: Vec<Response>,
    attributes: ConnectionAttributes,
  }

  impl TestChannel {
    fn new() -> Self {
      TestChannel { output_open: true, written: Vec::new(), attributes: ConnectionAttributes::new() }
    }
  }

  impl Channel for TestChannel {
    fn write(&mut self, response: Response) -> crate::error::TiiResult<()> {
      self.written.push(response);
      Ok(())
    }
    fn shutdown_input(&mut self) {}
    fn close(&mut self) {
      self.output_open = false;
    }
    fn is_input_open(&self) -> bool {
      true
    }
    fn is_output_open(&self) -> bool {
      self.output_open
    }
    fn attributes(&mut self) -> &mut ConnectionAttributes {
      &mut self.attributes
    }
  }

  fn hello_logic(_: &mut Request, _: &mut dyn Channel) -> crate::error::TiiResult<Response> {
    Ok(Response::ok("Hello", "text/plain"))
  }

  fn build_dispatcher() -> Dispatcher {
    let registry = Registry::new();
    let route = Route::builder("/hello")
      .unwrap()
      .handler(
        Handler::builder()
          .method(HttpMethod::get())
          .consumes(Consumes::NothingAndAll)
          .produces(MediaType::parse("text/plain").unwrap())
          .logic(hello_logic)
          .unwrap(),
      )
      .unwrap()
      .build()
      .unwrap();
    registry.add(route).unwrap();
    Dispatcher::new(registry, ErrorChain::new(), Configuration::default())
  }

  #[test]
  fn scenario_s1_hello_world() {
    let dispatcher = build_dispatcher();
    let accept = vec![MediaType::all()];
    let request = Request::new(HttpMethod::get(), None, accept);
    let mut channel = TestChannel::new();

    dispatcher.dispatch(&["hello"], request, &mut channel);

    assert_eq!(channel.written.len(), 1);
    assert_eq!(channel.written[0].status(), &StatusCode::OK);
    assert_eq!(channel.written[0].body(), b"Hello");
  }

  #[test]
  fn no_route_found_goes_through_error_chain() {
    let dispatcher = build_dispatcher();
    let request = Request::new(HttpMethod::get(), None, vec![MediaType::all()]);
    let mut channel = TestChannel::new();

    dispatcher.dispatch(&["missing"], request, &mut channel);

    assert_eq!(channel.written[0].status(), &StatusCode::NotFound);
  }

  #[test]
  fn closed_channel_is_not_written_to() {
    let dispatcher = build_dispatcher();
    let request = Request::new(HttpMethod::get(), None, vec![MediaType::all()]);
    let mut channel = TestChannel::new();
    channel.output_open = false;

    dispatcher.dispatch(&["missing"], request, &mut channel);

    assert!(channel.written.is_empty());
  }
}
