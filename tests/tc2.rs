//! Method-not-allowed end to end: a GET-only route rejects POST with a 405
//! and an `Allow:` header, and (with `implement_missing_options` turned on)
//! answers an unregistered OPTIONS with 204 and the same header.

use tii::channel::{Channel, ConnectionAttributes};
use tii::method::HttpMethod;
use tii::mime::{Consumes, MediaType};
use tii::route::{Handler, Route};
use tii::status::StatusCode;
use tii::{Configuration, Dispatcher, ErrorChain, Registry, Request, Response, TiiResult};

struct RecordingChannel {
  attributes: ConnectionAttributes,
  written: Vec<Response>,
}

impl RecordingChannel {
  fn new() -> Self {
    RecordingChannel { attributes: ConnectionAttributes::new(), written: Vec::new() }
  }
}

impl Channel for RecordingChannel {
  fn write(&mut self, response: Response) -> TiiResult<()> {
    self.written.push(response);
    Ok(())
  }
  fn shutdown_input(&mut self) {}
  fn close(&mut self) {}
  fn is_input_open(&self) -> bool {
    true
  }
  fn is_output_open(&self) -> bool {
    true
  }
  fn attributes(&mut self) -> &mut ConnectionAttributes {
    &mut self.attributes
  }
}

fn ok_logic(_request: &mut Request, _channel: &mut dyn Channel) -> TiiResult<Response> {
  Ok(Response::new(StatusCode::OK))
}

fn build_dispatcher(config: Configuration) -> Dispatcher {
  let registry = Registry::new();
  let route = Route::builder("/r")
    .unwrap()
    .handler(
      Handler::builder()
        .method(HttpMethod::get())
        .consumes(Consumes::NothingAndAll)
        .produces(MediaType::parse("text/plain").unwrap())
        .logic(ok_logic)
        .unwrap(),
    )
    .unwrap()
    .build()
    .unwrap();
  registry.add(route).unwrap();
  Dispatcher::new(registry, ErrorChain::new(), config)
}

#[test]
fn post_against_get_only_route_is_405_with_allow_header() {
  let dispatcher = build_dispatcher(Configuration::default());
  let accept = vec![MediaType::all()];
  let request = Request::new(HttpMethod::post(), None, accept);
  let mut channel = RecordingChannel::new();

  dispatcher.dispatch(&["r"], request, &mut channel);

  assert_eq!(channel.written.len(), 1);
  assert_eq!(channel.written[0].status(), &StatusCode::MethodNotAllowed);
  assert_eq!(channel.written[0].headers().get(tii::headers::HeaderName::ALLOW), Some("GET"));
}

#[test]
fn unregistered_options_with_implement_missing_options_is_204() {
  let config = Configuration::builder().with_implement_missing_options(true).build();
  let dispatcher = build_dispatcher(config);
  let accept = vec![MediaType::all()];
  let request = Request::new(HttpMethod::options(), None, accept);
  let mut channel = RecordingChannel::new();

  dispatcher.dispatch(&["r"], request, &mut channel);

  assert_eq!(channel.written.len(), 1);
  assert_eq!(channel.written[0].status(), &StatusCode::NoContent);
  assert_eq!(channel.written[0].headers().get(tii::headers::HeaderName::ALLOW), Some("OPTIONS, GET"));
}
