//! The request-dispatch core of an HTTP server library: route registration
//! and lookup, proactive content negotiation, and exception-to-response
//! mapping. Wire-level parsing, byte I/O, TLS, connection lifecycle and the
//! HTTP version/upgrade state machine are deliberately out of scope — see
//! [`channel`] and [`request`] for the seams a protocol layer implements.

pub mod channel;
pub mod config;
pub mod dispatcher;
pub mod error;
pub mod error_chain;
pub mod headers;
pub mod method;
pub mod mime;
pub mod path;
pub mod registry;
pub mod request;
pub mod response;
pub mod route;
pub mod status;
pub mod util;

pub use config::Configuration;
pub use dispatcher::Dispatcher;
pub use error::{TiiError, TiiResult};
pub use error_chain::{ErrorChain, ErrorHandler};
pub use method::HttpMethod;
pub use mime::{Consumes, MediaType};
pub use registry::{Match, Registry};
pub use request::Request;
pub use response::Response;
pub use route::{Handler, HandlerBuilder, Route, RouteBuilder};
