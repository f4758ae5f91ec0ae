//! Loopback HTTP bridge between editor clients and the engine.
//!
//! The wire surface is deliberately tiny. `GET /ping` answers `pong`
//! without touching the engine; `POST /` carries a JSON request document in
//! the body; `GET /?doc=...` carries it URL-encoded in the query string;
//! every other path is a 404. Malformed documents and engine-reported
//! failures become 400 responses with the error text in the body, so a
//! client always receives a definite answer for a reachable path.
//!
//! The listener binds to the loopback interface only; that bind is the
//! security boundary. There is no authentication.

mod handler;
mod server;

pub(crate) const HTTP_TARGET: &str = concat!(env!("CARGO_PKG_NAME"), "::http");

pub use handler::RequestHandler;
pub use server::{HttpBridge, HttpBridgeError, HttpBridgeHandle};
