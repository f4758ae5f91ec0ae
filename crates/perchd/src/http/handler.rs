//! Request routing and response rendering for the HTTP bridge.

use std::io::{Cursor, Read};

use serde_json::Value;
use tiny_http::{Header, Method, Request, Response};
use tracing::{debug, warn};
use url::form_urlencoded;

use crate::engine_bridge::EngineBridge;
use crate::idle::IdleMonitor;

use super::HTTP_TARGET;

/// Maximum size of a request document in bytes.
const MAX_DOCUMENT_BYTES: usize = 1024 * 1024;

/// Routes inbound requests and bridges analysis documents to the engine.
///
/// Cheap to clone; every request runs on its own thread with its own clone.
#[derive(Clone)]
pub struct RequestHandler {
    bridge: EngineBridge,
    idle: IdleMonitor,
}

impl RequestHandler {
    /// Creates a handler over the engine bridge and idle monitor.
    pub fn new(bridge: EngineBridge, idle: IdleMonitor) -> Self {
        Self { bridge, idle }
    }

    /// Handles one request; every reachable path gets a definite response.
    pub fn handle(&self, mut request: Request) {
        // Any traffic at all counts as activity, whatever the outcome.
        self.idle.touch();

        let reply = self.route(&mut request);
        debug!(
            target: HTTP_TARGET,
            url = %request.url(),
            method = %request.method(),
            status = reply.status,
            "request handled"
        );
        if let Err(error) = request.respond(reply.into_response()) {
            warn!(target: HTTP_TARGET, error = %error, "failed to write response");
        }
    }

    fn route(&self, request: &mut Request) -> Reply {
        let url = request.url().to_owned();
        let (path, query) = split_url(&url);
        match path {
            "/ping" => Reply::pong(),
            "/" => self.handle_document(request, query),
            other => Reply::not_found(other),
        }
    }

    fn handle_document(&self, request: &mut Request, query: Option<&str>) -> Reply {
        let raw = match request.method() {
            Method::Post => match read_body(request) {
                Ok(body) => body,
                Err(reply) => return reply,
            },
            Method::Get => match doc_parameter(query) {
                Some(doc) => doc,
                None => return Reply::bad_request("missing 'doc' query parameter".to_owned()),
            },
            other => {
                return Reply::bad_request(format!("unsupported method {other} for /"));
            }
        };
        self.dispatch(&raw)
    }

    fn dispatch(&self, raw: &str) -> Reply {
        let document: Value = match serde_json::from_str(raw) {
            Ok(document) => document,
            Err(error) => {
                return Reply::bad_request(format!("malformed request document: {error}"));
            }
        };
        match self.bridge.request(document) {
            Ok(result) => Reply::json(&result),
            Err(error) => Reply::bad_request(error.to_string()),
        }
    }
}

/// Rendered response before it is written to the socket.
struct Reply {
    status: u16,
    body: String,
    json: bool,
}

impl Reply {
    fn pong() -> Self {
        Self {
            status: 200,
            body: "pong".to_owned(),
            json: false,
        }
    }

    fn json(value: &Value) -> Self {
        Self {
            status: 200,
            body: value.to_string(),
            json: true,
        }
    }

    fn bad_request(message: String) -> Self {
        Self {
            status: 400,
            body: message,
            json: false,
        }
    }

    fn not_found(path: &str) -> Self {
        Self {
            status: 404,
            body: format!("unrecognised path: {path}"),
            json: false,
        }
    }

    fn into_response(self) -> Response<Cursor<Vec<u8>>> {
        let content_type = if self.json {
            "application/json"
        } else {
            "text/plain; charset=utf-8"
        };
        let mut response =
            Response::from_data(self.body.into_bytes()).with_status_code(self.status);
        if let Ok(header) = Header::from_bytes(&b"Content-Type"[..], content_type.as_bytes()) {
            response = response.with_header(header);
        }
        response
    }
}

fn split_url(url: &str) -> (&str, Option<&str>) {
    match url.split_once('?') {
        Some((path, query)) => (path, Some(query)),
        None => (url, None),
    }
}

fn doc_parameter(query: Option<&str>) -> Option<String> {
    let query = query?;
    form_urlencoded::parse(query.as_bytes())
        .find(|(key, _)| key == "doc")
        .map(|(_, value)| value.into_owned())
}

fn read_body(request: &mut Request) -> Result<String, Reply> {
    let mut body = String::new();
    let limit = MAX_DOCUMENT_BYTES as u64 + 1;
    if let Err(error) = request.as_reader().take(limit).read_to_string(&mut body) {
        return Err(Reply::bad_request(format!(
            "failed to read request body: {error}"
        )));
    }
    if body.len() > MAX_DOCUMENT_BYTES {
        return Err(Reply::bad_request(format!(
            "request body exceeds {MAX_DOCUMENT_BYTES} byte limit"
        )));
    }
    Ok(body)
}
