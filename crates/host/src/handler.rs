//! Request line handler.
//!
//! Parses one request line, routes it through the interceptor and maps the
//! outcome to a response line. Every line yields exactly one response.

use onload_loader::{Interceptor, LoadRequest};

use crate::error::HostError;
use crate::wire::{Reply, RequestLine};

/// Methods that load a resource.
const LOAD_METHODS: [&str; 2] = ["GET", "HEAD"];

/// Handle one raw request line.
pub async fn respond(interceptor: &Interceptor, line: &str) -> Reply {
    let line: RequestLine = match serde_json::from_str(line) {
        Ok(line) => line,
        Err(e) => return reject(None, e.into()),
    };

    let id = line.id.clone();
    let request = match admit(line) {
        Ok(request) => request,
        Err(e) => return reject(id, e),
    };

    let outcome = interceptor.handle(&request).await;
    Reply { id, response: outcome.into_host_response().into() }
}

fn admit(line: RequestLine) -> Result<LoadRequest, HostError> {
    if !LOAD_METHODS.iter().any(|m| m.eq_ignore_ascii_case(&line.method)) {
        return Err(HostError::InvalidMethod(line.method));
    }
    Ok(line.into())
}

fn reject(id: Option<serde_json::Value>, err: HostError) -> Reply {
    tracing::warn!(error = %err, "rejected request line");
    Reply { id, response: err.into() }
}
