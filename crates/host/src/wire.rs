//! JSON-lines wire format.
//!
//! One request object per stdin line, one response object per stdout line.
//! Responses are written as requests complete, so a request may carry an `id`
//! that its response echoes back.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use onload_loader::{HostResponse, LoadRequest};

fn default_method() -> String {
    "GET".into()
}

/// A request line: `{"id":1,"method":"GET","url":"file:///..."}`.
#[derive(Debug, Clone, Deserialize)]
pub struct RequestLine {
    /// Opaque correlation value, echoed on the response.
    #[serde(default)]
    pub id: Option<Value>,
    #[serde(default = "default_method")]
    pub method: String,
    pub url: String,
}

impl From<RequestLine> for LoadRequest {
    fn from(line: RequestLine) -> Self {
        LoadRequest { method: line.method, url: line.url }
    }
}

/// A response line, tagged by `kind`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ResponseLine {
    ServeFile { path: String },
    ServeContent { data: String, mime_type: String },
    Delegate { url: String },
    Error { code: &'static str },
}

/// A response line together with the id of the request it answers.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Reply {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id: Option<Value>,
    #[serde(flatten)]
    pub response: ResponseLine,
}

impl From<HostResponse> for ResponseLine {
    fn from(response: HostResponse) -> Self {
        match response {
            HostResponse::ServeFile { path } => Self::ServeFile { path: path.to_string_lossy().into_owned() },
            HostResponse::ServeContent { data, mime_type } => {
                Self::ServeContent { data: String::from_utf8_lossy(&data).into_owned(), mime_type }
            }
            HostResponse::Delegate { url } => Self::Delegate { url: url.into() },
            HostResponse::Error { code } => Self::Error { code: code.as_str() },
        }
    }
}
