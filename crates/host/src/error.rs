//! Structured errors for the onload host.
//!
//! These never reach the library; they describe request lines the host could
//! not turn into a load request.

use onload_loader::HostErrorCode;

use crate::wire::ResponseLine;

/// Structured errors for the onload host.
#[derive(Debug, thiserror::Error)]
pub enum HostError {
    /// The request line is not valid JSON or lacks required fields.
    #[error("INVALID_REQUEST: {0}")]
    InvalidRequest(#[from] serde_json::Error),

    /// The request method cannot load a resource.
    #[error("INVALID_METHOD: {0}")]
    InvalidMethod(String),
}

impl From<HostError> for ResponseLine {
    fn from(_err: HostError) -> Self {
        ResponseLine::Error { code: HostErrorCode::Failed.as_str() }
    }
}
