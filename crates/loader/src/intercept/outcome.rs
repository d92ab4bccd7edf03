//! Per-request outcomes and their mapping onto host instructions.

use std::fmt;
use std::path::PathBuf;

use url::Url;

/// The single result of handling one load request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LoadOutcome {
    /// No transform applies; the host serves the raw file.
    Passthrough(PathBuf),
    /// Transformed output.
    Content { bytes: Vec<u8>, mime_type: String },
    /// Protocol-relative reference rewritten to `https`.
    Remote(Url),
    /// The matched source file does not exist.
    NotFound,
    /// The matched source file could not be read.
    ReadError { path: PathBuf, message: String },
    /// Transform lookup failed.
    DispatchError { path: PathBuf, message: String },
    /// The request URL could not be interpreted.
    Unsupported { url: String, reason: String },
    /// The transform rejected the source; `diagnostic` is shown in its place.
    CompileError { diagnostic: String, mime_type: String },
}

/// Fixed error vocabulary of the host boundary.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HostErrorCode {
    NotFound,
    Failed,
    DispatchFailed,
}

impl HostErrorCode {
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::NotFound => "NOT_FOUND",
            Self::Failed => "FAILED",
            Self::DispatchFailed => "DISPATCH_FAILED",
        }
    }
}

impl fmt::Display for HostErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Instruction handed back to the host for one request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HostResponse {
    /// Serve the file at `path` unchanged.
    ServeFile { path: PathBuf },
    /// Serve `data` with the given mime type.
    ServeContent { data: Vec<u8>, mime_type: String },
    /// Let the host's network loader fetch `url`.
    Delegate { url: Url },
    /// Fail the request.
    Error { code: HostErrorCode },
}

impl LoadOutcome {
    /// Map the outcome onto exactly one host instruction.
    ///
    /// Compile failures are served as content in the transform's mime type so
    /// the diagnostic shows up where the compiled output would have.
    pub fn into_host_response(self) -> HostResponse {
        match self {
            Self::Passthrough(path) => HostResponse::ServeFile { path },
            Self::Content { bytes, mime_type } => HostResponse::ServeContent { data: bytes, mime_type },
            Self::CompileError { diagnostic, mime_type } => {
                HostResponse::ServeContent { data: diagnostic.into_bytes(), mime_type }
            }
            Self::Remote(url) => HostResponse::Delegate { url },
            Self::NotFound => HostResponse::Error { code: HostErrorCode::NotFound },
            Self::DispatchError { .. } => HostResponse::Error { code: HostErrorCode::DispatchFailed },
            Self::ReadError { .. } | Self::Unsupported { .. } => HostResponse::Error { code: HostErrorCode::Failed },
        }
    }
}
