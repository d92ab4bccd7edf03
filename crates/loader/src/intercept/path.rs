//! Request URL to filesystem path normalization.
//!
//! Only `file` URLs are interceptable. A `file` URL carrying a real host is a
//! protocol-relative reference (`//cdn.example.com/lib.js`) that the host
//! resolved against a `file:` page; it is handed back as an `https` URL.

use std::path::PathBuf;

use percent_encoding::percent_decode_str;
use url::Url;

/// Result of normalizing a request URL.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Normalized {
    /// A local filesystem path.
    LocalPath(PathBuf),
    /// Not local; the host's network loader should fetch this URL.
    Remote(Url),
    /// The URL cannot be interpreted; the reason is human-readable.
    Unsupported(String),
}

/// Path conventions of the running platform.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Platform {
    /// Absolute paths start with `/`.
    Unix,
    /// Absolute paths start with a drive letter.
    Windows,
}

impl Platform {
    pub const fn current() -> Self {
        if cfg!(windows) { Self::Windows } else { Self::Unix }
    }
}

/// Normalize `request_url` for the running platform.
pub fn normalize(request_url: &str) -> Normalized {
    normalize_for(request_url, Platform::current())
}

/// Normalize `request_url` using `platform`'s path conventions.
pub fn normalize_for(request_url: &str, platform: Platform) -> Normalized {
    let parsed = match Url::parse(request_url) {
        Ok(url) => url,
        Err(e) => return Normalized::Unsupported(format!("unparsable URL: {e}")),
    };

    if parsed.scheme() != "file" {
        return Normalized::Unsupported(format!("scheme `{}` is not interceptable", parsed.scheme()));
    }

    if let Some(host) = parsed.host_str()
        && host.len() > 1
    {
        return rewrite_remote(&parsed);
    }

    let decoded = match percent_decode_str(parsed.path()).decode_utf8() {
        Ok(path) => path,
        Err(e) => return Normalized::Unsupported(format!("path is not valid UTF-8 after decoding: {e}")),
    };

    let path: &str = match platform {
        Platform::Windows => decoded.strip_prefix('/').unwrap_or(&decoded),
        Platform::Unix => &decoded,
    };

    Normalized::LocalPath(PathBuf::from(path))
}

fn rewrite_remote(parsed: &Url) -> Normalized {
    let rest = parsed.as_str().strip_prefix("file:").unwrap_or(parsed.as_str());
    match Url::parse(&format!("https:{rest}")) {
        Ok(url) => Normalized::Remote(url),
        Err(e) => Normalized::Unsupported(format!("cannot rewrite protocol-relative URL: {e}")),
    }
}
