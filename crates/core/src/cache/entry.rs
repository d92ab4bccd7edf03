//! On-disk cache entry format.
//!
//! Layout: 4-byte little-endian header length, a JSON header, then the raw
//! output bytes. The header records the full cache key, the output mime type,
//! the write timestamp and a checksum of the payload.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

use super::key::{CacheKey, Fingerprint};

/// Magic marker identifying an onload cache entry.
const ENTRY_MAGIC: &str = "ONLOAD";

/// Current entry format version. Increment on breaking changes to the layout.
pub const ENTRY_FORMAT_VERSION: u32 = 1;

/// Transformed output as stored in and served from the cache.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CachedOutput {
    pub bytes: Vec<u8>,
    pub mime_type: String,
}

impl CachedOutput {
    pub fn new(bytes: impl Into<Vec<u8>>, mime_type: impl Into<String>) -> Self {
        Self { bytes: bytes.into(), mime_type: mime_type.into() }
    }
}

/// A decoded cache entry.
#[derive(Debug, Clone)]
pub struct CacheEntry {
    pub key: CacheKey,
    pub output: CachedOutput,
    pub written_at: DateTime<Utc>,
}

#[derive(Debug, Serialize, Deserialize)]
struct EntryHeader {
    magic: String,
    format_version: u32,
    transform: String,
    path: String,
    fingerprint: Fingerprint,
    mime_type: String,
    written_at: DateTime<Utc>,
    checksum: String,
}

fn checksum(payload: &[u8]) -> String {
    hex::encode(Sha256::digest(payload))
}

/// Encode an entry for `key` holding `output`.
pub(crate) fn encode(key: &CacheKey, output: &CachedOutput, written_at: DateTime<Utc>) -> serde_json::Result<Vec<u8>> {
    let header = EntryHeader {
        magic: ENTRY_MAGIC.into(),
        format_version: ENTRY_FORMAT_VERSION,
        transform: key.transform.clone(),
        path: key.path.to_string_lossy().into_owned(),
        fingerprint: key.fingerprint.clone(),
        mime_type: output.mime_type.clone(),
        written_at,
        checksum: checksum(&output.bytes),
    };
    let header_bytes = serde_json::to_vec(&header)?;

    let header_len = header_bytes.len() as u32;
    let mut raw = Vec::with_capacity(4 + header_bytes.len() + output.bytes.len());
    raw.extend_from_slice(&header_len.to_le_bytes());
    raw.extend_from_slice(&header_bytes);
    raw.extend_from_slice(&output.bytes);
    Ok(raw)
}

/// Decode `raw` as the entry for `key`.
///
/// Returns `None` if the data is truncated, the header is malformed or from
/// another format version, the entry was written for a different key, or the
/// payload checksum does not verify.
pub(crate) fn decode(raw: &[u8], key: &CacheKey) -> Option<CacheEntry> {
    let len_bytes: [u8; 4] = raw.get(..4)?.try_into().ok()?;
    let header_len = u32::from_le_bytes(len_bytes) as usize;
    let header_end = 4usize.checked_add(header_len)?;
    let header: EntryHeader = serde_json::from_slice(raw.get(4..header_end)?).ok()?;

    if header.magic != ENTRY_MAGIC || header.format_version != ENTRY_FORMAT_VERSION {
        return None;
    }

    if header.transform != key.transform
        || header.path != key.path.to_string_lossy()
        || header.fingerprint != key.fingerprint
    {
        return None;
    }

    let payload = &raw[header_end..];
    if checksum(payload) != header.checksum {
        return None;
    }

    Some(CacheEntry {
        key: key.clone(),
        output: CachedOutput { bytes: payload.to_vec(), mime_type: header.mime_type },
        written_at: header.written_at,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn key(source: &[u8]) -> CacheKey {
        CacheKey::new("coffeescript", "/project/app.coffee", source)
    }

    fn output() -> CachedOutput {
        CachedOutput::new("var x = 1;\n", "application/javascript")
    }

    #[test]
    fn test_decode_encoded_entry() {
        let k = key(b"x = 1");
        let now = Utc::now();
        let raw = encode(&k, &output(), now).unwrap();

        let entry = decode(&raw, &k).unwrap();
        assert_eq!(entry.output, output());
        assert_eq!(entry.written_at, now);
        assert_eq!(entry.key, k);
    }

    #[test]
    fn test_decode_other_fingerprint_is_none() {
        let raw = encode(&key(b"x = 1"), &output(), Utc::now()).unwrap();
        assert!(decode(&raw, &key(b"x = 2")).is_none());
    }

    #[test]
    fn test_decode_other_transform_is_none() {
        let k = key(b"x = 1");
        let raw = encode(&k, &output(), Utc::now()).unwrap();
        let other = CacheKey { transform: "typescript".into(), ..k };
        assert!(decode(&raw, &other).is_none());
    }

    #[test]
    fn test_decode_truncated_is_none() {
        let k = key(b"x = 1");
        assert!(decode(b"", &k).is_none());
        assert!(decode(b"AB", &k).is_none());

        let raw = encode(&k, &output(), Utc::now()).unwrap();
        assert!(decode(&raw[..10], &k).is_none());
    }

    #[test]
    fn test_decode_huge_header_length_is_none() {
        let k = key(b"x = 1");
        let mut raw = u32::MAX.to_le_bytes().to_vec();
        raw.extend_from_slice(b"{}");
        assert!(decode(&raw, &k).is_none());
    }

    #[test]
    fn test_decode_tampered_payload_is_none() {
        let k = key(b"x = 1");
        let mut raw = encode(&k, &output(), Utc::now()).unwrap();
        let last = raw.len() - 1;
        raw[last] ^= 0xff;
        assert!(decode(&raw, &k).is_none());
    }

    #[test]
    fn test_decode_wrong_version_is_none() {
        let k = key(b"x = 1");
        let header = EntryHeader {
            magic: ENTRY_MAGIC.into(),
            format_version: 999,
            transform: k.transform.clone(),
            path: k.path.to_string_lossy().into_owned(),
            fingerprint: k.fingerprint.clone(),
            mime_type: "application/javascript".into(),
            written_at: Utc::now(),
            checksum: checksum(b"data"),
        };
        let header_bytes = serde_json::to_vec(&header).unwrap();
        let mut raw = (header_bytes.len() as u32).to_le_bytes().to_vec();
        raw.extend_from_slice(&header_bytes);
        raw.extend_from_slice(b"data");
        assert!(decode(&raw, &k).is_none());
    }

    #[test]
    fn test_empty_payload() {
        let k = key(b"");
        let empty = CachedOutput::new(Vec::new(), "text/css");
        let raw = encode(&k, &empty, Utc::now()).unwrap();
        assert_eq!(decode(&raw, &k).unwrap().output, empty);
    }
}
