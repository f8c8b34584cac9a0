//! Section payload encoding
//!
//! Payloads are JSON, optionally zstd-compressed. The checksum always
//! covers the uncompressed JSON so a section's identity does not depend on
//! the writer's compression setting.

#![allow(clippy::result_large_err)]

use crate::errors::{codec_error, Result};
use crate::migrations::compute_checksum;
use serde::de::DeserializeOwned;
use serde::Serialize;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Encoding {
    Json,
    JsonZstd,
}

impl Encoding {
    pub fn as_str(&self) -> &'static str {
        match self {
            Encoding::Json => "json",
            Encoding::JsonZstd => "json+zstd",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "json" => Some(Encoding::Json),
            "json+zstd" => Some(Encoding::JsonZstd),
            _ => None,
        }
    }
}

/// A payload ready to be stored
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EncodedPayload {
    pub encoding: Encoding,
    pub checksum: String,
    pub bytes: Vec<u8>,
}

/// Serialize a value; `level` enables compression
pub fn encode<T: Serialize>(path: &str, value: &T, level: Option<i32>) -> Result<EncodedPayload> {
    let json = serde_json::to_vec(value).map_err(|e| codec_error(path, e.to_string()))?;
    let checksum = compute_checksum(&json);
    let (encoding, bytes) = match level {
        Some(level) => (
            Encoding::JsonZstd,
            zstd::encode_all(json.as_slice(), level)
                .map_err(|e| codec_error(path, format!("compression failed: {}", e)))?,
        ),
        None => (Encoding::Json, json),
    };
    Ok(EncodedPayload {
        encoding,
        checksum,
        bytes,
    })
}

/// Recover the JSON bytes of a stored payload
pub fn decode_bytes(path: &str, encoding: Encoding, bytes: &[u8]) -> Result<Vec<u8>> {
    match encoding {
        Encoding::Json => Ok(bytes.to_vec()),
        Encoding::JsonZstd => zstd::decode_all(bytes)
            .map_err(|e| codec_error(path, format!("decompression failed: {}", e))),
    }
}

pub fn decode<T: DeserializeOwned>(path: &str, encoding: Encoding, bytes: &[u8]) -> Result<T> {
    let json = decode_bytes(path, encoding, bytes)?;
    serde_json::from_slice(&json).map_err(|e| codec_error(path, e.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_compression_does_not_change_checksum() {
        let value = vec![[1u32, 3], [5, 9]];
        let plain = encode("apo/1/sequences", &value, None).unwrap();
        let packed = encode("apo/1/sequences", &value, Some(3)).unwrap();

        assert_eq!(plain.encoding, Encoding::Json);
        assert_eq!(packed.encoding, Encoding::JsonZstd);
        assert_eq!(plain.checksum, packed.checksum);

        let back: Vec<[u32; 2]> = decode("apo/1/sequences", packed.encoding, &packed.bytes).unwrap();
        assert_eq!(back, value);
    }

    #[test]
    fn test_corrupt_payload_is_serialization_error() {
        let err = decode::<Vec<u32>>("apo/1/sequences", Encoding::JsonZstd, b"not zstd").unwrap_err();
        assert_eq!(err.code(), "ERR_SERIALIZATION");
        assert_eq!(err.path(), Some("apo/1/sequences"));
    }
}
