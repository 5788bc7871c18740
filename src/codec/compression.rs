//! Gzip text compression with magic-byte auto-detection, and the on-disk
//! `text` field's two shapes (`"..."` plain or `{"gz": "<b64>"}` compressed).

use std::io::{Read, Write};

use base64::{engine::general_purpose::STANDARD, Engine as _};
use flate2::read::GzDecoder;
use flate2::write::GzEncoder;
use flate2::Compression;
use serde::{Deserialize, Serialize};

/// Text payloads above this length persist gzip-compressed.
pub const COMPRESSION_THRESHOLD_BYTES: usize = 256;

const GZIP_MAGIC: [u8; 2] = [0x1F, 0x8B];

/// The on-disk shape of a volume's `text` field: either a plain string or
/// a `{"gz": "<b64>"}` wrapper around gzip-compressed bytes.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(untagged)]
pub enum TextPayload {
    Plain(String),
    Compressed { gz: String },
}

impl TextPayload {
    /// Choose plain or compressed representation based on length.
    pub fn encode(text: &str) -> std::io::Result<TextPayload> {
        if text.len() <= COMPRESSION_THRESHOLD_BYTES {
            return Ok(TextPayload::Plain(text.to_string()));
        }
        let compressed = compress_text(text)?;
        Ok(TextPayload::Compressed {
            gz: STANDARD.encode(compressed),
        })
    }

    /// Recover the original text regardless of representation.
    pub fn decode(&self) -> std::io::Result<String> {
        match self {
            TextPayload::Plain(s) => Ok(s.clone()),
            TextPayload::Compressed { gz } => {
                let bytes = STANDARD
                    .decode(gz)
                    .map_err(|e| std::io::Error::new(std::io::ErrorKind::InvalidData, e))?;
                decompress_bytes(&bytes)
            }
        }
    }
}

/// Gzip-compress a string, returning raw bytes (not base64).
pub fn compress_text(text: &str) -> std::io::Result<Vec<u8>> {
    let mut encoder = GzEncoder::new(Vec::new(), Compression::default());
    encoder.write_all(text.as_bytes())?;
    encoder.finish()
}

/// Detect gzip magic bytes (0x1F 0x8B) and decompress if present; otherwise
/// interpret the bytes as UTF-8 plain text.
pub fn decompress_text(bytes: &[u8]) -> std::io::Result<String> {
    if is_gzip(bytes) {
        decompress_bytes(bytes)
    } else {
        String::from_utf8(bytes.to_vec())
            .map_err(|e| std::io::Error::new(std::io::ErrorKind::InvalidData, e))
    }
}

fn decompress_bytes(bytes: &[u8]) -> std::io::Result<String> {
    let mut decoder = GzDecoder::new(bytes);
    let mut out = String::new();
    decoder.read_to_string(&mut out)?;
    Ok(out)
}

/// Whether `bytes` begins with the gzip magic sequence (0x1F 0x8B).
pub fn is_gzip(bytes: &[u8]) -> bool {
    bytes.len() >= 2 && bytes[0] == GZIP_MAGIC[0] && bytes[1] == GZIP_MAGIC[1]
}
