//! Preservation codec: Float32 <-> base64 embedding encoding, gzip text
//! compression, and format detection.

pub mod compression;
pub mod embedding;

pub use compression::{compress_text, decompress_text, is_gzip, TextPayload};
pub use embedding::{decode_embedding, encode_embedding};
