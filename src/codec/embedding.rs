//! Embedding wire encoding: base64 of contiguous little-endian Float32
//! bytes, rather than a JSON number array. 1536 dimensions ~= 8 KB.

use base64::{engine::general_purpose::STANDARD, Engine as _};

/// Encode a vector of f32 as base64 of its little-endian byte
/// representation.
pub fn encode_embedding(values: &[f32]) -> String {
    let mut bytes = Vec::with_capacity(values.len() * 4);
    for v in values {
        bytes.extend_from_slice(&v.to_le_bytes());
    }
    STANDARD.encode(bytes)
}

/// Decode a base64 little-endian Float32 string back into a vector.
/// Returns `None` if the decoded byte length is not a multiple of 4.
pub fn decode_embedding(encoded: &str) -> Option<Vec<f32>> {
    let bytes = STANDARD.decode(encoded).ok()?;
    if bytes.len() % 4 != 0 {
        return None;
    }
    let mut values = Vec::with_capacity(bytes.len() / 4);
    for chunk in bytes.chunks_exact(4) {
        let arr: [u8; 4] = chunk.try_into().expect("chunks_exact(4) yields 4 bytes");
        values.push(f32::from_le_bytes(arr));
    }
    Some(values)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn round_trip_preserves_values_within_f32_precision() {
        let original = vec![0.9_f32, -0.1, 0.0, 123.456, f32::MIN, f32::MAX];
        let encoded = encode_embedding(&original);
        let decoded = decode_embedding(&encoded).expect("valid encoding");
        assert_eq!(original, decoded);
    }

    #[test]
    fn empty_vector_round_trips() {
        let encoded = encode_embedding(&[]);
        assert_eq!(decode_embedding(&encoded), Some(vec![]));
    }

    #[test]
    fn malformed_base64_length_is_rejected() {
        // "AAA" decodes to 2 bytes, not a multiple of 4.
        assert_eq!(decode_embedding("AAA="), None);
    }
}
