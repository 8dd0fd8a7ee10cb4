//! Lowercase hex encoding for keys, signatures and digests.

use dtrust_core::CryptoError;

/// Encode bytes as lowercase hex.
pub fn encode(bytes: &[u8]) -> String {
    bytes.iter().map(|b| format!("{b:02x}")).collect()
}

/// Decode a hex string. Surrounding whitespace is ignored and either case
/// is accepted.
pub fn decode(hex: &str) -> Result<Vec<u8>, CryptoError> {
    let hex = hex.trim();
    if hex.len() % 2 != 0 {
        return Err(CryptoError::Encoding(
            "hex string must have even length".to_string(),
        ));
    }
    (0..hex.len())
        .step_by(2)
        .map(|i| {
            hex.get(i..i + 2)
                .and_then(|pair| u8::from_str_radix(pair, 16).ok())
                .ok_or_else(|| CryptoError::Encoding(format!("invalid hex at position {i}")))
        })
        .collect()
}

/// Decode a hex string into a fixed-size array.
pub fn decode_array<const N: usize>(hex: &str) -> Result<[u8; N], CryptoError> {
    let bytes = decode(hex)?;
    bytes.try_into().map_err(|v: Vec<u8>| {
        CryptoError::Encoding(format!("expected {N} bytes, got {}", v.len()))
    })
}

pub(crate) fn prefix(bytes: &[u8]) -> String {
    encode(&bytes[..bytes.len().min(4)])
}
