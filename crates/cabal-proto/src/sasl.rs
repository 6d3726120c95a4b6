//! SASL PLAIN support (RFC 4616) for `AUTHENTICATE`.

use base64::{engine::general_purpose::STANDARD as BASE64, Engine as _};

/// `AUTHENTICATE` payloads are split into chunks of this many bytes.
pub const SASL_CHUNK_SIZE: usize = 400;

/// Encode `authzid NUL authcid NUL password` with an empty authzid.
pub fn encode_plain(account: &str, password: &str) -> String {
    let payload = format!("\0{}\0{}", account, password);
    BASE64.encode(payload.as_bytes())
}

/// Split an encoded payload into `AUTHENTICATE` arguments.
///
/// A payload that is an exact multiple of the chunk size is terminated
/// with a lone `+`, as is an empty one.
pub fn chunk_payload(encoded: &str) -> Vec<String> {
    let mut chunks: Vec<String> = encoded
        .as_bytes()
        .chunks(SASL_CHUNK_SIZE)
        .map(|c| String::from_utf8_lossy(c).into_owned())
        .collect();

    if encoded.len() % SASL_CHUNK_SIZE == 0 {
        chunks.push("+".to_owned());
    }
    chunks
}
