//! Short URL key derivation.

use std::io::Cursor;

/// Derives the short URL key for a target.
///
/// Computes murmur3 (32-bit, seed 0) over the UTF-8 bytes of `url` and renders
/// the digest as eight lowercase hex characters, least significant byte first.
/// The same target always yields the same key.
pub fn hash_url(url: &str) -> std::io::Result<String> {
    let digest = murmur3::murmur3_32(&mut Cursor::new(url.as_bytes()), 0)?;
    Ok(hex::encode(digest.to_le_bytes()))
}
