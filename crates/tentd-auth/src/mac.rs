//! HMAC-SHA256 signature computation and verification.
//!
//! The signature is `Base64(HMAC-SHA256(secret, canonical_string))`, where the
//! secret is used as raw key bytes exactly as issued to the client.

use base64::Engine;
use base64::engine::general_purpose::STANDARD as BASE64;
use hmac::{Hmac, KeyInit, Mac};
use sha2::Sha256;
use subtle::ConstantTimeEq;

type HmacSha256 = Hmac<Sha256>;

/// Algorithm name advertised to clients when a keypair is issued.
pub const MAC_ALGORITHM: &str = "hmac-sha-256";

/// Compute the raw HMAC-SHA256 of `canonical` under `secret`.
#[must_use]
pub fn compute_mac(secret: &[u8], canonical: &str) -> Vec<u8> {
    let mut mac = HmacSha256::new_from_slice(secret).expect("HMAC can accept any key length");
    mac.update(canonical.as_bytes());
    mac.finalize().into_bytes().to_vec()
}

/// Check `supplied` against the expected MAC in constant time.
///
/// A mismatch, including a length mismatch, is an ordinary `false`.
///
/// # Examples
///
/// ```
/// use tentd_auth::mac::{compute_mac, verify_mac};
///
/// let sig = compute_mac(b"secret", "canonical");
/// assert!(verify_mac(b"secret", "canonical", &sig));
/// assert!(!verify_mac(b"other", "canonical", &sig));
/// ```
#[must_use]
pub fn verify_mac(secret: &[u8], canonical: &str, supplied: &[u8]) -> bool {
    let expected = compute_mac(secret, canonical);
    expected.as_slice().ct_eq(supplied).into()
}

/// Encode a raw MAC into its wire representation.
#[must_use]
pub fn encode_mac(raw: &[u8]) -> String {
    BASE64.encode(raw)
}

/// Decode a wire MAC into raw bytes.
///
/// Surrounding whitespace is ignored; some clients append a newline after the
/// base64 text. Returns `None` for anything that is not valid base64.
#[must_use]
pub fn decode_mac(encoded: &str) -> Option<Vec<u8>> {
    BASE64.decode(encoded.trim()).ok()
}
