//! Double-submit CSRF tokens.
//!
//! The token is unrelated to the session token. It is handed to the client as
//! a script-readable cookie and must come back verbatim in the `X-CSRF-Token`
//! header; a cross-origin page can trigger the request but cannot read the
//! cookie to fill in the header.

use base64::{engine::general_purpose::URL_SAFE_NO_PAD, Engine as _};
use rand::{rngs::OsRng, RngCore};

/// Random bytes per token (256 bits).
pub const CSRF_TOKEN_BYTES: usize = 32;

#[derive(Debug, thiserror::Error)]
pub enum CsrfError {
    #[error("entropy source unavailable: {0}")]
    Entropy(#[from] rand::Error),
}

pub fn generate() -> Result<String, CsrfError> {
    let mut bytes = [0u8; CSRF_TOKEN_BYTES];
    OsRng.try_fill_bytes(&mut bytes)?;
    Ok(URL_SAFE_NO_PAD.encode(bytes))
}

/// True iff both values are present and identical. The comparison does not
/// short-circuit on the first differing byte.
pub fn verify(header_value: &str, cookie_value: &str) -> bool {
    if header_value.is_empty() || cookie_value.is_empty() {
        return false;
    }

    let (a, b) = (header_value.as_bytes(), cookie_value.as_bytes());
    if a.len() != b.len() {
        return false;
    }

    a.iter().zip(b).fold(0u8, |acc, (x, y)| acc | (x ^ y)) == 0
}
