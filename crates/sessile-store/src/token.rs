//! Session identifier generation.
//!
//! The registry stores whatever id it is handed, so resistance to session
//! fixation and guessing rests entirely on these ids being unpredictable.

use base64::{Engine, engine::general_purpose::URL_SAFE_NO_PAD};
use rand::RngCore;

/// Default number of random bytes in a session id.
pub const DEFAULT_TOKEN_BYTES: usize = 64;

/// Generate a session id from [`DEFAULT_TOKEN_BYTES`] random bytes.
pub fn generate_session_id() -> String {
    generate_session_id_with_len(DEFAULT_TOKEN_BYTES)
}

/// Generate a session id from `len` bytes of OS-seeded CSPRNG output,
/// encoded as URL-safe base64 without padding.
pub fn generate_session_id_with_len(len: usize) -> String {
    let mut bytes = vec![0u8; len];
    rand::rng().fill_bytes(&mut bytes);
    URL_SAFE_NO_PAD.encode(bytes)
}
