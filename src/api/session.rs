//! Session token generation.

use rand::Rng;

/// Cookie name the sites' anti-bot gate expects.
pub const SESSION_COOKIE: &str = "__ddg2";

/// Number of random bytes in a session token.
const TOKEN_BYTES: usize = 16;

/// Generate a fresh random session token as lowercase hex.
///
/// The value carries no meaning; it only has to look like a browser-issued
/// token. A new one is minted for every run.
pub fn generate_session_token() -> String {
    let mut bytes = [0u8; TOKEN_BYTES];
    rand::thread_rng().fill(&mut bytes);
    bytes.iter().map(|b| format!("{:02x}", b)).collect()
}
