//! Small helpers for token handling and input normalization.

use anyhow::{Context, Result};
use base64::Engine;
use rand::{rngs::OsRng, RngCore};
use regex::Regex;
use sha2::{Digest, Sha256};

/// Normalize a username for lookup/uniqueness checks.
pub(crate) fn normalize_username(username: &str) -> String {
    username.trim().to_lowercase()
}

/// Usernames are printable, whitespace free, and at most 254 characters (an email fits).
pub(crate) fn valid_username(username_normalized: &str) -> bool {
    Regex::new(r"^[^\s]{1,254}$").is_ok_and(|regex| regex.is_match(username_normalized))
}

/// Create a new random token (session cookie or OAuth `state`).
///
/// The raw value is only ever handed to the client.
pub(crate) fn generate_token() -> Result<String> {
    let mut bytes = [0u8; 32];
    OsRng
        .try_fill_bytes(&mut bytes)
        .context("failed to generate token")?;
    Ok(base64::engine::general_purpose::URL_SAFE_NO_PAD.encode(bytes))
}

/// Hash a session token so raw values never touch the store.
pub(crate) fn hash_session_token(token: &str) -> Vec<u8> {
    let mut hasher = Sha256::new();
    hasher.update(token.as_bytes());
    hasher.finalize().to_vec()
}
