//! # Secrets
//!
//! A small web app where every account may publish one anonymous secret.
//! All published secrets are listed together on `/secrets`, with no author
//! attached.
//!
//! ## Accounts
//!
//! An account is reachable through a local username and password, through a
//! federated (Google) identity, or both. Passwords are stored as Argon2 PHC
//! strings; the plaintext is never persisted nor logged.
//!
//! ## Sessions
//!
//! A successful login issues a random opaque token in an `HttpOnly` cookie.
//! Only the SHA-256 of the token is stored, so a leaked sessions table cannot
//! be replayed. Login failures are reported the same way whether the user is
//! unknown or the password is wrong.

pub mod api;
pub mod auth;
pub mod cli;
pub mod store;

#[allow(clippy::doc_markdown, clippy::needless_raw_string_hashes)]
pub mod built_info {
    include!(concat!(env!("OUT_DIR"), "/built.rs"));
}

pub const GIT_COMMIT_HASH: &str = match built_info::GIT_COMMIT_HASH {
    Some(hash) => hash,
    None => "unknown",
};

pub const APP_USER_AGENT: &str = concat!(env!("CARGO_PKG_NAME"), "/", env!("CARGO_PKG_VERSION"),);
