//! Wire types for a Webauthn relying party. Everything here is the JSON exchanged
//! with the browser, with binary fields carried as base64url.

#![warn(unused_extern_crates)]
#![warn(missing_docs)]
#![deny(clippy::todo)]
#![deny(clippy::unimplemented)]
#![deny(clippy::unwrap_used)]
#![deny(clippy::panic)]
#![deny(clippy::unreachable)]

pub mod attest;
pub mod auth;
pub mod cose;
pub mod extensions;
pub mod options;

#[cfg(test)]
mod tests;

pub use attest::*;
pub use auth::*;
pub use base64urlsafedata::Base64UrlSafeData;
pub use cose::*;
pub use extensions::*;
pub use options::*;
