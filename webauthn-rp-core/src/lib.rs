//! Webauthn-rp-core - the relying party side of Webauthn
//!
//! Webauthn is a standard allowing communication between servers, browsers and authenticators
//! to allow strong, passwordless, cryptographic authentication to be performed. This crate
//! issues the challenges for registration and authentication, and verifies the signed
//! responses that authenticators produce.
//!
//! Most applications will want [WebauthnBuilder] to configure a [WebauthnCore]. The ceremony
//! functions such as [verify_registration_response] are available directly for applications
//! that need control over every parameter. Neither stores any state: persisting challenges
//! and credentials is the responsibility of the caller.

#![warn(unused_extern_crates)]
#![warn(missing_docs)]
#![deny(clippy::todo)]
#![deny(clippy::unimplemented)]
#![deny(clippy::unwrap_used)]
// #![deny(clippy::expect_used)]
#![deny(clippy::panic)]
#![deny(clippy::unreachable)]
#![deny(clippy::await_holding_lock)]
#![deny(clippy::needless_pass_by_value)]
#![deny(clippy::trivially_copy_pass_by_ref)]

#[macro_use]
extern crate tracing;

#[macro_use]
mod macros;

mod constants;

pub mod attestation;
mod crypto;

pub mod core;
pub mod error;

pub mod interface;
mod internals;
pub mod settings;

/// Protocol bindings
pub mod proto {
    pub use crate::interface::*;
    pub use webauthn_rp_proto::*;
}

pub use attestation::{verify_attestation_ca_chain, AttestationFormat, AttestationStatement};
pub use crypto::{compute_sha256, cose_to_verification_key};
pub use internals::{decode_cbor_first, decode_client_data, format_aaguid};
pub use settings::{MetadataService, MetadataStatement, RootCertificate, SettingsService};

pub use crate::core::*;
