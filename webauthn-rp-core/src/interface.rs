//! Types produced by verification that a relying party keeps. [Credential] is
//! serialized into storage, so its shape should stay stable.

use webauthn_rp_proto::cose::*;
use webauthn_rp_proto::options::*;
use webauthn_rp_proto::Base64UrlSafeData;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use openssl::x509;

use crate::attestation::AttestationFormat;

/// The 16 byte model identifier of an authenticator.
/// <https://www.w3.org/TR/webauthn/#aaguid>
pub type Aaguid = [u8; 16];

/// OKP curves, by their COSE crv value.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum EDDSACurve {
    /// Ed25519, crv 6.
    ED25519 = 6,
    /// Ed448, crv 7.
    ED448 = 7,
}

/// EC2 curves, by their COSE crv value.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum ECDSACurve {
    /// NIST P-256 (prime256v1), crv 1.
    SECP256R1 = 1,
    /// NIST P-384, crv 2.
    SECP384R1 = 2,
    /// NIST P-521, crv 3.
    SECP521R1 = 3,
}

/// An elliptic curve public key given by its affine coordinates.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct COSEEC2Key {
    /// Curve.
    pub curve: ECDSACurve,
    /// X coordinate, big endian.
    pub x: Base64UrlSafeData,
    /// Y coordinate, big endian.
    pub y: Base64UrlSafeData,
}

/// An octet key pair public key, used by EdDSA credentials.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct COSEOKPKey {
    /// Curve.
    pub curve: EDDSACurve,
    /// The encoded public key.
    pub x: Base64UrlSafeData,
}

/// An RSA public key.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct COSERSAKey {
    /// Modulus, big endian.
    pub n: Base64UrlSafeData,
    /// Public exponent, big endian.
    pub e: Base64UrlSafeData,
}

/// The key material of a [COSEKey], one variant per COSE kty.
#[allow(non_camel_case_types)]
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum COSEKeyType {
    /// kty 1.
    EC_OKP(COSEOKPKey),
    /// kty 2.
    EC_EC2(COSEEC2Key),
    /// kty 3.
    RSA(COSERSAKey),
}

/// The COSE kty label values.
#[allow(non_camel_case_types)]
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[repr(i64)]
pub enum COSEKeyTypeId {
    /// Octet key pair.
    EC_OKP = 1,
    /// Elliptic curve with x and y.
    EC_EC2 = 2,
    /// RSA.
    EC_RSA = 3,
}

/// A credential public key decoded from COSE, along with the algorithm it
/// signs with.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct COSEKey {
    /// The algorithm this key signs with.
    pub type_: COSEAlgorithm,
    /// Key material.
    pub key: COSEKeyType,
}

/// The raw public key material extracted from a COSE key, in the form a
/// signature primitive consumes it.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum VerificationKey {
    /// An uncompressed elliptic curve point, `0x04 || X || Y`. Keys that only
    /// carry an X coordinate are returned as `0x04 || X`.
    EcPoint(Vec<u8>),
    /// An RSA public key as big endian modulus and exponent.
    Rsa {
        /// Modulus
        n: Vec<u8>,
        /// Exponent
        e: Vec<u8>,
    },
    /// An EdDSA public key.
    Okp(Vec<u8>),
}

/// A registered credential, as persisted by the relying party after a successful
/// registration.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
pub struct Credential {
    /// The credential id.
    pub cred_id: CredentialID,
    /// The credential public key.
    pub cred: COSEKey,
    /// The last signature counter seen.
    pub counter: u32,
    /// The transports this credential reported at registration, if any.
    pub transports: Option<Vec<AuthenticatorTransport>>,
    /// If the user was verified during registration of this credential.
    pub user_verified: bool,
    /// The AAGUID of the authenticator that created this credential.
    pub aaguid: Uuid,
    /// The attestation format that was presented at registration.
    pub attestation_format: AttestationFormat,
}

impl Credential {
    /// Apply the result of a successful authentication to this credential. The counter only
    /// ever moves forward. Returns `Some(true)` if the credential was changed, `Some(false)`
    /// if nothing needed to change, and `None` if the result belongs to another credential.
    pub fn update_credential(&mut self, auth: &VerifiedAuthentication) -> Option<bool> {
        if self.cred_id != auth.credential_id {
            return None;
        }
        if auth.new_counter > self.counter {
            self.counter = auth.new_counter;
            Some(true)
        } else {
            Some(false)
        }
    }

    /// A descriptor for this credential suitable for an exclude or allow list.
    pub fn descriptor(&self) -> PublicKeyCredentialDescriptor {
        PublicKeyCredentialDescriptor {
            type_: crate::constants::CREDENTIAL_TYPE_PUBLIC_KEY.to_string(),
            id: self.cred_id.clone(),
            transports: self.transports.clone(),
        }
    }
}

/// The attestation trust path established at registration.
#[derive(Debug, Clone)]
pub enum ParsedAttestationData {
    /// Signed by a vendor attestation certificate. The chain is leaf first.
    Basic(Vec<x509::X509>),
    /// Self attestation, signed by the credential key itself. This proves
    /// nothing about the authenticator model.
    Self_,
    /// Certified by an anonymization CA, as Apple does. The chain is leaf first.
    AnonCa(Vec<x509::X509>),
    /// No attestation was provided.
    None,
}

impl ParsedAttestationData {
    /// The certificate chain that must be validated against a trust root, if any.
    pub fn chain(&self) -> Option<&[x509::X509]> {
        match self {
            ParsedAttestationData::Basic(chain) | ParsedAttestationData::AnonCa(chain) => {
                Some(chain.as_slice())
            }
            ParsedAttestationData::Self_ | ParsedAttestationData::None => None,
        }
    }
}

/// The outcome of a successful registration ceremony.
#[derive(Debug, Clone)]
pub struct VerifiedRegistration {
    /// The attestation format that was verified.
    pub fmt: AttestationFormat,
    /// The signature counter reported at registration.
    pub counter: u32,
    /// The AAGUID of the authenticator, formatted as a hyphenated uuid.
    pub aaguid: String,
    /// The credential to persist for this user.
    pub credential: Credential,
    /// The credential public key, as the raw COSE bytes the authenticator provided.
    pub credential_public_key: Vec<u8>,
    /// The credential type, which is always `public-key`.
    pub credential_type: String,
    /// If the user was verified by the authenticator.
    pub user_verified: bool,
    /// The raw attestation object.
    pub attestation_object: Vec<u8>,
    /// The attestation that was presented and verified.
    pub attestation: ParsedAttestationData,
}

/// The outcome of a successful authentication ceremony. Nothing is mutated by the
/// verification itself, you should apply this to your stored credential with
/// [Credential::update_credential].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VerifiedAuthentication {
    /// The credential that was used.
    pub credential_id: CredentialID,
    /// The new signature counter value.
    pub new_counter: u32,
    /// If the user was verified by the authenticator.
    pub user_verified: bool,
    /// If the authenticator implements a signature counter. Authenticators that always
    /// report zero offer no clone detection.
    pub counter_supported: bool,
}
