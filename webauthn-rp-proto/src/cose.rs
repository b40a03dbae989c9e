//! COSE algorithm identifiers, as registered with IANA.
//! <https://www.iana.org/assignments/cose/cose.xhtml#algorithms>

use serde::{Deserialize, Serialize};

/// A COSE signature algorithm, indicating the type of key and hash type
/// that should be used. You shouldn't need to alter or use this value.
#[allow(non_camel_case_types)]
#[derive(Debug, Serialize, Clone, Copy, Deserialize, PartialEq, Eq, Hash)]
#[serde(try_from = "i64", into = "i64")]
#[repr(i32)]
pub enum COSEAlgorithm {
    /// Identifies this key as ECDSA (recommended SECP256R1) with SHA256 hashing
    ES256 = -7,
    /// Identifies this key as ECDSA (recommended SECP384R1) with SHA384 hashing
    ES384 = -35,
    /// Identifies this key as ECDSA (recommended SECP521R1) with SHA512 hashing
    ES512 = -36,
    /// Identifies this key as RS256 aka RSASSA-PKCS1-v1_5 w/ SHA-256
    RS256 = -257,
    /// Identifies this key as RS384 aka RSASSA-PKCS1-v1_5 w/ SHA-384
    RS384 = -258,
    /// Identifies this key as RS512 aka RSASSA-PKCS1-v1_5 w/ SHA-512
    RS512 = -259,
    /// Identifies this key as PS256 aka RSASSA-PSS w/ SHA-256
    PS256 = -37,
    /// Identifies this key as PS384 aka RSASSA-PSS w/ SHA-384
    PS384 = -38,
    /// Identifies this key as PS512 aka RSASSA-PSS w/ SHA-512
    PS512 = -39,
    /// Identifies this as an EdDSA key (Ed25519 / Ed448)
    EDDSA = -8,
    /// Identifies this as RS1 aka RSASSA-PKCS1-v1_5 w/ SHA-1. This is insecure
    /// and only exists for legacy TPM and Windows Hello authenticators.
    INSECURE_RS1 = -65535,
}

impl COSEAlgorithm {
    /// The set of algorithms offered when the caller doesn't choose one. This is
    /// every known algorithm except the insecure SHA-1 variant.
    pub fn all_possible_algs() -> Vec<Self> {
        vec![
            COSEAlgorithm::ES256,
            COSEAlgorithm::EDDSA,
            COSEAlgorithm::ES384,
            COSEAlgorithm::ES512,
            COSEAlgorithm::PS256,
            COSEAlgorithm::PS384,
            COSEAlgorithm::PS512,
            COSEAlgorithm::RS256,
            COSEAlgorithm::RS384,
            COSEAlgorithm::RS512,
        ]
    }

    /// Only the algorithms that nearly every authenticator supports, ES256 and RS256.
    pub fn secure_algs() -> Vec<Self> {
        vec![COSEAlgorithm::ES256, COSEAlgorithm::RS256]
    }
}

impl TryFrom<i128> for COSEAlgorithm {
    type Error = ();

    fn try_from(i: i128) -> Result<Self, Self::Error> {
        match i {
            -7 => Ok(COSEAlgorithm::ES256),
            -35 => Ok(COSEAlgorithm::ES384),
            -36 => Ok(COSEAlgorithm::ES512),
            -257 => Ok(COSEAlgorithm::RS256),
            -258 => Ok(COSEAlgorithm::RS384),
            -259 => Ok(COSEAlgorithm::RS512),
            -37 => Ok(COSEAlgorithm::PS256),
            -38 => Ok(COSEAlgorithm::PS384),
            -39 => Ok(COSEAlgorithm::PS512),
            -8 => Ok(COSEAlgorithm::EDDSA),
            -65535 => Ok(COSEAlgorithm::INSECURE_RS1),
            _ => Err(()),
        }
    }
}

impl TryFrom<i64> for COSEAlgorithm {
    type Error = String;

    fn try_from(i: i64) -> Result<Self, Self::Error> {
        COSEAlgorithm::try_from(i as i128).map_err(|_| format!("unknown COSE algorithm {i}"))
    }
}

impl From<COSEAlgorithm> for i64 {
    fn from(c: COSEAlgorithm) -> Self {
        c as i64
    }
}
