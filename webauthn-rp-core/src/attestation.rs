//! Attestation information and verifications procedures.
//!
//! The attestation statement is decoded into an [AttestationStatement] variant per format,
//! then verified by the matching procedure. Any certificate chain is finally validated
//! against the roots held by the [SettingsService].

use std::convert::TryFrom;
use std::fmt;
use std::str::FromStr;
use std::sync::Arc;
use std::time::{SystemTime, UNIX_EPOCH};

use openssl::stack;
use openssl::x509;
use openssl::x509::store;
use openssl::x509::verify;
use serde::{Deserialize, Serialize};
use serde_cbor_2::Value;
use uuid::Uuid;
use webauthn_rp_proto::{Base64UrlSafeData, COSEAlgorithm};
use x509_parser::oid_registry::Oid;

use crate::constants::{APPLE_NONCE_PREFIX, SAFETYNET_CLOCK_SKEW_MS, SAFETYNET_HOSTNAME};
use crate::crypto::{assert_packed_attest_req, compute_sha256, verify_signature};
use crate::error::{WebauthnError, WebauthnResult};
use crate::interface::*;
use crate::internals::{AttestedCredentialData, AuthenticatorData};
use crate::settings::SettingsService;

/// x509 certificate extensions are validated in the webauthn spec by checking
/// that the value of the extension is equal to some other value
pub(crate) trait AttestationX509Extension {
    /// the type of the value in the certificate extension
    type Output: Eq;

    /// the oid of the extension
    const OID: Oid<'static>;

    /// how to parse the value out of the certificate extension
    fn parse(i: &[u8]) -> der_parser::error::BerResult<Self::Output>;

    /// if `true`, then validating this certificate fails if this extension is
    /// missing
    const IS_REQUIRED: bool;

    /// what error to return if validation fails---i.e. if the "other value" is
    /// not equal to that in the extension
    const VALIDATION_ERROR: WebauthnError;
}

pub(crate) struct FidoGenCeAaguid;
pub(crate) struct AppleAnonymousNonce;
pub(crate) struct AndroidKeyAttestationExtensionData;

impl AttestationX509Extension for FidoGenCeAaguid {
    // If cert contains an extension with OID 1 3 6 1 4 1 45724 1 1 4 (id-fido-gen-ce-aaguid)
    const OID: Oid<'static> = der_parser::oid!(1.3.6 .1 .4 .1 .45724 .1 .1 .4);

    // verify that the value of this extension matches the aaguid in authenticatorData.
    type Output = Aaguid;

    fn parse(i: &[u8]) -> der_parser::error::BerResult<Self::Output> {
        let (rem, aaguid) = der_parser::der::parse_der_octetstring(i)?;
        let aaguid: Aaguid = aaguid
            .as_slice()?
            .try_into()
            .map_err(|_| nom::Err::Error(der_parser::error::BerError::InvalidLength))?;

        Ok((rem, aaguid))
    }

    const IS_REQUIRED: bool = false;

    const VALIDATION_ERROR: WebauthnError = WebauthnError::AttestationCertificateAAGUIDMismatch;
}

impl AttestationX509Extension for AppleAnonymousNonce {
    type Output = [u8; 32];

    // Verify that nonce equals the value of the extension with OID ( 1.2.840.113635.100.8.2 ) in credCert.
    const OID: Oid<'static> = der_parser::oid!(1.2.840 .113635 .100 .8 .2);

    fn parse(i: &[u8]) -> der_parser::error::BerResult<Self::Output> {
        // SEQUENCE { [1] { OCTET STRING } }, with a 32 byte nonce.
        let nonce = i
            .strip_prefix(&APPLE_NONCE_PREFIX)
            .ok_or(nom::Err::Error(der_parser::error::BerError::BerTypeError))?;

        let nonce: [u8; 32] = nonce
            .try_into()
            .map_err(|_| nom::Err::Error(der_parser::error::BerError::InvalidLength))?;

        Ok((&[], nonce))
    }

    const IS_REQUIRED: bool = true;

    const VALIDATION_ERROR: WebauthnError = WebauthnError::AttestationCertificateNonceMismatch;
}

pub(crate) mod android_key_attestation {
    use der_parser::ber::BerObjectContent;

    #[derive(Clone, PartialEq, Eq, Copy)]
    pub struct AuthorizationList {
        pub all_applications: bool,
        pub origin: Option<u32>,
        pub purpose: Option<u32>,
    }

    pub const KM_ORIGIN_GENERATED: u32 = 0;
    pub const KM_PURPOSE_SIGN: u32 = 2;

    impl AuthorizationList {
        pub fn parse(i: &[u8]) -> der_parser::error::BerResult<Self> {
            use der_parser::{der::*, error::BerError};
            parse_der_container(|i: &[u8], hdr: Header| {
                if hdr.tag() != Tag::Sequence {
                    return Err(nom::Err::Error(BerError::BerTypeError));
                }

                let mut all_applications = false;
                let mut origin = None;
                let mut purpose = None;

                let mut i = i;
                while let Ok((k, obj)) = parse_der(i) {
                    i = k;
                    if obj.content == BerObjectContent::Optional(None) {
                        continue;
                    }

                    match obj.tag() {
                        Tag(600) => {
                            all_applications = true;
                        }
                        Tag(702) => {
                            if let BerObjectContent::Unknown(o) = obj.content {
                                let (_, val) = parse_der_integer(o.data)?;
                                origin = Some(val.as_u32()?);
                            }
                        }
                        Tag(1) => {
                            if let BerObjectContent::Unknown(o) = obj.content {
                                let (_, val) =
                                    parse_der_container(|i, _| parse_der_integer(i))(o.data)?;
                                purpose = Some(val.as_u32()?);
                            }
                        }
                        _ => continue,
                    };
                }

                Ok((
                    i,
                    AuthorizationList {
                        all_applications,
                        origin,
                        purpose,
                    },
                ))
            })(i)
        }

        // Either both keymaster values are absent, or the key was generated for signing.
        fn keymaster_set(&self, list: &str) -> Result<bool, der_parser::error::BerError> {
            match (self.origin, self.purpose) {
                (Some(KM_ORIGIN_GENERATED), Some(KM_PURPOSE_SIGN)) => Ok(true),
                (None, None) => Ok(false),
                _ => Err(der_parser::error::BerError::InvalidValue {
                    tag: der_parser::der::Tag(701),
                    msg: format!("invalid key master values ({list})"),
                }),
            }
        }
    }

    /// Parse the key description, returning the attestation challenge it carries.
    pub fn parse_key_description(i: &[u8]) -> der_parser::error::BerResult<Vec<u8>> {
        use der_parser::{der::*, error::BerError};
        parse_der_container(|i: &[u8], hdr: Header| {
            if hdr.tag() != Tag::Sequence {
                return Err(nom::Err::Error(BerError::BerTypeError));
            }
            let (i, _attestation_version) = parse_der_integer(i)?;

            let (i, attest_sec_level) = parse_der_enum(i)?;
            let (i, _km_version) = parse_der_integer(i)?;
            let (i, km_sec_level) = parse_der_enum(i)?;

            // Software, TrustedEnvironment or StrongBox.
            if attest_sec_level.as_u32()? > 2 || km_sec_level.as_u32()? > 2 {
                return Err(BerError::InvalidTag)?;
            }

            let (i, attestation_challenge) = parse_der_octetstring(i)?;
            let attestation_challenge = attestation_challenge.as_slice()?.to_vec();

            let (i, _unique_id) = parse_der_octetstring(i)?;

            let (i, software_enforced) = AuthorizationList::parse(i)?;
            let (i, tee_enforced) = AuthorizationList::parse(i)?;

            // The key must be scoped to the RP ID, never to all applications.
            if software_enforced.all_applications || tee_enforced.all_applications {
                return Err(BerError::InvalidValue {
                    tag: Tag(600),
                    msg: "all_applications must not be set".to_string(),
                })?;
            }

            let software_set = software_enforced.keymaster_set("software")?;
            let tee_set = tee_enforced.keymaster_set("tee")?;

            if !tee_set && !software_set {
                return Err(BerError::InvalidValue {
                    tag: Tag(701),
                    msg: "both software and tee not set (keymaster values)".to_string(),
                })?;
            }

            Ok((i, attestation_challenge))
        })(i)
    }
}

impl AttestationX509Extension for AndroidKeyAttestationExtensionData {
    // If cert contains an extension with OID 1.3.6.1.4.1.11129.2.1.17 (android key attestation)
    const OID: Oid<'static> = der_parser::oid!(1.3.6 .1 .4 .1 .11129 .2 .1 .17);

    // verify that the attestation challenge of this extension matches the client data hash.
    type Output = Vec<u8>;

    fn parse(i: &[u8]) -> der_parser::error::BerResult<Self::Output> {
        android_key_attestation::parse_key_description(i)
    }

    const IS_REQUIRED: bool = true;

    const VALIDATION_ERROR: WebauthnError = WebauthnError::AttestationCertificateNonceMismatch;
}

/// Validate an x509 extension is present in an x509 certificate
pub(crate) fn validate_extension<T>(
    x509: &x509::X509,
    data: &<T as AttestationX509Extension>::Output,
) -> WebauthnResult<()>
where
    T: AttestationX509Extension,
{
    let der_bytes = x509.to_der()?;
    x509_parser::parse_x509_certificate(&der_bytes)
        .map_err(|_| WebauthnError::AttestationStatementX5CInvalid)?
        .1
        .extensions()
        .iter()
        .find_map(|extension| {
            (extension.oid == T::OID).then(|| {
                T::parse(extension.value)
                    .map_err(|e| {
                        debug!(?e, oid = %T::OID, "unable to parse certificate extension");
                        match e {
                            nom::Err::Failure(der_parser::error::BerError::InvalidValue {
                                ..
                            })
                            | nom::Err::Error(der_parser::error::BerError::InvalidValue {
                                ..
                            }) => WebauthnError::AttestationAndroidKeyNotBound,
                            _ => WebauthnError::AttestationStatementX5CInvalid,
                        }
                    })
                    .and_then(|(_, output)| {
                        if &output == data {
                            Ok(())
                        } else {
                            Err(T::VALIDATION_ERROR)
                        }
                    })
            })
        })
        .unwrap_or_else(|| {
            if T::IS_REQUIRED {
                Err(WebauthnError::AttestationStatementMissingExtension)
            } else {
                Ok(())
            }
        })
}

/// The type of attestation on the credential
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Hash)]
pub enum AttestationFormat {
    /// Packed attestation
    #[serde(rename = "packed")]
    Packed,
    /// TPM attestation (like Micrsoft)
    #[serde(rename = "tpm")]
    Tpm,
    /// Android hardware attestation
    #[serde(rename = "android-key")]
    AndroidKey,
    /// Older Android Safety Net
    #[serde(rename = "android-safetynet")]
    AndroidSafetyNet,
    /// Old U2F attestation type
    #[serde(rename = "fido-u2f")]
    FIDOU2F,
    /// Apple touchID/faceID
    #[serde(rename = "apple")]
    Apple,
    /// No attestation
    #[serde(rename = "none")]
    None,
}

impl AttestationFormat {
    /// The identifier of this format in an attestation object.
    pub fn as_str(&self) -> &'static str {
        match self {
            AttestationFormat::Packed => "packed",
            AttestationFormat::Tpm => "tpm",
            AttestationFormat::AndroidKey => "android-key",
            AttestationFormat::AndroidSafetyNet => "android-safetynet",
            AttestationFormat::FIDOU2F => "fido-u2f",
            AttestationFormat::Apple => "apple",
            AttestationFormat::None => "none",
        }
    }
}

impl fmt::Display for AttestationFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl TryFrom<&str> for AttestationFormat {
    type Error = WebauthnError;

    fn try_from(a: &str) -> Result<AttestationFormat, Self::Error> {
        match a {
            "packed" => Ok(AttestationFormat::Packed),
            "tpm" => Ok(AttestationFormat::Tpm),
            "android-key" => Ok(AttestationFormat::AndroidKey),
            "android-safetynet" => Ok(AttestationFormat::AndroidSafetyNet),
            "fido-u2f" => Ok(AttestationFormat::FIDOU2F),
            "apple" => Ok(AttestationFormat::Apple),
            "none" => Ok(AttestationFormat::None),
            _ => Err(WebauthnError::AttestationNotSupported),
        }
    }
}

impl FromStr for AttestationFormat {
    type Err = WebauthnError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        AttestationFormat::try_from(s)
    }
}

/// An attestation statement, decoded for its format. Each variant holds exactly the
/// fields that format requires.
#[derive(Debug, Clone)]
pub enum AttestationStatement {
    /// `none`: the statement was empty.
    None,
    /// `packed`: without x5c this is self attestation.
    Packed {
        /// The algorithm of the signature.
        alg: COSEAlgorithm,
        /// Signature over authData and the client data hash.
        sig: Vec<u8>,
        /// The attestation certificate followed by its chain.
        x5c: Option<Vec<x509::X509>>,
    },
    /// `fido-u2f`
    FidoU2F {
        /// Signature over the U2F registration data.
        sig: Vec<u8>,
        /// The single attestation certificate.
        att_cert: x509::X509,
    },
    /// `android-key`
    AndroidKey {
        /// The algorithm of the signature.
        alg: COSEAlgorithm,
        /// Signature over authData and the client data hash.
        sig: Vec<u8>,
        /// The attestation certificate followed by its chain.
        x5c: Vec<x509::X509>,
    },
    /// `android-safetynet`
    AndroidSafetyNet {
        /// The version of the SafetyNet response.
        ver: String,
        /// The compact JWS returned by SafetyNet.
        response: Vec<u8>,
    },
    /// `apple`
    Apple {
        /// The credential certificate followed by its chain.
        x5c: Vec<x509::X509>,
    },
    /// A format that is recognised but can't be verified, such as `tpm`, or an unknown one.
    Unsupported(String),
}

type CborMap = std::collections::BTreeMap<Value, Value>;

fn att_stmt_alg(m: &CborMap) -> WebauthnResult<COSEAlgorithm> {
    let alg_value = cbor_get_text_key!(m, "alg").ok_or(WebauthnError::AttestationStatementAlgMissing)?;
    cbor_try_i128!(alg_value)
        .map_err(|_| WebauthnError::AttestationStatementAlgMissing)
        .and_then(|v| {
            COSEAlgorithm::try_from(v).map_err(|_| WebauthnError::COSEKeyInvalidAlgorithm)
        })
}

fn att_stmt_sig(m: &CborMap) -> WebauthnResult<Vec<u8>> {
    let sig_value = cbor_get_text_key!(m, "sig").ok_or(WebauthnError::AttestationStatementSigMissing)?;
    cbor_try_bytes!(sig_value)
        .cloned()
        .map_err(|_| WebauthnError::AttestationStatementSigMissing)
}

// The elements of this array contain attestnCert and its certificate chain, each
// encoded in X.509 format. The attestation certificate attestnCert MUST be the first
// element in the array.
fn att_stmt_x5c(m: &CborMap) -> WebauthnResult<Option<Vec<x509::X509>>> {
    let Some(x5c) = cbor_get_text_key!(m, "x5c") else {
        return Ok(None);
    };

    let x5c_array_ref =
        cbor_try_array!(x5c).map_err(|_| WebauthnError::AttestationStatementX5CInvalid)?;

    let arr_x509 = x5c_array_ref
        .iter()
        .map(|values| {
            cbor_try_bytes!(values)
                .map_err(|_| WebauthnError::AttestationStatementX5CInvalid)
                .and_then(|b| {
                    x509::X509::from_der(b).map_err(|e| {
                        debug!(?e, "invalid x5c certificate");
                        WebauthnError::AttestationStatementX5CInvalid
                    })
                })
        })
        .collect::<WebauthnResult<Vec<_>>>()?;

    // Must have at least one x509 cert, this is the leaf certificate.
    if arr_x509.is_empty() {
        return Err(WebauthnError::AttestationStatementX5CInvalid);
    }

    Ok(Some(arr_x509))
}

impl TryFrom<(&str, &Value)> for AttestationStatement {
    type Error = WebauthnError;

    fn try_from((fmt, att_stmt): (&str, &Value)) -> Result<Self, Self::Error> {
        // Verify that attStmt is valid CBOR conforming to the syntax of the format.
        let m = cbor_try_map!(att_stmt).map_err(|_| WebauthnError::AttestationStatementMapInvalid)?;

        let format = match AttestationFormat::try_from(fmt) {
            Ok(f) => f,
            Err(_) => {
                debug!(%fmt, "unknown attestation format");
                return Ok(AttestationStatement::Unsupported(fmt.to_string()));
            }
        };

        match format {
            AttestationFormat::None => {
                if m.is_empty() {
                    Ok(AttestationStatement::None)
                } else {
                    debug!(entries = m.len(), "none attestation carried a statement");
                    Err(WebauthnError::AttestationStatementNotEmpty)
                }
            }
            AttestationFormat::Packed => {
                if cbor_get_text_key!(m, "ecdaaKeyId").is_some() {
                    debug!("ecdaa packed attestation is not supported");
                    return Err(WebauthnError::AttestationNotSupported);
                }
                Ok(AttestationStatement::Packed {
                    alg: att_stmt_alg(m)?,
                    sig: att_stmt_sig(m)?,
                    x5c: att_stmt_x5c(m)?,
                })
            }
            AttestationFormat::FIDOU2F => {
                let sig = att_stmt_sig(m)?;
                // Check that x5c has exactly one element and let att_cert be that element.
                let mut x5c =
                    att_stmt_x5c(m)?.ok_or(WebauthnError::AttestationStatementX5CMissing)?;
                if x5c.len() != 1 {
                    return Err(WebauthnError::AttestationStatementX5CInvalid);
                }
                let att_cert = x5c
                    .pop()
                    .ok_or(WebauthnError::AttestationStatementX5CInvalid)?;
                Ok(AttestationStatement::FidoU2F { sig, att_cert })
            }
            AttestationFormat::AndroidKey => Ok(AttestationStatement::AndroidKey {
                alg: att_stmt_alg(m)?,
                sig: att_stmt_sig(m)?,
                x5c: att_stmt_x5c(m)?.ok_or(WebauthnError::AttestationStatementX5CMissing)?,
            }),
            AttestationFormat::AndroidSafetyNet => {
                let ver = cbor_get_text_key!(m, "ver")
                    .ok_or(WebauthnError::AttestationStatementVerMissing)
                    .and_then(|v| {
                        cbor_try_string!(v)
                            .map_err(|_| WebauthnError::AttestationStatementVerInvalid)
                    })?
                    .clone();

                let response = cbor_get_text_key!(m, "response")
                    .ok_or(WebauthnError::AttestationStatementResponseMissing)
                    .and_then(|v| {
                        cbor_try_bytes!(v)
                            .map_err(|_| WebauthnError::AttestationStatementResponseMissing)
                    })?
                    .clone();

                Ok(AttestationStatement::AndroidSafetyNet { ver, response })
            }
            AttestationFormat::Apple => Ok(AttestationStatement::Apple {
                x5c: att_stmt_x5c(m)?.ok_or(WebauthnError::AttestationStatementX5CMissing)?,
            }),
            AttestationFormat::Tpm => Ok(AttestationStatement::Unsupported(fmt.to_string())),
        }
    }
}

impl AttestationStatement {
    /// The format of this statement. Unsupported statements have no verifiable format.
    pub fn format(&self) -> WebauthnResult<AttestationFormat> {
        match self {
            AttestationStatement::None => Ok(AttestationFormat::None),
            AttestationStatement::Packed { .. } => Ok(AttestationFormat::Packed),
            AttestationStatement::FidoU2F { .. } => Ok(AttestationFormat::FIDOU2F),
            AttestationStatement::AndroidKey { .. } => Ok(AttestationFormat::AndroidKey),
            AttestationStatement::AndroidSafetyNet { .. } => Ok(AttestationFormat::AndroidSafetyNet),
            AttestationStatement::Apple { .. } => Ok(AttestationFormat::Apple),
            AttestationStatement::Unsupported(fmt) => {
                debug!(%fmt, "attestation format is not supported");
                Err(WebauthnError::AttestationNotSupported)
            }
        }
    }
}

/// The parts of a registration every attestation verifier works from.
pub(crate) struct AttestationContext<'a> {
    pub(crate) auth_data: &'a AuthenticatorData,
    pub(crate) auth_data_bytes: &'a [u8],
    pub(crate) acd: &'a AttestedCredentialData,
    pub(crate) credential_public_key: &'a COSEKey,
    pub(crate) client_data_hash: &'a [u8; 32],
}

impl AttestationContext<'_> {
    // authenticatorData || clientDataHash
    fn signed_data(&self) -> Vec<u8> {
        self.auth_data_bytes
            .iter()
            .chain(self.client_data_hash.iter())
            .copied()
            .collect()
    }
}

// Perform the Verification procedure for 8.2. Packed Attestation Statement Format
// https://w3c.github.io/webauthn/#sctn-packed-attestation
pub(crate) fn verify_packed_attestation(
    ctx: &AttestationContext<'_>,
    alg: COSEAlgorithm,
    sig: &[u8],
    x5c: Option<&[x509::X509]>,
) -> WebauthnResult<ParsedAttestationData> {
    let verification_data = ctx.signed_data();

    match x5c {
        Some(arr_x509) => {
            // If x5c is present, this indicates that the attestation type is not ECDAA.
            let attestn_cert = arr_x509
                .first()
                .ok_or(WebauthnError::AttestationStatementX5CInvalid)?;

            trace!(?attestn_cert);

            // Verify that sig is a valid signature over the concatenation of authenticatorData
            // and clientDataHash using the attestation public key in attestnCert with the
            // algorithm specified in alg.
            let verified = verify_signature(alg, attestn_cert, sig, &verification_data)?;
            if !verified {
                error!("signature verification failed!");
                return Err(WebauthnError::AttestationStatementSigInvalid);
            }

            // Verify that attestnCert meets the requirements in § 8.2.1 Packed Attestation
            // Statement Certificate Requirements.
            assert_packed_attest_req(attestn_cert)?;

            // If attestnCert contains an extension with OID 1.3.6.1.4.1.45724.1.1.4
            // (id-fido-gen-ce-aaguid) verify that the value of this extension matches the aaguid
            // in authenticatorData.
            validate_extension::<FidoGenCeAaguid>(attestn_cert, &ctx.acd.aaguid)?;

            Ok(ParsedAttestationData::Basic(arr_x509.to_vec()))
        }
        None => {
            // If x5c is not present, self attestation is in use.
            // Validate that alg matches the algorithm of the credentialPublicKey in authenticatorData.
            if alg != ctx.credential_public_key.type_ {
                debug!(?alg, key_alg = ?ctx.credential_public_key.type_, "self attestation alg mismatch");
                return Err(WebauthnError::AttestationStatementAlgMismatch);
            }

            // Verify that sig is a valid signature over the concatenation of authenticatorData and
            // clientDataHash using the credential public key with alg.
            let verified = ctx
                .credential_public_key
                .verify_signature(sig, &verification_data)?;

            if !verified {
                error!("signature verification failed!");
                return Err(WebauthnError::AttestationStatementSigInvalid);
            }

            Ok(ParsedAttestationData::Self_)
        }
    }
}

// https://w3c.github.io/webauthn/#sctn-fido-u2f-attestation
pub(crate) fn verify_fidou2f_attestation(
    ctx: &AttestationContext<'_>,
    sig: &[u8],
    att_cert: &x509::X509,
) -> WebauthnResult<ParsedAttestationData> {
    // If certificate public key is not an Elliptic Curve (EC) public key over the P-256 curve,
    // terminate this algorithm and return an appropriate error.
    let certificate_public_key = COSEKey::try_from((COSEAlgorithm::ES256, att_cert))?;
    match &certificate_public_key.key {
        COSEKeyType::EC_EC2(ec2k) if ec2k.curve == ECDSACurve::SECP256R1 => {}
        _ => {
            debug!("fido-u2f attestation certificate is not P-256");
            return Err(WebauthnError::CertificatePublicKeyInvalid);
        }
    }

    // Convert the COSE_KEY formatted credentialPublicKey (see Section 7 of [RFC8152]) to Raw
    // ANSI X9.62 public key format.
    let public_key_u2f = ctx.credential_public_key.get_alg_key_ecc_x962_raw()?;

    // Let verificationData be the concatenation of
    // (0x00 || rpIdHash || clientDataHash || credentialId || publicKeyU2F)
    let r: [u8; 1] = [0x00];
    let verification_data: Vec<u8> = r
        .iter()
        .chain(ctx.auth_data.rp_id_hash.iter())
        .chain(ctx.client_data_hash.iter())
        .chain(ctx.acd.credential_id.as_ref().iter())
        .chain(public_key_u2f.iter())
        .copied()
        .collect();

    // Verify the sig using verificationData and certificate public key per [SEC1].
    let verified = verify_signature(COSEAlgorithm::ES256, att_cert, sig, &verification_data)?;

    if !verified {
        error!("signature verification failed!");
        return Err(WebauthnError::AttestationStatementSigInvalid);
    }

    Ok(ParsedAttestationData::Basic(vec![att_cert.clone()]))
}

// https://www.w3.org/TR/webauthn-3/#sctn-apple-anonymous-attestation
pub(crate) fn verify_apple_anonymous_attestation(
    ctx: &AttestationContext<'_>,
    x5c: &[x509::X509],
) -> WebauthnResult<ParsedAttestationData> {
    let attestn_cert = x5c
        .first()
        .ok_or(WebauthnError::AttestationStatementX5CInvalid)?;

    // Perform SHA-256 hash of authenticatorData || clientDataHash to produce nonce.
    let nonce = compute_sha256(&ctx.signed_data());

    // The nonce here is used to prove that the attestation is live and to protect the integrity
    // of the authenticatorData and the client data.
    validate_extension::<AppleAnonymousNonce>(attestn_cert, &nonce)?;

    // Verify credential public key matches the Subject Public Key of credCert.
    let subject_public_key = COSEKey::try_from((ctx.credential_public_key.type_, attestn_cert))?;

    if ctx.credential_public_key != &subject_public_key {
        return Err(WebauthnError::AttestationCredentialSubjectKeyMismatch);
    }

    Ok(ParsedAttestationData::AnonCa(x5c.to_vec()))
}

/// <https://www.w3.org/TR/webauthn-3/#sctn-android-key-attestation>
pub(crate) fn verify_android_key_attestation(
    ctx: &AttestationContext<'_>,
    alg: COSEAlgorithm,
    sig: &[u8],
    x5c: &[x509::X509],
) -> WebauthnResult<ParsedAttestationData> {
    let attestn_cert = x5c
        .first()
        .ok_or(WebauthnError::AttestationStatementX5CInvalid)?;

    // Verify that sig is a valid signature over the concatenation of authenticatorData and
    // clientDataHash using the public key in the first certificate in x5c with the algorithm
    // specified in alg.
    let verified = verify_signature(alg, attestn_cert, sig, &ctx.signed_data())?;

    if !verified {
        error!("signature verification failed!");
        return Err(WebauthnError::AttestationStatementSigInvalid);
    }

    // Verify that the public key in the first certificate in x5c matches the
    // credentialPublicKey in the attestedCredentialData in authenticatorData.
    let subject_public_key = COSEKey::try_from((ctx.credential_public_key.type_, attestn_cert))?;

    if ctx.credential_public_key != &subject_public_key {
        return Err(WebauthnError::AttestationCredentialSubjectKeyMismatch);
    }

    // Verify that the attestationChallenge field in the attestation certificate extension data
    // is identical to clientDataHash, and that the key is bound to this RP.
    validate_extension::<AndroidKeyAttestationExtensionData>(
        attestn_cert,
        &ctx.client_data_hash.to_vec(),
    )?;

    Ok(ParsedAttestationData::Basic(x5c.to_vec()))
}

#[derive(Clone, Debug, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
struct SafetyNetAttestResponse {
    timestamp_ms: u64,
    nonce: Base64UrlSafeData,
    apk_package_name: String,
    cts_profile_match: bool,
    basic_integrity: bool,
}

#[derive(Debug, thiserror::Error)]
enum SafetyNetError {
    #[error("JWT error")]
    Jwt(#[from] compact_jwt::JwtError),

    #[error("No cert in chain")]
    MissingCertChain,

    #[error("Invalid Cert")]
    BadCert,

    #[error("openssl")]
    OpenSSL(#[from] openssl::error::ErrorStack),

    #[error("nonce mismatch")]
    NonceMismatch,

    #[error("hostname invalid")]
    InvalidHostname,

    #[error("False CTS Profile Match")]
    CtsProfileMatchFailed,

    #[error("Timestamp is in the future")]
    FutureTimestamp,

    #[error("Timestamp too old")]
    Expired,

    #[error("Time error: {0}")]
    Time(#[from] std::time::SystemTimeError),
}

/// <https://www.w3.org/TR/webauthn/#sctn-android-safetynet-attestation>
pub(crate) fn verify_android_safetynet_attestation(
    ctx: &AttestationContext<'_>,
    ver: &str,
    response: &[u8],
    settings: &SettingsService,
) -> WebauthnResult<ParsedAttestationData> {
    debug!(%ver, "safetynet response version");

    let response_str = std::str::from_utf8(response)
        .map_err(|_| WebauthnError::AttestationStatementResponseInvalid)?;

    // The nonce is the hash of authenticatorData || clientDataHash.
    let expected_nonce = compute_sha256(&ctx.signed_data());
    let freshness = settings.safetynet_freshness_window().as_millis();

    let res = |token: &str| -> Result<Vec<x509::X509>, SafetyNetError> {
        trace!(?token);
        let jwsu = compact_jwt::JwsUnverified::from_str(token)?;

        let certs = jwsu
            .get_x5c_chain()?
            .ok_or(SafetyNetError::MissingCertChain)?;

        let leaf_cert = certs.first().ok_or(SafetyNetError::BadCert)?;

        // Verify with the internal certificate.
        let jws: compact_jwt::Jws<SafetyNetAttestResponse> = jwsu.validate_embeded()?;
        let verified_claims = jws.into_inner();

        debug!(
            apk_package_name = %verified_claims.apk_package_name,
            basic_integrity = verified_claims.basic_integrity,
            "safetynet claims"
        );

        // Verify that the nonce attribute in the payload of response is identical to the Base64
        // encoding of the SHA-256 hash of the concatenation of authenticatorData and clientDataHash.
        if verified_claims.nonce.as_ref() != expected_nonce.as_slice() {
            return Err(SafetyNetError::NonceMismatch);
        }

        // Verify that attestationCert is issued to the hostname "attest.android.com"
        let common_name = {
            let name = leaf_cert
                .subject_name()
                .entries_by_nid(openssl::nid::Nid::COMMONNAME)
                .next()
                .ok_or(SafetyNetError::InvalidHostname)?;
            name.data().as_utf8()?.to_string()
        };

        if common_name.as_str() != SAFETYNET_HOSTNAME {
            return Err(SafetyNetError::InvalidHostname);
        }

        // Verify that the ctsProfileMatch attribute in the payload of response is true.
        if !verified_claims.cts_profile_match {
            return Err(SafetyNetError::CtsProfileMatchFailed);
        }

        // The response must be recent, allowing a little skew for clocks ahead of ours.
        let now = SystemTime::now().duration_since(UNIX_EPOCH)?.as_millis();
        let timestamp = verified_claims.timestamp_ms as u128;
        if timestamp > now + SAFETYNET_CLOCK_SKEW_MS {
            return Err(SafetyNetError::FutureTimestamp);
        }
        if now.saturating_sub(timestamp) > freshness {
            return Err(SafetyNetError::Expired);
        }

        Ok(certs)
    }(response_str)
    .map_err(|e| {
        error!("jwt safety-net error: {:?}", e);
        WebauthnError::AttestationSafetyNetInvalid(e.to_string())
    })?;

    Ok(ParsedAttestationData::Basic(res))
}

/// Verify that a certificate chain, leaf first, leads to one of the roots.
pub fn verify_attestation_ca_chain(
    fullchain: &[x509::X509],
    roots: &[x509::X509],
    danger_disable_certificate_time_checks: bool,
) -> WebauthnResult<()> {
    // If the roots are empty, immediately fail since no chain can be trusted.
    if roots.is_empty() {
        return Err(WebauthnError::AttestationCertificateTrustStoreEmpty);
    }

    let (leaf, chain) = fullchain
        .split_first()
        .ok_or(WebauthnError::AttestationLeafCertMissing)?;

    // Convert the chain to a stackref so that openssl can use it.
    let mut chain_stack = stack::Stack::new()?;
    for crt in chain.iter() {
        chain_stack.push(crt.clone())?;
    }

    // Create the x509 store that we will validate against.
    let mut ca_store = store::X509StoreBuilder::new()?;

    // In tests we may need to allow disabling time window validity.
    if danger_disable_certificate_time_checks {
        ca_store.set_flags(verify::X509VerifyFlags::NO_CHECK_TIME)?;
    }

    for ca_crt in roots {
        ca_store.add_cert(ca_crt.clone())?;
    }

    let ca_store = ca_store.build();

    let mut ca_ctx = x509::X509StoreContext::new()?;

    // Providing the cert and chain, validate we have a ref to our store.
    // Note this is a result<result ... because the inner .init must return an errorstack
    // for openssl.
    let res: WebauthnResult<()> = ca_ctx
        .init(&ca_store, leaf, &chain_stack, |ca_ctx_ref| {
            ca_ctx_ref.verify_cert().map(|_| {
                // The value as passed in is a boolean that we ignore in favour of the richer error type.
                let res = ca_ctx_ref.error();
                if res == x509::X509VerifyResult::OK {
                    Ok(())
                } else {
                    debug!(
                        "ca_ctx_ref verify cert - error depth={}, sn={:?}",
                        ca_ctx_ref.error_depth(),
                        ca_ctx_ref.current_cert().map(|crt| crt.subject_name())
                    );
                    Err(WebauthnError::AttestationChainNotTrusted(format!(
                        "depth {}: {}",
                        ca_ctx_ref.error_depth(),
                        res
                    )))
                }
            })
        })
        .map_err(|e| {
            // If an openssl error occured, dump it here.
            error!(?e);
            e
        })?;

    res
}

/// Verify an attestation statement, then validate its certificate chain against the
/// trust roots. Roots from a metadata statement for the AAGUID take precedence over
/// the roots configured for the format.
pub(crate) fn verify_attestation(
    att_stmt: &AttestationStatement,
    ctx: &AttestationContext<'_>,
    settings: &SettingsService,
) -> WebauthnResult<(AttestationFormat, ParsedAttestationData)> {
    let format = att_stmt.format()?;

    let attestation = match att_stmt {
        AttestationStatement::None => ParsedAttestationData::None,
        AttestationStatement::Packed { alg, sig, x5c } => {
            verify_packed_attestation(ctx, *alg, sig, x5c.as_deref())?
        }
        AttestationStatement::FidoU2F { sig, att_cert } => {
            verify_fidou2f_attestation(ctx, sig, att_cert)?
        }
        AttestationStatement::AndroidKey { alg, sig, x5c } => {
            verify_android_key_attestation(ctx, *alg, sig, x5c)?
        }
        AttestationStatement::AndroidSafetyNet { ver, response } => {
            verify_android_safetynet_attestation(ctx, ver, response, settings)?
        }
        AttestationStatement::Apple { x5c } => verify_apple_anonymous_attestation(ctx, x5c)?,
        AttestationStatement::Unsupported(_) => return Err(WebauthnError::AttestationNotSupported),
    };

    if let Some(chain) = attestation.chain() {
        let aaguid = Uuid::from_bytes(ctx.acd.aaguid);
        let roots = match settings.get_metadata_statement(&aaguid) {
            Some(statement) => {
                debug!(%aaguid, description = %statement.description, "using metadata statement roots");
                Arc::new(statement.attestation_root_certificates)
            }
            None => settings.get_root_certificates(format)?,
        };

        if roots.is_empty() {
            debug!(%format, "no roots configured, accepting attestation without chain validation");
        } else {
            verify_attestation_ca_chain(
                chain,
                &roots,
                settings.certificate_time_checks_disabled(),
            )?;
        }
    }

    Ok((format, attestation))
}
