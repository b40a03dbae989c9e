//! Possible errors that may occur during Webauthn Operation processing.

use openssl::error::ErrorStack as OpenSSLErrorStack;
use serde_cbor_2::error::Error as CBORError;
use serde_json::error::Error as JSONError;

/// The broad category a [WebauthnError] belongs to. Operators should treat
/// [ErrorKind::CloneDetected] differently from the others, since it indicates
/// an authenticator may have been duplicated rather than a transient failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// The input could not be decoded. No cryptographic work was attempted.
    MalformedInput,
    /// The input decoded, but does not follow the ceremony rules.
    ProtocolViolation,
    /// A signature, certificate chain, or attestation binding did not validate.
    TrustFailure,
    /// The signature counter did not advance.
    CloneDetected,
}

/// Possible errors that may occur during Webauthn Operation processing.
#[derive(Debug, thiserror::Error)]
#[allow(missing_docs)]
pub enum WebauthnError {
    #[error("The configuration was invalid")]
    Configuration,

    #[error("The relying party id is not a registrable suffix of the origin")]
    RelyingPartyIdMismatch,

    #[error("Unable to generate a challenge from the system entropy source")]
    ChallengeGenerationFailed,

    #[error("The credential id was missing, or did not match the raw id")]
    InvalidCredentialId,

    #[error("The credential type was not public-key")]
    InvalidCredentialType,

    #[error("The JSON from the client did not indicate webauthn.<method> correctly")]
    InvalidClientDataType,

    #[error("The client response challenge differs from the latest challenge issued to the userId")]
    MismatchedChallenge,

    #[error("The response origin does not match any allowed origin for the relying party")]
    InvalidRPOrigin,

    #[error("The client response token binding status is not recognised")]
    InvalidTokenBindingStatus,

    #[error("The provided rp id hash does not match any expected rp id")]
    InvalidRPIDHash,

    #[error("The user present bit is not set, and required")]
    UserNotPresent,

    #[error("The user verified bit is not set, and required by policy")]
    UserNotVerified,

    #[error("The attested credential public key and subject public key do not match")]
    AttestationCredentialSubjectKeyMismatch,

    #[error("The credential does not carry attested credential data")]
    MissingAttestationCredentialData,

    #[error("The credential algorithm is not one of the supported algorithms")]
    CredentialAlteredAlgFromRequest,

    #[error("The attestation format is not supported")]
    AttestationNotSupported,

    #[error("The none attestation carried a statement")]
    AttestationStatementNotEmpty,

    #[error("The attestation statement map is not valid")]
    AttestationStatementMapInvalid,

    #[error("The attestation statement response is missing")]
    AttestationStatementResponseMissing,

    #[error("The attestation statement response is not valid")]
    AttestationStatementResponseInvalid,

    #[error("The attestation statement signature is missing")]
    AttestationStatementSigMissing,

    #[error("The attestation statement signature is not valid")]
    AttestationStatementSigInvalid,

    #[error("The attestation statement version is missing")]
    AttestationStatementVerMissing,

    #[error("The attestation statement version is not valid")]
    AttestationStatementVerInvalid,

    #[error("The attestation statement alg is missing")]
    AttestationStatementAlgMissing,

    #[error("The attestation statement alg does not match the credential public key")]
    AttestationStatementAlgMismatch,

    #[error("The attestation statement x5c (trust root) is missing")]
    AttestationStatementX5CMissing,

    #[error("The attestation statement x5c (trust root) is not valid")]
    AttestationStatementX5CInvalid,

    #[error("The attestation certificate is missing a required extension")]
    AttestationStatementMissingExtension,

    #[error("The attestation certificate requirements were not met")]
    AttestationCertificateRequirementsNotMet,

    #[error("The attestation certificate aaguid does not match the authenticator data")]
    AttestationCertificateAAGUIDMismatch,

    #[error("The attestation certificate nonce does not match")]
    AttestationCertificateNonceMismatch,

    #[error("The android key attestation does not bind the key to this application")]
    AttestationAndroidKeyNotBound,

    #[error("The safetynet attestation did not validate: {0}")]
    AttestationSafetyNetInvalid(String),

    #[error("The attestation chain has no leaf certificate")]
    AttestationLeafCertMissing,

    #[error("The attestation trust store is empty")]
    AttestationCertificateTrustStoreEmpty,

    #[error("The attestation chain is not trusted: {0}")]
    AttestationChainNotTrusted(String),

    #[error("The credential is not in the allowed credential list")]
    CredentialNotAllowed,

    #[error("The signature counter did not increase, the credential may be cloned")]
    CredentialPossibleCompromise,

    #[error("The assertion signature is not valid")]
    AuthenticationFailure,

    #[error("Unable to parse the CBOR content")]
    ParseCBORFailure(#[from] CBORError),

    #[error("Unable to parse the JSON content")]
    ParseJSONFailure(#[from] JSONError),

    #[error("Unable to parse the binary structure")]
    ParseNOMFailure,

    #[error("The binary structure declares more bytes than are available")]
    ParseInsufficientBytesAvailable,

    #[error("The binary structure has trailing bytes that no flag accounts for")]
    ParseTrailingBytes,

    #[error("The COSE key contains invalid CBOR")]
    COSEKeyInvalidCBORValue,

    #[error("The COSE key type is not supported")]
    COSEKeyInvalidType,

    #[error("The COSE key algorithm is not supported")]
    COSEKeyInvalidAlgorithm,

    #[error("The COSE key EC2 coordinates are not valid")]
    COSEKeyECDSAXYInvalid,

    #[error("The COSE key EC2 curve is not supported")]
    COSEKeyECDSAInvalidCurve,

    #[error("The COSE key EdDSA curve is not supported")]
    COSEKeyEDDSAInvalidCurve,

    #[error("The COSE key RSA modulus or exponent is not valid")]
    COSEKeyRSANEInvalid,

    #[error("The certificate public key does not match the algorithm")]
    CertificatePublicKeyInvalid,

    #[error("OpenSSL Error")]
    OpenSSLError(#[from] OpenSSLErrorStack),

    #[error("OpenSSL could not determine the curve name")]
    OpenSSLErrorNoCurveName,

    #[error("The settings service lock was poisoned")]
    SettingsPoisoned,
}

impl WebauthnError {
    /// Categorise this error for audit logging and response handling.
    pub fn kind(&self) -> ErrorKind {
        use WebauthnError::*;
        match self {
            CredentialPossibleCompromise => ErrorKind::CloneDetected,

            ParseCBORFailure(_)
            | ParseJSONFailure(_)
            | ParseNOMFailure
            | ParseInsufficientBytesAvailable
            | ParseTrailingBytes
            | COSEKeyInvalidCBORValue
            | COSEKeyInvalidType
            | COSEKeyInvalidAlgorithm
            | COSEKeyECDSAXYInvalid
            | COSEKeyECDSAInvalidCurve
            | COSEKeyEDDSAInvalidCurve
            | COSEKeyRSANEInvalid
            | AttestationStatementMapInvalid
            | AttestationStatementResponseMissing
            | AttestationStatementSigMissing
            | AttestationStatementVerMissing
            | AttestationStatementVerInvalid
            | AttestationStatementAlgMissing
            | AttestationStatementX5CMissing
            | AttestationStatementX5CInvalid => ErrorKind::MalformedInput,

            Configuration
            | RelyingPartyIdMismatch
            | InvalidCredentialId
            | InvalidCredentialType
            | InvalidClientDataType
            | MismatchedChallenge
            | InvalidRPOrigin
            | InvalidTokenBindingStatus
            | InvalidRPIDHash
            | UserNotPresent
            | UserNotVerified
            | MissingAttestationCredentialData
            | CredentialAlteredAlgFromRequest
            | AttestationStatementNotEmpty
            | CredentialNotAllowed => ErrorKind::ProtocolViolation,

            ChallengeGenerationFailed
            | AttestationCredentialSubjectKeyMismatch
            | AttestationNotSupported
            | AttestationStatementResponseInvalid
            | AttestationStatementSigInvalid
            | AttestationStatementAlgMismatch
            | AttestationStatementMissingExtension
            | AttestationCertificateRequirementsNotMet
            | AttestationCertificateAAGUIDMismatch
            | AttestationCertificateNonceMismatch
            | AttestationAndroidKeyNotBound
            | AttestationSafetyNetInvalid(_)
            | AttestationLeafCertMissing
            | AttestationCertificateTrustStoreEmpty
            | AttestationChainNotTrusted(_)
            | AuthenticationFailure
            | CertificatePublicKeyInvalid
            | OpenSSLError(_)
            | OpenSSLErrorNoCurveName
            | SettingsPoisoned => ErrorKind::TrustFailure,
        }
    }
}

/// A shorthand for a result of a Webauthn operation.
pub type WebauthnResult<T> = core::result::Result<T, WebauthnError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn clone_detection_is_distinct() {
        assert_eq!(
            WebauthnError::CredentialPossibleCompromise.kind(),
            ErrorKind::CloneDetected
        );
        assert_eq!(
            WebauthnError::InvalidRPOrigin.kind(),
            ErrorKind::ProtocolViolation
        );
        assert_eq!(
            WebauthnError::AttestationStatementSigInvalid.kind(),
            ErrorKind::TrustFailure
        );
        assert_eq!(
            WebauthnError::ParseInsufficientBytesAvailable.kind(),
            ErrorKind::MalformedInput
        );
    }
}
