//! Registration: the options sent to `navigator.credentials.create()` and the
//! credential it resolves with.

use serde::{Deserialize, Serialize};

use base64urlsafedata::Base64UrlSafeData;
use crate::extensions::{RegistrationExtensionsClientOutputs, RequestRegistrationExtensions};
use crate::options::*;

/// Options for creating a credential.
/// <https://w3c.github.io/webauthn/#dictionary-makecredentialoptions>
#[derive(Debug, Serialize, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PublicKeyCredentialCreationOptions {
    /// Single use challenge the attestation will cover.
    pub challenge: Base64UrlSafeData,
    /// The relying party.
    pub rp: RelyingParty,
    /// The account being registered.
    pub user: User,
    /// Acceptable algorithms, most preferred first.
    pub pub_key_cred_params: Vec<PubKeyCredParams>,

    /// Milliseconds the client should wait for the user.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub timeout: Option<u32>,

    /// Requested attestation conveyance.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub attestation: Option<AttestationConveyancePreference>,

    /// Credentials the user already holds, so the same authenticator isn't
    /// registered twice.
    #[serde(default)]
    pub exclude_credentials: Vec<PublicKeyCredentialDescriptor>,

    /// Constraints on the authenticator.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub authenticator_selection: Option<AuthenticatorSelectionCriteria>,

    /// Client extension inputs.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub extensions: Option<RequestRegistrationExtensions>,
}

/// The authenticator's answer to a create call.
/// <https://w3c.github.io/webauthn/#authenticatorattestationresponse>
#[derive(Debug, Serialize, Clone, Deserialize)]
pub struct AuthenticatorAttestationResponseRaw {
    /// CBOR map of `fmt`, `attStmt` and `authData`.
    #[serde(rename = "attestationObject")]
    pub attestation_object: Base64UrlSafeData,

    /// The client data JSON, as the exact bytes that were hashed.
    #[serde(rename = "clientDataJSON")]
    pub client_data_json: Base64UrlSafeData,

    /// Result of `getTransports()`, when the client provides it.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub transports: Option<Vec<AuthenticatorTransport>>,
}

/// A newly created credential, posted back by the browser for verification.
/// <https://w3c.github.io/webauthn/#iface-pkcredential>
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct RegisterPublicKeyCredential {
    /// The credential id as unpadded base64url. Must agree with `raw_id`.
    pub id: String,
    /// The credential id.
    #[serde(rename = "rawId")]
    pub raw_id: Base64UrlSafeData,
    /// The attestation.
    pub response: AuthenticatorAttestationResponseRaw,
    /// Always `public-key`.
    #[serde(rename = "type")]
    pub type_: String,
    /// Client extension outputs. These are not signed.
    #[serde(
        default,
        rename = "clientExtensionResults",
        alias = "extensions"
    )]
    pub extensions: RegistrationExtensionsClientOutputs,
    /// Some client libraries report transports here rather than in the response.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub transports: Option<Vec<AuthenticatorTransport>>,
}

impl RegisterPublicKeyCredential {
    /// Transports the credential claims, taken from the response first.
    pub fn transports(&self) -> Option<&[AuthenticatorTransport]> {
        self.response
            .transports
            .as_deref()
            .or(self.transports.as_deref())
    }
}
