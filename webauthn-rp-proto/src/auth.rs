//! Authentication: the options sent to `navigator.credentials.get()` and the
//! assertion it resolves with.

use serde::{Deserialize, Serialize};

use base64urlsafedata::Base64UrlSafeData;
use crate::extensions::{AuthenticationExtensionsClientOutputs, RequestAuthenticationExtensions};
use crate::options::*;

/// Options for requesting an assertion.
#[derive(Debug, Serialize, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PublicKeyCredentialRequestOptions {
    /// Single use challenge the assertion will sign.
    pub challenge: Base64UrlSafeData,
    /// Milliseconds the client should wait for the user.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub timeout: Option<u32>,
    /// The rp id. The client uses the caller's effective domain if absent.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub rp_id: Option<String>,
    /// Credentials that may answer. An empty list would block every credential,
    /// so absent is the only form of "any".
    #[serde(skip_serializing_if = "Option::is_none")]
    pub allow_credentials: Option<Vec<AllowCredentials>>,
    /// Requested user verification.
    pub user_verification: UserVerificationPolicy,
    /// Client extension inputs.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub extensions: Option<RequestAuthenticationExtensions>,
}

/// The authenticator's answer to a get call.
/// <https://w3c.github.io/webauthn/#authenticatorassertionresponse>
#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct AuthenticatorAssertionResponseRaw {
    /// rpIdHash, flags and counter, plus any extensions.
    #[serde(rename = "authenticatorData")]
    pub authenticator_data: Base64UrlSafeData,

    /// The client data JSON, as the exact bytes that were hashed.
    #[serde(rename = "clientDataJSON")]
    pub client_data_json: Base64UrlSafeData,

    /// Signature over `authenticatorData || SHA-256(clientDataJSON)`.
    pub signature: Base64UrlSafeData,

    /// The user handle, sent by discoverable credentials.
    #[serde(rename = "userHandle", default)]
    pub user_handle: Option<Base64UrlSafeData>,
}

/// An assertion posted back by the browser for verification.
#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct PublicKeyCredential {
    /// The credential id as unpadded base64url.
    pub id: String,
    /// The credential id.
    #[serde(rename = "rawId")]
    pub raw_id: Base64UrlSafeData,
    /// The assertion.
    pub response: AuthenticatorAssertionResponseRaw,
    /// Client extension outputs. These are not signed.
    #[serde(
        default,
        rename = "clientExtensionResults",
        alias = "extensions"
    )]
    pub extensions: AuthenticationExtensionsClientOutputs,
    /// Always `public-key`.
    #[serde(rename = "type")]
    pub type_: String,
}

impl PublicKeyCredential {
    /// The user handle, if the authenticator returned one.
    pub fn get_user_unique_id(&self) -> Option<&[u8]> {
        self.response.user_handle.as_ref().map(|b| b.as_ref())
    }

    /// The id of the credential that signed.
    pub fn get_credential_id(&self) -> &[u8] {
        self.raw_id.as_ref()
    }
}
