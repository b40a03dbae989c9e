//! Parameters a relying party sends to the browser to shape a ceremony, and the
//! client data the browser sends back.

use base64urlsafedata::Base64UrlSafeData;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// The binary id of a credential, as chosen by the authenticator.
pub type CredentialID = Base64UrlSafeData;

/// How strongly the relying party wants the authenticator to verify the user.
/// <https://w3c.github.io/webauthn/#enumdef-userverificationrequirement>
///
/// Presence (a touch) is always required. Verification is a further check of who
/// the user is, such as a PIN or a biometric.
#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum UserVerificationPolicy {
    /// The UV flag must be set or the ceremony fails. Authenticators that
    /// can't verify users are unusable under this policy.
    Required,
    /// Ask for verification, but accept a response without it.
    #[default]
    Preferred,
    /// Ask the authenticator to skip verification. It may still verify.
    Discouraged,
}

/// The relying party as presented to the user.
#[derive(Debug, Serialize, Clone, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct RelyingParty {
    /// Human readable name.
    pub name: String,
    /// The rp id, an effective domain.
    pub id: String,
}

/// The account a credential is created for.
#[derive(Debug, Serialize, Clone, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct User {
    /// Opaque user handle. It is stored on discoverable credentials and can't be
    /// changed later, so it must not carry personal information.
    pub id: Base64UrlSafeData,
    /// Account name, such as an email address.
    pub name: String,
    /// Name shown to the user when choosing a credential.
    pub display_name: String,
}

/// One acceptable credential algorithm.
#[derive(Debug, Serialize, Clone, Deserialize, PartialEq, Eq)]
pub struct PubKeyCredParams {
    /// Always `public-key`.
    #[serde(rename = "type")]
    pub type_: String,
    /// COSE algorithm identifier.
    pub alg: i64,
}

/// What attestation the relying party asks for at registration.
/// <https://www.w3.org/TR/webauthn/#enumdef-attestationconveyancepreference>
#[derive(Debug, Serialize, Clone, Copy, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum AttestationConveyancePreference {
    /// No attestation.
    #[default]
    None,
    /// Attestation the client may anonymize.
    Indirect,
    /// Attestation exactly as the authenticator produced it.
    Direct,
    /// Attestation that may identify the individual device.
    Enterprise,
}

/// How the client reaches an authenticator.
/// <https://www.w3.org/TR/webauthn/#enumdef-authenticatortransport>
#[derive(Debug, Serialize, Clone, Copy, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum AuthenticatorTransport {
    /// USB.
    Usb,
    /// NFC.
    Nfc,
    /// Bluetooth low energy.
    Ble,
    /// Built into the client device.
    Internal,
    /// A phone reached through a hybrid (caBLE) tunnel.
    Hybrid,
}

/// Names a credential in an exclude list.
/// <https://www.w3.org/TR/webauthn/#dictdef-publickeycredentialdescriptor>
#[derive(Debug, Serialize, Clone, Deserialize, PartialEq, Eq)]
pub struct PublicKeyCredentialDescriptor {
    /// Always `public-key`.
    #[serde(rename = "type")]
    pub type_: String,
    /// The credential id.
    pub id: Base64UrlSafeData,
    /// Transports the credential reported. The client treats these as hints.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub transports: Option<Vec<AuthenticatorTransport>>,
}

/// Where the authenticator should live. A hint only.
/// <https://www.w3.org/TR/webauthn/#enumdef-authenticatorattachment>
#[derive(Debug, Copy, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub enum AuthenticatorAttachment {
    /// Built into the client device.
    #[serde(rename = "platform")]
    Platform,
    /// A removable security key or another device.
    #[serde(rename = "cross-platform")]
    CrossPlatform,
}

/// Whether the credential should be discoverable, stored on the authenticator
/// along with the user handle.
/// <https://www.w3.org/TR/webauthn-2/#enumdef-residentkeyrequirement>
#[derive(Debug, Copy, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum ResidentKeyRequirement {
    /// A server side credential is preferred.
    Discouraged,
    /// A discoverable credential is preferred.
    Preferred,
    /// Registration fails unless the credential is discoverable.
    Required,
}

/// Constraints on the authenticator used for registration.
/// <https://www.w3.org/TR/webauthn/#dictdef-authenticatorselectioncriteria>
#[derive(Debug, Serialize, Clone, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct AuthenticatorSelectionCriteria {
    /// Platform or roaming authenticator.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub authenticator_attachment: Option<AuthenticatorAttachment>,

    /// Discoverable credential requirement.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub resident_key: Option<ResidentKeyRequirement>,

    /// The level 1 form of `resident_key`. Option generation sets this to
    /// `resident_key == Required`.
    #[serde(default)]
    pub require_resident_key: bool,

    /// Verification requested during registration.
    #[serde(default)]
    pub user_verification: UserVerificationPolicy,
}

impl Default for AuthenticatorSelectionCriteria {
    fn default() -> Self {
        AuthenticatorSelectionCriteria {
            authenticator_attachment: None,
            resident_key: None,
            require_resident_key: false,
            user_verification: UserVerificationPolicy::Preferred,
        }
    }
}

/// Names a credential that may answer an authentication.
#[derive(Debug, Serialize, Clone, Deserialize, PartialEq, Eq)]
pub struct AllowCredentials {
    /// Always `public-key`.
    #[serde(rename = "type")]
    pub type_: String,
    /// The credential id.
    pub id: Base64UrlSafeData,
    /// Transports the credential reported at registration.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub transports: Option<Vec<AuthenticatorTransport>>,
}

/// The JSON the browser builds and the authenticator signs over, by hash.
/// <https://www.w3.org/TR/webauthn-2/#dictdef-collectedclientdata>
#[derive(Debug, Serialize, Clone, Deserialize)]
pub struct CollectedClientData {
    /// `webauthn.create` or `webauthn.get`.
    #[serde(rename = "type")]
    pub type_: String,
    /// The challenge the relying party issued.
    pub challenge: Base64UrlSafeData,
    /// The origin of the calling page.
    pub origin: url::Url,
    /// Set when the call came from a cross-origin iframe.
    #[serde(rename = "crossOrigin", skip_serializing_if = "Option::is_none")]
    pub cross_origin: Option<bool>,
    /// Token binding state, if the client reports any.
    #[serde(rename = "tokenBinding", skip_serializing_if = "Option::is_none")]
    pub token_binding: Option<TokenBinding>,
    /// Browsers add their own keys (for example `androidPackageName`), which are kept here.
    #[serde(flatten)]
    pub unknown_keys: BTreeMap<String, serde_json::value::Value>,
}

/// Token binding state within client data.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct TokenBinding {
    /// `present`, `supported` or `not-supported`.
    pub status: String,
    /// The token binding id when `present`.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
}
