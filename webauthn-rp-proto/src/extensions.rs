//! Client extension inputs and outputs. Outputs are reported by the client and
//! aren't covered by any signature, so they are informational only.

use serde::{Deserialize, Serialize};

/// Extension inputs for registration.
#[derive(Debug, Serialize, Clone, Deserialize, Default, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct RequestRegistrationExtensions {
    /// Ask for the user verification method.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub uvm: Option<bool>,

    /// Ask whether the credential was created discoverable.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cred_props: Option<bool>,
}

/// Extension inputs for authentication.
#[derive(Debug, Serialize, Clone, Deserialize, Default, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct RequestAuthenticationExtensions {
    /// Legacy U2F app id to accept alongside the rp id.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub appid: Option<String>,

    /// Ask for the user verification method.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub uvm: Option<bool>,
}

/// Extension outputs reported with an assertion.
#[derive(Debug, Deserialize, Serialize, Clone, Default)]
#[serde(rename_all = "camelCase")]
pub struct AuthenticationExtensionsClientOutputs {
    /// Whether the client used the legacy app id.
    #[serde(default)]
    pub appid: Option<bool>,
}

/// The `credProps` output.
/// <https://www.w3.org/TR/webauthn-3/#sctn-authenticator-credential-properties-extension>
#[derive(Debug, Deserialize, Serialize, Clone, PartialEq, Eq)]
pub struct CredProps {
    /// True if the client believes the credential is discoverable.
    pub rk: bool,
}

/// Extension outputs reported with a new credential.
#[derive(Debug, Deserialize, Serialize, Clone, Default)]
#[serde(rename_all = "camelCase")]
pub struct RegistrationExtensionsClientOutputs {
    /// Whether the client used the legacy app id.
    #[serde(default)]
    pub appid: Option<bool>,

    /// Credential properties, when requested.
    #[serde(default)]
    pub cred_props: Option<CredProps>,
}
