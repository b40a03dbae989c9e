#![allow(clippy::unwrap_used)]

use crate::attest::RegisterPublicKeyCredential;
use crate::auth::{PublicKeyCredential, PublicKeyCredentialRequestOptions};
use crate::options::UserVerificationPolicy;
use crate::Base64UrlSafeData;

const FIREFOX_NONE_REGISTRATION: &str = r#"{
    "id": "AfJfonHsXY_f7_gFmV1dI473Ce--_g0tHhdXUoh7JmMn0gzhYUtU9bFqpCgSljjwJxEXkjzb-11ulePZyI0RiyQ",
    "rawId": "AfJfonHsXY_f7_gFmV1dI473Ce--_g0tHhdXUoh7JmMn0gzhYUtU9bFqpCgSljjwJxEXkjzb-11ulePZyI0RiyQ",
    "response": {
        "attestationObject": "o2NmbXRkbm9uZWdhdHRTdG10oGhhdXRoRGF0YVjFarm78N-aFvkduzO7sTL6-dF8eCxIJsbscOzuWNl-9SpFAAAAAAAAAAAAAAAAAAAAAAAAAAAAQQHyX6Jx7F2P3-_4BZldXSOO9wnvvv4NLR4XV1KIeyZjJ9IM4WFLVPWxaqQoEpY48CcRF5I82_tdbpXj2ciNEYskpQECAyYgASFYIE_9awy66uhXZ6hIzPAW2AzIrTMZ7kyC2jtZe0zuH_pOIlggFbNKhOSt8-prIx0snKRqcxULtc2u1rzUUf47g1PxTcU",
        "clientDataJSON": "eyJ0eXBlIjoid2ViYXV0aG4uY3JlYXRlIiwiY2hhbGxlbmdlIjoidF9XZTEzMU5wd2xseVBMMHgyNmJ6WmdrRjVmX1h2QTdPY2I0Yjk4emx4TSIsIm9yaWdpbiI6Imh0dHBzOlwvXC93ZWJhdXRobi5maXJzdHllYXIuaWQuYXUiLCJhbmRyb2lkUGFja2FnZU5hbWUiOiJvcmcubW96aWxsYS5maXJlZm94In0"
    },
    "type": "public-key",
    "clientExtensionResults": {"credProps":{"rk":false}},
    "transports": ["usb", "nfc"]
    }"#;

#[test]
fn parse_cred_props() {
    let rsp_d: RegisterPublicKeyCredential =
        serde_json::from_str(FIREFOX_NONE_REGISTRATION).unwrap();

    assert_eq!(
        rsp_d.extensions.cred_props.as_ref().map(|c| c.rk),
        Some(false)
    );
    assert_eq!(rsp_d.raw_id.len(), 65);
    assert_eq!(rsp_d.transports().map(|t| t.len()), Some(2));

    // The older "extensions" key is still accepted.
    let legacy = FIREFOX_NONE_REGISTRATION.replace("clientExtensionResults", "extensions");
    let rsp_d: RegisterPublicKeyCredential = serde_json::from_str(&legacy).unwrap();
    assert!(rsp_d.extensions.cred_props.is_some());
}

#[test]
fn parse_assertion_without_user_handle() {
    let rsp_d: PublicKeyCredential = serde_json::from_str(
        r#"{
        "id": "AAEC",
        "rawId": "AAEC",
        "response": {
            "authenticatorData": "AAEC",
            "clientDataJSON": "AAEC",
            "signature": "AAEC"
        },
        "type": "public-key",
        "clientExtensionResults": {}
    }"#,
    )
    .unwrap();

    assert!(rsp_d.get_user_unique_id().is_none());
    assert_eq!(rsp_d.get_credential_id(), &[0, 1, 2]);
}

#[test]
fn request_options_omit_missing_allow_list() {
    let opts = PublicKeyCredentialRequestOptions {
        challenge: Base64UrlSafeData(vec![0; 4]),
        timeout: Some(60000),
        rp_id: None,
        allow_credentials: None,
        user_verification: UserVerificationPolicy::Preferred,
        extensions: None,
    };

    let json = serde_json::to_value(&opts).unwrap();
    assert!(json.get("allowCredentials").is_none());
    assert!(json.get("rpId").is_none());
    assert_eq!(json["userVerification"], "preferred");
    assert_eq!(json["challenge"], "AAAAAA");
}
