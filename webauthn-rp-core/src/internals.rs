//! Internal structures for parsing webauthn registrations and challenges. This *may* change
//! at anytime and should not be relied on in your library.

use std::collections::BTreeMap;
use std::convert::TryFrom;

use serde::Deserialize;
use serde_cbor_2::Value;
use uuid::Uuid;
use webauthn_rp_proto::{CollectedClientData, CredentialID};

use crate::attestation::AttestationStatement;
use crate::error::WebauthnError;
use crate::interface::Aaguid;

const FLAG_USER_PRESENT: u8 = 0x01;
const FLAG_USER_VERIFIED: u8 = 0x04;
const FLAG_ATTESTED_CREDENTIAL_DATA: u8 = 0x40;
const FLAG_EXTENSION_DATA: u8 = 0x80;

/// Decode the first CBOR item of `data`. Anything after that item is ignored, since some
/// authenticators append padding to their responses.
pub fn decode_cbor_first(data: &[u8]) -> Result<Value, WebauthnError> {
    let mut de = serde_cbor_2::Deserializer::from_slice(data);
    Value::deserialize(&mut de).map_err(WebauthnError::ParseCBORFailure)
}

/// Render an AAGUID as a hyphenated, lowercase uuid.
pub fn format_aaguid(aaguid: &Aaguid) -> String {
    Uuid::from_bytes(*aaguid).hyphenated().to_string()
}

/// Attested Credential Data
#[derive(Debug, Clone)]
pub(crate) struct AttestedCredentialData {
    /// The guid of the authenticator. May indicate manufacturer.
    pub(crate) aaguid: Aaguid,
    /// The credential ID.
    pub(crate) credential_id: CredentialID,
    /// The credentials public Key.
    pub(crate) credential_pk: Value,
    /// The public key exactly as the authenticator encoded it.
    pub(crate) credential_pk_bytes: Vec<u8>,
}

/// Data returned by this authenticator during registration and authentication.
#[derive(Debug, Clone)]
pub(crate) struct AuthenticatorData {
    /// Hash of the relying party id.
    pub(crate) rp_id_hash: [u8; 32],
    /// The counter of this credentials activations.
    pub(crate) counter: u32,
    /// Flag if the user was present.
    pub(crate) user_present: bool,
    /// Flag is the user verified to the device. Implies presence.
    pub(crate) user_verified: bool,
    /// The optional attestation.
    pub(crate) acd: Option<AttestedCredentialData>,
    /// Extensions supplied by the device.
    pub(crate) extensions: Option<BTreeMap<Value, Value>>,
}

fn cbor_parser(i: &[u8]) -> nom::IResult<&[u8], (Value, &[u8])> {
    let mut de = serde_cbor_2::Deserializer::from_slice(i);
    let v = Value::deserialize(&mut de).map_err(|e| {
        debug!(?e, "invalid cbor within authenticator data");
        nom::Err::Failure(nom::error::Error::new(i, nom::error::ErrorKind::Verify))
    })?;

    let (consumed, rem) = i.split_at(de.byte_offset());
    Ok((rem, (v, consumed)))
}

fn extensions_parser(i: &[u8]) -> nom::IResult<&[u8], BTreeMap<Value, Value>> {
    let (rem, (v, _)) = cbor_parser(i)?;
    match v {
        Value::Map(m) => Ok((rem, m)),
        _ => Err(nom::Err::Failure(nom::error::Error::new(
            i,
            nom::error::ErrorKind::MapRes,
        ))),
    }
}

fn acd_parser(i: &[u8]) -> nom::IResult<&[u8], AttestedCredentialData> {
    let (i, aaguid_bytes) = nom::bytes::complete::take(16usize)(i)?;
    let (i, cred_id) = nom::multi::length_data(nom::number::complete::be_u16)(i)?;
    let (i, (cred_pk, cred_pk_bytes)) = cbor_parser(i)?;

    let mut aaguid: Aaguid = [0; 16];
    aaguid.copy_from_slice(aaguid_bytes);

    Ok((
        i,
        AttestedCredentialData {
            aaguid,
            credential_id: cred_id.into(),
            credential_pk: cred_pk,
            credential_pk_bytes: cred_pk_bytes.to_vec(),
        },
    ))
}

fn authenticator_data_parser(i: &[u8]) -> nom::IResult<&[u8], AuthenticatorData> {
    let (i, rp_id_hash_bytes) = nom::bytes::complete::take(32usize)(i)?;
    let (i, flags) = nom::number::complete::be_u8(i)?;
    let (i, counter) = nom::number::complete::be_u32(i)?;
    let (i, acd) =
        nom::combinator::cond(flags & FLAG_ATTESTED_CREDENTIAL_DATA != 0, acd_parser)(i)?;
    let (i, extensions) =
        nom::combinator::cond(flags & FLAG_EXTENSION_DATA != 0, extensions_parser)(i)?;

    let mut rp_id_hash = [0; 32];
    rp_id_hash.copy_from_slice(rp_id_hash_bytes);

    Ok((
        i,
        AuthenticatorData {
            rp_id_hash,
            counter,
            user_present: flags & FLAG_USER_PRESENT != 0,
            user_verified: flags & FLAG_USER_VERIFIED != 0,
            acd,
            extensions,
        },
    ))
}

impl TryFrom<&[u8]> for AuthenticatorData {
    type Error = WebauthnError;

    fn try_from(auth_data_bytes: &[u8]) -> Result<Self, Self::Error> {
        let (rem, auth_data) = authenticator_data_parser(auth_data_bytes).map_err(|e| {
            debug!(?e, "unable to parse authenticator data");
            match e {
                nom::Err::Error(e) | nom::Err::Failure(e)
                    if e.code == nom::error::ErrorKind::Eof =>
                {
                    WebauthnError::ParseInsufficientBytesAvailable
                }
                nom::Err::Incomplete(_) => WebauthnError::ParseInsufficientBytesAvailable,
                _ => WebauthnError::ParseNOMFailure,
            }
        })?;

        if !rem.is_empty() {
            debug!(trailing = rem.len(), "authenticator data has unaccounted bytes");
            return Err(WebauthnError::ParseTrailingBytes);
        }

        trace!(?auth_data);
        Ok(auth_data)
    }
}

/// The decoded attestation object of a registration.
#[derive(Debug)]
pub(crate) struct AttestationObject {
    /// The declared attestation format.
    pub(crate) fmt: String,
    /// The attestation statement, decoded for its format.
    pub(crate) att_stmt: AttestationStatement,
    /// The authenticator data as signed by the authenticator.
    pub(crate) auth_data_bytes: Vec<u8>,
    /// The parsed authenticator data.
    pub(crate) auth_data: AuthenticatorData,
}

impl TryFrom<&[u8]> for AttestationObject {
    type Error = WebauthnError;

    fn try_from(data: &[u8]) -> Result<Self, Self::Error> {
        let value = decode_cbor_first(data)?;
        let m = cbor_try_map!(&value)?;

        let fmt = cbor_get_text_key!(m, "fmt")
            .ok_or(WebauthnError::AttestationStatementMapInvalid)
            .and_then(|v| {
                cbor_try_string!(v).map_err(|_| WebauthnError::AttestationStatementMapInvalid)
            })?
            .clone();

        let att_stmt = cbor_get_text_key!(m, "attStmt")
            .ok_or(WebauthnError::AttestationStatementMapInvalid)?;
        let att_stmt = AttestationStatement::try_from((fmt.as_str(), att_stmt))?;

        let auth_data_bytes = cbor_get_text_key!(m, "authData")
            .ok_or(WebauthnError::MissingAttestationCredentialData)
            .and_then(|v| {
                cbor_try_bytes!(v).map_err(|_| WebauthnError::MissingAttestationCredentialData)
            })?
            .clone();

        let auth_data = AuthenticatorData::try_from(auth_data_bytes.as_slice())?;

        Ok(AttestationObject {
            fmt,
            att_stmt,
            auth_data_bytes,
            auth_data,
        })
    }
}

/// Decode the clientDataJSON of a ceremony. This must be valid UTF-8 JSON.
pub fn decode_client_data(client_data_json: &[u8]) -> Result<CollectedClientData, WebauthnError> {
    let client_data: CollectedClientData =
        serde_json::from_slice(client_data_json).map_err(WebauthnError::ParseJSONFailure)?;
    trace!(?client_data);
    Ok(client_data)
}
