//! Cryptographic operation wrapper for Webauthn. This module exists to
//! allow ease of auditing, safe operation wrappers for the webauthn library,
//! and cryptographic provider abstraction. This module currently uses OpenSSL
//! as the cryptographic primitive provider.

#![allow(non_camel_case_types)]

use std::convert::TryFrom;

use openssl::{bn, ec, hash, nid, pkey, rsa, sign, x509};
use serde_cbor_2::Value;

use super::error::*;
use crate::interface::*;
use webauthn_rp_proto::cose::COSEAlgorithm;

impl TryFrom<i128> for ECDSACurve {
    type Error = WebauthnError;
    fn try_from(u: i128) -> Result<Self, Self::Error> {
        match u {
            1 => Ok(ECDSACurve::SECP256R1),
            2 => Ok(ECDSACurve::SECP384R1),
            3 => Ok(ECDSACurve::SECP521R1),
            _ => Err(WebauthnError::COSEKeyECDSAInvalidCurve),
        }
    }
}

impl TryFrom<nid::Nid> for ECDSACurve {
    type Error = WebauthnError;
    fn try_from(nid: nid::Nid) -> Result<Self, Self::Error> {
        match nid {
            nid::Nid::X9_62_PRIME256V1 => Ok(ECDSACurve::SECP256R1),
            nid::Nid::SECP384R1 => Ok(ECDSACurve::SECP384R1),
            nid::Nid::SECP521R1 => Ok(ECDSACurve::SECP521R1),
            _ => Err(WebauthnError::COSEKeyECDSAInvalidCurve),
        }
    }
}

impl ECDSACurve {
    fn to_openssl_nid(self) -> nid::Nid {
        match self {
            ECDSACurve::SECP256R1 => nid::Nid::X9_62_PRIME256V1,
            ECDSACurve::SECP384R1 => nid::Nid::SECP384R1,
            ECDSACurve::SECP521R1 => nid::Nid::SECP521R1,
        }
    }

    /// The size in bytes of a single coordinate on this curve.
    pub(crate) fn coordinate_size(self) -> usize {
        match self {
            ECDSACurve::SECP256R1 => 32,
            ECDSACurve::SECP384R1 => 48,
            ECDSACurve::SECP521R1 => 66,
        }
    }
}

impl TryFrom<i128> for EDDSACurve {
    type Error = WebauthnError;
    fn try_from(u: i128) -> Result<Self, Self::Error> {
        match u {
            6 => Ok(EDDSACurve::ED25519),
            7 => Ok(EDDSACurve::ED448),
            _ => Err(WebauthnError::COSEKeyEDDSAInvalidCurve),
        }
    }
}

impl EDDSACurve {
    fn to_openssl_id(self) -> pkey::Id {
        match self {
            EDDSACurve::ED25519 => pkey::Id::ED25519,
            EDDSACurve::ED448 => pkey::Id::ED448,
        }
    }

    fn coordinate_size(self) -> usize {
        match self {
            EDDSACurve::ED25519 => 32,
            EDDSACurve::ED448 => 57,
        }
    }
}

/// The digest an algorithm signs over. EdDSA signs the message directly, so it has none.
pub(crate) fn hash_from_alg(alg: COSEAlgorithm) -> Option<hash::MessageDigest> {
    match alg {
        COSEAlgorithm::ES256 | COSEAlgorithm::RS256 | COSEAlgorithm::PS256 => {
            Some(hash::MessageDigest::sha256())
        }
        COSEAlgorithm::ES384 | COSEAlgorithm::RS384 | COSEAlgorithm::PS384 => {
            Some(hash::MessageDigest::sha384())
        }
        COSEAlgorithm::ES512 | COSEAlgorithm::RS512 | COSEAlgorithm::PS512 => {
            Some(hash::MessageDigest::sha512())
        }
        COSEAlgorithm::INSECURE_RS1 => {
            warn!("INSECURE SHA1 USAGE DETECTED");
            Some(hash::MessageDigest::sha1())
        }
        COSEAlgorithm::EDDSA => None,
    }
}

fn pkey_matches_alg(alg: COSEAlgorithm, pkey: &pkey::PKeyRef<pkey::Public>) -> bool {
    match alg {
        COSEAlgorithm::ES256 | COSEAlgorithm::ES384 | COSEAlgorithm::ES512 => {
            pkey.id() == pkey::Id::EC
        }
        COSEAlgorithm::RS256
        | COSEAlgorithm::RS384
        | COSEAlgorithm::RS512
        | COSEAlgorithm::PS256
        | COSEAlgorithm::PS384
        | COSEAlgorithm::PS512
        | COSEAlgorithm::INSECURE_RS1 => pkey.id() == pkey::Id::RSA,
        COSEAlgorithm::EDDSA => pkey.id() == pkey::Id::ED25519 || pkey.id() == pkey::Id::ED448,
    }
}

fn verify_with_pkey(
    alg: COSEAlgorithm,
    pkey: &pkey::PKeyRef<pkey::Public>,
    signature: &[u8],
    verification_data: &[u8],
) -> Result<bool, WebauthnError> {
    if !pkey_matches_alg(alg, pkey) {
        debug!(?alg, key_id = ?pkey.id(), "public key does not match the algorithm");
        return Err(WebauthnError::CertificatePublicKeyInvalid);
    }

    let mut verifier = match hash_from_alg(alg) {
        Some(md) => sign::Verifier::new(md, pkey)?,
        None => sign::Verifier::new_without_digest(pkey)?,
    };

    match alg {
        COSEAlgorithm::PS256 | COSEAlgorithm::PS384 | COSEAlgorithm::PS512 => {
            verifier.set_rsa_padding(rsa::Padding::PKCS1_PSS)?;
            verifier.set_rsa_pss_saltlen(sign::RsaPssSaltlen::DIGEST_LENGTH)?;
        }
        COSEAlgorithm::RS256
        | COSEAlgorithm::RS384
        | COSEAlgorithm::RS512
        | COSEAlgorithm::INSECURE_RS1 => {
            verifier.set_rsa_padding(rsa::Padding::PKCS1)?;
        }
        _ => {}
    }

    let res = if alg == COSEAlgorithm::EDDSA {
        verifier.verify_oneshot(signature, verification_data)
    } else {
        verifier
            .update(verification_data)
            .and_then(|_| verifier.verify(signature))
    };

    // A signature openssl can't even decode is just an invalid signature.
    Ok(res.unwrap_or_else(|e| {
        debug!(?e, "signature rejected during decode");
        false
    }))
}

/// Validate an x509 signature is valid for the supplied data
pub(crate) fn verify_signature(
    alg: COSEAlgorithm,
    pubk: &x509::X509,
    signature: &[u8],
    verification_data: &[u8],
) -> Result<bool, WebauthnError> {
    let pkey = pubk.public_key()?;
    verify_with_pkey(alg, &pkey, signature, verification_data)
}

/// Check the certificate requirements of a packed attestation certificate.
/// <https://w3c.github.io/webauthn/#sctn-packed-attestation-cert-requirements>
pub(crate) fn assert_packed_attest_req(pubk: &x509::X509) -> Result<(), WebauthnError> {
    // Version MUST be set to 3 (which is indicated by an ASN.1 INTEGER with value 2).
    if pubk.version() != 2 {
        debug!(version = pubk.version(), "packed attestation cert is not v3");
        return Err(WebauthnError::AttestationCertificateRequirementsNotMet);
    }

    // Subject field MUST be set to:
    //
    // Subject-C
    //  ISO 3166 code specifying the country where the Authenticator vendor is incorporated (PrintableString)
    // Subject-O
    //  Legal name of the Authenticator vendor (UTF8String)
    // Subject-OU
    //  Literal string “Authenticator Attestation” (UTF8String)
    // Subject-CN
    //  A UTF8String of the vendor’s choosing
    let subject = pubk.subject_name();

    let has_entry = |n: nid::Nid| subject.entries_by_nid(n).next().is_some();

    if !(has_entry(nid::Nid::COUNTRYNAME)
        && has_entry(nid::Nid::ORGANIZATIONNAME)
        && has_entry(nid::Nid::COMMONNAME))
    {
        debug!("packed attestation cert subject is incomplete");
        return Err(WebauthnError::AttestationCertificateRequirementsNotMet);
    }

    let subject_ou = subject
        .entries_by_nid(nid::Nid::ORGANIZATIONALUNITNAME)
        .next()
        .ok_or(WebauthnError::AttestationCertificateRequirementsNotMet)?;

    let ou = subject_ou.data().as_utf8()?;
    if ou.to_string() != "Authenticator Attestation" {
        debug!("packed attestation cert OU is not 'Authenticator Attestation'");
        return Err(WebauthnError::AttestationCertificateRequirementsNotMet);
    }

    // The Basic Constraints extension MUST have the CA component set to false.
    let der_bytes = pubk.to_der()?;
    let (_, cert) = x509_parser::parse_x509_certificate(&der_bytes)
        .map_err(|_| WebauthnError::AttestationStatementX5CInvalid)?;

    let is_ca = cert
        .basic_constraints()
        .map_err(|_| WebauthnError::AttestationCertificateRequirementsNotMet)?
        .map(|bc| bc.value.ca)
        .unwrap_or(false);

    if is_ca {
        debug!("packed attestation cert is a CA");
        return Err(WebauthnError::AttestationCertificateRequirementsNotMet);
    }

    Ok(())
}

fn cbor_int_field(m: &std::collections::BTreeMap<Value, Value>, k: i128) -> Option<&Value> {
    m.get(&Value::Integer(k))
}

impl TryFrom<&Value> for COSEKey {
    type Error = WebauthnError;
    fn try_from(d: &Value) -> Result<COSEKey, Self::Error> {
        let m = cbor_try_map!(d)?;

        // See also https://tools.ietf.org/html/rfc8152#section-3.1
        // 1 is the key type, 3 the algorithm, and negative labels are key type specific.
        let key_type_value =
            cbor_int_field(m, 1).ok_or(WebauthnError::COSEKeyInvalidCBORValue)?;
        let key_type = cbor_try_i128!(key_type_value)?;

        let content_type_value =
            cbor_int_field(m, 3).ok_or(WebauthnError::COSEKeyInvalidCBORValue)?;
        let content_type = cbor_try_i128!(content_type_value)?;

        let type_ = COSEAlgorithm::try_from(content_type)
            .map_err(|_| WebauthnError::COSEKeyInvalidAlgorithm)?;

        let key = match type_ {
            COSEAlgorithm::ES256 | COSEAlgorithm::ES384 | COSEAlgorithm::ES512
                if key_type == COSEKeyTypeId::EC_EC2 as i128 =>
            {
                // crv (-1), x (-2) and y (-3)
                let curve_type_value =
                    cbor_int_field(m, -1).ok_or(WebauthnError::COSEKeyInvalidCBORValue)?;
                let curve = cbor_try_i128!(curve_type_value).and_then(ECDSACurve::try_from)?;

                let x_value = cbor_int_field(m, -2).ok_or(WebauthnError::COSEKeyECDSAXYInvalid)?;
                let x = cbor_try_bytes!(x_value)?;

                let y_value = cbor_int_field(m, -3).ok_or(WebauthnError::COSEKeyECDSAXYInvalid)?;
                let y = cbor_try_bytes!(y_value)?;

                let coord_len = curve.coordinate_size();
                if x.len() != coord_len || y.len() != coord_len {
                    return Err(WebauthnError::COSEKeyECDSAXYInvalid);
                }

                COSEKeyType::EC_EC2(COSEEC2Key {
                    curve,
                    x: x.clone().into(),
                    y: y.clone().into(),
                })
            }
            COSEAlgorithm::RS256
            | COSEAlgorithm::RS384
            | COSEAlgorithm::RS512
            | COSEAlgorithm::PS256
            | COSEAlgorithm::PS384
            | COSEAlgorithm::PS512
            | COSEAlgorithm::INSECURE_RS1
                if key_type == COSEKeyTypeId::EC_RSA as i128 =>
            {
                // n (-1), e (-2)
                let n_value = cbor_int_field(m, -1).ok_or(WebauthnError::COSEKeyRSANEInvalid)?;
                let n = cbor_try_bytes!(n_value)?;

                let e_value = cbor_int_field(m, -2).ok_or(WebauthnError::COSEKeyRSANEInvalid)?;
                let e = cbor_try_bytes!(e_value)?;

                if n.is_empty() || e.is_empty() {
                    return Err(WebauthnError::COSEKeyRSANEInvalid);
                }

                COSEKeyType::RSA(COSERSAKey {
                    n: n.clone().into(),
                    e: e.clone().into(),
                })
            }
            COSEAlgorithm::EDDSA if key_type == COSEKeyTypeId::EC_OKP as i128 => {
                // https://datatracker.ietf.org/doc/html/rfc8152#section-13.2
                let curve_type_value =
                    cbor_int_field(m, -1).ok_or(WebauthnError::COSEKeyInvalidCBORValue)?;
                let curve = cbor_try_i128!(curve_type_value).and_then(EDDSACurve::try_from)?;

                let x_value =
                    cbor_int_field(m, -2).ok_or(WebauthnError::COSEKeyInvalidCBORValue)?;
                let x = cbor_try_bytes!(x_value)?;

                if x.len() != curve.coordinate_size() {
                    return Err(WebauthnError::COSEKeyInvalidCBORValue);
                }

                COSEKeyType::EC_OKP(COSEOKPKey {
                    curve,
                    x: x.clone().into(),
                })
            }
            _ => {
                debug!(?key_type, ?type_, "WebauthnError::COSEKeyInvalidType");
                return Err(WebauthnError::COSEKeyInvalidType);
            }
        };

        let cose_key = COSEKey { type_, key };

        // The rfc additionally states:
        //   "   Applications MUST check that the curve and the key type are
        //     consistent and reject a key if they are not."
        // this means feeding the values to openssl to validate them for us!
        cose_key.validate()?;
        Ok(cose_key)
    }
}

impl TryFrom<(COSEAlgorithm, &x509::X509)> for COSEKey {
    type Error = WebauthnError;
    fn try_from((alg, pubk): (COSEAlgorithm, &x509::X509)) -> Result<COSEKey, Self::Error> {
        let pkey = pubk.public_key()?;
        if !pkey_matches_alg(alg, &pkey) {
            debug!(?alg, key_id = ?pkey.id(), "certificate key does not match the algorithm");
            return Err(WebauthnError::CertificatePublicKeyInvalid);
        }

        let key = match alg {
            COSEAlgorithm::ES256 | COSEAlgorithm::ES384 | COSEAlgorithm::ES512 => {
                let ec_key = pkey.ec_key()?;
                let group = ec_key.group();
                let curve = group
                    .curve_name()
                    .ok_or(WebauthnError::OpenSSLErrorNoCurveName)
                    .and_then(ECDSACurve::try_from)?;

                let mut ctx = bn::BigNumContext::new()?;
                let mut xbn = bn::BigNum::new()?;
                let mut ybn = bn::BigNum::new()?;
                ec_key
                    .public_key()
                    .affine_coordinates_gfp(group, &mut xbn, &mut ybn, &mut ctx)?;

                let coord_len = curve.coordinate_size() as i32;
                COSEKeyType::EC_EC2(COSEEC2Key {
                    curve,
                    x: xbn.to_vec_padded(coord_len)?.into(),
                    y: ybn.to_vec_padded(coord_len)?.into(),
                })
            }
            COSEAlgorithm::RS256
            | COSEAlgorithm::RS384
            | COSEAlgorithm::RS512
            | COSEAlgorithm::PS256
            | COSEAlgorithm::PS384
            | COSEAlgorithm::PS512
            | COSEAlgorithm::INSECURE_RS1 => {
                let rsa_key = pkey.rsa()?;
                COSEKeyType::RSA(COSERSAKey {
                    n: rsa_key.n().to_vec().into(),
                    e: rsa_key.e().to_vec().into(),
                })
            }
            COSEAlgorithm::EDDSA => {
                let curve = if pkey.id() == pkey::Id::ED448 {
                    EDDSACurve::ED448
                } else {
                    EDDSACurve::ED25519
                };
                COSEKeyType::EC_OKP(COSEOKPKey {
                    curve,
                    x: pkey.raw_public_key()?.into(),
                })
            }
        };

        Ok(COSEKey { type_: alg, key })
    }
}

impl COSEKey {
    pub(crate) fn get_alg_key_ecc_x962_raw(&self) -> Result<Vec<u8>, WebauthnError> {
        // Let publicKeyU2F be the concatenation 0x04 || x || y.
        // Note: This signifies uncompressed ECC key format.
        match &self.key {
            COSEKeyType::EC_EC2(ecpk) => {
                let r: [u8; 1] = [0x04];
                Ok(r.iter()
                    .chain(ecpk.x.as_ref().iter())
                    .chain(ecpk.y.as_ref().iter())
                    .copied()
                    .collect())
            }
            _ => {
                debug!("get_alg_key_ecc_x962_raw");
                Err(WebauthnError::COSEKeyInvalidType)
            }
        }
    }

    /// The raw key material of this key.
    pub fn get_verification_key(&self) -> VerificationKey {
        match &self.key {
            COSEKeyType::EC_EC2(ecpk) => {
                let mut point = Vec::with_capacity(1 + ecpk.x.len() + ecpk.y.len());
                point.push(0x04);
                point.extend_from_slice(ecpk.x.as_ref());
                point.extend_from_slice(ecpk.y.as_ref());
                VerificationKey::EcPoint(point)
            }
            COSEKeyType::RSA(rsak) => VerificationKey::Rsa {
                n: rsak.n.clone().into(),
                e: rsak.e.clone().into(),
            },
            COSEKeyType::EC_OKP(edk) => VerificationKey::Okp(edk.x.clone().into()),
        }
    }

    pub(crate) fn validate(&self) -> Result<(), WebauthnError> {
        self.get_openssl_pkey().map(|_| ())
    }

    /// Retrieve the public key of this COSEKey as an OpenSSL structure
    pub(crate) fn get_openssl_pkey(&self) -> Result<pkey::PKey<pkey::Public>, WebauthnError> {
        match &self.key {
            COSEKeyType::EC_EC2(ec2k) => {
                let group = ec::EcGroup::from_curve_name(ec2k.curve.to_openssl_nid())?;
                let xbn = bn::BigNum::from_slice(ec2k.x.as_ref())?;
                let ybn = bn::BigNum::from_slice(ec2k.y.as_ref())?;

                let ec_key = ec::EcKey::from_public_key_affine_coordinates(&group, &xbn, &ybn)
                    .map_err(|e| {
                        debug!(?e, "EC2 coordinates are not on the curve");
                        WebauthnError::COSEKeyECDSAXYInvalid
                    })?;

                ec_key.check_key().map_err(|e| {
                    debug!(?e, "EC2 key failed validation");
                    WebauthnError::COSEKeyECDSAXYInvalid
                })?;

                pkey::PKey::from_ec_key(ec_key).map_err(WebauthnError::OpenSSLError)
            }
            COSEKeyType::RSA(rsak) => {
                let nbn = bn::BigNum::from_slice(rsak.n.as_ref())?;
                let ebn = bn::BigNum::from_slice(rsak.e.as_ref())?;

                let rsa_key = rsa::Rsa::from_public_components(nbn, ebn)
                    .map_err(|_| WebauthnError::COSEKeyRSANEInvalid)?;

                pkey::PKey::from_rsa(rsa_key).map_err(WebauthnError::OpenSSLError)
            }
            COSEKeyType::EC_OKP(edk) => {
                pkey::PKey::public_key_from_raw_bytes(edk.x.as_ref(), edk.curve.to_openssl_id())
                    .map_err(|e| {
                        debug!(?e, "OKP key is invalid");
                        WebauthnError::COSEKeyEDDSAInvalidCurve
                    })
            }
        }
    }

    /// Verifies data was signed with this [COSEKey]. An invalid signature is `Ok(false)`,
    /// while a key that can't be used is an error.
    pub fn verify_signature(
        &self,
        signature: &[u8],
        verification_data: &[u8],
    ) -> Result<bool, WebauthnError> {
        let pkey = self.get_openssl_pkey()?;
        verify_with_pkey(self.type_, &pkey, signature, verification_data)
    }
}

/// Convert a CBOR encoded COSE public key to the raw key material a signature primitive
/// consumes. EC2 keys produce an uncompressed point. This is more lenient than [COSEKey]
/// parsing, since a point missing its Y coordinate is returned as `0x04 || X`.
pub fn cose_to_verification_key(cose_key: &Value) -> Result<VerificationKey, WebauthnError> {
    let m = cbor_try_map!(cose_key)?;

    let key_type_value = cbor_int_field(m, 1).ok_or(WebauthnError::COSEKeyInvalidCBORValue)?;
    let key_type = cbor_try_i128!(key_type_value)?;

    if key_type == COSEKeyTypeId::EC_EC2 as i128 {
        let x = cbor_int_field(m, -2)
            .ok_or(WebauthnError::COSEKeyECDSAXYInvalid)
            .and_then(|v| cbor_try_bytes!(v))?;

        let mut point = Vec::with_capacity(1 + x.len() * 2);
        point.push(0x04);
        point.extend_from_slice(x);

        if let Some(y_value) = cbor_int_field(m, -3) {
            point.extend_from_slice(cbor_try_bytes!(y_value)?);
        }

        Ok(VerificationKey::EcPoint(point))
    } else if key_type == COSEKeyTypeId::EC_RSA as i128 {
        let n = cbor_int_field(m, -1)
            .ok_or(WebauthnError::COSEKeyRSANEInvalid)
            .and_then(|v| cbor_try_bytes!(v))?;
        let e = cbor_int_field(m, -2)
            .ok_or(WebauthnError::COSEKeyRSANEInvalid)
            .and_then(|v| cbor_try_bytes!(v))?;

        Ok(VerificationKey::Rsa {
            n: n.clone(),
            e: e.clone(),
        })
    } else if key_type == COSEKeyTypeId::EC_OKP as i128 {
        let x = cbor_int_field(m, -2)
            .ok_or(WebauthnError::COSEKeyInvalidCBORValue)
            .and_then(|v| cbor_try_bytes!(v))?;
        Ok(VerificationKey::Okp(x.clone()))
    } else {
        debug!(?key_type, "WebauthnError::COSEKeyInvalidType");
        Err(WebauthnError::COSEKeyInvalidType)
    }
}

/// Compute the sha256 of a slice of data.
pub fn compute_sha256(data: &[u8]) -> [u8; 32] {
    openssl::sha::sha256(data)
}

#[cfg(test)]
mod tests {
    #![allow(clippy::panic)]

    use super::*;
    use hex_literal::hex;
    use openssl::ecdsa::EcdsaSig;

    fn p256_keypair() -> (pkey::PKey<pkey::Private>, COSEKey) {
        let group = ec::EcGroup::from_curve_name(nid::Nid::X9_62_PRIME256V1).unwrap();
        let ec_key = ec::EcKey::generate(&group).unwrap();

        let mut ctx = bn::BigNumContext::new().unwrap();
        let mut xbn = bn::BigNum::new().unwrap();
        let mut ybn = bn::BigNum::new().unwrap();
        ec_key
            .public_key()
            .affine_coordinates_gfp(&group, &mut xbn, &mut ybn, &mut ctx)
            .unwrap();

        let cose = COSEKey {
            type_: COSEAlgorithm::ES256,
            key: COSEKeyType::EC_EC2(COSEEC2Key {
                curve: ECDSACurve::SECP256R1,
                x: xbn.to_vec_padded(32).unwrap().into(),
                y: ybn.to_vec_padded(32).unwrap().into(),
            }),
        };

        (pkey::PKey::from_ec_key(ec_key).unwrap(), cose)
    }

    #[test]
    fn cbor_es256() {
        let hex_data = hex!(
                "A5"         // Map - 5 elements
                "01 02"      //   1:   2,  ; kty: EC2 key type
                "03 26"      //   3:  -7,  ; alg: ES256 signature algorithm
                "20 01"      //  -1:   1,  ; crv: P-256 curve
                "21 58 20   65eda5a12577c2bae829437fe338701a10aaa375e1bb5b5de108de439c08551d" // -2:   x,  ; x-coordinate
                "22 58 20   1e52ed75701163f7f9e40ddf9f341b3dc9ba860af7e0ca7ca7e9eecd0084d19c" // -3:   y,  ; y-coordinate
        );

        let val: Value = serde_cbor_2::from_slice(&hex_data).unwrap();
        let key = COSEKey::try_from(&val).unwrap();

        assert_eq!(key.type_, COSEAlgorithm::ES256);
        match &key.key {
            COSEKeyType::EC_EC2(pkey) => {
                assert_eq!(
                    pkey.x.as_ref(),
                    hex!("65eda5a12577c2bae829437fe338701a10aaa375e1bb5b5de108de439c08551d")
                );
                assert_eq!(
                    pkey.y.as_ref(),
                    hex!("1e52ed75701163f7f9e40ddf9f341b3dc9ba860af7e0ca7ca7e9eecd0084d19c")
                );
                assert_eq!(pkey.curve, ECDSACurve::SECP256R1);
            }
            _ => panic!("Key should be parsed EC2 key"),
        }

        match key.get_verification_key() {
            VerificationKey::EcPoint(p) => {
                assert_eq!(p.len(), 65);
                assert_eq!(p[0], 0x04);
            }
            _ => panic!("EC2 key should give a point"),
        }
    }

    #[test]
    fn cbor_es384() {
        let hex_data = hex!(
                "A5"         // Map - 5 elements
                "01 02"      //   1:   2,  ; kty: EC2 key type
                "03 38 22"   //   3:  -35,  ; alg: ES384 signature algorithm
                "20 02"      //  -1:   2,  ; crv: P-384 curve
                "21 58 30   ceeaf818731db7af2d02e029854823d71bdbf65fb0c6ff69" // -2: x, ; x-coordinate
                           "42c9cf891efe18ea81430517d777f5c43550da801be5bf2f"
                "22 58 30   dda1d0ead72e042efb7c36a38cc021abb2ca1a2e38159edd" // -3: y ; y-coordinate
                           "a8c25f391e9a38d79dd56b9427d1c7c70cfa778ab849b087"
        );

        let val: Value = serde_cbor_2::from_slice(&hex_data).unwrap();
        let key = COSEKey::try_from(&val).unwrap();

        assert_eq!(key.type_, COSEAlgorithm::ES384);
        match key.key {
            COSEKeyType::EC_EC2(pkey) => {
                assert_eq!(pkey.curve, ECDSACurve::SECP384R1);
                assert_eq!(pkey.x.len(), 48);
            }
            _ => panic!("Key should be parsed EC2 key"),
        }
    }

    #[test]
    fn cbor_es256_bad_point() {
        // Same key as cbor_es256 with the last byte of y altered, so it's off the curve.
        let hex_data = hex!(
                "A5"
                "01 02"
                "03 26"
                "20 01"
                "21 58 20   65eda5a12577c2bae829437fe338701a10aaa375e1bb5b5de108de439c08551d"
                "22 58 20   1e52ed75701163f7f9e40ddf9f341b3dc9ba860af7e0ca7ca7e9eecd0084d19d"
        );

        let val: Value = serde_cbor_2::from_slice(&hex_data).unwrap();
        assert!(matches!(
            COSEKey::try_from(&val),
            Err(WebauthnError::COSEKeyECDSAXYInvalid)
        ));
    }

    #[test]
    fn verification_key_lenient_forms() {
        // EC2 with only an x coordinate.
        let x_only = hex!("A3 01 02 03 26 21 43 010203");
        let val: Value = serde_cbor_2::from_slice(&x_only).unwrap();
        assert_eq!(
            cose_to_verification_key(&val).unwrap(),
            VerificationKey::EcPoint(vec![0x04, 0x01, 0x02, 0x03])
        );

        // EC2 missing x entirely.
        let no_x = hex!("A3 01 02 03 26 22 43 010203");
        let val: Value = serde_cbor_2::from_slice(&no_x).unwrap();
        assert!(matches!(
            cose_to_verification_key(&val),
            Err(WebauthnError::COSEKeyECDSAXYInvalid)
        ));

        // RSA missing the modulus.
        let no_n = hex!("A3 01 03 03 39 0100 21 43 010001");
        let val: Value = serde_cbor_2::from_slice(&no_n).unwrap();
        assert!(matches!(
            cose_to_verification_key(&val),
            Err(WebauthnError::COSEKeyRSANEInvalid)
        ));
    }

    #[test]
    fn p256_signature_and_tamper() {
        let _ = tracing_subscriber::fmt::try_init();
        let (private, cose) = p256_keypair();
        let data = b"authenticator data and client data hash";

        let mut signer = sign::Signer::new(hash::MessageDigest::sha256(), &private).unwrap();
        signer.update(data).unwrap();
        let sig = signer.sign_to_vec().unwrap();

        assert!(cose.verify_signature(&sig, data).unwrap());

        for i in 0..sig.len() {
            let mut bad_sig = sig.clone();
            bad_sig[i] ^= 0x01;
            assert!(!cose.verify_signature(&bad_sig, data).unwrap());
        }

        let mut bad_data = data.to_vec();
        bad_data[0] ^= 0x01;
        assert!(!cose.verify_signature(&sig, &bad_data).unwrap());
    }

    #[test]
    fn p256_known_answer() {
        // RFC 6979 A.2.5, P-256 with SHA-256 over "sample".
        let cose = COSEKey {
            type_: COSEAlgorithm::ES256,
            key: COSEKeyType::EC_EC2(COSEEC2Key {
                curve: ECDSACurve::SECP256R1,
                x: hex!("60FED4BA255A9D31C961EB74C6356D68C049B8923B61FA6CE669622E60F29FB6")
                    .to_vec()
                    .into(),
                y: hex!("7903FE1008B8BC99A41AE9E95628BC64F2F1B20C2D7E9F5177A3C294D4462299")
                    .to_vec()
                    .into(),
            }),
        };
        let r = hex!("EFD48B2AACB6A8FD1140DD9CD45E81D69D2C877B56AAF991C34D0EA84EAF3716");
        let s = hex!("F7CB1C942D657C41D436C7A1B6E29F65F3E900DBB9AFF4064DC4AB2F843ACDA8");

        let sig = EcdsaSig::from_private_components(
            bn::BigNum::from_slice(&r).unwrap(),
            bn::BigNum::from_slice(&s).unwrap(),
        )
        .unwrap()
        .to_der()
        .unwrap();

        assert!(cose.verify_signature(&sig, b"sample").unwrap());
        assert!(!cose.verify_signature(&sig, b"samplf").unwrap());

        // Webauthn ES256 signatures are DER, the raw r || s form must not verify.
        assert!(!cose.verify_signature(&[r, s].concat(), b"sample").unwrap());
    }

    #[test]
    fn rsa_pss_signature() {
        let private = pkey::PKey::from_rsa(rsa::Rsa::generate(2048).unwrap()).unwrap();
        let rsa_key = private.rsa().unwrap();
        let cose = COSEKey {
            type_: COSEAlgorithm::PS256,
            key: COSEKeyType::RSA(COSERSAKey {
                n: rsa_key.n().to_vec().into(),
                e: rsa_key.e().to_vec().into(),
            }),
        };
        let data = b"pss signed data";

        let mut signer = sign::Signer::new(hash::MessageDigest::sha256(), &private).unwrap();
        signer.set_rsa_padding(rsa::Padding::PKCS1_PSS).unwrap();
        signer
            .set_rsa_pss_saltlen(sign::RsaPssSaltlen::DIGEST_LENGTH)
            .unwrap();
        signer.update(data).unwrap();
        let sig = signer.sign_to_vec().unwrap();

        assert!(cose.verify_signature(&sig, data).unwrap());

        // The same signature is not valid under PKCS1 v1.5 padding.
        let pkcs1 = COSEKey {
            type_: COSEAlgorithm::RS256,
            ..cose
        };
        assert!(!pkcs1.verify_signature(&sig, data).unwrap());
    }

    #[test]
    fn ed25519_signature() {
        let private = pkey::PKey::generate_ed25519().unwrap();
        let cose = COSEKey {
            type_: COSEAlgorithm::EDDSA,
            key: COSEKeyType::EC_OKP(COSEOKPKey {
                curve: EDDSACurve::ED25519,
                x: private.raw_public_key().unwrap().into(),
            }),
        };
        let data = b"eddsa signs the message directly";

        let mut signer = sign::Signer::new_without_digest(&private).unwrap();
        let sig = signer.sign_oneshot_to_vec(data).unwrap();

        assert!(cose.verify_signature(&sig, data).unwrap());
        assert!(!cose.verify_signature(&sig, b"other data").unwrap());
    }

    #[test]
    fn sha256_vector() {
        assert_eq!(
            compute_sha256(b"webauthn.firstyear.id.au"),
            hex!("6ab9bbf0df9a16f91dbb33bbb132faf9d17c782c4826c6ec70ecee58d97ef52a")
        );
    }
}
