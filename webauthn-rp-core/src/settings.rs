//! The trust configuration used when verifying attestation. Root certificates are kept
//! per attestation format, and may be replaced at any time while ceremonies are running.

use std::collections::HashMap;
use std::fmt;
use std::sync::{Arc, RwLock};
use std::time::Duration;

use openssl::x509;
use uuid::Uuid;

use crate::attestation::AttestationFormat;
use crate::constants::DEFAULT_SAFETYNET_FRESHNESS_MS;
use crate::error::{WebauthnError, WebauthnResult};

/// A root certificate, either as raw DER or as a PEM document.
#[derive(Debug, Clone)]
pub enum RootCertificate {
    /// DER encoded certificate bytes.
    Der(Vec<u8>),
    /// A PEM encoded certificate.
    Pem(String),
}

impl RootCertificate {
    fn to_x509(&self) -> WebauthnResult<x509::X509> {
        match self {
            RootCertificate::Der(der) => x509::X509::from_der(der),
            RootCertificate::Pem(pem) => x509::X509::from_pem(pem.as_bytes()),
        }
        .map_err(|e| {
            debug!(?e, "unable to load root certificate");
            WebauthnError::Configuration
        })
    }
}

/// What an external metadata source knows about an authenticator model.
#[derive(Debug, Clone)]
pub struct MetadataStatement {
    /// The authenticator model this statement describes.
    pub aaguid: Uuid,
    /// A human readable description of the authenticator.
    pub description: String,
    /// The roots that attestation of this model must chain to.
    pub attestation_root_certificates: Vec<x509::X509>,
}

/// A source of authenticator metadata, such as a cached copy of the FIDO Metadata Service.
/// When it knows an AAGUID, its roots replace the per-format roots.
pub trait MetadataService: Send + Sync {
    /// Retrieve the statement for this authenticator model, if one is known.
    fn get_statement(&self, aaguid: &Uuid) -> Option<MetadataStatement>;
}

/// Root certificates and attestation policy shared by every ceremony.
pub struct SettingsService {
    roots: RwLock<HashMap<AttestationFormat, Arc<Vec<x509::X509>>>>,
    metadata: Option<Arc<dyn MetadataService>>,
    danger_disable_certificate_time_checks: bool,
    safetynet_freshness: Duration,
}

impl fmt::Debug for SettingsService {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SettingsService")
            .field("metadata", &self.metadata.is_some())
            .field(
                "danger_disable_certificate_time_checks",
                &self.danger_disable_certificate_time_checks,
            )
            .field("safetynet_freshness", &self.safetynet_freshness)
            .finish()
    }
}

impl Default for SettingsService {
    fn default() -> Self {
        SettingsService {
            roots: RwLock::new(HashMap::new()),
            metadata: None,
            danger_disable_certificate_time_checks: false,
            safetynet_freshness: Duration::from_millis(DEFAULT_SAFETYNET_FRESHNESS_MS as u64),
        }
    }
}

impl SettingsService {
    /// Create a settings service with no roots and the default policy.
    pub fn new() -> Self {
        Self::default()
    }

    /// Consult this metadata source before the per-format roots.
    pub fn with_metadata_service(mut self, metadata: Arc<dyn MetadataService>) -> Self {
        self.metadata = Some(metadata);
        self
    }

    /// Skip certificate validity period checks when validating chains. This exists
    /// so that captured attestations with expired certificates can still be tested,
    /// and must not be used in production.
    pub fn danger_disable_certificate_time_checks(mut self, disable: bool) -> Self {
        self.danger_disable_certificate_time_checks = disable;
        self
    }

    /// How old an android-safetynet response may be before it is rejected.
    pub fn safetynet_freshness(mut self, freshness: Duration) -> Self {
        self.safetynet_freshness = freshness;
        self
    }

    /// Replace the roots for a format. Every certificate is decoded before the
    /// existing roots are touched, so a bad certificate leaves them unchanged.
    pub fn set_root_certificates(
        &self,
        format: AttestationFormat,
        certificates: &[RootCertificate],
    ) -> WebauthnResult<()> {
        let certs = certificates
            .iter()
            .map(RootCertificate::to_x509)
            .collect::<WebauthnResult<Vec<_>>>()?;

        debug!(%format, count = certs.len(), "setting root certificates");

        let mut guard = self
            .roots
            .write()
            .map_err(|_| WebauthnError::SettingsPoisoned)?;
        guard.insert(format, Arc::new(certs));
        Ok(())
    }

    /// Add a single root for a format, keeping the existing ones.
    pub fn add_root_certificate(
        &self,
        format: AttestationFormat,
        certificate: &RootCertificate,
    ) -> WebauthnResult<()> {
        let cert = certificate.to_x509()?;

        let mut guard = self
            .roots
            .write()
            .map_err(|_| WebauthnError::SettingsPoisoned)?;
        let mut certs = guard
            .get(&format)
            .map(|existing| existing.as_ref().clone())
            .unwrap_or_default();
        certs.push(cert);
        guard.insert(format, Arc::new(certs));
        Ok(())
    }

    /// The roots currently configured for a format. This is a snapshot, later updates
    /// don't affect a validation that is already using it.
    pub fn get_root_certificates(
        &self,
        format: AttestationFormat,
    ) -> WebauthnResult<Arc<Vec<x509::X509>>> {
        let guard = self
            .roots
            .read()
            .map_err(|_| WebauthnError::SettingsPoisoned)?;
        Ok(guard.get(&format).cloned().unwrap_or_default())
    }

    /// Ask the metadata service about this authenticator model.
    pub fn get_metadata_statement(&self, aaguid: &Uuid) -> Option<MetadataStatement> {
        self.metadata
            .as_ref()
            .and_then(|md| md.get_statement(aaguid))
    }

    pub(crate) fn certificate_time_checks_disabled(&self) -> bool {
        self.danger_disable_certificate_time_checks
    }

    pub(crate) fn safetynet_freshness_window(&self) -> Duration {
        self.safetynet_freshness
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use openssl::asn1::Asn1Time;
    use openssl::bn::{BigNum, MsbOption};
    use openssl::ec::{EcGroup, EcKey};
    use openssl::hash::MessageDigest;
    use openssl::nid::Nid;
    use openssl::pkey::{PKey, Private};
    use openssl::x509::extension::{BasicConstraints, KeyUsage};
    use openssl::x509::{X509Name, X509};

    pub(crate) fn p256_key() -> PKey<Private> {
        let group = EcGroup::from_curve_name(Nid::X9_62_PRIME256V1).unwrap();
        PKey::from_ec_key(EcKey::generate(&group).unwrap()).unwrap()
    }

    pub(crate) fn build_name(entries: &[(Nid, &str)]) -> X509Name {
        let mut name = X509Name::builder().unwrap();
        for (nid, value) in entries {
            name.append_entry_by_nid(*nid, value).unwrap();
        }
        name.build()
    }

    /// Issue a certificate for `key`. When `issuer` is None the certificate is self signed.
    pub(crate) fn issue_cert(
        subject: &X509Name,
        key: &PKey<Private>,
        issuer: Option<(&X509, &PKey<Private>)>,
        is_ca: bool,
    ) -> X509 {
        let mut builder = X509::builder().unwrap();
        builder.set_version(2).unwrap();
        let serial = {
            let mut bn = BigNum::new().unwrap();
            bn.rand(64, MsbOption::MAYBE_ZERO, false).unwrap();
            bn.to_asn1_integer().unwrap()
        };
        builder.set_serial_number(&serial).unwrap();
        builder.set_subject_name(subject).unwrap();
        builder.set_pubkey(key).unwrap();
        builder
            .set_not_before(&Asn1Time::days_from_now(0).unwrap())
            .unwrap();
        builder
            .set_not_after(&Asn1Time::days_from_now(30).unwrap())
            .unwrap();

        if is_ca {
            builder
                .append_extension(BasicConstraints::new().critical().ca().build().unwrap())
                .unwrap();
            builder
                .append_extension(
                    KeyUsage::new()
                        .critical()
                        .key_cert_sign()
                        .crl_sign()
                        .build()
                        .unwrap(),
                )
                .unwrap();
        } else {
            builder
                .append_extension(BasicConstraints::new().build().unwrap())
                .unwrap();
        }

        match issuer {
            Some((issuer_cert, issuer_key)) => {
                builder
                    .set_issuer_name(issuer_cert.subject_name())
                    .unwrap();
                builder.sign(issuer_key, MessageDigest::sha256()).unwrap();
            }
            None => {
                builder.set_issuer_name(subject).unwrap();
                builder.sign(key, MessageDigest::sha256()).unwrap();
            }
        }
        builder.build()
    }

    pub(crate) struct StaticMetadata(pub(crate) MetadataStatement);

    impl MetadataService for StaticMetadata {
        fn get_statement(&self, aaguid: &Uuid) -> Option<MetadataStatement> {
            (aaguid == &self.0.aaguid).then(|| self.0.clone())
        }
    }

    #[test]
    fn roots_are_snapshots() {
        let settings = SettingsService::new();
        let key = p256_key();
        let name = build_name(&[(Nid::COMMONNAME, "Test Root")]);
        let root = issue_cert(&name, &key, None, true);

        assert!(settings
            .get_root_certificates(AttestationFormat::Packed)
            .unwrap()
            .is_empty());

        settings
            .set_root_certificates(
                AttestationFormat::Packed,
                &[RootCertificate::Der(root.to_der().unwrap())],
            )
            .unwrap();

        let snapshot = settings
            .get_root_certificates(AttestationFormat::Packed)
            .unwrap();
        assert_eq!(snapshot.len(), 1);

        let pem = String::from_utf8(root.to_pem().unwrap()).unwrap();
        settings
            .add_root_certificate(AttestationFormat::Packed, &RootCertificate::Pem(pem))
            .unwrap();

        // The earlier snapshot is unaffected by the update.
        assert_eq!(snapshot.len(), 1);
        assert_eq!(
            settings
                .get_root_certificates(AttestationFormat::Packed)
                .unwrap()
                .len(),
            2
        );

        // Other formats are independent.
        assert!(settings
            .get_root_certificates(AttestationFormat::FIDOU2F)
            .unwrap()
            .is_empty());
    }

    #[test]
    fn invalid_root_leaves_existing() {
        let settings = SettingsService::new();
        let key = p256_key();
        let name = build_name(&[(Nid::COMMONNAME, "Test Root")]);
        let root = issue_cert(&name, &key, None, true);

        settings
            .set_root_certificates(
                AttestationFormat::Apple,
                &[RootCertificate::Der(root.to_der().unwrap())],
            )
            .unwrap();

        let res = settings.set_root_certificates(
            AttestationFormat::Apple,
            &[
                RootCertificate::Der(root.to_der().unwrap()),
                RootCertificate::Pem("not a certificate".to_string()),
            ],
        );
        assert!(matches!(res, Err(WebauthnError::Configuration)));
        assert_eq!(
            settings
                .get_root_certificates(AttestationFormat::Apple)
                .unwrap()
                .len(),
            1
        );
    }

    #[test]
    fn metadata_lookup() {
        let aaguid = Uuid::from_bytes([7; 16]);
        let settings =
            SettingsService::new().with_metadata_service(Arc::new(StaticMetadata(
                MetadataStatement {
                    aaguid,
                    description: "Test Key".to_string(),
                    attestation_root_certificates: Vec::new(),
                },
            )));

        assert_eq!(
            settings
                .get_metadata_statement(&aaguid)
                .map(|s| s.description),
            Some("Test Key".to_string())
        );
        assert!(settings.get_metadata_statement(&Uuid::nil()).is_none());
    }
}
