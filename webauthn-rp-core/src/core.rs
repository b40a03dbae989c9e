//! The registration and authentication ceremonies. Options are generated for the browser,
//! and the responses are verified step by step, failing closed on the first check that
//! does not hold. Nothing in here persists state: the caller stores the challenge and the
//! resulting [Credential], and applies counter updates itself.

use std::sync::Arc;
use std::time::Duration;

use rand::rngs::OsRng;
use rand::RngCore;
use tracing::instrument;
use url::Url;
use uuid::Uuid;
use webauthn_rp_proto::*;

use crate::attestation::{verify_attestation, AttestationContext};
use crate::constants::*;
use crate::crypto::compute_sha256;
use crate::error::{WebauthnError, WebauthnResult};
use crate::interface::*;
use crate::internals::{
    decode_client_data, format_aaguid, AttestationObject, AuthenticatorData,
};
use crate::settings::SettingsService;

/// Generate a new random challenge from the system entropy source.
pub fn generate_challenge() -> WebauthnResult<Base64UrlSafeData> {
    let mut challenge = vec![0u8; CHALLENGE_SIZE_BYTES];
    OsRng.try_fill_bytes(&mut challenge).map_err(|e| {
        error!(?e, "unable to fill challenge from OsRng");
        WebauthnError::ChallengeGenerationFailed
    })?;
    Ok(challenge.into())
}

fn select_challenge(challenge: Option<Base64UrlSafeData>) -> WebauthnResult<Base64UrlSafeData> {
    match challenge {
        Some(c) if c.len() < MIN_CHALLENGE_SIZE_BYTES => {
            debug!(len = c.len(), "supplied challenge is too short");
            Err(WebauthnError::Configuration)
        }
        Some(c) => Ok(c),
        None => generate_challenge(),
    }
}

/// The inputs to [generate_registration_options]. Anything left empty takes its default.
#[derive(Debug, Clone, Default)]
pub struct GenerateRegistrationOptions {
    /// A human readable name of the relying party.
    pub rp_name: String,
    /// The relying party id, usually the effective domain of the site.
    pub rp_id: String,
    /// The user's unique id. This should not contain personal information.
    pub user_id: Base64UrlSafeData,
    /// The user name, such as an email address.
    pub user_name: String,
    /// The name shown for the user. Defaults to the user name.
    pub user_display_name: Option<String>,
    /// A caller supplied challenge. One is generated when absent.
    pub challenge: Option<Base64UrlSafeData>,
    /// Credentials the user already holds, so the same authenticator is not registered twice.
    pub exclude_credentials: Vec<PublicKeyCredentialDescriptor>,
    /// Requirements on the authenticator.
    pub authenticator_selection: Option<AuthenticatorSelectionCriteria>,
    /// Accepted credential algorithms, in order of preference. Empty selects every
    /// algorithm except RS1.
    pub supported_algorithms: Vec<COSEAlgorithm>,
    /// How long the browser should wait, in milliseconds.
    pub timeout: Option<u32>,
    /// The attestation the relying party would like to receive.
    pub attestation_type: Option<AttestationConveyancePreference>,
    /// Extensions to request.
    pub extensions: Option<RequestRegistrationExtensions>,
}

/// Build the options passed to `navigator.credentials.create()`.
#[instrument(level = "debug", skip_all)]
pub fn generate_registration_options(
    opts: GenerateRegistrationOptions,
) -> WebauthnResult<PublicKeyCredentialCreationOptions> {
    let GenerateRegistrationOptions {
        rp_name,
        rp_id,
        user_id,
        user_name,
        user_display_name,
        challenge,
        exclude_credentials,
        authenticator_selection,
        supported_algorithms,
        timeout,
        attestation_type,
        extensions,
    } = opts;

    let challenge = select_challenge(challenge)?;

    let supported_algorithms = if supported_algorithms.is_empty() {
        COSEAlgorithm::all_possible_algs()
    } else {
        supported_algorithms
    };

    let pub_key_cred_params = supported_algorithms
        .into_iter()
        .map(|alg| PubKeyCredParams {
            type_: CREDENTIAL_TYPE_PUBLIC_KEY.to_string(),
            alg: alg.into(),
        })
        .collect();

    // requireResidentKey mirrors residentKey for clients that only know the older field.
    let authenticator_selection = authenticator_selection
        .map(|mut sel| {
            if let Some(rk) = sel.resident_key {
                sel.require_resident_key = rk == ResidentKeyRequirement::Required;
            }
            sel
        })
        .unwrap_or_default();

    let display_name = user_display_name.unwrap_or_else(|| user_name.clone());

    let options = PublicKeyCredentialCreationOptions {
        challenge,
        rp: RelyingParty { name: rp_name, id: rp_id },
        user: User {
            id: user_id,
            name: user_name,
            display_name,
        },
        pub_key_cred_params,
        timeout: Some(timeout.unwrap_or(DEFAULT_AUTHENTICATOR_TIMEOUT)),
        attestation: Some(attestation_type.unwrap_or(AttestationConveyancePreference::None)),
        exclude_credentials,
        authenticator_selection: Some(authenticator_selection),
        extensions,
    };

    trace!(?options);
    Ok(options)
}

/// The inputs to [generate_authentication_options].
#[derive(Debug, Clone, Default)]
pub struct GenerateAuthenticationOptions {
    /// How long the browser should wait, in milliseconds.
    pub timeout: Option<u32>,
    /// The credentials that may be used. When absent the authenticator may offer any
    /// discoverable credential for this relying party.
    pub allow_credentials: Option<Vec<PublicKeyCredentialDescriptor>>,
    /// Defaults to preferred.
    pub user_verification: Option<UserVerificationPolicy>,
    /// The relying party id.
    pub rp_id: Option<String>,
    /// A caller supplied challenge. One is generated when absent.
    pub challenge: Option<Base64UrlSafeData>,
    /// Extensions to request.
    pub extensions: Option<RequestAuthenticationExtensions>,
}

/// Build the options passed to `navigator.credentials.get()`.
#[instrument(level = "debug", skip_all)]
pub fn generate_authentication_options(
    opts: GenerateAuthenticationOptions,
) -> WebauthnResult<PublicKeyCredentialRequestOptions> {
    let GenerateAuthenticationOptions {
        timeout,
        allow_credentials,
        user_verification,
        rp_id,
        challenge,
        extensions,
    } = opts;

    let challenge = select_challenge(challenge)?;

    // An empty list is omitted, never serialized as [].
    let allow_credentials = allow_credentials
        .filter(|creds| !creds.is_empty())
        .map(|creds| {
            creds
                .into_iter()
                .map(|desc| AllowCredentials {
                    type_: desc.type_,
                    id: desc.id,
                    transports: desc.transports,
                })
                .collect()
        });

    let options = PublicKeyCredentialRequestOptions {
        challenge,
        timeout: Some(timeout.unwrap_or(DEFAULT_AUTHENTICATOR_TIMEOUT)),
        rp_id,
        allow_credentials,
        user_verification: user_verification.unwrap_or_default(),
        extensions,
    };

    trace!(?options);
    Ok(options)
}

/// How the challenge in the client data is checked.
#[derive(Clone, Copy)]
pub enum ExpectedChallenge<'a> {
    /// The challenge must be exactly these bytes.
    Exact(&'a [u8]),
    /// The challenge must satisfy this predicate, for challenges that embed other data.
    Predicate(&'a dyn Fn(&[u8]) -> bool),
}

impl ExpectedChallenge<'_> {
    fn matches(&self, challenge: &[u8]) -> bool {
        match self {
            ExpectedChallenge::Exact(expected) => *expected == challenge,
            ExpectedChallenge::Predicate(predicate) => predicate(challenge),
        }
    }
}

/// The inputs to [verify_registration_response].
#[derive(Clone, Copy)]
pub struct VerifyRegistrationOptions<'a> {
    /// The credential the browser returned.
    pub credential: &'a RegisterPublicKeyCredential,
    /// The challenge issued for this ceremony.
    pub expected_challenge: ExpectedChallenge<'a>,
    /// The origins the response may come from.
    pub expected_origins: &'a [Url],
    /// The relying party ids the authenticator may have scoped the credential to.
    pub expected_rp_ids: &'a [String],
    /// Fail unless the authenticator verified the user.
    pub require_user_verification: bool,
    /// Accepted credential algorithms. Empty accepts every algorithm except RS1.
    pub supported_algorithms: &'a [COSEAlgorithm],
}

/// The inputs to [verify_authentication_response].
#[derive(Clone, Copy)]
pub struct VerifyAuthenticationOptions<'a> {
    /// The assertion the browser returned.
    pub credential: &'a PublicKeyCredential,
    /// The challenge issued for this ceremony.
    pub expected_challenge: ExpectedChallenge<'a>,
    /// The origins the response may come from.
    pub expected_origins: &'a [Url],
    /// The relying party ids the credential may be scoped to.
    pub expected_rp_ids: &'a [String],
    /// The stored credential the assertion claims to be made with.
    pub authenticator: &'a Credential,
    /// Fail unless the authenticator verified the user.
    pub require_user_verification: bool,
}

fn verify_credential_id(id: &str, raw_id: &Base64UrlSafeData, type_: &str) -> WebauthnResult<()> {
    if id.is_empty() || id != raw_id.to_base64url() {
        debug!(%id, "credential id missing or not the encoding of raw id");
        return Err(WebauthnError::InvalidCredentialId);
    }

    if type_ != CREDENTIAL_TYPE_PUBLIC_KEY {
        debug!(%type_, "credential type is not public-key");
        return Err(WebauthnError::InvalidCredentialType);
    }

    Ok(())
}

// Opaque origins, such as android apk hashes, are compared as strings.
fn origin_allowed(origin: &Url, expected_origins: &[Url]) -> bool {
    let origin_tuple = origin.origin();
    expected_origins.iter().any(|expected| {
        let expected_tuple = expected.origin();
        if origin_tuple.is_tuple() && expected_tuple.is_tuple() {
            origin_tuple == expected_tuple
        } else {
            origin.as_str() == expected.as_str()
        }
    })
}

fn verify_client_data(
    client_data_json: &[u8],
    expected_type: &str,
    expected_challenge: ExpectedChallenge<'_>,
    expected_origins: &[Url],
) -> WebauthnResult<CollectedClientData> {
    let client_data = decode_client_data(client_data_json)?;

    if client_data.type_ != expected_type {
        debug!(type_ = %client_data.type_, %expected_type, "client data type mismatch");
        return Err(WebauthnError::InvalidClientDataType);
    }

    if !expected_challenge.matches(client_data.challenge.as_ref()) {
        debug!("client data challenge mismatch");
        return Err(WebauthnError::MismatchedChallenge);
    }

    if !origin_allowed(&client_data.origin, expected_origins) {
        debug!(origin = %client_data.origin, "origin is not allowed");
        return Err(WebauthnError::InvalidRPOrigin);
    }

    if let Some(token_binding) = &client_data.token_binding {
        if !TOKEN_BINDING_STATUSES.contains(&token_binding.status.as_str()) {
            debug!(status = %token_binding.status, "unknown token binding status");
            return Err(WebauthnError::InvalidTokenBindingStatus);
        }
    }

    Ok(client_data)
}

fn verify_auth_data_flags(
    auth_data: &AuthenticatorData,
    expected_rp_ids: &[String],
    require_user_verification: bool,
) -> WebauthnResult<()> {
    if !expected_rp_ids
        .iter()
        .any(|rp_id| compute_sha256(rp_id.as_bytes()) == auth_data.rp_id_hash)
    {
        debug!("rp id hash does not match any expected rp id");
        return Err(WebauthnError::InvalidRPIDHash);
    }

    if !auth_data.user_present {
        debug!("user present flag not set");
        return Err(WebauthnError::UserNotPresent);
    }

    if require_user_verification && !auth_data.user_verified {
        debug!("user verification required but not performed");
        return Err(WebauthnError::UserNotVerified);
    }

    Ok(())
}

/// Verify the response to a registration ceremony. On success the returned
/// [VerifiedRegistration] holds the [Credential] to persist.
#[instrument(level = "debug", skip_all)]
pub fn verify_registration_response(
    opts: &VerifyRegistrationOptions<'_>,
    settings: &SettingsService,
) -> WebauthnResult<VerifiedRegistration> {
    let credential = opts.credential;

    verify_credential_id(&credential.id, &credential.raw_id, &credential.type_)?;

    verify_client_data(
        credential.response.client_data_json.as_ref(),
        CLIENT_DATA_TYPE_CREATE,
        opts.expected_challenge,
        opts.expected_origins,
    )?;

    let attestation_object_bytes = credential.response.attestation_object.as_ref();
    let attestation_object = AttestationObject::try_from(attestation_object_bytes)?;
    let auth_data = &attestation_object.auth_data;

    verify_auth_data_flags(
        auth_data,
        opts.expected_rp_ids,
        opts.require_user_verification,
    )?;

    let acd = auth_data
        .acd
        .as_ref()
        .ok_or(WebauthnError::MissingAttestationCredentialData)?;

    let credential_public_key = COSEKey::try_from(&acd.credential_pk)?;

    let allowed = if opts.supported_algorithms.is_empty() {
        COSEAlgorithm::all_possible_algs().contains(&credential_public_key.type_)
    } else {
        opts.supported_algorithms
            .contains(&credential_public_key.type_)
    };
    if !allowed {
        debug!(alg = ?credential_public_key.type_, "credential algorithm not supported");
        return Err(WebauthnError::CredentialAlteredAlgFromRequest);
    }

    trace!(extensions = ?auth_data.extensions);

    let client_data_hash = compute_sha256(credential.response.client_data_json.as_ref());

    let ctx = AttestationContext {
        auth_data,
        auth_data_bytes: &attestation_object.auth_data_bytes,
        acd,
        credential_public_key: &credential_public_key,
        client_data_hash: &client_data_hash,
    };

    let (fmt, attestation) = verify_attestation(&attestation_object.att_stmt, &ctx, settings)?;

    debug!(fmt = %attestation_object.fmt, "attestation verified");

    let credential_record = Credential {
        cred_id: acd.credential_id.clone(),
        cred: credential_public_key,
        counter: auth_data.counter,
        transports: credential.transports().map(|t| t.to_vec()),
        user_verified: auth_data.user_verified,
        aaguid: Uuid::from_bytes(acd.aaguid),
        attestation_format: fmt,
    };

    Ok(VerifiedRegistration {
        fmt,
        counter: auth_data.counter,
        aaguid: format_aaguid(&acd.aaguid),
        credential: credential_record,
        credential_public_key: acd.credential_pk_bytes.clone(),
        credential_type: CREDENTIAL_TYPE_PUBLIC_KEY.to_string(),
        user_verified: auth_data.user_verified,
        attestation_object: attestation_object_bytes.to_vec(),
        attestation,
    })
}

/// Verify the response to an authentication ceremony against the stored credential.
/// The credential is not modified, apply the result with [Credential::update_credential].
#[instrument(level = "debug", skip_all)]
pub fn verify_authentication_response(
    opts: &VerifyAuthenticationOptions<'_>,
) -> WebauthnResult<VerifiedAuthentication> {
    let credential = opts.credential;
    let authenticator = opts.authenticator;

    verify_credential_id(&credential.id, &credential.raw_id, &credential.type_)?;

    verify_client_data(
        credential.response.client_data_json.as_ref(),
        CLIENT_DATA_TYPE_GET,
        opts.expected_challenge,
        opts.expected_origins,
    )?;

    if credential.raw_id != authenticator.cred_id {
        debug!(raw_id = %credential.raw_id, "assertion is for a different credential");
        return Err(WebauthnError::CredentialNotAllowed);
    }

    let auth_data_bytes = credential.response.authenticator_data.as_ref();
    let auth_data = AuthenticatorData::try_from(auth_data_bytes)?;

    verify_auth_data_flags(
        &auth_data,
        opts.expected_rp_ids,
        opts.require_user_verification,
    )?;

    let new_counter = auth_data.counter;
    let stored_counter = authenticator.counter;
    let counter_supported = new_counter != 0 || stored_counter != 0;

    if !counter_supported {
        warn!(
            cred_id = %authenticator.cred_id,
            "authenticator does not implement a signature counter, clone detection is unavailable"
        );
    } else if new_counter <= stored_counter {
        error!(
            cred_id = %authenticator.cred_id,
            new_counter,
            stored_counter,
            "signature counter did not advance, this credential may have been cloned"
        );
        return Err(WebauthnError::CredentialPossibleCompromise);
    }

    let client_data_hash = compute_sha256(credential.response.client_data_json.as_ref());
    let verification_data: Vec<u8> = auth_data_bytes
        .iter()
        .chain(client_data_hash.iter())
        .copied()
        .collect();

    let verified = authenticator
        .cred
        .verify_signature(credential.response.signature.as_ref(), &verification_data)?;

    if !verified {
        error!(cred_id = %authenticator.cred_id, "assertion signature verification failed");
        return Err(WebauthnError::AuthenticationFailure);
    }

    if let Some(user_handle) = credential.get_user_unique_id() {
        trace!(?user_handle);
    }

    Ok(VerifiedAuthentication {
        credential_id: authenticator.cred_id.clone(),
        new_counter,
        user_verified: auth_data.user_verified,
        counter_supported,
    })
}

fn rp_id_valid_for(rp_id: &str, origin: &Url) -> bool {
    origin
        .domain()
        .map(|effective_domain| {
            // We need to prepend the '.' here to ensure that myexample.com != example.com,
            // rather than just ends with.
            effective_domain.ends_with(&format!(".{rp_id}")) || effective_domain == rp_id
        })
        .unwrap_or(false)
}

/// The relying party's policy for every ceremony.
#[derive(Debug, Clone)]
pub struct RelyingPartyConfig {
    /// The relying party id.
    pub rp_id: String,
    /// The relying party name shown to users.
    pub rp_name: String,
    /// The origins responses may come from.
    pub origins: Vec<Url>,
    /// Browser timeout in milliseconds.
    pub timeout: u32,
    /// The attestation requested at registration.
    pub attestation: AttestationConveyancePreference,
    /// The user verification requested, and required when this is `Required`.
    pub user_verification: UserVerificationPolicy,
    /// Accepted credential algorithms.
    pub algorithms: Vec<COSEAlgorithm>,
}

/// A constructor for a new [WebauthnCore] instance. This accepts and configures a number of site-wide
/// properties that apply to all webauthn operations of this service.
#[derive(Debug)]
pub struct WebauthnBuilder<'a> {
    rp_name: Option<&'a str>,
    rp_id: &'a str,
    origins: Vec<Url>,
    timeout: u32,
    attestation: AttestationConveyancePreference,
    user_verification: UserVerificationPolicy,
    algorithms: Vec<COSEAlgorithm>,
    settings: Option<SettingsService>,
    safetynet_freshness: Option<Duration>,
    danger_disable_certificate_time_checks: bool,
}

impl<'a> WebauthnBuilder<'a> {
    /// Initiate a new builder. This takes the relying party id and relying party origin.
    ///
    /// The rp_id must be the effective domain of the origin, or a registrable suffix of it.
    /// For example, an origin of `https://idm.example.com` may use the rp_id `idm.example.com`
    /// or `example.com`.
    pub fn new(rp_id: &'a str, rp_origin: &Url) -> WebauthnResult<Self> {
        if rp_id_valid_for(rp_id, rp_origin) {
            Ok(WebauthnBuilder {
                rp_name: None,
                rp_id,
                origins: vec![rp_origin.clone()],
                timeout: DEFAULT_AUTHENTICATOR_TIMEOUT,
                attestation: AttestationConveyancePreference::None,
                user_verification: UserVerificationPolicy::Preferred,
                algorithms: COSEAlgorithm::all_possible_algs(),
                settings: None,
                safetynet_freshness: None,
                danger_disable_certificate_time_checks: false,
            })
        } else {
            error!(%rp_id, origin = %rp_origin, "rp_id is not an effective_domain of rp_origin");
            Err(WebauthnError::RelyingPartyIdMismatch)
        }
    }

    /// Set the relying party name. This may be shown to the user. If not set, defaults to rp_id.
    pub fn rp_name(mut self, rp_name: &'a str) -> Self {
        self.rp_name = Some(rp_name);
        self
    }

    /// Allow responses from another origin. The rp_id must also be valid for it.
    pub fn append_allowed_origin(mut self, origin: &Url) -> Self {
        self.origins.push(origin.clone());
        self
    }

    /// Set the browser timeout in milliseconds.
    pub fn timeout(mut self, timeout: u32) -> Self {
        self.timeout = timeout;
        self
    }

    /// Set the attestation to request at registration.
    pub fn attestation_preference(mut self, attestation: AttestationConveyancePreference) -> Self {
        self.attestation = attestation;
        self
    }

    /// Set the user verification policy.
    pub fn user_verification(mut self, policy: UserVerificationPolicy) -> Self {
        self.user_verification = policy;
        self
    }

    /// Set the accepted credential algorithms, in order of preference.
    pub fn supported_algorithms(mut self, algorithms: Vec<COSEAlgorithm>) -> Self {
        self.algorithms = algorithms;
        self
    }

    /// Use this settings service rather than an empty one.
    pub fn settings(mut self, settings: SettingsService) -> Self {
        self.settings = Some(settings);
        self
    }

    /// How old an android-safetynet response may be.
    pub fn safetynet_freshness(mut self, freshness: Duration) -> Self {
        self.safetynet_freshness = Some(freshness);
        self
    }

    /// Skip certificate validity checks on attestation chains. Only for testing.
    pub fn danger_disable_certificate_time_checks(mut self, disable: bool) -> Self {
        self.danger_disable_certificate_time_checks = disable;
        self
    }

    /// Complete the construction of the [WebauthnCore] instance. If an invalid configuration
    /// setting is found, an Error may be returned.
    pub fn build(self) -> WebauthnResult<WebauthnCore> {
        if let Some(origin) = self
            .origins
            .iter()
            .find(|origin| !rp_id_valid_for(self.rp_id, origin))
        {
            error!(rp_id = %self.rp_id, %origin, "rp_id is not an effective_domain of an allowed origin");
            return Err(WebauthnError::RelyingPartyIdMismatch);
        }

        if self.algorithms.is_empty() {
            error!("at least one credential algorithm must be supported");
            return Err(WebauthnError::Configuration);
        }

        let mut settings = self
            .settings
            .unwrap_or_default()
            .danger_disable_certificate_time_checks(self.danger_disable_certificate_time_checks);
        if let Some(freshness) = self.safetynet_freshness {
            settings = settings.safetynet_freshness(freshness);
        }

        Ok(WebauthnCore {
            config: RelyingPartyConfig {
                rp_id: self.rp_id.to_string(),
                rp_name: self.rp_name.unwrap_or(self.rp_id).to_string(),
                origins: self.origins,
                timeout: self.timeout,
                attestation: self.attestation,
                user_verification: self.user_verification,
                algorithms: self.algorithms,
            },
            settings: Arc::new(settings),
        })
    }
}

/// The relying party configuration bound to its settings service. This fills the ceremony
/// options from configuration, so callers only supply the per-user values.
#[derive(Debug, Clone)]
pub struct WebauthnCore {
    config: RelyingPartyConfig,
    settings: Arc<SettingsService>,
}

impl WebauthnCore {
    /// The relying party configuration.
    pub fn config(&self) -> &RelyingPartyConfig {
        &self.config
    }

    /// The settings service, for updating root certificates at runtime.
    pub fn settings(&self) -> &Arc<SettingsService> {
        &self.settings
    }

    fn require_user_verification(&self) -> bool {
        self.config.user_verification == UserVerificationPolicy::Required
    }

    /// Begin a registration. The challenge in the returned options must be stored by the
    /// caller until [WebauthnCore::finish_registration].
    pub fn start_registration(
        &self,
        user_id: &[u8],
        user_name: &str,
        user_display_name: Option<&str>,
        existing_credentials: &[Credential],
    ) -> WebauthnResult<PublicKeyCredentialCreationOptions> {
        generate_registration_options(GenerateRegistrationOptions {
            rp_name: self.config.rp_name.clone(),
            rp_id: self.config.rp_id.clone(),
            user_id: user_id.into(),
            user_name: user_name.to_string(),
            user_display_name: user_display_name.map(str::to_string),
            challenge: None,
            exclude_credentials: existing_credentials
                .iter()
                .map(Credential::descriptor)
                .collect(),
            authenticator_selection: Some(AuthenticatorSelectionCriteria {
                user_verification: self.config.user_verification,
                ..Default::default()
            }),
            supported_algorithms: self.config.algorithms.clone(),
            timeout: Some(self.config.timeout),
            attestation_type: Some(self.config.attestation),
            extensions: None,
        })
    }

    /// Complete a registration against the challenge that was issued.
    pub fn finish_registration(
        &self,
        reg: &RegisterPublicKeyCredential,
        challenge: &[u8],
    ) -> WebauthnResult<VerifiedRegistration> {
        verify_registration_response(
            &VerifyRegistrationOptions {
                credential: reg,
                expected_challenge: ExpectedChallenge::Exact(challenge),
                expected_origins: &self.config.origins,
                expected_rp_ids: std::slice::from_ref(&self.config.rp_id),
                require_user_verification: self.require_user_verification(),
                supported_algorithms: &self.config.algorithms,
            },
            &self.settings,
        )
    }

    /// Begin an authentication limited to these credentials.
    pub fn start_authentication(
        &self,
        credentials: &[Credential],
    ) -> WebauthnResult<PublicKeyCredentialRequestOptions> {
        generate_authentication_options(GenerateAuthenticationOptions {
            timeout: Some(self.config.timeout),
            allow_credentials: Some(credentials.iter().map(Credential::descriptor).collect()),
            user_verification: Some(self.config.user_verification),
            rp_id: Some(self.config.rp_id.clone()),
            challenge: None,
            extensions: None,
        })
    }

    /// Complete an authentication with the stored credential the assertion names.
    pub fn finish_authentication(
        &self,
        rsp: &PublicKeyCredential,
        challenge: &[u8],
        credential: &Credential,
    ) -> WebauthnResult<VerifiedAuthentication> {
        verify_authentication_response(&VerifyAuthenticationOptions {
            credential: rsp,
            expected_challenge: ExpectedChallenge::Exact(challenge),
            expected_origins: &self.config.origins,
            expected_rp_ids: std::slice::from_ref(&self.config.rp_id),
            authenticator: credential,
            require_user_verification: self.require_user_verification(),
        })
    }
}
