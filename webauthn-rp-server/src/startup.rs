use std::net::SocketAddr;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::Context;
use clap::Parser;
use url::Url;
use webauthn_rp_core::proto::COSEAlgorithm;
use webauthn_rp_core::{AttestationFormat, RootCertificate, WebauthnBuilder, WebauthnCore};

use crate::store::{CredentialStore, InMemoryStore};

/// Reference relying party server for webauthn registration and authentication.
#[derive(Debug, Parser)]
#[command(name = "webauthn-rp-server", version)]
pub struct Config {
    /// Address to listen on.
    #[arg(long, env = "WEBAUTHN_BIND", default_value = "127.0.0.1:8081")]
    pub bind: SocketAddr,

    /// The relying party id, the effective domain of the site.
    #[arg(long, env = "WEBAUTHN_RP_ID", default_value = "localhost")]
    pub rp_id: String,

    /// An origin responses may come from. May be repeated.
    #[arg(
        long = "rp-origin",
        env = "WEBAUTHN_RP_ORIGIN",
        value_delimiter = ',',
        default_value = "http://localhost:8081"
    )]
    pub rp_origins: Vec<Url>,

    /// The relying party name shown to users.
    #[arg(long, env = "WEBAUTHN_RP_NAME", default_value = "Webauthn RP Example")]
    pub rp_name: String,

    /// A trusted attestation root as FORMAT=PATH, in PEM or DER. May be repeated.
    #[arg(long = "root-cert", value_parser = parse_root_cert)]
    pub root_certs: Vec<(AttestationFormat, PathBuf)>,
}

fn parse_root_cert(s: &str) -> Result<(AttestationFormat, PathBuf), String> {
    let (format, path) = s
        .split_once('=')
        .ok_or_else(|| format!("expected FORMAT=PATH, got {s}"))?;
    let format = format
        .parse::<AttestationFormat>()
        .map_err(|_| format!("unknown attestation format {format}"))?;
    Ok((format, PathBuf::from(path)))
}

fn load_root_cert(path: &Path) -> anyhow::Result<RootCertificate> {
    let bytes = std::fs::read(path)
        .with_context(|| format!("unable to read root certificate {}", path.display()))?;
    if bytes.starts_with(b"-----BEGIN") {
        let pem = String::from_utf8(bytes)
            .with_context(|| format!("root certificate {} is not utf8", path.display()))?;
        Ok(RootCertificate::Pem(pem))
    } else {
        Ok(RootCertificate::Der(bytes))
    }
}

// The user that ceremonies apply to when the request doesn't name one.
pub const DEFAULT_USER_NAME: &str = "localuser";

/// Shared by every request handler.
#[derive(Clone)]
pub struct AppState {
    // Only the roots inside the settings change after startup, and they carry their own lock.
    pub webauthn: Arc<WebauthnCore>,
    pub store: Arc<dyn CredentialStore>,
}

impl AppState {
    pub fn new(config: &Config) -> anyhow::Result<Self> {
        let (rp_origin, other_origins) = config
            .rp_origins
            .split_first()
            .context("at least one rp origin is required")?;

        let builder = WebauthnBuilder::new(&config.rp_id, rp_origin)
            .context("invalid webauthn configuration")?
            .rp_name(&config.rp_name)
            // ES256 and RS256 cover nearly every authenticator in use.
            .supported_algorithms(COSEAlgorithm::secure_algs());

        let webauthn = other_origins
            .iter()
            .fold(builder, |builder, origin| builder.append_allowed_origin(origin))
            .build()
            .context("invalid webauthn configuration")?;

        for (format, path) in config.root_certs.iter() {
            let cert = load_root_cert(path)?;
            webauthn
                .settings()
                .add_root_certificate(*format, &cert)
                .with_context(|| format!("invalid root certificate {}", path.display()))?;
            info!(%format, path = %path.display(), "loaded attestation root");
        }

        Ok(AppState {
            webauthn: Arc::new(webauthn),
            store: Arc::new(InMemoryStore::new()),
        })
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn parse_config() {
        let config = Config::try_parse_from([
            "webauthn-rp-server",
            "--rp-id",
            "example.com",
            "--rp-origin",
            "https://example.com",
            "--rp-origin",
            "https://login.example.com",
            "--root-cert",
            "fido-u2f=/etc/webauthn/yubico.pem",
        ])
        .unwrap();

        assert_eq!(config.rp_origins.len(), 2);
        assert_eq!(config.bind.port(), 8081);
        assert_eq!(
            config.root_certs,
            vec![(
                AttestationFormat::FIDOU2F,
                PathBuf::from("/etc/webauthn/yubico.pem")
            )]
        );

        assert!(Config::try_parse_from(["webauthn-rp-server", "--root-cert", "tpm"]).is_err());
        assert!(
            Config::try_parse_from(["webauthn-rp-server", "--root-cert", "bogus=/tmp/x"]).is_err()
        );
    }

    #[test]
    fn state_rejects_foreign_origin() {
        let config = Config::try_parse_from([
            "webauthn-rp-server",
            "--rp-id",
            "example.com",
            "--rp-origin",
            "https://example.com",
            "--rp-origin",
            "https://evil.com",
        ])
        .unwrap();
        assert!(AppState::new(&config).is_err());
    }
}
