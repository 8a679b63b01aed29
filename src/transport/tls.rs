use rustls::{
    ClientConfig, DigitallySignedStruct, RootCertStore, SignatureScheme,
    client::danger::{HandshakeSignatureValid, ServerCertVerified, ServerCertVerifier},
    crypto::{CryptoProvider, ring::default_provider},
    pki_types::{CertificateDer, ServerName, UnixTime},
};
use std::{fs::File, io, io::BufReader, path::Path, sync::Arc};
use tokio::net::TcpStream;
use tokio_rustls::{TlsConnector, client::TlsStream};

use crate::config::TlsOptions;
use crate::log::debug;

/// Lazily built TLS client configuration.
pub(super) struct TlsContext {
    options: TlsOptions,
    connector: Option<TlsConnector>,
}

impl TlsContext {
    pub(super) fn new(options: TlsOptions) -> Self {
        Self {
            options,
            connector: None,
        }
    }

    pub(super) fn configure(&mut self, options: TlsOptions) {
        self.options = options;
        self.connector = None;
    }

    /// Name overriding the URI host for verification and SNI.
    pub(super) fn server_name(&self) -> Option<&str> {
        self.options.server_name.as_deref()
    }

    pub(super) fn connector(&mut self) -> io::Result<TlsConnector> {
        if let Some(connector) = &self.connector {
            return Ok(connector.clone());
        }
        let connector = TlsConnector::from(Arc::new(client_config(&self.options)?));
        self.connector = Some(connector.clone());
        Ok(connector)
    }
}

pub(super) async fn handshake(
    connector: TlsConnector,
    host: &str,
    tcp: TcpStream,
) -> io::Result<TlsStream<TcpStream>> {
    let host = host.trim_start_matches('[').trim_end_matches(']');
    let server_name = ServerName::try_from(host.to_owned())
        .map_err(|err| io::Error::new(io::ErrorKind::InvalidInput, err))?;
    connector.connect(server_name, tcp).await
}

fn client_config(options: &TlsOptions) -> io::Result<ClientConfig> {
    let provider = Arc::new(default_provider());

    let mut roots = RootCertStore::empty();
    roots.extend(webpki_roots::TLS_SERVER_ROOTS.iter().cloned());
    if let Some(ca_file) = &options.ca_file {
        for cert in read_certs(ca_file)? {
            roots.add(cert).map_err(io::Error::other)?;
        }
    }

    let builder = ClientConfig::builder_with_provider(provider.clone())
        .with_safe_default_protocol_versions()
        .map_err(io::Error::other)?
        .with_root_certificates(roots);

    let mut config = match &options.local_cert {
        Some(path) => {
            let chain = read_certs(path)?;
            let key = rustls_pemfile::private_key(&mut BufReader::new(File::open(path)?))?
                .ok_or_else(|| io::Error::new(io::ErrorKind::InvalidData, "no private key in local cert"))?;
            builder.with_client_auth_cert(chain, key).map_err(io::Error::other)?
        }
        None => builder.with_no_client_auth(),
    };

    config.enable_sni = options.sni_enabled;
    if !options.verify_peer {
        debug!("tls peer verification is disabled");
        config
            .dangerous()
            .set_certificate_verifier(Arc::new(NoVerification(provider)));
    }

    Ok(config)
}

fn read_certs(path: &Path) -> io::Result<Vec<CertificateDer<'static>>> {
    let mut reader = BufReader::new(File::open(path)?);
    rustls_pemfile::certs(&mut reader).collect()
}

/// Accepts any certificate, signatures are still checked.
#[derive(Debug)]
struct NoVerification(Arc<CryptoProvider>);

impl ServerCertVerifier for NoVerification {
    fn verify_server_cert(
        &self,
        _end_entity: &CertificateDer<'_>,
        _intermediates: &[CertificateDer<'_>],
        _server_name: &ServerName<'_>,
        _ocsp_response: &[u8],
        _now: UnixTime,
    ) -> Result<ServerCertVerified, rustls::Error> {
        Ok(ServerCertVerified::assertion())
    }

    fn verify_tls12_signature(
        &self,
        message: &[u8],
        cert: &CertificateDer<'_>,
        dss: &DigitallySignedStruct,
    ) -> Result<HandshakeSignatureValid, rustls::Error> {
        rustls::crypto::verify_tls12_signature(message, cert, dss, &self.0.signature_verification_algorithms)
    }

    fn verify_tls13_signature(
        &self,
        message: &[u8],
        cert: &CertificateDer<'_>,
        dss: &DigitallySignedStruct,
    ) -> Result<HandshakeSignatureValid, rustls::Error> {
        rustls::crypto::verify_tls13_signature(message, cert, dss, &self.0.signature_verification_algorithms)
    }

    fn supported_verify_schemes(&self) -> Vec<SignatureScheme> {
        self.0.signature_verification_algorithms.supported_schemes()
    }
}
