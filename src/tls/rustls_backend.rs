use super::{TlsBackend, TlsSession};
use crate::error::ProbeError;
use crate::model::TlsInfo;
use async_trait::async_trait;
use rustls::client::{ServerCertVerified, ServerCertVerifier};
use rustls::{Certificate, ClientConfig, RootCertStore, ServerName};
use std::sync::Arc;
use std::time::SystemTime;
use tokio::net::TcpStream;
use tokio_rustls::TlsConnector;

struct AcceptAnyCert;

impl ServerCertVerifier for AcceptAnyCert {
    fn verify_server_cert(
        &self,
        _end_entity: &Certificate,
        _intermediates: &[Certificate],
        _server_name: &ServerName,
        _scts: &mut dyn Iterator<Item = &[u8]>,
        _ocsp_response: &[u8],
        _now: SystemTime,
    ) -> Result<ServerCertVerified, rustls::Error> {
        Ok(ServerCertVerified::assertion())
    }
}

pub struct RustlsBackend {
    connector: TlsConnector,
}

impl RustlsBackend {
    pub fn new(alpn: &[String]) -> Self {
        let mut config = ClientConfig::builder()
            .with_safe_defaults()
            .with_root_certificates(RootCertStore::empty())
            .with_no_client_auth();
        config
            .dangerous()
            .set_certificate_verifier(Arc::new(AcceptAnyCert));
        config.alpn_protocols = alpn
            .iter()
            .filter(|proto| !proto.is_empty())
            .map(|proto| proto.as_bytes().to_vec())
            .collect();

        Self {
            connector: TlsConnector::from(Arc::new(config)),
        }
    }
}

#[async_trait]
impl TlsBackend for RustlsBackend {
    fn name(&self) -> &'static str {
        "rustls"
    }

    async fn handshake(
        &self,
        stream: TcpStream,
        server_name: &str,
    ) -> Result<TlsSession, ProbeError> {
        let domain = ServerName::try_from(server_name)
            .map_err(|err| ProbeError::TlsSetup(format!("invalid server name {server_name}: {err}")))?;
        let tls_stream = self
            .connector
            .connect(domain, stream)
            .await
            .map_err(ProbeError::Handshake)?;

        let (_, conn) = tls_stream.get_ref();
        let info = TlsInfo {
            version: conn
                .protocol_version()
                .map(|version| format!("{version:?}"))
                .unwrap_or_default(),
            cipher: conn
                .negotiated_cipher_suite()
                .map(|suite| format!("{:?}", suite.suite()))
                .unwrap_or_default(),
            alpn: conn
                .alpn_protocol()
                .map(|proto| String::from_utf8_lossy(proto).into_owned()),
            ..TlsInfo::default()
        };

        Ok(TlsSession {
            stream: Box::new(tls_stream),
            info,
        })
    }
}
