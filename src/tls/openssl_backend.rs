use super::{TlsBackend, TlsSession};
use crate::error::ProbeError;
use crate::model::TlsInfo;
use crate::util::alpn_wire_format;
use async_trait::async_trait;
use openssl::ssl::{SslConnector, SslMethod, SslVerifyMode};
use openssl::x509::X509NameRef;
use std::io;
use std::pin::Pin;
use tokio::net::TcpStream;
use tokio_openssl::SslStream;

pub struct OpensslBackend {
    connector: SslConnector,
}

impl OpensslBackend {
    pub fn new(alpn: &[String]) -> Result<Self, ProbeError> {
        let mut builder = SslConnector::builder(SslMethod::tls()).map_err(setup_error)?;
        // The handshake has to complete no matter what certificate the peer
        // presents, so accept any certificate and hostname.
        builder.set_verify(SslVerifyMode::NONE);
        let wire = alpn_wire_format(alpn);
        if !wire.is_empty() {
            builder.set_alpn_protos(&wire).map_err(setup_error)?;
        }
        Ok(Self {
            connector: builder.build(),
        })
    }
}

#[async_trait]
impl TlsBackend for OpensslBackend {
    fn name(&self) -> &'static str {
        "openssl"
    }

    async fn handshake(
        &self,
        stream: TcpStream,
        server_name: &str,
    ) -> Result<TlsSession, ProbeError> {
        let mut config = self.connector.configure().map_err(setup_error)?;
        config.set_verify_hostname(false);
        config.set_use_server_name_indication(true);
        let ssl = config.into_ssl(server_name).map_err(setup_error)?;

        let mut tls_stream = SslStream::new(ssl, stream).map_err(setup_error)?;
        Pin::new(&mut tls_stream).connect().await.map_err(|err| {
            ProbeError::Handshake(
                err.into_io_error()
                    .unwrap_or_else(|err| io::Error::new(io::ErrorKind::Other, err)),
            )
        })?;

        let info = extract_tls_info(&tls_stream);
        Ok(TlsSession {
            stream: Box::new(tls_stream),
            info,
        })
    }
}

fn setup_error(err: openssl::error::ErrorStack) -> ProbeError {
    ProbeError::TlsSetup(err.to_string())
}

fn extract_tls_info(stream: &SslStream<TcpStream>) -> TlsInfo {
    let ssl = stream.ssl();
    let mut info = TlsInfo {
        cipher: ssl
            .current_cipher()
            .map(|cipher| cipher.name().to_string())
            .unwrap_or_default(),
        version: ssl.version_str().to_string(),
        alpn: ssl
            .selected_alpn_protocol()
            .map(|proto| String::from_utf8_lossy(proto).into_owned()),
        ..TlsInfo::default()
    };

    if let Some(cert) = ssl.peer_certificate() {
        info.cert_subject = format_x509_name(cert.subject_name());
        info.cert_issuer = format_x509_name(cert.issuer_name());
    }

    info
}

fn format_x509_name(name: &X509NameRef) -> String {
    name.entries()
        .filter_map(|entry| {
            let key = entry.object().nid().short_name().unwrap_or("UNKNOWN");
            let value = entry.data().as_utf8().ok()?.to_string();
            (!value.is_empty()).then(|| format!("{key}={value}"))
        })
        .collect::<Vec<_>>()
        .join(", ")
}
