//! Encrypted byte-stream capability used by the probe engine.
//!
//! The engine dials TCP itself and hands the socket to a [`TlsBackend`], which
//! performs the handshake with whatever server name it is told to present.
//! Certificate verification is always off: the presented name deliberately
//! does not match the dialed address.

#[cfg(not(any(feature = "openssl-tls", feature = "rustls-tls")))]
compile_error!("enable at least one TLS backend feature: `openssl-tls` or `rustls-tls`");

#[cfg(feature = "openssl-tls")]
mod openssl_backend;
#[cfg(feature = "rustls-tls")]
mod rustls_backend;

#[cfg(feature = "openssl-tls")]
pub use openssl_backend::OpensslBackend;
#[cfg(feature = "rustls-tls")]
pub use rustls_backend::RustlsBackend;

use crate::error::ProbeError;
use crate::model::{ProbeConfig, TlsInfo};
use async_trait::async_trait;
use std::sync::Arc;
use tokio::io::{AsyncRead, AsyncWrite};
use tokio::net::TcpStream;

pub trait RawStream: AsyncRead + AsyncWrite + Unpin + Send {}
impl<T: AsyncRead + AsyncWrite + Unpin + Send> RawStream for T {}

pub type ProbeStream = Box<dyn RawStream>;

pub struct TlsSession {
    pub stream: ProbeStream,
    pub info: TlsInfo,
}

#[async_trait]
pub trait TlsBackend: Send + Sync {
    fn name(&self) -> &'static str;

    /// Upgrades `stream`, presenting `server_name` in SNI.
    async fn handshake(&self, stream: TcpStream, server_name: &str)
        -> Result<TlsSession, ProbeError>;
}

/// Builds the backend compiled into this binary. OpenSSL wins when both are enabled.
#[cfg(feature = "openssl-tls")]
pub fn default_backend(cfg: &ProbeConfig) -> Result<Arc<dyn TlsBackend>, ProbeError> {
    Ok(Arc::new(OpensslBackend::new(&cfg.alpn)?))
}

#[cfg(all(feature = "rustls-tls", not(feature = "openssl-tls")))]
pub fn default_backend(cfg: &ProbeConfig) -> Result<Arc<dyn TlsBackend>, ProbeError> {
    Ok(Arc::new(RustlsBackend::new(&cfg.alpn)))
}
