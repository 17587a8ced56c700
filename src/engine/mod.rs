pub mod framer;
pub mod reader;

use crate::error::ProbeError;
use crate::model::{ProbeConfig, ProbeState, RawResponse, Target};
use crate::tls::{self, TlsBackend};
use async_trait::async_trait;
use reader::{ReadResult, StreamReader};
use std::sync::Arc;
use std::time::Instant;
use tokio::io::AsyncWriteExt;
use tokio::net::TcpStream;
use tokio::time::timeout;
use tracing::{debug, info, instrument, warn};

/// Seam between the request handler and whatever actually talks to the network.
#[async_trait]
pub trait TargetProber: Send + Sync {
    async fn probe(&self, target: &Target) -> Result<RawResponse, ProbeError>;
}

/// Runs one SNI-spoofed HTTPS exchange per call. Holds no per-probe state.
pub struct Engine {
    cfg: Arc<ProbeConfig>,
    backend: Arc<dyn TlsBackend>,
    request: Vec<u8>,
}

impl Engine {
    pub fn new(cfg: ProbeConfig) -> Result<Self, ProbeError> {
        let backend = tls::default_backend(&cfg)?;
        Ok(Self::with_backend(cfg, backend))
    }

    pub fn with_backend(cfg: ProbeConfig, backend: Arc<dyn TlsBackend>) -> Self {
        let request = cfg.render_request().into_bytes();
        Self {
            cfg: Arc::new(cfg),
            backend,
            request,
        }
    }

    pub fn config(&self) -> &ProbeConfig {
        &self.cfg
    }

    async fn session(
        &self,
        target: &Target,
        state: &mut ProbeState,
    ) -> Result<ReadResult, ProbeError> {
        *state = ProbeState::Dialing;
        let addr = target.socket_addr();
        let tcp = TcpStream::connect(addr)
            .await
            .map_err(|source| ProbeError::Connect { addr, source })?;
        if let Err(err) = tcp.set_nodelay(true) {
            debug!(error = %err, "failed to set TCP_NODELAY");
        }

        *state = ProbeState::Handshaking;
        let session = self
            .backend
            .handshake(tcp, &self.cfg.server_name)
            .await?;
        debug!(
            backend = self.backend.name(),
            version = %session.info.version,
            cipher = %session.info.cipher,
            alpn = ?session.info.alpn,
            subject = %session.info.cert_subject,
            issuer = %session.info.cert_issuer,
            "handshake complete"
        );
        let mut stream = session.stream;

        *state = ProbeState::Writing;
        stream
            .write_all(&self.request)
            .await
            .map_err(ProbeError::Write)?;
        if self.cfg.half_close {
            stream.shutdown().await.map_err(ProbeError::Write)?;
        } else {
            stream.flush().await.map_err(ProbeError::Write)?;
        }

        *state = ProbeState::Reading;
        let mut reader = StreamReader::new(self.cfg.max_bytes);
        let result = reader.read(&mut stream).await?;
        *state = ProbeState::Closed;
        Ok(result)
    }
}

#[async_trait]
impl TargetProber for Engine {
    #[instrument(skip(self, target), fields(target = %target, sni = %self.cfg.server_name))]
    async fn probe(&self, target: &Target) -> Result<RawResponse, ProbeError> {
        let started = Instant::now();
        let mut state = ProbeState::Dialing;
        // The session owns the socket, so dropping it on expiry aborts any
        // pending read and closes the connection.
        let outcome = timeout(self.cfg.timeout, self.session(target, &mut state)).await;
        let elapsed_ms = started.elapsed().as_millis();

        match outcome {
            Ok(Ok(result)) => {
                if result.dropped > 0 {
                    warn!(
                        max_bytes = self.cfg.max_bytes,
                        dropped = result.dropped,
                        "response exceeded read cap"
                    );
                }
                let response = framer::parse_response(&result.text());
                info!(
                    ms = elapsed_ms,
                    bytes = result.bytes.len(),
                    reason = ?result.reason,
                    status = %response.status_line,
                    "probe finished"
                );
                Ok(response)
            }
            Ok(Err(err)) => {
                warn!(stage = %state, ms = elapsed_ms, error = %err, "probe failed");
                Err(err)
            }
            Err(_) => {
                warn!(stage = %state, ms = elapsed_ms, "probe timed out");
                Err(ProbeError::Timeout {
                    elapsed_ms,
                    stage: state,
                })
            }
        }
    }
}
