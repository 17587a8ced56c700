use crate::model::ProbeState;
use std::io;
use std::net::SocketAddr;
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum InvalidTarget {
    #[error("bad target format; use /IP:PORT")]
    Format,
    #[error("invalid IP or port")]
    Range,
}

#[derive(Debug, Error)]
pub enum ProbeError {
    #[error("connect to {addr} failed: {source}")]
    Connect {
        addr: SocketAddr,
        #[source]
        source: io::Error,
    },
    #[error("failed to configure TLS: {0}")]
    TlsSetup(String),
    #[error("TLS handshake failed: {0}")]
    Handshake(#[source] io::Error),
    #[error("failed to write probe request: {0}")]
    Write(#[source] io::Error),
    #[error("failed to read response: {0}")]
    Read(#[source] io::Error),
    #[error("socket timeout after {elapsed_ms} ms while {stage}")]
    Timeout { elapsed_ms: u128, stage: ProbeState },
}

impl ProbeError {
    pub fn is_timeout(&self) -> bool {
        matches!(self, ProbeError::Timeout { .. })
    }
}

/// Anything that turns a request into a failure envelope.
#[derive(Debug, Error)]
pub enum Error {
    #[error(transparent)]
    InvalidTarget(#[from] InvalidTarget),
    #[error(transparent)]
    Probe(#[from] ProbeError),
}
