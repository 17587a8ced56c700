use std::collections::BTreeMap;
use std::fmt;
use std::net::{Ipv4Addr, SocketAddr, SocketAddrV4};
use std::time::Duration;

pub const DEFAULT_SERVER_NAME: &str = "myip.ipeek.workers.dev";
pub const DEFAULT_USER_AGENT: &str = "ProxyScanner/1.0";
pub const DEFAULT_TIMEOUT: Duration = Duration::from_millis(5000);
pub const DEFAULT_MAX_BODY_CHARS: usize = 2000;
pub const DEFAULT_MAX_BYTES: usize = 4 * 1024 * 1024;

/// A validated probe destination. Only [`crate::input::parse_target`] builds one.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Target {
    ip: Ipv4Addr,
    port: u16,
}

impl Target {
    pub(crate) fn new(ip: Ipv4Addr, port: u16) -> Self {
        Self { ip, port }
    }

    pub fn ip(&self) -> Ipv4Addr {
        self.ip
    }

    pub fn port(&self) -> u16 {
        self.port
    }

    pub fn socket_addr(&self) -> SocketAddr {
        SocketAddr::V4(SocketAddrV4::new(self.ip, self.port))
    }
}

impl fmt::Display for Target {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.ip, self.port)
    }
}

/// Settings shared by every probe of a running process.
#[derive(Debug, Clone)]
pub struct ProbeConfig {
    /// Hostname presented in SNI and in the `Host` header.
    pub server_name: String,
    pub user_agent: String,
    pub request_path: String,
    pub alpn: Vec<String>,
    /// Deadline for the whole session, from dial to peer close.
    pub timeout: Duration,
    pub max_body_chars: usize,
    pub max_bytes: usize,
    /// Close the write side once the request is sent.
    pub half_close: bool,
}

impl Default for ProbeConfig {
    fn default() -> Self {
        Self {
            server_name: DEFAULT_SERVER_NAME.into(),
            user_agent: DEFAULT_USER_AGENT.into(),
            request_path: "/".into(),
            alpn: vec!["http/1.1".into()],
            timeout: DEFAULT_TIMEOUT,
            max_body_chars: DEFAULT_MAX_BODY_CHARS,
            max_bytes: DEFAULT_MAX_BYTES,
            half_close: true,
        }
    }
}

impl ProbeConfig {
    pub fn render_request(&self) -> String {
        format!(
            "GET {} HTTP/1.1\r\nHost: {}\r\nUser-Agent: {}\r\nConnection: close\r\n\r\n",
            self.request_path, self.server_name, self.user_agent
        )
    }
}

/// A response split into its status line, headers and body.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RawResponse {
    pub status_line: String,
    pub headers: BTreeMap<String, String>,
    pub body: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProbeState {
    Dialing,
    Handshaking,
    Writing,
    Reading,
    Closed,
}

impl fmt::Display for ProbeState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            ProbeState::Dialing => "dialing",
            ProbeState::Handshaking => "handshaking",
            ProbeState::Writing => "writing",
            ProbeState::Reading => "reading",
            ProbeState::Closed => "closed",
        };
        write!(f, "{}", label)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum ReadStopReason {
    #[default]
    ConnectionClosed,
    /// Peer dropped TCP without sending a TLS close_notify.
    UncleanClose,
}

/// Negotiated session parameters, for logging.
#[derive(Debug, Clone, Default)]
pub struct TlsInfo {
    pub version: String,
    pub cipher: String,
    pub alpn: Option<String>,
    pub cert_subject: String,
    pub cert_issuer: String,
}
