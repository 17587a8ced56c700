use clap::{ArgAction, Args, Parser, Subcommand};
use sni_probe::model::{
    ProbeConfig, DEFAULT_MAX_BODY_CHARS, DEFAULT_MAX_BYTES, DEFAULT_SERVER_NAME,
    DEFAULT_USER_AGENT,
};
use std::net::SocketAddr;
use std::time::Duration;

#[derive(Debug, Parser)]
#[command(
    author,
    version,
    about = "Probe what an IP:port serves when TLS presents a different SNI hostname",
    long_about = None
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Serve probes over HTTP: GET /<IP>:<PORT>
    Serve {
        /// Address to listen on
        #[arg(short = 'l', long = "listen", default_value = "127.0.0.1:8787")]
        listen: SocketAddr,

        #[command(flatten)]
        probe: ProbeArgs,
    },
    /// Probe a single IP:PORT and print the result as JSON
    Probe {
        /// Target as IP:PORT (a leading slash is accepted)
        #[arg(value_name = "IP:PORT")]
        target: String,

        #[command(flatten)]
        probe: ProbeArgs,
    },
}

#[derive(Debug, Clone, Args)]
pub struct ProbeArgs {
    /// Hostname presented in SNI and the Host header
    #[arg(long = "sni", default_value = DEFAULT_SERVER_NAME)]
    pub sni: String,

    /// User-Agent sent with the probe request
    #[arg(long = "user-agent", default_value = DEFAULT_USER_AGENT)]
    pub user_agent: String,

    /// Request path sent to the peer
    #[arg(long = "path", default_value = "/")]
    pub path: String,

    /// Probe timeout in milliseconds, from dial to peer close
    #[arg(long = "timeout", default_value_t = 5000)]
    pub timeout_ms: u64,

    /// Characters of a non-JSON body to include in diagnostics
    #[arg(long = "max-body-chars", default_value_t = DEFAULT_MAX_BODY_CHARS)]
    pub max_body_chars: usize,

    /// Stop reading after this many response bytes
    #[arg(long = "max-bytes", default_value_t = DEFAULT_MAX_BYTES)]
    pub max_bytes: usize,

    /// Keep the write side open after sending the request
    #[arg(long = "no-half-close", action = ArgAction::SetTrue)]
    pub no_half_close: bool,
}

/// Turns a command-line target into the request path the handler routes.
pub fn target_path(target: &str) -> anyhow::Result<String> {
    let target = target.trim().trim_start_matches('/');
    if target.is_empty() {
        anyhow::bail!("target must not be empty; expected IP:PORT");
    }
    Ok(format!("/{target}"))
}

impl ProbeArgs {
    pub fn into_config(self) -> anyhow::Result<ProbeConfig> {
        if self.timeout_ms == 0 {
            anyhow::bail!("timeout must be greater than zero");
        }

        let sni = self.sni.trim();
        if sni.is_empty() {
            anyhow::bail!("--sni must not be empty");
        }

        if !self.path.starts_with('/') {
            anyhow::bail!("--path must start with '/'");
        }

        if self.max_body_chars == 0 || self.max_bytes == 0 {
            anyhow::bail!("--max-body-chars and --max-bytes must be greater than zero");
        }

        Ok(ProbeConfig {
            server_name: sni.to_string(),
            user_agent: self.user_agent,
            request_path: self.path,
            timeout: Duration::from_millis(self.timeout_ms),
            max_body_chars: self.max_body_chars,
            max_bytes: self.max_bytes,
            half_close: !self.no_half_close,
            ..ProbeConfig::default()
        })
    }
}
