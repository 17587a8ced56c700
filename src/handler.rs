use crate::engine::TargetProber;
use crate::error::Error;
use crate::input::parse_target;
use crate::output::{Envelope, Reply};
use std::sync::Arc;
use tracing::{debug, warn};

/// Turns a request path into exactly one reply: usage, success, diagnostic or failure.
#[derive(Clone)]
pub struct Handler {
    prober: Arc<dyn TargetProber>,
    max_body_chars: usize,
}

impl Handler {
    pub fn new(prober: Arc<dyn TargetProber>, max_body_chars: usize) -> Self {
        Self {
            prober,
            max_body_chars,
        }
    }

    pub async fn handle(&self, path: &str) -> Reply {
        if path == "/" {
            return Reply::usage();
        }

        match self.run(path).await {
            Ok(envelope) => envelope.into_reply(),
            Err(err) => {
                warn!(path, error = %err, "request failed");
                Envelope::failure(&err).into_reply()
            }
        }
    }

    async fn run(&self, path: &str) -> Result<Envelope, Error> {
        let target = parse_target(path)?;
        debug!(%target, "probing");
        let raw = self.prober.probe(&target).await?;
        Ok(Envelope::from_response(&target, raw, self.max_body_chars))
    }
}
