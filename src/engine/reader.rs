use crate::error::ProbeError;
use crate::model::ReadStopReason;
use std::io;
use tokio::io::{AsyncRead, AsyncReadExt};
use tracing::{debug, trace};

const CHUNK: usize = 4096;

/// Collects everything the peer sends until it closes the stream. Bytes past
/// `max_bytes` are read and dropped; only close or the caller's deadline ends
/// the loop.
pub struct StreamReader {
    max_bytes: usize,
}

impl StreamReader {
    pub fn new(max_bytes: usize) -> Self {
        Self {
            max_bytes: max_bytes.max(1),
        }
    }

    pub async fn read<T: AsyncRead + Unpin>(
        &mut self,
        stream: &mut T,
    ) -> Result<ReadResult, ProbeError> {
        let mut bytes = Vec::with_capacity(CHUNK);
        let mut chunk = vec![0u8; CHUNK];
        let mut dropped = 0usize;
        let reason = loop {
            match stream.read(&mut chunk).await {
                Ok(0) => break ReadStopReason::ConnectionClosed,
                Ok(n) => {
                    let keep = n.min(self.max_bytes - bytes.len());
                    bytes.extend_from_slice(&chunk[..keep]);
                    dropped += n - keep;
                    trace!(n, total = bytes.len(), dropped, "received chunk");
                }
                Err(err) if is_unclean_close(&err) => {
                    debug!(error = %err, "peer closed without close_notify");
                    break ReadStopReason::UncleanClose;
                }
                Err(err) => return Err(ProbeError::Read(err)),
            }
        };

        Ok(ReadResult {
            bytes,
            reason,
            dropped,
        })
    }
}

#[derive(Debug, Clone)]
pub struct ReadResult {
    pub bytes: Vec<u8>,
    pub reason: ReadStopReason,
    /// Bytes received past the cap and discarded.
    pub dropped: usize,
}

impl ReadResult {
    /// Decodes the accumulated bytes in one pass so multi-byte sequences split
    /// across reads survive intact.
    pub fn text(&self) -> String {
        String::from_utf8_lossy(&self.bytes).into_owned()
    }
}

// rustls reports a missing close_notify as UnexpectedEof; OpenSSL 3 only
// carries it in the message text.
fn is_unclean_close(err: &io::Error) -> bool {
    err.kind() == io::ErrorKind::UnexpectedEof
        || err.to_string().to_ascii_lowercase().contains("unexpected eof")
}
