//! Minimal HTTP/1.1 front end: one request per connection, any method, path
//! routed straight into the [`Handler`].

use crate::handler::Handler;
use crate::output::{Envelope, Reply};
use std::future::Future;
use std::io;
use std::time::Duration;
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWriteExt};
use tokio::net::{TcpListener, TcpStream};
use tokio::time::timeout;
use tracing::{debug, info, instrument, warn};
use url::Url;

const MAX_HEAD_BYTES: usize = 16 * 1024;
const MAX_HEADERS: usize = 64;
const HEAD_TIMEOUT: Duration = Duration::from_secs(10);

/// Accepts connections until `shutdown` resolves.
pub async fn serve(
    listener: TcpListener,
    handler: Handler,
    shutdown: impl Future<Output = ()>,
) -> io::Result<()> {
    let local = listener.local_addr()?;
    info!(addr = %local, "probe server listening");
    tokio::pin!(shutdown);

    loop {
        tokio::select! {
            _ = &mut shutdown => {
                info!("shutting down probe server");
                return Ok(());
            }
            accepted = listener.accept() => {
                let (stream, peer) = match accepted {
                    Ok(conn) => conn,
                    Err(err) => {
                        warn!(error = %err, "accept failed");
                        continue;
                    }
                };
                let handler = handler.clone();
                tokio::spawn(async move {
                    if let Err(err) = handle_connection(stream, handler).await {
                        debug!(%peer, error = %err, "connection error");
                    }
                });
            }
        }
    }
}

#[instrument(skip_all, fields(peer = ?stream.peer_addr().ok()))]
async fn handle_connection(mut stream: TcpStream, handler: Handler) -> io::Result<()> {
    let head = match timeout(HEAD_TIMEOUT, read_request_head(&mut stream)).await {
        Ok(head) => head,
        Err(_) => {
            debug!("client did not send a request head in time");
            return Ok(());
        }
    };

    let reply = match head {
        Ok(request_target) => match request_path(&request_target) {
            Some(path) => {
                debug!(%path, "request");
                handler.handle(&path).await
            }
            None => Envelope::failure("malformed request target").into_reply(),
        },
        Err(err) if err.kind() == io::ErrorKind::InvalidData => {
            Envelope::failure(err).into_reply()
        }
        Err(err) => return Err(err),
    };

    respond(&mut stream, &reply).await?;
    stream.shutdown().await
}

/// Reads the request head in bounded chunks and returns its request target.
/// Headers are parsed only to validate the head and are then discarded.
async fn read_request_head<R: AsyncRead + Unpin>(r: &mut R) -> io::Result<String> {
    let mut buf = Vec::with_capacity(2048);
    let mut tmp = [0u8; 512];

    loop {
        let n = r.read(&mut tmp).await?;
        if n == 0 {
            break;
        }
        buf.extend_from_slice(&tmp[..n]);
        if buf.len() > MAX_HEAD_BYTES {
            return Err(io::Error::new(io::ErrorKind::InvalidData, "request head too large"));
        }
        let scan_from = buf.len().saturating_sub(n + 3);
        if buf[scan_from..].windows(4).any(|w| w == b"\r\n\r\n") {
            break;
        }
    }

    let mut headers = [httparse::EMPTY_HEADER; MAX_HEADERS];
    let mut req = httparse::Request::new(&mut headers);
    req.parse(&buf).map_err(|err| {
        io::Error::new(io::ErrorKind::InvalidData, format!("bad request head: {err}"))
    })?;

    req.path
        .map(str::to_string)
        .ok_or_else(|| io::Error::new(io::ErrorKind::InvalidData, "malformed request line"))
}

/// Extracts the path of an origin-form or absolute-form request target.
/// The query string is dropped; repeated leading slashes are kept.
pub fn request_path(target: &str) -> Option<String> {
    let url = if target.starts_with('/') {
        Url::parse(&format!("http://probe.invalid{target}")).ok()?
    } else {
        Url::parse(target).ok()?
    };
    Some(url.path().to_string())
}

async fn respond(sock: &mut (impl AsyncWriteExt + Unpin), reply: &Reply) -> io::Result<()> {
    let head = format!(
        "HTTP/1.1 {} {}\r\nContent-Type: {}\r\nContent-Length: {}\r\nConnection: close\r\n\r\n",
        reply.status,
        reply.reason(),
        reply.content_type,
        reply.body.len()
    );
    sock.write_all(head.as_bytes()).await?;
    sock.write_all(reply.body.as_bytes()).await?;
    sock.flush().await
}
