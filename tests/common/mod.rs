#![allow(dead_code)]

use openssl::asn1::Asn1Time;
use openssl::bn::BigNum;
use openssl::ec::{EcGroup, EcKey};
use openssl::hash::MessageDigest;
use openssl::nid::Nid;
use openssl::pkey::{PKey, Private};
use openssl::ssl::{select_next_proto, AlpnError, NameType, Ssl, SslAcceptor, SslMethod};
use openssl::x509::{X509NameBuilder, X509};
use std::net::SocketAddr;
use std::pin::Pin;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::mpsc;
use tokio_openssl::SslStream;

/// What the fake edge does after reading the request.
#[derive(Clone)]
pub enum Behavior {
    /// Write the bytes, send close_notify and close.
    Respond(Vec<u8>),
    /// Write the bytes, then keep trickling data and never close.
    Stall(Vec<u8>),
}

#[derive(Debug, Clone)]
pub struct Seen {
    pub sni: Option<String>,
    pub alpn: Option<Vec<u8>>,
    pub request: String,
}

pub struct TlsPeer {
    pub addr: SocketAddr,
    pub accepts: Arc<AtomicUsize>,
    pub seen: mpsc::UnboundedReceiver<Seen>,
    /// Receives a message once a stalled connection notices the client is gone.
    pub closed: mpsc::UnboundedReceiver<()>,
}

fn self_signed() -> (PKey<Private>, X509) {
    let group = EcGroup::from_curve_name(Nid::X9_62_PRIME256V1).unwrap();
    let key = PKey::from_ec_key(EcKey::generate(&group).unwrap()).unwrap();

    let mut name = X509NameBuilder::new().unwrap();
    name.append_entry_by_nid(Nid::COMMONNAME, "unrelated.test")
        .unwrap();
    let name = name.build();

    let mut builder = X509::builder().unwrap();
    builder.set_version(2).unwrap();
    let serial = BigNum::from_u32(1).unwrap().to_asn1_integer().unwrap();
    builder.set_serial_number(&serial).unwrap();
    builder.set_subject_name(&name).unwrap();
    builder.set_issuer_name(&name).unwrap();
    builder.set_pubkey(&key).unwrap();
    builder
        .set_not_before(&Asn1Time::days_from_now(0).unwrap())
        .unwrap();
    builder
        .set_not_after(&Asn1Time::days_from_now(1).unwrap())
        .unwrap();
    builder.sign(&key, MessageDigest::sha256()).unwrap();
    (key, builder.build())
}

fn acceptor() -> SslAcceptor {
    let (key, cert) = self_signed();
    let mut builder = SslAcceptor::mozilla_intermediate_v5(SslMethod::tls()).unwrap();
    builder.set_private_key(&key).unwrap();
    builder.set_certificate(&cert).unwrap();
    builder.set_alpn_select_callback(|_, client| {
        select_next_proto(b"\x08http/1.1", client).ok_or(AlpnError::NOACK)
    });
    builder.build()
}

pub async fn spawn_tls_peer(behavior: Behavior) -> TlsPeer {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let accepts = Arc::new(AtomicUsize::new(0));
    let (seen_tx, seen) = mpsc::unbounded_channel();
    let (closed_tx, closed) = mpsc::unbounded_channel();
    let acceptor = Arc::new(acceptor());

    let counter = accepts.clone();
    tokio::spawn(async move {
        loop {
            let Ok((tcp, _)) = listener.accept().await else {
                return;
            };
            counter.fetch_add(1, Ordering::SeqCst);
            let acceptor = acceptor.clone();
            let behavior = behavior.clone();
            let seen_tx = seen_tx.clone();
            let closed_tx = closed_tx.clone();
            tokio::spawn(async move {
                serve_one(tcp, &acceptor, behavior, seen_tx, closed_tx).await;
            });
        }
    });

    TlsPeer {
        addr,
        accepts,
        seen,
        closed,
    }
}

async fn serve_one(
    tcp: TcpStream,
    acceptor: &SslAcceptor,
    behavior: Behavior,
    seen_tx: mpsc::UnboundedSender<Seen>,
    closed_tx: mpsc::UnboundedSender<()>,
) {
    let ssl = Ssl::new(acceptor.context()).unwrap();
    let mut tls = SslStream::new(ssl, tcp).unwrap();
    if Pin::new(&mut tls).accept().await.is_err() {
        return;
    }

    let mut request = Vec::new();
    let mut buf = [0u8; 1024];
    while !request.windows(4).any(|w| w == b"\r\n\r\n") {
        match tls.read(&mut buf).await {
            Ok(0) | Err(_) => break,
            Ok(n) => request.extend_from_slice(&buf[..n]),
        }
    }

    let _ = seen_tx.send(Seen {
        sni: tls.ssl().servername(NameType::HOST_NAME).map(str::to_owned),
        alpn: tls.ssl().selected_alpn_protocol().map(<[u8]>::to_vec),
        request: String::from_utf8_lossy(&request).into_owned(),
    });

    match behavior {
        Behavior::Respond(bytes) => {
            let _ = tls.write_all(&bytes).await;
            let _ = tls.shutdown().await;
        }
        Behavior::Stall(bytes) => {
            let _ = tls.write_all(&bytes).await;
            for _ in 0..500 {
                tokio::time::sleep(Duration::from_millis(20)).await;
                if tls.write_all(b" ").await.is_err() {
                    let _ = closed_tx.send(());
                    return;
                }
            }
        }
    }
}

/// A plain TCP peer that accepts and then says nothing. Reports when the client hangs up.
pub async fn spawn_silent_peer() -> (SocketAddr, mpsc::UnboundedReceiver<()>) {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let (closed_tx, closed) = mpsc::unbounded_channel();

    tokio::spawn(async move {
        let Ok((mut tcp, _)) = listener.accept().await else {
            return;
        };
        let mut buf = [0u8; 1024];
        loop {
            match tcp.read(&mut buf).await {
                Ok(0) | Err(_) => {
                    let _ = closed_tx.send(());
                    return;
                }
                Ok(_) => {}
            }
        }
    });

    (addr, closed)
}
