//! A2S_INFO query client.

use std::net::{Ipv4Addr, Ipv6Addr, SocketAddr};
use std::time::Duration;

use bytes::BytesMut;
use tokio::net::{lookup_host, UdpSocket};
use tokio_util::codec::{Decoder, Encoder};
use tracing::debug;

use crate::common::error::QueryError;
use crate::common::types::format_address;
use crate::query::codec::A2sCodec;
use crate::query::packets::{A2sReply, A2sRequest, ServerInfo};

/// Queries game servers for live status.
///
/// Stateless: each call binds its own socket, so calls run fully in parallel.
#[derive(Debug, Clone)]
pub struct QueryClient {
    timeout: Duration,
}

impl QueryClient {
    pub fn new(timeout: Duration) -> Self {
        Self { timeout }
    }

    /// Perform a single A2S_INFO attempt against `host:port`.
    ///
    /// DNS resolution and the optional challenge round trip all count
    /// against the timeout. Nothing is retried.
    pub async fn query(&self, host: &str, port: u16) -> Result<ServerInfo, QueryError> {
        match tokio::time::timeout(self.timeout, query_info(host, port)).await {
            Ok(result) => result,
            Err(_) => {
                debug!(
                    "A2S query to {} timed out after {:?}",
                    format_address(host, port),
                    self.timeout
                );
                Err(QueryError::Timeout {
                    timeout: self.timeout,
                })
            }
        }
    }
}

async fn resolve(host: &str, port: u16) -> Result<SocketAddr, QueryError> {
    let mut addrs = lookup_host((host, port))
        .await
        .map_err(|e| QueryError::Network {
            message: format!("failed to resolve {}: {}", host, e),
        })?;

    addrs.next().ok_or_else(|| QueryError::Network {
        message: format!("{} did not resolve to any address", host),
    })
}

/// Largest datagram accepted from a server.
const MAX_DATAGRAM: usize = 1400;

async fn query_info(host: &str, port: u16) -> Result<ServerInfo, QueryError> {
    let target = resolve(host, port).await?;

    let bind: SocketAddr = if target.is_ipv4() {
        (Ipv4Addr::UNSPECIFIED, 0).into()
    } else {
        (Ipv6Addr::UNSPECIFIED, 0).into()
    };
    let socket = UdpSocket::bind(bind).await?;
    // Connected: the kernel drops datagrams from any other peer.
    socket.connect(target).await?;

    let mut codec = A2sCodec;
    let mut buf = BytesMut::with_capacity(MAX_DATAGRAM);

    debug!("Sending A2S_INFO to {}", target);
    send_request(&socket, &mut codec, &mut buf, A2sRequest::Info { challenge: None }).await?;

    let mut challenged = false;
    loop {
        buf.clear();
        buf.resize(MAX_DATAGRAM, 0);
        let n = socket.recv(&mut buf).await?;
        buf.truncate(n);

        let reply = match codec.decode(&mut buf)? {
            Some(reply) => reply,
            None => continue,
        };

        match reply {
            A2sReply::Info(info) => {
                debug!(
                    "A2S_INFO from {}: {} ({}/{})",
                    target, info.name, info.players, info.max_players
                );
                return Ok(info);
            }
            A2sReply::Challenge(challenge) if !challenged => {
                debug!("Answering A2S challenge from {}", target);
                challenged = true;
                let request = A2sRequest::Info {
                    challenge: Some(challenge),
                };
                send_request(&socket, &mut codec, &mut buf, request).await?;
            }
            A2sReply::Challenge(_) => {
                return Err(QueryError::protocol(
                    "server answered the challenge with another challenge",
                ))
            }
        }
    }
}

async fn send_request(
    socket: &UdpSocket,
    codec: &mut A2sCodec,
    buf: &mut BytesMut,
    request: A2sRequest,
) -> Result<(), QueryError> {
    buf.clear();
    codec.encode(request, buf)?;
    socket.send(&buf[..]).await?;
    Ok(())
}
