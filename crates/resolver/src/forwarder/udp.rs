use std::net::SocketAddr;

use anyhow::Context;
use bytes::{Bytes, BytesMut};
use sinkhole_dns::helpers;
use tokio::{net::UdpSocket, time::Instant};

/// Largest UDP response accepted from an upstream.
const MAX_UDP_RESPONSE: usize = 1232;

/// A connected UDP socket to one upstream, on a fresh random source port.
#[derive(Debug)]
pub(crate) struct UdpConn {
    socket: UdpSocket,
}

impl UdpConn {
    pub async fn new(upstream_addr: SocketAddr) -> anyhow::Result<Self> {
        let bind_addr = if upstream_addr.is_ipv4() {
            SocketAddr::from(([0, 0, 0, 0], 0))
        } else {
            SocketAddr::from(([0u16; 8], 0))
        };
        let socket = UdpSocket::bind(bind_addr).await?;
        socket.connect(upstream_addr).await?;
        Ok(Self { socket })
    }

    /// Send a query and wait for the response carrying the same transaction id.
    ///
    /// Datagrams that are not responses to this query are dropped.
    pub async fn send_and_receive(&self, query: &[u8], deadline: Instant) -> anyhow::Result<Bytes> {
        let want_id = helpers::extract_transaction_id(query).context("query without transaction id")?;

        tokio::time::timeout_at(deadline, self.socket.send(query))
            .await
            .context("send timeout")??;

        let mut buf = BytesMut::zeroed(MAX_UDP_RESPONSE);

        loop {
            let n = tokio::time::timeout_at(deadline, self.socket.recv(&mut buf))
                .await
                .context("recv timeout")??;

            let resp = &buf[..n];
            if helpers::is_response(resp) == Some(true) && helpers::extract_transaction_id(resp) == Some(want_id) {
                buf.truncate(n);
                return Ok(buf.freeze());
            }
            tracing::debug!("dropping unexpected datagram of {} bytes", n);
        }
    }
}
