use std::net::SocketAddr;

use anyhow::Context;
use bytes::{Bytes, BytesMut};
use tokio::{
    io::{AsyncReadExt, AsyncWriteExt},
    net::TcpStream,
    time::{Instant, timeout_at},
};

/// A TCP connection to one upstream, used for a single exchange.
pub(crate) struct TcpConn {
    stream: TcpStream,
}

impl TcpConn {
    pub async fn connect(addr: SocketAddr, deadline: Instant) -> anyhow::Result<Self> {
        let stream = timeout_at(deadline, TcpStream::connect(addr))
            .await
            .context("tcp connect timeout")??;

        // Length prefix and body are written separately.
        stream.set_nodelay(true)?;

        Ok(Self { stream })
    }

    /// Send a length-prefixed query and read the length-prefixed response.
    pub async fn send_and_receive(&mut self, query: &[u8], deadline: Instant) -> anyhow::Result<Bytes> {
        let len = u16::try_from(query.len()).map_err(|_| anyhow::anyhow!("query too large for DNS/TCP: {}", query.len()))?;

        timeout_at(deadline, self.stream.write_all(&len.to_be_bytes()))
            .await
            .context("write len timeout")??;

        timeout_at(deadline, self.stream.write_all(query))
            .await
            .context("write body timeout")??;

        let mut resp_len = [0u8; 2];
        timeout_at(deadline, self.stream.read_exact(&mut resp_len))
            .await
            .context("read len timeout")??;

        let mut buf = BytesMut::zeroed(u16::from_be_bytes(resp_len) as usize);
        timeout_at(deadline, self.stream.read_exact(&mut buf[..]))
            .await
            .context("read body timeout")??;

        Ok(buf.freeze())
    }
}
