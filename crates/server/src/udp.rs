use std::sync::Arc;

use bytes::BytesMut;
use sinkhole_context::RequestType;
use tokio::net::UdpSocket;

use crate::{ServerState, handle_request};

/// Largest query accepted over UDP.
const RECV_SIZE: usize = 4096;

/// Serve DNS over UDP, one task per datagram.
pub(crate) async fn run_udp<G, L>(socket: UdpSocket, state: Arc<ServerState<G, L>>) -> anyhow::Result<()>
where
    G: Send + Sync + 'static,
    L: Default + Send + Sync + 'static,
{
    let socket = Arc::new(socket);
    let mut buffer = BytesMut::with_capacity(RECV_SIZE);

    tracing::info!("UDP listening on {}", socket.local_addr()?);

    loop {
        buffer.resize(RECV_SIZE, 0);
        let (len, client) = match socket.recv_from(&mut buffer[..]).await {
            Ok(r) => r,
            Err(e) => {
                tracing::warn!("failed to receive UDP datagram: {}", e);
                continue;
            }
        };
        let raw = buffer.split_to(len).freeze();

        let sock = socket.clone();
        let state = state.clone();

        tokio::spawn(async move {
            if let Some(resp) = handle_request(&state, RequestType::UDP, client, raw).await {
                if let Err(e) = sock.send_to(&resp, client).await {
                    tracing::warn!("failed to write response to client {}: {}", client, e);
                }
            }
        });
    }
}
