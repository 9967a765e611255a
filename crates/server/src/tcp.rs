use std::{sync::Arc, time::Duration};

use bytes::Bytes;
use sinkhole_context::RequestType;
use tokio::{
    io::{AsyncRead, AsyncReadExt, AsyncWriteExt},
    net::{TcpListener, TcpStream},
    time,
};

use crate::{ServerState, handle_request};

/// Pause after a failed accept, e.g. when the process is out of file descriptors.
const ACCEPT_BACKOFF: Duration = Duration::from_millis(50);

/// Serve DNS over TCP: one length-prefixed query per connection.
pub(crate) async fn run_tcp<G, L>(listener: TcpListener, state: Arc<ServerState<G, L>>) -> anyhow::Result<()>
where
    G: Send + Sync + 'static,
    L: Default + Send + Sync + 'static,
{
    tracing::info!("TCP listening on {}", listener.local_addr()?);

    loop {
        let (mut stream, client) = match listener.accept().await {
            Ok(r) => r,
            Err(e) => {
                tracing::warn!("failed to accept TCP connection: {}", e);
                time::sleep(ACCEPT_BACKOFF).await;
                continue;
            }
        };
        let state = state.clone();

        tokio::spawn(async move {
            let raw = match time::timeout(state.timeout, read_tcp_query(&mut stream)).await {
                Ok(Ok(raw)) => raw,
                Ok(Err(e)) => {
                    tracing::warn!("failed to read query from client {}: {}", client, e);
                    return;
                }
                Err(_) => {
                    tracing::debug!("client {} sent no query within {:?}", client, state.timeout);
                    return;
                }
            };

            if let Some(resp) = handle_request(&state, RequestType::TCP, client, raw).await {
                if let Err(e) = write_tcp_response(&mut stream, &resp).await {
                    tracing::warn!("failed to write response to client {}: {}", client, e);
                }
            }
        });
    }
}

/// Read one length-prefixed DNS message.
async fn read_tcp_query<S: AsyncRead + Unpin>(stream: &mut S) -> anyhow::Result<Bytes> {
    let mut len_buf = [0u8; 2];
    stream.read_exact(&mut len_buf).await?;

    let mut buf = vec![0; u16::from_be_bytes(len_buf) as usize];
    stream.read_exact(&mut buf).await?;

    Ok(Bytes::from(buf))
}

/// Write a length-prefixed DNS message.
async fn write_tcp_response(stream: &mut TcpStream, response: &Bytes) -> anyhow::Result<()> {
    let len = u16::try_from(response.len())?;

    stream.write_all(&len.to_be_bytes()).await?;
    stream.write_all(response).await?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_read_tcp_query() {
        let mut input: &[u8] = &[0, 3, 1, 2, 3, 9];
        assert_eq!(read_tcp_query(&mut input).await.unwrap(), Bytes::from_static(&[1, 2, 3]));
    }

    #[tokio::test]
    async fn test_read_tcp_query_short_body() {
        let mut input: &[u8] = &[0, 5, 1, 2];
        assert!(read_tcp_query(&mut input).await.is_err());
    }
}
