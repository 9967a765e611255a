use std::{net::SocketAddr, sync::Arc, time::Duration};

use bytes::Bytes;
use futures::FutureExt;
use sinkhole_context::{DnsRequestCtx, Middlewares, RequestType};
use sinkhole_dns::{DnsMessage, DnsMessageBuilder};
use sinkhole_resolver::{DynResolver, ResolveError};
use tcp::run_tcp;
use tokio::net::{TcpListener, UdpSocket};
use udp::run_udp;

mod tcp;
mod udp;

/// Everything a request needs on its way through the server.
pub struct ServerState<G, L> {
    pub resolver: Arc<DynResolver<G, L>>,
    pub middlewares: Middlewares<G, L>,
    pub global: Arc<G>,
    /// Budget for a single request, middlewares and upstreams included.
    pub timeout: Duration,
}

/// DNS server answering over UDP and TCP on the same address.
pub struct DnsServer<G, L> {
    udp: UdpSocket,
    tcp: TcpListener,
    state: Arc<ServerState<G, L>>,
}

impl<G, L> DnsServer<G, L>
where
    G: Send + Sync + 'static,
    L: Default + Send + Sync + 'static,
{
    /// Bind both sockets. With port 0 the TCP listener takes the port the UDP socket got.
    pub async fn bind(bind_addr: SocketAddr, state: ServerState<G, L>) -> anyhow::Result<Self> {
        let udp = UdpSocket::bind(bind_addr).await?;
        let tcp = TcpListener::bind(udp.local_addr()?).await?;

        Ok(Self {
            udp,
            tcp,
            state: Arc::new(state),
        })
    }

    pub fn local_addr(&self) -> anyhow::Result<SocketAddr> {
        Ok(self.udp.local_addr()?)
    }

    /// Serve until one of the listeners fails.
    pub async fn run(self) -> anyhow::Result<()> {
        let udp_future = run_udp(self.udp, self.state.clone()).boxed();
        let tcp_future = run_tcp(self.tcp, self.state).boxed();

        futures::future::try_join_all([udp_future, tcp_future]).await?;

        Ok(())
    }
}

/// Run one request through the middlewares and then the resolver.
///
/// Returns `None` when there is nothing to send back, i.e. the request could not even be decoded.
pub(crate) async fn handle_request<G, L>(
    state: &ServerState<G, L>,
    request_type: RequestType,
    peer: SocketAddr,
    raw: Bytes,
) -> Option<Bytes>
where
    G: Send + Sync + 'static,
    L: Default + Send + Sync + 'static,
{
    let ctx = DnsRequestCtx::new(state.timeout, request_type, peer, raw, state.global.clone(), L::default());

    match sinkhole_context::run_middlewares(state.middlewares.clone(), &ctx).await {
        Ok(Some(resp)) => return Some(resp),
        Ok(None) => {}
        Err(e) => tracing::warn!("middleware failed for {}: {:#}", peer, e),
    }

    match state.resolver.resolve(&ctx).await {
        Ok(resp) => Some(resp),
        Err(e) => {
            tracing::warn!("failed to resolve query from {}: {}", peer, e);
            let message = ctx.message().ok()?;
            match error_response(message, &e) {
                Ok(resp) => Some(resp),
                Err(err) => {
                    tracing::warn!("failed to build error response for {}: {}", peer, err);
                    None
                }
            }
        }
    }
}

/// A reply to `message` that carries only the response code for `error`.
fn error_response(message: &DnsMessage, error: &ResolveError) -> anyhow::Result<Bytes> {
    DnsMessageBuilder::reply_to(message)
        .recursion_available(true)
        .with_response(error.response_code())
        .build()
        .encode()
}
