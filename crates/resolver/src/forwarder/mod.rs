use std::{net::SocketAddr, sync::Arc};

use async_trait::async_trait;
use bytes::Bytes;
use sinkhole_context::DnsRequestCtx;

use crate::{DnsResolver, ResolveError};

use request::UpstreamResolveRequest;
use upstream::Upstreams;

mod request;
mod tcp;
mod udp;
mod upstream;

/// Resolver that forwards the incoming request to the configured upstream servers.
pub struct ForwardResolver {
    upstreams: Arc<Upstreams>,
}

impl ForwardResolver {
    pub fn new(upstreams: &[SocketAddr]) -> Self {
        if upstreams.is_empty() {
            tracing::warn!("no upstreams configured for forward resolver, it will not be able to resolve any queries!");
        }
        Self {
            upstreams: Arc::new(Upstreams::new(upstreams)),
        }
    }
}

#[async_trait]
impl<G, L> DnsResolver<G, L> for ForwardResolver
where
    G: Send + Sync,
    L: Send + Sync,
{
    async fn resolve(&self, ctx: &DnsRequestCtx<G, L>) -> Result<Bytes, ResolveError> {
        UpstreamResolveRequest::new(
            ctx.request_type(),
            ctx.raw(),
            ctx.budget().clone(),
            self.upstreams.clone(),
        )
        .resolve()
        .await
    }
}
