use std::{net::SocketAddr, sync::Arc, time::Duration};

use bytes::Bytes;
use sinkhole_context::{RequestBudget, RequestType};
use sinkhole_dns::helpers;

use super::{tcp::TcpConn, udp::UdpConn, upstream::Upstreams};
use crate::ResolveError;

/// Minimum time left on the budget to start another upstream attempt.
const MIN_REMAINING_TO_START_ATTEMPT: Duration = Duration::from_millis(15);

/// One query on its way to the upstreams.
pub struct UpstreamResolveRequest {
    request_type: RequestType,
    query: Bytes,
    budget: RequestBudget,
    upstreams: Arc<Upstreams>,
}

impl UpstreamResolveRequest {
    pub fn new(request_type: RequestType, query: Bytes, budget: RequestBudget, upstreams: Arc<Upstreams>) -> Self {
        Self {
            request_type,
            query,
            budget,
            upstreams,
        }
    }

    /// Try each upstream once in round-robin order until one answers.
    ///
    /// UDP queries are retried over TCP on the same upstream when the answer is truncated.
    pub async fn resolve(&self) -> Result<Bytes, ResolveError> {
        let upstreams = self.upstreams.as_slice();
        let Some(start) = self.upstreams.pick_index() else {
            return Err(ResolveError::Other(anyhow::anyhow!("no upstreams available")));
        };

        let request_tid = helpers::extract_transaction_id(&self.query)
            .ok_or_else(|| ResolveError::InvalidRequest("failed to extract tid from query".into()))?;

        let n = upstreams.len();
        for off in 0..n {
            match self.budget.remaining() {
                Some(r) if r >= MIN_REMAINING_TO_START_ATTEMPT => {}
                _ => return Err(ResolveError::Timeout),
            }

            let upstream = upstreams[(start + off) % n];

            let attempt = match self.request_type {
                RequestType::TCP => self.resolve_tcp(upstream).await,
                RequestType::UDP => match self.resolve_udp(upstream).await {
                    Ok(resp) => match helpers::is_truncated(&resp) {
                        Some(true) => self.resolve_tcp(upstream).await,
                        Some(false) => Ok(resp),
                        None => Err(anyhow::anyhow!("invalid UDP response")),
                    },
                    Err(e) => Err(e),
                },
            };

            let resp = match attempt {
                Ok(r) => r,
                Err(e) => {
                    tracing::warn!(
                        upstream = %upstream,
                        req_type = ?self.request_type,
                        error = %e,
                        "forward attempt failed"
                    );
                    continue;
                }
            };

            if helpers::extract_transaction_id(&resp) != Some(request_tid) {
                tracing::warn!(
                    upstream = %upstream,
                    expected_tid = request_tid,
                    "transaction id mismatch"
                );
                continue;
            }
            return Ok(resp);
        }

        Err(ResolveError::Other(anyhow::anyhow!("all upstreams failed")))
    }

    async fn resolve_tcp(&self, upstream: SocketAddr) -> anyhow::Result<Bytes> {
        let deadline = self.budget.at();
        let mut conn = TcpConn::connect(upstream, deadline).await?;
        conn.send_and_receive(&self.query, deadline).await
    }

    async fn resolve_udp(&self, upstream: SocketAddr) -> anyhow::Result<Bytes> {
        let conn = UdpConn::new(upstream).await?;
        conn.send_and_receive(&self.query, self.budget.at()).await
    }
}
