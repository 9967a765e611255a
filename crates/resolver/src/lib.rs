use async_trait::async_trait;
use bytes::Bytes;
use sinkhole_context::DnsRequestCtx;
use sinkhole_dns::DnsResponseCode;
use thiserror::Error;

pub mod forwarder;

/// Why a request could not be resolved.
#[derive(Debug, Error)]
pub enum ResolveError {
    #[error("invalid request: {0}")]
    InvalidRequest(String),
    #[error("request timed out")]
    Timeout,
    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl ResolveError {
    /// Response code to answer the client with.
    pub fn response_code(&self) -> DnsResponseCode {
        match self {
            ResolveError::InvalidRequest(_) => DnsResponseCode::FormatError,
            ResolveError::Timeout | ResolveError::Other(_) => DnsResponseCode::ServerFailure,
        }
    }
}

/// The handler a request reaches when no middleware answered it.
#[async_trait]
pub trait DnsResolver<G, L>: Send + Sync {
    async fn resolve(&self, ctx: &DnsRequestCtx<G, L>) -> Result<Bytes, ResolveError>;
}

pub type DynResolver<G, L> = dyn DnsResolver<G, L>;
