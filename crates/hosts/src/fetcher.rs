use std::{io, time::Duration};

use futures::{StreamExt, TryStreamExt};
use reqwest::{Client, StatusCode};
use thiserror::Error;
use tokio_util::io::StreamReader;
use tracing::{debug, info, warn};

use crate::{
    name::NormalizedName,
    parser::parse_stream,
    source::Source,
    store::BlackholeStore,
};

pub const DEFAULT_FETCH_TIMEOUT: Duration = Duration::from_secs(30);

#[derive(Debug, Error)]
pub enum FetchError {
    #[error("request to {location} failed: {error}")]
    Request {
        location: Source,
        #[source]
        error: reqwest::Error,
    },
    #[error("reading body of {location} failed: {error}")]
    Body {
        location: Source,
        #[source]
        error: io::Error,
    },
}

impl FetchError {
    pub fn location(&self) -> &Source {
        match self {
            FetchError::Request { location, .. } | FetchError::Body { location, .. } => location,
        }
    }
}

/// What a successful fetch contributed to the store.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FetchOutcome {
    pub source: Source,
    pub status: StatusCode,
    /// Names read from the body, duplicates included.
    pub parsed: usize,
    /// Names that were not blocked before this fetch.
    pub added: usize,
}

/// Downloads hosts lists and merges them into a [`BlackholeStore`].
#[derive(Debug, Clone)]
pub struct Fetcher {
    client: Client,
}

impl Fetcher {
    pub fn new(timeout: Duration) -> anyhow::Result<Self> {
        let client = Client::builder()
            .timeout(timeout)
            .user_agent(concat!("sinkhole/", env!("CARGO_PKG_VERSION")))
            .build()?;

        Ok(Self { client })
    }

    pub fn with_client(client: Client) -> Self {
        Self { client }
    }

    /// Download and parse `source`.
    ///
    /// A non-success status is logged and the body is parsed anyway. Any transport or
    /// read error fails the whole fetch, so a truncated body contributes nothing.
    pub async fn fetch(&self, source: &Source) -> Result<(StatusCode, Vec<NormalizedName>), FetchError> {
        debug!("fetching hosts list from {}", source);

        let resp = self
            .client
            .get(source.url().clone())
            .send()
            .await
            .map_err(|error| FetchError::Request {
                location: source.clone(),
                error,
            })?;

        let status = resp.status();
        if !status.is_success() {
            warn!("hosts list {} answered with status {}, parsing body anyway", source, status);
        }

        let body = Box::pin(resp.bytes_stream()).map(|chunk| chunk.map_err(io::Error::other));
        let names = parse_stream(StreamReader::new(body))
            .try_collect::<Vec<_>>()
            .await
            .map_err(|error| FetchError::Body {
                location: source.clone(),
                error,
            })?;

        Ok((status, names))
    }

    /// Fetch `source` and merge its names into `store` as one batch.
    pub async fn fetch_into(&self, source: &Source, store: &BlackholeStore) -> Result<FetchOutcome, FetchError> {
        let (status, names) = self.fetch(source).await?;
        let parsed = names.len();
        let added = store.insert_all(names);

        info!(
            "merged {} of {} names from {}, blackhole now contains {} entries",
            added,
            parsed,
            source,
            store.len()
        );

        Ok(FetchOutcome {
            source: source.clone(),
            status,
            parsed,
            added,
        })
    }
}
