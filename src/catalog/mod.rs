mod client;
mod decode;
mod models;

use std::fmt;

use async_trait::async_trait;
use serde::Serialize;
use thiserror::Error;

pub use client::IptvOrgClient;
pub use decode::{decode_rows, DecodedRows};
pub use models::{BlockEntry, Catalog, ChannelRecord, LogoFormat, LogoRecord, StreamRecord};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Collection {
    Channels,
    Streams,
    Logos,
    Blocklist,
}

impl Collection {
    pub fn as_str(&self) -> &'static str {
        match self {
            Collection::Channels => "channels",
            Collection::Streams => "streams",
            Collection::Logos => "logos",
            Collection::Blocklist => "blocklist",
        }
    }
}

impl fmt::Display for Collection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Error)]
pub enum RetrievalError {
    #[error("{collection} request failed: {source}")]
    Request {
        collection: Collection,
        #[source]
        source: reqwest::Error,
    },
    #[error("{collection} returned {status}")]
    Status {
        collection: Collection,
        status: reqwest::StatusCode,
    },
    #[error("{collection} payload is not a JSON array: {source}")]
    Decode {
        collection: Collection,
        #[source]
        source: serde_json::Error,
    },
}

impl RetrievalError {
    pub fn collection(&self) -> Collection {
        match self {
            RetrievalError::Request { collection, .. }
            | RetrievalError::Status { collection, .. }
            | RetrievalError::Decode { collection, .. } => *collection,
        }
    }
}

/// Read-only provider of the four iptv-org collections.
#[async_trait]
pub trait CatalogSource: Send + Sync {
    async fn fetch_channels(&self) -> Result<Vec<ChannelRecord>, RetrievalError>;
    async fn fetch_streams(&self) -> Result<Vec<StreamRecord>, RetrievalError>;
    async fn fetch_logos(&self) -> Result<Vec<LogoRecord>, RetrievalError>;
    async fn fetch_blocklist(&self) -> Result<Vec<BlockEntry>, RetrievalError>;
}

/// Runs the four fetches concurrently. The first failure aborts the cycle;
/// there is no partial catalog.
pub async fn fetch_catalog<S>(source: &S) -> Result<Catalog, RetrievalError>
where
    S: CatalogSource + ?Sized,
{
    let (channels, streams, logos, blocklist) = tokio::try_join!(
        source.fetch_channels(),
        source.fetch_streams(),
        source.fetch_logos(),
        source.fetch_blocklist(),
    )?;

    Ok(Catalog {
        channels,
        streams,
        logos,
        blocklist,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[derive(Default)]
    struct FlakySource {
        failing: Option<Collection>,
        calls: AtomicUsize,
    }

    impl FlakySource {
        fn check(&self, collection: Collection) -> Result<(), RetrievalError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            if self.failing == Some(collection) {
                return Err(RetrievalError::Status {
                    collection,
                    status: reqwest::StatusCode::SERVICE_UNAVAILABLE,
                });
            }
            Ok(())
        }
    }

    #[async_trait]
    impl CatalogSource for FlakySource {
        async fn fetch_channels(&self) -> Result<Vec<ChannelRecord>, RetrievalError> {
            self.check(Collection::Channels)?;
            Ok(vec![ChannelRecord {
                id: "bbc1".into(),
                name: "BBC One".into(),
            }])
        }

        async fn fetch_streams(&self) -> Result<Vec<StreamRecord>, RetrievalError> {
            self.check(Collection::Streams)?;
            Ok(vec![StreamRecord {
                channel: Some("bbc1".into()),
                url: Some("https://x/live.m3u8".into()),
                ..Default::default()
            }])
        }

        async fn fetch_logos(&self) -> Result<Vec<LogoRecord>, RetrievalError> {
            self.check(Collection::Logos)?;
            Ok(Vec::new())
        }

        async fn fetch_blocklist(&self) -> Result<Vec<BlockEntry>, RetrievalError> {
            self.check(Collection::Blocklist)?;
            Ok(Vec::new())
        }
    }

    #[tokio::test]
    async fn joint_fetch_returns_all_four_collections() {
        let source = FlakySource::default();
        let catalog = fetch_catalog(&source).await.unwrap();
        assert_eq!(catalog.channels.len(), 1);
        assert_eq!(catalog.streams.len(), 1);
        assert!(catalog.logos.is_empty());
        assert!(catalog.blocklist.is_empty());
        assert_eq!(source.calls.load(Ordering::SeqCst), 4);
    }

    #[tokio::test]
    async fn one_failing_collection_fails_the_whole_cycle() {
        let source = FlakySource {
            failing: Some(Collection::Logos),
            ..Default::default()
        };
        let err = fetch_catalog(&source).await.unwrap_err();
        assert_eq!(err.collection(), Collection::Logos);
        assert_eq!(err.to_string(), "logos returned 503 Service Unavailable");
    }
}
