use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::Serialize;
use serde_json::json;
use thiserror::Error;
use tokio::sync::{watch, RwLock};

use crate::catalog::{fetch_catalog, CatalogSource, RetrievalError};
use crate::channels::{aggregate_catalog, build_channels_fingerprint, ChannelView};
use crate::logging::logger;

#[derive(Debug, Clone, Serialize)]
pub struct Snapshot {
    pub limit: usize,
    pub channels: Vec<ChannelView>,
    pub fingerprint: String,
    #[serde(rename = "loadedAt")]
    pub loaded_at: DateTime<Utc>,
}

#[derive(Debug, Error)]
pub enum LoadError {
    #[error("{error}")]
    Retrieval {
        #[source]
        error: RetrievalError,
        last_good: Option<Arc<Snapshot>>,
    },
    #[error("request for limit {requested} was superseded by limit {current}")]
    Superseded { requested: usize, current: usize },
    #[error(transparent)]
    Internal(#[from] anyhow::Error),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct ActiveRequest {
    generation: u64,
    limit: Option<usize>,
}

/// Fetches and aggregates channel lists. The most recently requested limit
/// wins: starting a load for a different limit abandons loads still in
/// flight for the previous one, and their results are never committed.
pub struct ChannelLoader {
    source: Arc<dyn CatalogSource>,
    active: watch::Sender<ActiveRequest>,
    last_good: RwLock<Option<Arc<Snapshot>>>,
}

impl ChannelLoader {
    pub fn new(source: Arc<dyn CatalogSource>) -> Self {
        let (active, _) = watch::channel(ActiveRequest {
            generation: 0,
            limit: None,
        });
        Self {
            source,
            active,
            last_good: RwLock::new(None),
        }
    }

    pub async fn last_good(&self) -> Option<Arc<Snapshot>> {
        self.last_good.read().await.clone()
    }

    pub async fn load(&self, limit: usize) -> Result<Arc<Snapshot>, LoadError> {
        let generation = self.begin(limit);
        let mut watcher = self.active.subscribe();

        let fetched = tokio::select! {
            biased;
            _ = wait_superseded(&mut watcher, generation) => {
                return Err(self.superseded(limit));
            }
            result = fetch_catalog(self.source.as_ref()) => result,
        };

        let catalog = match fetched {
            Ok(catalog) => catalog,
            Err(_) if self.is_superseded(generation) => {
                return Err(self.superseded(limit));
            }
            Err(error) => {
                logger().error(
                    "channels.load_failed",
                    json!({
                        "limit": limit,
                        "collection": error.collection(),
                        "error": error.to_string(),
                    }),
                );
                return Err(LoadError::Retrieval {
                    error,
                    last_good: self.last_good().await,
                });
            }
        };

        let aggregation = aggregate_catalog(&catalog, limit);
        let fingerprint = build_channels_fingerprint(&aggregation.channels)?;
        logger().info(
            "channels.aggregated",
            json!({
                "limit": limit,
                "total": aggregation.channels.len(),
                "eligible": aggregation.eligible,
                "streams": catalog.streams.len(),
                "skippedStreams": {
                    "total": aggregation.skipped.total(),
                    "missingFields": aggregation.skipped.missing_fields,
                    "blocked": aggregation.skipped.blocked,
                    "invalidUrl": aggregation.skipped.invalid_url,
                },
                "fingerprint": fingerprint,
            }),
        );

        let snapshot = Arc::new(Snapshot {
            limit,
            channels: aggregation.channels,
            fingerprint,
            loaded_at: Utc::now(),
        });

        let mut last_good = self.last_good.write().await;
        if self.is_superseded(generation) {
            return Err(self.superseded(limit));
        }
        *last_good = Some(snapshot.clone());
        Ok(snapshot)
    }

    fn begin(&self, limit: usize) -> u64 {
        let mut generation = 0;
        self.active.send_if_modified(|active| {
            let changed = active.limit != Some(limit);
            if changed {
                active.generation += 1;
                active.limit = Some(limit);
            }
            generation = active.generation;
            changed
        });
        generation
    }

    fn is_superseded(&self, generation: u64) -> bool {
        self.active.borrow().generation != generation
    }

    fn superseded(&self, requested: usize) -> LoadError {
        let current = self.active.borrow().limit.unwrap_or(requested);
        logger().info(
            "channels.load_superseded",
            json!({
                "requested": requested,
                "current": current,
            }),
        );
        LoadError::Superseded { requested, current }
    }
}

async fn wait_superseded(watcher: &mut watch::Receiver<ActiveRequest>, generation: u64) {
    let closed = watcher
        .wait_for(|active| active.generation != generation)
        .await
        .is_err();
    if closed {
        std::future::pending::<()>().await;
    }
}
