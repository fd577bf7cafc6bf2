use async_trait::async_trait;
use reqwest::{Client, Url};
use serde::de::DeserializeOwned;
use serde_json::json;

use crate::config::CatalogConfig;
use crate::logging::logger;

use super::{
    decode_rows, BlockEntry, CatalogSource, ChannelRecord, Collection, LogoRecord,
    RetrievalError, StreamRecord,
};

/// HTTP client for the public iptv-org API.
#[derive(Clone)]
pub struct IptvOrgClient {
    client: Client,
    channels_url: Url,
    streams_url: Url,
    logos_url: Url,
    blocklist_url: Url,
}

impl IptvOrgClient {
    pub fn new(config: &CatalogConfig) -> anyhow::Result<Self> {
        let client = Client::builder()
            .user_agent(config.user_agent.clone())
            .timeout(config.request_timeout())
            .build()?;

        Ok(Self {
            client,
            channels_url: config.endpoint(&config.channels_path)?,
            streams_url: config.endpoint(&config.streams_path)?,
            logos_url: config.endpoint(&config.logos_path)?,
            blocklist_url: config.endpoint(&config.blocklist_path)?,
        })
    }

    fn url_for(&self, collection: Collection) -> &Url {
        match collection {
            Collection::Channels => &self.channels_url,
            Collection::Streams => &self.streams_url,
            Collection::Logos => &self.logos_url,
            Collection::Blocklist => &self.blocklist_url,
        }
    }

    async fn fetch_collection<T: DeserializeOwned>(
        &self,
        collection: Collection,
    ) -> Result<Vec<T>, RetrievalError> {
        let url = self.url_for(collection);
        let response = self
            .client
            .get(url.clone())
            .send()
            .await
            .map_err(|source| RetrievalError::Request { collection, source })?;

        let status = response.status();
        if !status.is_success() {
            return Err(RetrievalError::Status { collection, status });
        }

        let body = response
            .bytes()
            .await
            .map_err(|source| RetrievalError::Request { collection, source })?;
        let decoded = decode_rows::<T>(collection, &body)?;

        if decoded.skipped > 0 {
            logger().warn(
                "catalog.rows_skipped",
                json!({
                    "collection": collection,
                    "skipped": decoded.skipped,
                }),
            );
        }
        logger().debug(
            "catalog.fetched",
            json!({
                "collection": collection,
                "url": url.as_str(),
                "rows": decoded.rows.len(),
                "bytes": body.len(),
            }),
        );

        Ok(decoded.rows)
    }
}

#[async_trait]
impl CatalogSource for IptvOrgClient {
    async fn fetch_channels(&self) -> Result<Vec<ChannelRecord>, RetrievalError> {
        self.fetch_collection(Collection::Channels).await
    }

    async fn fetch_streams(&self) -> Result<Vec<StreamRecord>, RetrievalError> {
        self.fetch_collection(Collection::Streams).await
    }

    async fn fetch_logos(&self) -> Result<Vec<LogoRecord>, RetrievalError> {
        self.fetch_collection(Collection::Logos).await
    }

    async fn fetch_blocklist(&self) -> Result<Vec<BlockEntry>, RetrievalError> {
        self.fetch_collection(Collection::Blocklist).await
    }
}
