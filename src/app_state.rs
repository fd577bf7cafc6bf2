use std::sync::Arc;

use anyhow::Context;

use crate::{
    catalog::{CatalogSource, IptvOrgClient},
    config::Config,
    loader::ChannelLoader,
};

#[derive(Clone)]
pub struct AppState {
    pub config: Config,
    pub loader: Arc<ChannelLoader>,
}

impl AppState {
    pub fn initialize(config: Config) -> anyhow::Result<Self> {
        let client =
            IptvOrgClient::new(&config.catalog).context("failed to build iptv-org client")?;
        Ok(Self::with_source(config, Arc::new(client)))
    }

    pub fn with_source(config: Config, source: Arc<dyn CatalogSource>) -> Self {
        Self {
            config,
            loader: Arc::new(ChannelLoader::new(source)),
        }
    }
}
