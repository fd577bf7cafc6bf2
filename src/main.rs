use anyhow::Context;
use iptv_service::{
    app_state::AppState,
    config::Config,
    http,
    logging::{init_logger, SERVICE_NAME},
};
use serde_json::json;
use std::env;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let logger = init_logger(SERVICE_NAME);

    let config = Config::load().context("failed to load configuration")?;

    if matches!(env::args().nth(1).as_deref(), Some("check-config")) {
        logger.info(
            "config.check_passed",
            serde_json::to_value(&config).unwrap_or_else(|_| json!({ "status": "ok" })),
        );
        return Ok(());
    }

    let state = AppState::initialize(config.clone())
        .context("failed to initialize application state")?;

    if matches!(env::args().nth(1).as_deref(), Some("channels")) {
        let limit = match env::args().nth(2) {
            Some(raw) => raw
                .trim()
                .parse::<usize>()
                .with_context(|| format!("limit must be a whole number, got {raw:?}"))?,
            None => config.channels.default_limit,
        };
        let snapshot = state
            .loader
            .load(limit)
            .await
            .context("failed to load channels")?;
        let body = serde_json::to_string_pretty(&snapshot.channels)?;
        println!("{body}");
        return Ok(());
    }

    logger.info(
        "server.initialized",
        json!({
            "port": config.port,
            "catalogBaseUrl": config.catalog.base_url,
            "defaultLimit": config.channels.default_limit,
            "maxLimit": config.channels.max_limit,
        }),
    );

    http::serve(state).await.context("http server failed")
}
