use std::{net::SocketAddr, sync::Arc, time::Instant};

use axum::{
    body::Body,
    extract::{ConnectInfo, Query, State},
    http::{header, HeaderMap, HeaderValue, Request, StatusCode},
    middleware::{self, Next},
    response::{IntoResponse, Response},
    routing::get,
    Json, Router,
};
use serde::{Deserialize, Serialize};
use serde_json::json;
use tokio::net::TcpListener;
use uuid::Uuid;

use crate::logging::logger;
use crate::{
    app_state::AppState,
    channels::{build_channels_fingerprint, ChannelView},
    loader::{LoadError, Snapshot},
};

const MAX_LIMIT_DIGITS: usize = 5;
const INVALID_QUERY_ERROR: &str = "Invalid query parameters supplied.";
const SUPERSEDED_ERROR: &str = "Channel request was superseded by a newer limit.";

type ApiResponse = Result<Response, ApiError>;

fn extract_request_id(headers: &HeaderMap) -> String {
    headers
        .get("x-request-id")
        .and_then(|value| value.to_str().ok())
        .filter(|value| !value.trim().is_empty())
        .map(|value| value.to_string())
        .unwrap_or_else(|| Uuid::new_v4().to_string())
}

fn extract_client_ip(headers: &HeaderMap, remote: Option<&SocketAddr>) -> Option<String> {
    headers
        .get("x-forwarded-for")
        .and_then(|value| value.to_str().ok())
        .and_then(|raw| raw.split(',').next())
        .map(|value| value.trim().to_string())
        .filter(|value| !value.is_empty())
        .or_else(|| remote.map(|addr| addr.ip().to_string()))
}

async fn log_requests(request: Request<Body>, next: Next) -> Response {
    let request_id = extract_request_id(request.headers());
    let method = request.method().clone();
    let raw_url = request.uri().to_string();
    let remote = request
        .extensions()
        .get::<ConnectInfo<SocketAddr>>()
        .map(|info| &info.0);
    let client_ip = extract_client_ip(request.headers(), remote);
    let user_agent = request
        .headers()
        .get(header::USER_AGENT)
        .and_then(|value| value.to_str().ok())
        .map(|value| value.to_string());
    let started_at = Instant::now();

    logger().info(
        "request.received",
        json!({
            "requestId": request_id,
            "method": method.as_str(),
            "rawUrl": raw_url,
            "clientIp": client_ip,
            "userAgent": user_agent,
        }),
    );

    let mut response = next.run(request).await;
    let status = response.status().as_u16();
    let duration_ms = started_at.elapsed().as_secs_f64() * 1000.0;

    logger().info(
        "request.completed",
        json!({
            "requestId": request_id,
            "method": method.as_str(),
            "rawUrl": raw_url,
            "statusCode": status,
            "durationMs": duration_ms,
            "clientIp": client_ip,
        }),
    );

    if let Ok(value) = HeaderValue::from_str(&request_id) {
        response
            .headers_mut()
            .insert(header::HeaderName::from_static("x-request-id"), value);
    }

    response
}

#[derive(Debug)]
enum ApiError {
    BadRequestWithDetails {
        message: &'static str,
        details: Vec<String>,
    },
    BadGateway(String),
    Conflict(&'static str),
    Internal(anyhow::Error),
}

#[derive(Serialize)]
struct ErrorResponse<'a> {
    error: &'a str,
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        match self {
            ApiError::BadRequestWithDetails { message, details } => (
                StatusCode::BAD_REQUEST,
                Json(json!({
                    "error": message,
                    "details": details,
                })),
            )
                .into_response(),
            ApiError::BadGateway(message) => (
                StatusCode::BAD_GATEWAY,
                Json(ErrorResponse { error: &message }),
            )
                .into_response(),
            ApiError::Conflict(message) => {
                (StatusCode::CONFLICT, Json(ErrorResponse { error: message })).into_response()
            }
            ApiError::Internal(error) => {
                logger().error(
                    "internal.error",
                    json!({
                        "error": {
                            "message": error.to_string(),
                            "debug": format!("{:?}", error),
                        }
                    }),
                );
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    Json(ErrorResponse {
                        error: "Internal Server Error",
                    }),
                )
                    .into_response()
            }
        }
    }
}

#[derive(Serialize)]
struct HealthResponse<'a> {
    status: &'a str,
}

#[derive(Serialize)]
struct ChannelsResponse<'a> {
    channels: &'a [ChannelView],
    meta: ChannelsMeta<'a>,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct ChannelsMeta<'a> {
    limit: usize,
    total: usize,
    fingerprint: &'a str,
    loaded_at: String,
    stale: bool,
}

pub fn build_router(state: AppState) -> Router {
    Router::new()
        .route("/healthz", get(healthz))
        .route("/channels", get(get_channels))
        .with_state(state)
        .layer(middleware::from_fn(log_requests))
}

pub async fn serve(state: AppState) -> anyhow::Result<()> {
    let addr = SocketAddr::from(([0, 0, 0, 0], state.config.port));
    let router = build_router(state);

    let listener = TcpListener::bind(addr).await?;
    logger().info(
        "server.listening",
        json!({
            "address": addr.to_string()
        }),
    );

    axum::serve(
        listener,
        router.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .with_graceful_shutdown(shutdown_signal())
    .await?;

    Ok(())
}

async fn healthz() -> Response {
    (StatusCode::OK, Json(HealthResponse { status: "ok" })).into_response()
}

#[derive(Debug, Default, Deserialize)]
struct ChannelsQueryParams {
    #[serde(default)]
    limit: Option<String>,
}

async fn get_channels(
    State(state): State<AppState>,
    headers: HeaderMap,
    Query(query): Query<ChannelsQueryParams>,
) -> ApiResponse {
    let limit = match parse_limit(
        query.limit,
        state.config.channels.default_limit,
        state.config.channels.max_limit,
    ) {
        Ok(limit) => limit,
        Err(details) => {
            return Err(ApiError::BadRequestWithDetails {
                message: INVALID_QUERY_ERROR,
                details,
            });
        }
    };

    match state.loader.load(limit).await {
        Ok(snapshot) => Ok(channels_response(&headers, &snapshot, limit, false)),
        Err(LoadError::Retrieval { error, last_good }) => {
            match last_good.filter(|_| state.config.channels.serve_stale) {
                Some(snapshot) => {
                    logger().warn(
                        "channels.serving_stale",
                        json!({
                            "limit": limit,
                            "snapshotLimit": snapshot.limit,
                            "loadedAt": snapshot.loaded_at.to_rfc3339(),
                            "error": error.to_string(),
                        }),
                    );
                    let snapshot = cap_snapshot(snapshot, limit).map_err(ApiError::Internal)?;
                    Ok(channels_response(&headers, &snapshot, limit, true))
                }
                None => Err(ApiError::BadGateway(error.to_string())),
            }
        }
        Err(LoadError::Superseded { .. }) => Err(ApiError::Conflict(SUPERSEDED_ERROR)),
        Err(LoadError::Internal(error)) => Err(ApiError::Internal(error)),
    }
}

/// Trims a retained snapshot taken with a larger limit down to the
/// requested one.
fn cap_snapshot(snapshot: Arc<Snapshot>, limit: usize) -> anyhow::Result<Arc<Snapshot>> {
    if snapshot.channels.len() <= limit {
        return Ok(snapshot);
    }
    let channels: Vec<ChannelView> = snapshot.channels.iter().take(limit).cloned().collect();
    let fingerprint = build_channels_fingerprint(&channels)?;
    Ok(Arc::new(Snapshot {
        limit,
        channels,
        fingerprint,
        loaded_at: snapshot.loaded_at,
    }))
}

fn channels_response(headers: &HeaderMap, snapshot: &Snapshot, limit: usize, stale: bool) -> Response {
    let etag = format!("\"{}\"", snapshot.fingerprint);
    let cache_control = if stale {
        HeaderValue::from_static("no-cache")
    } else {
        HeaderValue::from_static("public, max-age=30")
    };

    let not_modified = headers
        .get(header::IF_NONE_MATCH)
        .and_then(|value| value.to_str().ok())
        .is_some_and(|value| value.split(',').any(|candidate| candidate.trim() == etag));

    let mut reply = if not_modified {
        StatusCode::NOT_MODIFIED.into_response()
    } else {
        Json(ChannelsResponse {
            channels: &snapshot.channels,
            meta: ChannelsMeta {
                limit,
                total: snapshot.channels.len(),
                fingerprint: &snapshot.fingerprint,
                loaded_at: snapshot.loaded_at.to_rfc3339(),
                stale,
            },
        })
        .into_response()
    };

    if let Ok(value) = HeaderValue::from_str(&etag) {
        reply.headers_mut().insert(header::ETAG, value);
    }
    reply.headers_mut().insert(header::CACHE_CONTROL, cache_control);
    reply
}

fn parse_limit(
    value: Option<String>,
    default_limit: usize,
    max_limit: usize,
) -> Result<usize, Vec<String>> {
    let Some(raw) = normalize_raw_value(value) else {
        return Ok(default_limit.min(max_limit));
    };
    if raw.len() > MAX_LIMIT_DIGITS || !raw.chars().all(|c| c.is_ascii_digit()) {
        return Err(vec!["limit must be a whole number".into()]);
    }
    raw.parse::<usize>()
        .map(|parsed| parsed.min(max_limit))
        .map_err(|_| vec!["limit must be a whole number".into()])
}

fn normalize_raw_value(value: Option<String>) -> Option<String> {
    value.and_then(|raw| {
        let trimmed = raw.trim();
        if trimmed.is_empty() {
            None
        } else {
            Some(trimmed.to_string())
        }
    })
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(error) = tokio::signal::ctrl_c().await {
            logger().error(
                "server.signal_error",
                json!({ "signal": "ctrl_c", "error": error.to_string() }),
            );
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        use tokio::signal::unix::{signal, SignalKind};
        match signal(SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(error) => {
                logger().error(
                    "server.signal_error",
                    json!({ "signal": "sigterm", "error": error.to_string() }),
                );
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }

    logger().info("server.shutdown", json!({}));
}
