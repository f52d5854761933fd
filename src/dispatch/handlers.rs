use axum::{
    extract::{Request, State},
    middleware::Next,
    response::Response,
    Json,
};
use serde::Serialize;
use std::sync::Arc;

use crate::observability::metrics;

/// Static facts about this node, exposed on `/api/v1/info`.
#[derive(Debug, Clone, Serialize)]
pub struct NodeInfo {
    pub version: &'static str,
    pub external_url: String,
    pub peer_url: String,
}

pub async fn get_info(State(info): State<Arc<NodeInfo>>) -> Json<NodeInfo> {
    Json(info.as_ref().clone())
}

pub async fn count_requests(request: Request, next: Next) -> Response {
    let path = request.uri().path();
    let route = if path == "/api/v1/info" {
        "info"
    } else if path.starts_with("/api/v1/cli/") {
        "cli"
    } else {
        "other"
    };
    metrics::record_dispatch_request(route);
    next.run(request).await
}
