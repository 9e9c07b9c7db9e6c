use std::sync::Arc;

use axum::{
    Json,
    extract::{Extension, Query},
    response::sse::Event as SseEvent,
};
use serde_json::{Value as JsonValue, json};

use crate::app::dto::StreamQuery;
use crate::app::services::{self, AppServices};

pub async fn health(Extension(services): Extension<Arc<AppServices>>) -> Json<JsonValue> {
    Json(json!({
        "status": "ok",
        "store": services.backend().as_str(),
    }))
}

pub async fn stream(
    Extension(services): Extension<Arc<AppServices>>,
    Query(query): Query<StreamQuery>,
) -> axum::response::Sse<impl tokio_stream::Stream<Item = Result<SseEvent, std::convert::Infallible>>> {
    services::sse_stream(services, query.prefix)
}
