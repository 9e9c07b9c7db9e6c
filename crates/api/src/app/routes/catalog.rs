use std::sync::Arc;

use axum::{
    Json, Router,
    extract::{Extension, Path},
    http::StatusCode,
    response::IntoResponse,
    routing::{get, post, put},
};

use storefront_catalog::CatalogItemId;

use crate::app::services::AppServices;
use crate::app::{dto, errors};

pub fn router() -> Router {
    Router::new()
        .route("/items", get(list_items).post(create_item))
        .route("/items/:id", get(get_item))
        .route("/items/:id/stock", post(adjust_stock))
        .route("/items/:id/pricing", put(update_pricing))
}

pub async fn list_items(Extension(services): Extension<Arc<AppServices>>) -> axum::response::Response {
    match services.coordinator().catalog_items().await {
        Ok(items) => (StatusCode::OK, Json(items)).into_response(),
        Err(e) => errors::coordinator_error_to_response(e),
    }
}

pub async fn create_item(
    Extension(services): Extension<Arc<AppServices>>,
    Json(body): Json<dto::CreateItemRequest>,
) -> axum::response::Response {
    let parent_id = match body.parent_id.as_deref().map(|raw| errors::parse_id::<CatalogItemId>(raw, "parent")) {
        None => None,
        Some(Ok(id)) => Some(id),
        Some(Err(resp)) => return resp,
    };
    let input = match body.into_new_item(parent_id) {
        Ok(v) => v,
        Err(e) => return errors::domain_error_to_response(e),
    };

    match services.coordinator().create_item(input).await {
        Ok(item) => (StatusCode::CREATED, Json(item)).into_response(),
        Err(e) => errors::coordinator_error_to_response(e),
    }
}

pub async fn get_item(
    Extension(services): Extension<Arc<AppServices>>,
    Path(id): Path<String>,
) -> axum::response::Response {
    let item_id: CatalogItemId = match errors::parse_id(&id, "item") {
        Ok(v) => v,
        Err(resp) => return resp,
    };

    match services.coordinator().catalog_item(item_id).await {
        Ok(view) => (StatusCode::OK, Json(view)).into_response(),
        Err(e) => errors::coordinator_error_to_response(e),
    }
}

/// External sales (negative delta) and receiving (positive delta).
pub async fn adjust_stock(
    Extension(services): Extension<Arc<AppServices>>,
    Path(id): Path<String>,
    Json(body): Json<dto::AdjustStockRequest>,
) -> axum::response::Response {
    let item_id: CatalogItemId = match errors::parse_id(&id, "item") {
        Ok(v) => v,
        Err(resp) => return resp,
    };

    match services.coordinator().adjust_stock(item_id, body.delta).await {
        Ok(item) => (StatusCode::OK, Json(item)).into_response(),
        Err(e) => errors::coordinator_error_to_response(e),
    }
}

pub async fn update_pricing(
    Extension(services): Extension<Arc<AppServices>>,
    Path(id): Path<String>,
    Json(body): Json<dto::UpdateItemPricingRequest>,
) -> axum::response::Response {
    let item_id: CatalogItemId = match errors::parse_id(&id, "item") {
        Ok(v) => v,
        Err(resp) => return resp,
    };
    let (price, alt_price) = match body.into_prices() {
        Ok(v) => v,
        Err(e) => return errors::domain_error_to_response(e),
    };

    match services.coordinator().update_item_pricing(item_id, price, alt_price).await {
        Ok(item) => (StatusCode::OK, Json(item)).into_response(),
        Err(e) => errors::coordinator_error_to_response(e),
    }
}
