use std::sync::Arc;

use axum::{
    Json, Router,
    extract::{Extension, Path},
    http::StatusCode,
    response::IntoResponse,
    routing::{delete, get, post, put},
};

use storefront_catalog::CatalogItemId;
use storefront_kits::{DiscountPercent, EntryId, KitId};

use crate::app::services::AppServices;
use crate::app::{dto, errors};

pub fn router() -> Router {
    Router::new()
        .route("/", get(list_kits).post(create_kit))
        .route("/:id", get(get_kit).patch(update_kit).delete(delete_kit))
        .route("/:id/stock", put(set_stock))
        .route("/:id/discount", put(set_discount))
        .route("/:id/pricing", put(override_pricing))
        .route("/:id/pricing/refresh", post(refresh_pricing))
        .route("/:id/components", post(add_component))
        .route("/components/:entry_id", delete(remove_component))
}

fn kit_id(raw: &str) -> Result<KitId, axum::response::Response> {
    errors::parse_id(raw, "kit")
}

pub async fn list_kits(Extension(services): Extension<Arc<AppServices>>) -> axum::response::Response {
    match services.coordinator().kits().await {
        Ok(kits) => (StatusCode::OK, Json(kits)).into_response(),
        Err(e) => errors::coordinator_error_to_response(e),
    }
}

pub async fn create_kit(
    Extension(services): Extension<Arc<AppServices>>,
    Json(body): Json<dto::CreateKitRequest>,
) -> axum::response::Response {
    let input = match body.into_new_kit() {
        Ok(v) => v,
        Err(e) => return errors::domain_error_to_response(e),
    };

    match services.coordinator().create_kit(input).await {
        Ok(kit) => (StatusCode::CREATED, Json(kit)).into_response(),
        Err(e) => errors::coordinator_error_to_response(e),
    }
}

/// Kit, status, entries, capacity and suggested pricing in one document.
pub async fn get_kit(
    Extension(services): Extension<Arc<AppServices>>,
    Path(id): Path<String>,
) -> axum::response::Response {
    let kit_id = match kit_id(&id) {
        Ok(v) => v,
        Err(resp) => return resp,
    };

    match services.coordinator().kit_overview(kit_id).await {
        Ok(overview) => (StatusCode::OK, Json(overview)).into_response(),
        Err(e) => errors::coordinator_error_to_response(e),
    }
}

pub async fn update_kit(
    Extension(services): Extension<Arc<AppServices>>,
    Path(id): Path<String>,
    Json(body): Json<dto::UpdateKitRequest>,
) -> axum::response::Response {
    let kit_id = match kit_id(&id) {
        Ok(v) => v,
        Err(resp) => return resp,
    };

    match services.coordinator().update_kit(kit_id, body.into()).await {
        Ok(kit) => (StatusCode::OK, Json(kit)).into_response(),
        Err(e) => errors::coordinator_error_to_response(e),
    }
}

/// Deleting an absent kit is a success as well.
pub async fn delete_kit(
    Extension(services): Extension<Arc<AppServices>>,
    Path(id): Path<String>,
) -> axum::response::Response {
    let kit_id = match kit_id(&id) {
        Ok(v) => v,
        Err(resp) => return resp,
    };

    match services.coordinator().delete_kit(kit_id).await {
        Ok(_) => StatusCode::NO_CONTENT.into_response(),
        Err(e) => errors::coordinator_error_to_response(e),
    }
}

pub async fn set_stock(
    Extension(services): Extension<Arc<AppServices>>,
    Path(id): Path<String>,
    Json(body): Json<dto::SetKitStockRequest>,
) -> axum::response::Response {
    let kit_id = match kit_id(&id) {
        Ok(v) => v,
        Err(resp) => return resp,
    };

    match services
        .coordinator()
        .set_kit_stock(kit_id, body.target_stock_quantity)
        .await
    {
        Ok(kit) => (StatusCode::OK, Json(kit)).into_response(),
        Err(e) => errors::coordinator_error_to_response(e),
    }
}

pub async fn set_discount(
    Extension(services): Extension<Arc<AppServices>>,
    Path(id): Path<String>,
    Json(body): Json<dto::SetDiscountRequest>,
) -> axum::response::Response {
    let kit_id = match kit_id(&id) {
        Ok(v) => v,
        Err(resp) => return resp,
    };
    let discount = match DiscountPercent::new(body.discount_percent) {
        Ok(v) => v,
        Err(e) => return errors::domain_error_to_response(e),
    };

    match services.coordinator().set_discount(kit_id, discount).await {
        Ok(kit) => (StatusCode::OK, Json(kit)).into_response(),
        Err(e) => errors::coordinator_error_to_response(e),
    }
}

pub async fn override_pricing(
    Extension(services): Extension<Arc<AppServices>>,
    Path(id): Path<String>,
    Json(body): Json<dto::OverridePricingRequest>,
) -> axum::response::Response {
    let kit_id = match kit_id(&id) {
        Ok(v) => v,
        Err(resp) => return resp,
    };
    let (sell, alt) = match body.into_prices() {
        Ok(v) => v,
        Err(e) => return errors::domain_error_to_response(e),
    };

    match services.coordinator().override_pricing(kit_id, sell, alt).await {
        Ok(kit) => (StatusCode::OK, Json(kit)).into_response(),
        Err(e) => errors::coordinator_error_to_response(e),
    }
}

pub async fn refresh_pricing(
    Extension(services): Extension<Arc<AppServices>>,
    Path(id): Path<String>,
) -> axum::response::Response {
    let kit_id = match kit_id(&id) {
        Ok(v) => v,
        Err(resp) => return resp,
    };

    match services.coordinator().refresh_pricing(kit_id).await {
        Ok(kit) => (StatusCode::OK, Json(kit)).into_response(),
        Err(e) => errors::coordinator_error_to_response(e),
    }
}

pub async fn add_component(
    Extension(services): Extension<Arc<AppServices>>,
    Path(id): Path<String>,
    Json(body): Json<dto::AddComponentRequest>,
) -> axum::response::Response {
    let kit_id = match kit_id(&id) {
        Ok(v) => v,
        Err(resp) => return resp,
    };
    let item_id: CatalogItemId = match errors::parse_id(&body.catalog_item_id, "catalog item") {
        Ok(v) => v,
        Err(resp) => return resp,
    };

    match services
        .coordinator()
        .add_component(kit_id, item_id, body.quantity_per_kit)
        .await
    {
        Ok(entry) => (StatusCode::CREATED, Json(entry)).into_response(),
        Err(e) => errors::coordinator_error_to_response(e),
    }
}

/// Removing an absent entry is a success as well.
pub async fn remove_component(
    Extension(services): Extension<Arc<AppServices>>,
    Path(entry_id): Path<String>,
) -> axum::response::Response {
    let entry_id: EntryId = match errors::parse_id(&entry_id, "entry") {
        Ok(v) => v,
        Err(resp) => return resp,
    };

    match services.coordinator().remove_component(entry_id).await {
        Ok(_) => StatusCode::NO_CONTENT.into_response(),
        Err(e) => errors::coordinator_error_to_response(e),
    }
}
