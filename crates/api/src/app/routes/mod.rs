use axum::{Router, routing::get};

pub mod catalog;
pub mod kits;
pub mod system;

/// Router for every engine endpoint except `/health`.
pub fn router() -> Router {
    Router::new()
        .route("/stream", get(system::stream))
        .nest("/catalog", catalog::router())
        .nest("/kits", kits::router())
}
