use axum::{
    routing::{get, post},
    Router,
};

use crate::handlers;

/// Конфигурация всех роутов приложения
pub fn configure_routes() -> Router {
    Router::new()
        .route("/health", get(|| async { "ok" }))
        // A001 Supplier connection handlers
        .route(
            "/api/supplier_connection",
            get(handlers::a001_supplier_connection::list_all)
                .post(handlers::a001_supplier_connection::upsert),
        )
        .route(
            "/api/supplier_connection/:id",
            get(handlers::a001_supplier_connection::get_by_id)
                .delete(handlers::a001_supplier_connection::delete),
        )
        // UseCase u501: Bulk product import
        .route(
            "/api/u501/import/start",
            post(handlers::usecases::u501_start_import),
        )
        .route(
            "/api/u501/import/:session_id/progress",
            get(handlers::usecases::u501_get_progress),
        )
        .route("/api/u501/preview", post(handlers::usecases::u501_preview))
}
