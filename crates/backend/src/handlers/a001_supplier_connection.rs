use axum::{extract::Path, http::StatusCode, Json};
use contracts::domain::a001_supplier_connection::aggregate::{
    SupplierConnection, SupplierConnectionDto,
};
use serde_json::json;

use crate::domain::a001_supplier_connection::service::{self, ConnectionError};
use crate::shared::data::db::get_connection;

/// GET /api/supplier_connection
pub async fn list_all() -> Result<Json<Vec<SupplierConnection>>, StatusCode> {
    match service::list_all(get_connection()).await {
        Ok(v) => Ok(Json(v)),
        Err(e) => {
            tracing::error!("Failed to list supplier connections: {}", e);
            Err(StatusCode::INTERNAL_SERVER_ERROR)
        }
    }
}

/// GET /api/supplier_connection/:id
pub async fn get_by_id(Path(id): Path<String>) -> Result<Json<SupplierConnection>, StatusCode> {
    let uuid = uuid::Uuid::parse_str(&id).map_err(|_| StatusCode::BAD_REQUEST)?;
    match service::get_by_id(get_connection(), uuid).await {
        Ok(Some(v)) => Ok(Json(v)),
        Ok(None) => Err(StatusCode::NOT_FOUND),
        Err(_) => Err(StatusCode::INTERNAL_SERVER_ERROR),
    }
}

/// POST /api/supplier_connection
///
/// Создает подключение, если `id` не указан, иначе обновляет.
/// Дубль (тот же поставщик и та же точка доступа) отклоняется с 409.
pub async fn upsert(
    Json(dto): Json<SupplierConnectionDto>,
) -> Result<Json<serde_json::Value>, (StatusCode, Json<serde_json::Value>)> {
    let db = get_connection();
    let result = if dto.id.is_some() {
        service::update(db, dto).await
    } else {
        service::create(db, dto).await
    };
    match result {
        Ok(id) => Ok(Json(json!({"id": id.to_string()}))),
        Err(e) => {
            let status = match e.downcast_ref::<ConnectionError>() {
                Some(ConnectionError::Duplicate { .. }) => StatusCode::CONFLICT,
                Some(ConnectionError::Validation(_)) => StatusCode::BAD_REQUEST,
                Some(ConnectionError::NotFound) => StatusCode::NOT_FOUND,
                None => StatusCode::INTERNAL_SERVER_ERROR,
            };
            if status.is_server_error() {
                tracing::error!("Failed to save supplier connection: {}", e);
            } else {
                tracing::warn!("Supplier connection rejected: {}", e);
            }
            Err((status, Json(json!({"error": e.to_string()}))))
        }
    }
}

/// DELETE /api/supplier_connection/:id
pub async fn delete(Path(id): Path<String>) -> Result<(), StatusCode> {
    let uuid = uuid::Uuid::parse_str(&id).map_err(|_| StatusCode::BAD_REQUEST)?;
    match service::delete(get_connection(), uuid).await {
        Ok(true) => Ok(()),
        Ok(false) => Err(StatusCode::NOT_FOUND),
        Err(_) => Err(StatusCode::INTERNAL_SERVER_ERROR),
    }
}
