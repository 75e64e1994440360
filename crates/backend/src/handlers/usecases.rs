use axum::{extract::Path, http::StatusCode, Json};
use contracts::usecases::common::{codes, UseCaseError};
use contracts::usecases::u501_bulk_product_import::{
    ImportRequest, ImportResponse, ImportSession, PreviewRequest, PreviewResponse,
};
use once_cell::sync::OnceCell;

use crate::usecases::u501_bulk_product_import::ImportExecutor;

static U501_EXECUTOR: OnceCell<ImportExecutor> = OnceCell::new();

/// Зарегистрировать executor импорта (вызывается один раз при старте)
pub fn set_u501_executor(executor: ImportExecutor) -> anyhow::Result<()> {
    U501_EXECUTOR
        .set(executor)
        .map_err(|_| anyhow::anyhow!("u501 executor already initialized"))
}

type ErrorResponse = (StatusCode, Json<UseCaseError>);

fn error_response(err: UseCaseError) -> ErrorResponse {
    let status = match err.code.as_str() {
        codes::VALIDATION => StatusCode::BAD_REQUEST,
        codes::NOT_FOUND => StatusCode::NOT_FOUND,
        codes::CONFLICT => StatusCode::CONFLICT,
        codes::NOT_CONFIGURED => StatusCode::SERVICE_UNAVAILABLE,
        codes::EXTERNAL => StatusCode::BAD_GATEWAY,
        _ => StatusCode::INTERNAL_SERVER_ERROR,
    };
    if !err.is_client_error() {
        tracing::error!("u501 request failed: {}", err);
    } else {
        tracing::warn!("u501 request rejected: {}", err);
    }
    (status, Json(err))
}

fn executor() -> Result<&'static ImportExecutor, ErrorResponse> {
    U501_EXECUTOR
        .get()
        .ok_or_else(|| error_response(UseCaseError::internal("Импорт не инициализирован")))
}

/// POST /api/u501/import/start
pub async fn u501_start_import(
    Json(request): Json<ImportRequest>,
) -> Result<Json<ImportResponse>, ErrorResponse> {
    executor()?
        .start_import(request)
        .await
        .map(Json)
        .map_err(error_response)
}

/// GET /api/u501/import/:session_id/progress
pub async fn u501_get_progress(
    Path(session_id): Path<String>,
) -> Result<Json<ImportSession>, ErrorResponse> {
    match executor()?.get_progress(&session_id).await {
        Ok(Some(session)) => Ok(Json(session)),
        Ok(None) => Err(error_response(UseCaseError::not_found(format!(
            "Сессия импорта {} не найдена",
            session_id
        )))),
        Err(e) => Err(error_response(e)),
    }
}

/// POST /api/u501/preview
pub async fn u501_preview(
    Json(request): Json<PreviewRequest>,
) -> Result<Json<PreviewResponse>, ErrorResponse> {
    executor()?
        .preview(request)
        .await
        .map(Json)
        .map_err(error_response)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_codes_map_to_status() {
        let (status, body) = error_response(UseCaseError::conflict("busy"));
        assert_eq!(status, StatusCode::CONFLICT);
        assert_eq!(body.0.code, "CONFLICT");

        assert_eq!(
            error_response(UseCaseError::validation("bad")).0,
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            error_response(UseCaseError::not_configured("no shop")).0,
            StatusCode::SERVICE_UNAVAILABLE
        );
        assert_eq!(
            error_response(UseCaseError::internal("db")).0,
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }
}
