use axum::body::{to_bytes, Body};
use axum::http::Request;
use axum::middleware::Next;
use axum::response::Response;

use crate::shared::format::format_number;

/// Middleware для логирования HTTP запросов: длительность, размер ответа,
/// статус, метод и путь
pub async fn request_logger(req: Request<Body>, next: Next) -> Response {
    let start = std::time::Instant::now();
    let method = req.method().clone();
    let path = req.uri().path().to_string();

    let response = next.run(req).await;
    let (parts, body) = response.into_parts();

    // Читаем тело ответа, чтобы узнать реальный размер
    let bytes = match to_bytes(body, usize::MAX).await {
        Ok(b) => b,
        Err(e) => {
            tracing::warn!(
                "{:>5}ms | {:>12} | {} {:>6} {} ({})",
                start.elapsed().as_millis(),
                "error",
                parts.status.as_u16(),
                method,
                path,
                e
            );
            return Response::from_parts(parts, Body::default());
        }
    };

    let duration = start.elapsed();
    if parts.status.is_success() {
        tracing::info!(
            "{:>5}ms | {:>12} | {} {:>6} {}",
            duration.as_millis(),
            format_number(bytes.len()),
            parts.status.as_u16(),
            method,
            path
        );
    } else {
        tracing::warn!(
            "{:>5}ms | {:>12} | {} {:>6} {}",
            duration.as_millis(),
            format_number(bytes.len()),
            parts.status.as_u16(),
            method,
            path
        );
    }

    Response::from_parts(parts, Body::from(bytes))
}
