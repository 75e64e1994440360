pub mod domain;
pub mod handlers;
pub mod routes;
pub mod shared;
pub mod system;
pub mod usecases;

use std::sync::Arc;
use std::time::Duration;

use crate::domain::a002_catalog_entry::service::CatalogStore;
use crate::usecases::u501_bulk_product_import::commerce_api_client::CommerceApiClient;
use crate::usecases::u501_bulk_product_import::reconciliation::RemoteCatalog;
use crate::usecases::u501_bulk_product_import::session_repository::DbSessionStore;
use crate::usecases::u501_bulk_product_import::source_adapter::HttpPageFetcher;
use crate::usecases::u501_bulk_product_import::{
    DbConnectionDirectory, ImportExecutor, ImportSettings,
};

/// Собрать executor импорта из конфигурации и подключения к БД
fn build_import_executor(config: &shared::config::Config) -> anyhow::Result<ImportExecutor> {
    let db = shared::data::db::get_connection().clone();

    let remote_catalog: Option<Arc<dyn RemoteCatalog>> = match &config.commerce {
        Some(commerce) => {
            let client = CommerceApiClient::new(commerce)?;
            tracing::info!("Commerce platform configured for shop {}", commerce.shop_domain);
            Some(Arc::new(client))
        }
        None => {
            tracing::warn!("Section [commerce] is missing in config.toml: import start is disabled");
            None
        }
    };

    let page_fetcher = HttpPageFetcher::new(Duration::from_secs(config.import.page_timeout_secs))?;

    Ok(ImportExecutor::new(
        Arc::new(DbSessionStore::new(db.clone())),
        Arc::new(CatalogStore::new(db.clone())),
        remote_catalog,
        Arc::new(page_fetcher),
        Arc::new(DbConnectionDirectory::new(db)),
        ImportSettings::from(&config.import),
    ))
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    use axum::http::{header, Method};
    use axum::middleware;
    use std::net::SocketAddr;
    use tokio::net::TcpListener;
    use tower_http::cors::{Any, CorsLayer};

    system::tracing::initialize()?;

    let config = shared::config::initialize()?;

    // Initialize database (loads config from config.toml)
    shared::data::db::initialize_database()
        .await
        .map_err(|e| anyhow::anyhow!("db init failed: {e}"))?;

    handlers::usecases::set_u501_executor(build_import_executor(config)?)?;

    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods([Method::GET, Method::POST, Method::DELETE, Method::OPTIONS])
        .allow_headers([header::CONTENT_TYPE, header::ACCEPT]);

    let app = routes::configure_routes()
        .layer(middleware::from_fn(system::middleware::request_logger::request_logger))
        .layer(cors);

    let port = config.server.port;
    let addr: SocketAddr = ([0, 0, 0, 0], port).into();

    tracing::info!("Attempting to bind server to http://{}", addr);
    let listener = match TcpListener::bind(addr).await {
        Ok(listener) => {
            tracing::info!("Server successfully bound to {}", addr);
            listener
        }
        Err(e) => {
            if e.kind() == std::io::ErrorKind::AddrInUse {
                tracing::error!(
                    "Error: Port {} is already in use. Please ensure no other process is using this port.",
                    port
                );
            } else {
                tracing::error!("Failed to bind to port {}. Error: {}", port, e);
            }
            return Err(e.into());
        }
    };

    axum::serve(listener, app).await?;

    Ok(())
}
