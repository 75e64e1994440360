use super::field_mapper::to_reconciliation_record;
use super::filter_selector::{distinct_values, select_any_token, select_strict};
use super::markup_engine::apply_markup;
use super::progress_tracker::{ProgressTracker, SessionStore};
use super::reconciliation::{InventorySet, LocalCatalog, Reconciler, RemoteCatalog};
use super::run_lock::{RunGuard, RunLocks};
use super::source_adapter::{read_api, read_csv, PageFetcher, SourceBatch, SourceError};
use async_trait::async_trait;
use contracts::domain::a001_supplier_connection::aggregate::{SourceKind, SupplierConnection};
use contracts::usecases::common::{UseCaseError, UseCaseMetadata};
use contracts::usecases::u501_bulk_product_import::{
    ApiCredentials, BulkProductImport, DataSource, ImportRequest, ImportResponse, ImportSession,
    ImportStartStatus, PreviewRequest, PreviewResponse, ReconciliationRecord,
};
use sea_orm::DatabaseConnection;
use std::sync::Arc;
use uuid::Uuid;

use crate::domain::a001_supplier_connection;
use crate::shared::config::ImportConfig;

/// Сохраненные подключения к поставщикам
#[async_trait]
pub trait ConnectionDirectory: Send + Sync {
    async fn get_connection(&self, id: Uuid) -> anyhow::Result<Option<SupplierConnection>>;
}

/// Подключения из таблицы a001_supplier_connection
pub struct DbConnectionDirectory {
    db: DatabaseConnection,
}

impl DbConnectionDirectory {
    pub fn new(db: DatabaseConnection) -> Self {
        Self { db }
    }
}

#[async_trait]
impl ConnectionDirectory for DbConnectionDirectory {
    async fn get_connection(&self, id: Uuid) -> anyhow::Result<Option<SupplierConnection>> {
        a001_supplier_connection::service::get_by_id(&self.db, id).await
    }
}

/// Источник после разбора сохраненного подключения
#[derive(Debug, Clone)]
pub enum ResolvedSource {
    Csv(String),
    Api(ApiCredentials),
}

#[derive(Debug, Clone, Copy)]
pub struct ImportSettings {
    pub max_pages: usize,
    pub inventory_batch_size: usize,
}

impl From<&ImportConfig> for ImportSettings {
    fn from(config: &ImportConfig) -> Self {
        Self {
            max_pages: config.max_pages.max(1),
            inventory_batch_size: config.inventory_batch_size.max(1),
        }
    }
}

/// Executor для UseCase массового импорта товаров
#[derive(Clone)]
pub struct ImportExecutor {
    sessions: Arc<dyn SessionStore>,
    local_catalog: Arc<dyn LocalCatalog>,
    /// None, если в конфигурации нет секции [commerce]
    remote_catalog: Option<Arc<dyn RemoteCatalog>>,
    page_fetcher: Arc<dyn PageFetcher>,
    connections: Arc<dyn ConnectionDirectory>,
    run_locks: RunLocks,
    settings: ImportSettings,
}

impl ImportExecutor {
    pub fn new(
        sessions: Arc<dyn SessionStore>,
        local_catalog: Arc<dyn LocalCatalog>,
        remote_catalog: Option<Arc<dyn RemoteCatalog>>,
        page_fetcher: Arc<dyn PageFetcher>,
        connections: Arc<dyn ConnectionDirectory>,
        settings: ImportSettings,
    ) -> Self {
        Self {
            sessions,
            local_catalog,
            remote_catalog,
            page_fetcher,
            connections,
            run_locks: RunLocks::new(),
            settings,
        }
    }

    /// Запустить импорт (создает async task и возвращает session_id)
    pub async fn start_import(&self, request: ImportRequest) -> Result<ImportResponse, UseCaseError> {
        let shop = request.shop.trim().to_string();
        if shop.is_empty() {
            return Err(UseCaseError::validation("Магазин не указан"));
        }
        let missing = request.field_mapping.missing_required();
        if !missing.is_empty() {
            let names: Vec<&str> = missing.iter().map(|t| t.as_str()).collect();
            return Err(UseCaseError::validation("Не сопоставлены обязательные поля")
                .with_details(names.join(", ")));
        }
        let remote = self.remote_catalog.clone().ok_or_else(|| {
            UseCaseError::not_configured("Платформа магазина не настроена (секция [commerce])")
        })?;
        let source = self.resolve_source(&request.data_source).await?;

        let guard = self.run_locks.try_acquire(&shop).ok_or_else(|| {
            UseCaseError::conflict(format!("Для магазина {} уже выполняется импорт", shop))
        })?;

        let session_id = Uuid::new_v4().to_string();
        let tracker = ProgressTracker::start(self.sessions.clone(), session_id.clone(), shop.clone())
            .await
            .map_err(|e| UseCaseError::internal("Не удалось создать сессию импорта").with_details(e.to_string()))?;

        tracing::info!(
            "{}: session {} started for shop {}",
            BulkProductImport::full_name(),
            session_id,
            shop
        );

        let executor = self.clone();
        tokio::spawn(async move {
            executor
                .run_import(tracker, remote, request, source, guard)
                .await;
        });

        Ok(ImportResponse {
            session_id,
            status: ImportStartStatus::Started,
            message: "Импорт запущен".to_string(),
        })
    }

    /// Получить текущий прогресс импорта
    pub async fn get_progress(&self, session_id: &str) -> Result<Option<ImportSession>, UseCaseError> {
        Ok(self.sessions.get_session(session_id).await?)
    }

    /// Предпросмотр: сколько записей пройдет строгий фильтр и какие
    /// значения есть у атрибутов
    pub async fn preview(&self, request: PreviewRequest) -> Result<PreviewResponse, UseCaseError> {
        let source = self.resolve_source(&request.data_source).await?;
        let batch = self.read_source(&source).await.map_err(source_error)?;
        let SourceBatch {
            records: source_records,
            headers,
            skipped,
        } = batch;

        let records: Vec<ReconciliationRecord> = source_records
            .iter()
            .map(|r| to_reconciliation_record(r, &request.field_mapping))
            .collect();
        let matched = select_strict(&records, &request.attribute_filter).len();

        Ok(PreviewResponse {
            total: records.len(),
            matched,
            skipped,
            headers,
            attribute_values: distinct_values(&records, &request.attribute_keys),
        })
    }

    async fn resolve_source(&self, source: &DataSource) -> Result<ResolvedSource, UseCaseError> {
        match source {
            DataSource::Csv { csv_payload } => Ok(ResolvedSource::Csv(csv_payload.clone())),
            DataSource::Api { credentials } => {
                if credentials.url.trim().is_empty() {
                    return Err(UseCaseError::validation("URL API поставщика не указан"));
                }
                Ok(ResolvedSource::Api(credentials.clone()))
            }
            DataSource::Connection {
                connection_id,
                csv_payload,
            } => {
                let id = Uuid::parse_str(connection_id)
                    .map_err(|_| UseCaseError::validation("Invalid connection_id"))?;
                let connection = self
                    .connections
                    .get_connection(id)
                    .await?
                    .ok_or_else(|| UseCaseError::not_found("Подключение к поставщику не найдено"))?;
                match connection.source_kind {
                    SourceKind::Csv => csv_payload
                        .clone()
                        .map(ResolvedSource::Csv)
                        .ok_or_else(|| {
                            UseCaseError::validation("Для CSV-подключения нужно передать csv_payload")
                        }),
                    SourceKind::Api => Ok(ResolvedSource::Api(ApiCredentials {
                        url: connection.endpoint_url.clone().unwrap_or_default(),
                        api_key: connection.api_key.clone(),
                        headers: connection.extra_headers.clone(),
                    })),
                }
            }
        }
    }

    async fn read_source(&self, source: &ResolvedSource) -> Result<SourceBatch, SourceError> {
        match source {
            ResolvedSource::Csv(payload) => read_csv(payload),
            ResolvedSource::Api(credentials) => {
                read_api(self.page_fetcher.as_ref(), credentials, self.settings.max_pages).await
            }
        }
    }

    /// Выполнить импорт: записи обрабатываются строго по одной
    async fn run_import(
        &self,
        mut tracker: ProgressTracker,
        remote: Arc<dyn RemoteCatalog>,
        request: ImportRequest,
        source: ResolvedSource,
        _guard: RunGuard,
    ) {
        let session_id = tracker.session().id.clone();
        let shop = tracker.session().shop.clone();

        let batch = match self.read_source(&source).await {
            Ok(batch) => batch,
            Err(e) => {
                tracker.abort(format!("Источник не прочитан: {}", e)).await;
                return;
            }
        };
        let source_count = batch.records.len();
        let records: Vec<ReconciliationRecord> = batch
            .records
            .iter()
            .map(|r| to_reconciliation_record(r, &request.field_mapping))
            .collect();
        let selected = select_any_token(records, &request.attribute_filter);
        tracing::info!(
            "Session {}: {} source records, {} selected, {} blank rows skipped",
            session_id,
            source_count,
            selected.len(),
            batch.skipped
        );
        tracker.set_total(selected.len()).await;

        let reconciler = Reconciler::new(&shop, self.local_catalog.as_ref(), remote.as_ref());
        let mut inventory_queue: Vec<InventorySet> = Vec::new();

        for mut record in selected {
            apply_markup(&mut record, &request.markup_config);
            let label = record.display_label();
            tracker.begin_record(label.clone()).await;

            let outcome = match reconciler.resolve(&record).await {
                Ok(resolution) => {
                    reconciler
                        .apply(&record, resolution, &session_id, request.publish_mode)
                        .await
                }
                Err(e) => Err(e),
            };

            match outcome {
                Ok(applied) => {
                    tracing::debug!("Record '{}' imported: {:?}", label, applied.action);
                    if let Some(set) = applied.inventory {
                        inventory_queue.push(set);
                    }
                    tracker.record_success().await;
                }
                Err(e) => {
                    tracing::warn!("Record '{}' failed: {}", label, e);
                    tracker.record_failure().await;
                }
            }

            if inventory_queue.len() >= self.settings.inventory_batch_size {
                flush_inventory(remote.as_ref(), &mut inventory_queue, self.settings.inventory_batch_size)
                    .await;
            }
        }

        flush_inventory(remote.as_ref(), &mut inventory_queue, self.settings.inventory_batch_size).await;

        let session = tracker.session();
        tracing::info!(
            "Import session {} completed: imported={}, failed={}, total={}",
            session_id,
            session.imported_count,
            session.failed_count,
            session.total_count
        );
    }
}

/// Отправить накопленные остатки пакетами; ошибка пакета только логируется
async fn flush_inventory(remote: &dyn RemoteCatalog, queue: &mut Vec<InventorySet>, chunk_size: usize) {
    if queue.is_empty() {
        return;
    }
    let pending = std::mem::take(queue);
    for chunk in pending.chunks(chunk_size.max(1)) {
        match remote.set_inventory_on_hand(chunk).await {
            Ok(()) => tracing::info!("Inventory set for {} items", chunk.len()),
            Err(e) => tracing::error!("Inventory batch of {} items failed: {}", chunk.len(), e),
        }
    }
}

fn source_error(e: SourceError) -> UseCaseError {
    match e {
        SourceError::EmptyCsv | SourceError::Csv(_) | SourceError::InvalidUrl { .. } => {
            UseCaseError::validation(e.to_string())
        }
        _ => UseCaseError::external("Источник поставщика недоступен").with_details(e.to_string()),
    }
}
