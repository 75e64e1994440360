use async_trait::async_trait;
use contracts::usecases::u501_bulk_product_import::ImportSession;
use std::sync::Arc;

/// Хранилище сессий импорта: прогресс читается отсюда, а не из памяти процесса
#[async_trait]
pub trait SessionStore: Send + Sync {
    async fn create_session(&self, session: &ImportSession) -> anyhow::Result<()>;

    /// Записать счетчики, статус и текущую запись
    async fn update_session_counters(&self, session: &ImportSession) -> anyhow::Result<()>;

    async fn get_session(&self, session_id: &str) -> anyhow::Result<Option<ImportSession>>;
}

/// Единственный писатель сессии на время запуска.
///
/// Счетчики меняются в копии сессии и сразу сохраняются; ошибка сохранения
/// логируется и не останавливает импорт.
pub struct ProgressTracker {
    store: Arc<dyn SessionStore>,
    session: ImportSession,
}

impl ProgressTracker {
    /// Создать сессию в хранилище
    pub async fn start(
        store: Arc<dyn SessionStore>,
        session_id: String,
        shop: String,
    ) -> anyhow::Result<Self> {
        let session = ImportSession::new(session_id, shop);
        store.create_session(&session).await?;
        Ok(Self { store, session })
    }

    pub fn session(&self) -> &ImportSession {
        &self.session
    }

    pub async fn set_total(&mut self, total: usize) {
        self.session.set_total(i32::try_from(total).unwrap_or(i32::MAX));
        self.persist().await;
    }

    pub async fn begin_record(&mut self, label: String) {
        self.session.begin_record(label);
        self.persist().await;
    }

    pub async fn record_success(&mut self) {
        if !self.session.record_success() {
            tracing::warn!(
                "Session {}: success beyond total {} ignored",
                self.session.id,
                self.session.total_count
            );
        }
        self.persist().await;
    }

    pub async fn record_failure(&mut self) {
        if !self.session.record_failure() {
            tracing::warn!(
                "Session {}: failure beyond total {} ignored",
                self.session.id,
                self.session.total_count
            );
        }
        self.persist().await;
    }

    /// Досрочное завершение (источник не прочитан и т.п.)
    pub async fn abort(&mut self, error: String) {
        tracing::error!("Session {} aborted: {}", self.session.id, error);
        self.session.abort(error);
        self.persist().await;
    }

    async fn persist(&self) {
        if let Err(e) = self.store.update_session_counters(&self.session).await {
            tracing::error!("Failed to persist session {}: {}", self.session.id, e);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::super::test_support::InMemorySessionStore;
    use super::*;
    use contracts::usecases::u501_bulk_product_import::ImportStatus;

    #[tokio::test]
    async fn test_tracker_persists_every_step() {
        let store = Arc::new(InMemorySessionStore::default());
        let mut tracker = ProgressTracker::start(store.clone(), "s1".into(), "acme".into())
            .await
            .unwrap();
        let stored = store.get_session("s1").await.unwrap().unwrap();
        assert_eq!(stored.status, ImportStatus::Pending);

        tracker.set_total(2).await;
        tracker.begin_record("Lamp".into()).await;
        tracker.record_success().await;
        let stored = store.get_session("s1").await.unwrap().unwrap();
        assert_eq!(stored.status, ImportStatus::Processing);
        assert_eq!(stored.imported_count, 1);
        assert_eq!(stored.current_label.as_deref(), Some("Lamp"));

        tracker.begin_record("Desk".into()).await;
        tracker.record_failure().await;
        let stored = store.get_session("s1").await.unwrap().unwrap();
        assert_eq!(stored.status, ImportStatus::Completed);
        assert_eq!(stored.failed_count, 1);
        assert!(store.get_session("missing").await.unwrap().is_none());
    }
}
