use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Статус сессии импорта. Порядок вариантов совпадает с порядком переходов,
/// статус никогда не откатывается назад.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ImportStatus {
    Pending,
    Processing,
    Completed,
}

impl ImportStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Processing => "processing",
            Self::Completed => "completed",
        }
    }

    pub fn from_str_lossy(s: &str) -> Self {
        match s {
            "processing" => Self::Processing,
            "completed" => Self::Completed,
            _ => Self::Pending,
        }
    }
}

/// Состояние одного запуска импорта (то, что опрашивает клиент)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ImportSession {
    pub id: String,
    pub shop: String,
    pub status: ImportStatus,
    pub total_count: i32,
    pub imported_count: i32,
    pub failed_count: i32,
    /// Название последней обрабатываемой записи
    pub current_label: Option<String>,
    /// Причина досрочного завершения (например, источник недоступен)
    pub last_error: Option<String>,
    pub started_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub completed_at: Option<DateTime<Utc>>,
}

impl ImportSession {
    pub fn new(id: String, shop: String) -> Self {
        let now = Utc::now();
        Self {
            id,
            shop,
            status: ImportStatus::Pending,
            total_count: 0,
            imported_count: 0,
            failed_count: 0,
            current_label: None,
            last_error: None,
            started_at: now,
            updated_at: now,
            completed_at: None,
        }
    }

    pub fn attempted(&self) -> i32 {
        self.imported_count + self.failed_count
    }

    pub fn is_finished(&self) -> bool {
        self.status == ImportStatus::Completed
    }

    /// Установить общее число записей. Допустимо только пока ничего не
    /// обработано; пустой запуск сразу завершается.
    pub fn set_total(&mut self, total: i32) {
        if self.attempted() > 0 || self.is_finished() {
            return;
        }
        self.total_count = total.max(0);
        self.recompute_status();
    }

    /// Отметить начало обработки записи
    pub fn begin_record(&mut self, label: String) {
        if self.is_finished() {
            return;
        }
        self.current_label = Some(label);
        self.advance(ImportStatus::Processing);
    }

    /// Учесть успешно импортированную запись.
    /// Возвращает false, если счетчики уже достигли total.
    pub fn record_success(&mut self) -> bool {
        if self.attempted() >= self.total_count {
            return false;
        }
        self.imported_count += 1;
        self.recompute_status();
        true
    }

    /// Учесть запись, завершившуюся ошибкой
    pub fn record_failure(&mut self) -> bool {
        if self.attempted() >= self.total_count {
            return false;
        }
        self.failed_count += 1;
        self.recompute_status();
        true
    }

    /// Завершить запуск досрочно: необработанные записи больше не ожидаются
    pub fn abort(&mut self, error: String) {
        self.last_error = Some(error);
        self.total_count = self.attempted();
        self.recompute_status();
    }

    fn recompute_status(&mut self) {
        self.updated_at = Utc::now();
        let attempted = self.attempted();
        if attempted >= self.total_count {
            self.advance(ImportStatus::Completed);
        } else if attempted > 0 {
            self.advance(ImportStatus::Processing);
        }
    }

    fn advance(&mut self, next: ImportStatus) {
        if next <= self.status {
            return;
        }
        self.status = next;
        self.updated_at = Utc::now();
        if next == ImportStatus::Completed {
            self.completed_at = Some(self.updated_at);
            self.current_label = None;
        }
    }
}
