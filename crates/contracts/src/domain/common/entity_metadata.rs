use serde::{Deserialize, Serialize};

/// Метаданные экземпляра агрегата (lifecycle tracking)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EntityMetadata {
    pub created_at: chrono::DateTime<chrono::Utc>,
    pub updated_at: chrono::DateTime<chrono::Utc>,
    /// Мягкое удаление (soft delete)
    pub is_deleted: bool,
    /// Версия для optimistic locking
    pub version: i32,
}

impl EntityMetadata {
    pub fn new() -> Self {
        let now = chrono::Utc::now();
        Self {
            created_at: now,
            updated_at: now,
            is_deleted: false,
            version: 0,
        }
    }

    /// Обновить timestamp и версию перед записью
    pub fn touch(&mut self) {
        self.updated_at = chrono::Utc::now();
        self.version += 1;
    }
}

impl Default for EntityMetadata {
    fn default() -> Self {
        Self::new()
    }
}
