use super::progress_tracker::SessionStore;
use async_trait::async_trait;
use chrono::Utc;
use contracts::usecases::u501_bulk_product_import::{ImportSession, ImportStatus};
use serde::{Deserialize, Serialize};

use sea_orm::entity::prelude::*;
use sea_orm::{EntityTrait, Set};

#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "u501_import_session")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: String,
    pub shop: String,
    pub status: String,
    pub total_count: i32,
    pub imported_count: i32,
    pub failed_count: i32,
    pub current_label: Option<String>,
    pub last_error: Option<String>,
    pub started_at: chrono::DateTime<chrono::Utc>,
    pub updated_at: chrono::DateTime<chrono::Utc>,
    pub completed_at: Option<chrono::DateTime<chrono::Utc>>,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}

impl From<Model> for ImportSession {
    fn from(m: Model) -> Self {
        ImportSession {
            id: m.id,
            shop: m.shop,
            status: ImportStatus::from_str_lossy(&m.status),
            total_count: m.total_count,
            imported_count: m.imported_count,
            failed_count: m.failed_count,
            current_label: m.current_label,
            last_error: m.last_error,
            started_at: m.started_at,
            updated_at: m.updated_at,
            completed_at: m.completed_at,
        }
    }
}

fn to_active(session: &ImportSession) -> ActiveModel {
    ActiveModel {
        id: Set(session.id.clone()),
        shop: Set(session.shop.clone()),
        status: Set(session.status.as_str().to_string()),
        total_count: Set(session.total_count),
        imported_count: Set(session.imported_count),
        failed_count: Set(session.failed_count),
        current_label: Set(session.current_label.clone()),
        last_error: Set(session.last_error.clone()),
        started_at: Set(session.started_at),
        updated_at: Set(session.updated_at),
        completed_at: Set(session.completed_at),
    }
}

/// Сессии импорта в SQLite (таблица u501_import_session)
#[derive(Clone)]
pub struct DbSessionStore {
    db: DatabaseConnection,
}

impl DbSessionStore {
    pub fn new(db: DatabaseConnection) -> Self {
        Self { db }
    }
}

#[async_trait]
impl SessionStore for DbSessionStore {
    async fn create_session(&self, session: &ImportSession) -> anyhow::Result<()> {
        to_active(session).insert(&self.db).await?;
        Ok(())
    }

    async fn update_session_counters(&self, session: &ImportSession) -> anyhow::Result<()> {
        let mut active = to_active(session);
        active.shop = sea_orm::ActiveValue::NotSet;
        active.started_at = sea_orm::ActiveValue::NotSet;
        active.updated_at = Set(Utc::now());
        active.update(&self.db).await?;
        Ok(())
    }

    async fn get_session(&self, session_id: &str) -> anyhow::Result<Option<ImportSession>> {
        let result = Entity::find_by_id(session_id.to_string()).one(&self.db).await?;
        Ok(result.map(Into::into))
    }
}
