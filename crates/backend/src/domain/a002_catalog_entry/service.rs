use super::repository;
use contracts::domain::a002_catalog_entry::aggregate::CatalogEntry;
use sea_orm::DatabaseConnection;

/// Локальный каталог импортированных товаров поверх SQLite
#[derive(Clone)]
pub struct CatalogStore {
    db: DatabaseConnection,
}

impl CatalogStore {
    pub fn new(db: DatabaseConnection) -> Self {
        Self { db }
    }

    /// Поиск по ключу идентичности: сначала SKU, затем название
    pub async fn find_by_identity(
        &self,
        shop: &str,
        sku: Option<&str>,
        title: Option<&str>,
    ) -> anyhow::Result<Option<CatalogEntry>> {
        if let Some(sku) = sku {
            if let Some(entry) = repository::get_by_sku(&self.db, shop, sku).await? {
                return Ok(Some(entry));
            }
        }
        match title {
            Some(title) => repository::get_by_title(&self.db, shop, title).await,
            None => Ok(None),
        }
    }

    pub async fn create(&self, mut entry: CatalogEntry) -> anyhow::Result<CatalogEntry> {
        entry
            .validate()
            .map_err(|e| anyhow::anyhow!("Validation failed: {}", e))?;
        entry.before_write();
        repository::insert(&self.db, &entry).await?;
        Ok(entry)
    }

    pub async fn update(&self, mut entry: CatalogEntry) -> anyhow::Result<CatalogEntry> {
        entry
            .validate()
            .map_err(|e| anyhow::anyhow!("Validation failed: {}", e))?;
        entry.before_write();
        repository::update(&self.db, &entry).await?;
        Ok(entry)
    }

    pub async fn list_by_shop(&self, shop: &str) -> anyhow::Result<Vec<CatalogEntry>> {
        repository::list_by_shop(&self.db, shop).await
    }
}
