use crate::domain::common::{AggregateId, AggregateRoot, BaseAggregate, EntityMetadata, Origin};
use serde::{Deserialize, Serialize};

// ============================================================================
// ID Type
// ============================================================================

crate::uuid_aggregate_id!(
    /// Уникальный идентификатор записи локального каталога
    CatalogEntryId
);

// ============================================================================
// Aggregate Root
// ============================================================================

/// Запись локального каталога: что и куда уже импортировано для магазина.
///
/// `base.code` хранит ключ идентичности (SKU, а если его нет, название),
/// `base.description` хранит название товара.
/// Ссылки `remote_*` слабые: это только идентификаторы товара на платформе,
/// сам товар принадлежит платформе и может быть удален там независимо.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CatalogEntry {
    #[serde(flatten)]
    pub base: BaseAggregate<CatalogEntryId>,

    /// Магазин (домен платформы), к которому относится запись
    pub shop: String,

    pub sku: Option<String>,

    pub vendor: Option<String>,

    pub price: Option<f64>,

    pub compare_at_price: Option<f64>,

    pub inventory_qty: Option<i64>,

    pub remote_product_id: Option<String>,

    pub remote_variant_id: Option<String>,

    pub remote_inventory_item_id: Option<String>,

    /// Сессия импорта, которая последней писала запись
    pub last_session_id: Option<String>,
}

impl CatalogEntry {
    /// Создать новую запись для вставки в БД
    pub fn new_for_insert(shop: String, sku: Option<String>, title: String) -> Self {
        let code = identity_code(sku.as_deref(), &title);
        Self {
            base: BaseAggregate::new(CatalogEntryId::new_v4(), code, title),
            shop,
            sku,
            vendor: None,
            price: None,
            compare_at_price: None,
            inventory_qty: None,
            remote_product_id: None,
            remote_variant_id: None,
            remote_inventory_item_id: None,
            last_session_id: None,
        }
    }

    pub fn title(&self) -> &str {
        &self.base.description
    }

    /// Пересчитать `base.code` после смены SKU или названия
    pub fn refresh_code(&mut self) {
        self.base.code = identity_code(self.sku.as_deref(), &self.base.description);
    }

    pub fn to_string_id(&self) -> String {
        self.base.id.as_string()
    }

    pub fn validate(&self) -> Result<(), String> {
        if self.shop.trim().is_empty() {
            return Err("Магазин должен быть указан".into());
        }
        if self.base.code.trim().is_empty() {
            return Err("Нужен SKU или название товара".into());
        }
        Ok(())
    }

    pub fn before_write(&mut self) {
        self.base.touch();
    }
}

fn identity_code(sku: Option<&str>, title: &str) -> String {
    sku.filter(|s| !s.trim().is_empty())
        .unwrap_or(title)
        .to_string()
}

impl AggregateRoot for CatalogEntry {
    type Id = CatalogEntryId;

    fn id(&self) -> Self::Id {
        self.base.id
    }

    fn code(&self) -> &str {
        &self.base.code
    }

    fn description(&self) -> &str {
        &self.base.description
    }

    fn metadata(&self) -> &EntityMetadata {
        &self.base.metadata
    }

    fn metadata_mut(&mut self) -> &mut EntityMetadata {
        &mut self.base.metadata
    }

    fn aggregate_index() -> &'static str {
        "a002"
    }

    fn collection_name() -> &'static str {
        "catalog_entry"
    }

    fn element_name() -> &'static str {
        "Товар локального каталога"
    }

    fn origin() -> Origin {
        Origin::Supplier
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_code_falls_back_to_title() {
        let with_sku = CatalogEntry::new_for_insert("shop".into(), Some("SKU-1".into()), "Lamp".into());
        assert_eq!(with_sku.base.code, "SKU-1");

        let blank_sku = CatalogEntry::new_for_insert("shop".into(), Some("  ".into()), "Lamp".into());
        assert_eq!(blank_sku.base.code, "Lamp");
        assert_eq!(blank_sku.title(), "Lamp");
    }

    #[test]
    fn test_refresh_code_after_sku_assigned() {
        let mut entry = CatalogEntry::new_for_insert("shop".into(), None, "Lamp".into());
        assert_eq!(entry.base.code, "Lamp");
        entry.sku = Some("SKU-1".into());
        entry.refresh_code();
        assert_eq!(entry.base.code, "SKU-1");
    }

    #[test]
    fn test_full_name_is_table_name() {
        assert_eq!(CatalogEntry::full_name(), "a002_catalog_entry");
    }
}
