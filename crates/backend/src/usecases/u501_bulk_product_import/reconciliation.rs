//! Сверка записи с двумя каталогами: локальным (наша БД) и удаленным
//! (платформа магазина). По двум независимым проверкам существования
//! выбирается действие: создать или обновить.

use async_trait::async_trait;
use contracts::domain::a002_catalog_entry::aggregate::CatalogEntry;
use contracts::usecases::u501_bulk_product_import::{PublishMode, ReconciliationRecord};
use serde::{Deserialize, Serialize};

use crate::domain::a002_catalog_entry::service::CatalogStore;

// ============================================================================
// Remote platform model
// ============================================================================

#[derive(Debug, thiserror::Error)]
pub enum PlatformError {
    #[error("Платформа не настроена: {0}")]
    NotConfigured(String),
    #[error("HTTP error: {0}")]
    Http(String),
    #[error("Platform returned status {status}: {body}")]
    Status { status: u16, body: String },
    #[error("GraphQL errors: {0}")]
    GraphQl(String),
    #[error("Platform rejected input: {0}")]
    UserErrors(String),
    #[error("Unexpected platform response: {0}")]
    UnexpectedResponse(String),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RemoteVariant {
    pub id: String,
    pub sku: Option<String>,
    pub barcode: Option<String>,
    pub price: Option<f64>,
    pub inventory_item_id: Option<String>,
}

/// Товар на платформе
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RemoteProduct {
    pub id: String,
    pub title: String,
    pub variants: Vec<RemoteVariant>,
}

/// Найденный на платформе товар (и вариант, если определен)
#[derive(Debug, Clone, PartialEq)]
pub struct RemoteMatch {
    pub product_id: String,
    pub variant_id: Option<String>,
    pub inventory_item_id: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProductStatus {
    Active,
    Draft,
}

impl ProductStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Active => "ACTIVE",
            Self::Draft => "DRAFT",
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct ProductInput {
    pub title: String,
    pub description_html: Option<String>,
    pub vendor: Option<String>,
    pub product_type: Option<String>,
    pub tags: Vec<String>,
    /// None при обновлении: статус существующего товара не меняется
    pub status: Option<ProductStatus>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct VariantInput {
    /// Заполнен для обновления существующего варианта
    pub id: Option<String>,
    pub price: Option<f64>,
    pub compare_at_price: Option<f64>,
    pub sku: Option<String>,
    pub barcode: Option<String>,
}

/// Установка остатка по товарной позиции склада
#[derive(Debug, Clone, PartialEq)]
pub struct InventorySet {
    pub inventory_item_id: String,
    pub quantity: i64,
}

// ============================================================================
// Collaborators
// ============================================================================

/// Локальный каталог импортированных товаров
#[async_trait]
pub trait LocalCatalog: Send + Sync {
    /// Поиск по SKU (точно), затем по названию (точно)
    async fn find_by_identity(
        &self,
        shop: &str,
        sku: Option<&str>,
        title: Option<&str>,
    ) -> anyhow::Result<Option<CatalogEntry>>;

    async fn create(&self, entry: CatalogEntry) -> anyhow::Result<CatalogEntry>;

    async fn update(&self, entry: CatalogEntry) -> anyhow::Result<CatalogEntry>;
}

/// Каталог платформы магазина. Любая ошибка означает неуспех одной записи.
#[async_trait]
pub trait RemoteCatalog: Send + Sync {
    /// Кандидаты, у которых может быть вариант с этим SKU
    async fn query_product_by_sku(&self, sku: &str) -> Result<Vec<RemoteProduct>, PlatformError>;

    /// Кандидаты с похожим названием
    async fn query_product_by_title(&self, title: &str) -> Result<Vec<RemoteProduct>, PlatformError>;

    async fn query_inventory_item_by_barcode(
        &self,
        barcode: &str,
    ) -> Result<Option<RemoteMatch>, PlatformError>;

    async fn create_product(&self, input: &ProductInput) -> Result<RemoteProduct, PlatformError>;

    async fn update_product(&self, product_id: &str, input: &ProductInput) -> Result<(), PlatformError>;

    async fn bulk_create_variants(
        &self,
        product_id: &str,
        variants: &[VariantInput],
    ) -> Result<Vec<RemoteVariant>, PlatformError>;

    async fn bulk_update_variants(
        &self,
        product_id: &str,
        variants: &[VariantInput],
    ) -> Result<Vec<RemoteVariant>, PlatformError>;

    async fn set_inventory_on_hand(&self, batch: &[InventorySet]) -> Result<(), PlatformError>;

    async fn publish_to_all_channels(&self, product_id: &str) -> Result<(), PlatformError>;
}

#[async_trait]
impl LocalCatalog for CatalogStore {
    async fn find_by_identity(
        &self,
        shop: &str,
        sku: Option<&str>,
        title: Option<&str>,
    ) -> anyhow::Result<Option<CatalogEntry>> {
        CatalogStore::find_by_identity(self, shop, sku, title).await
    }

    async fn create(&self, entry: CatalogEntry) -> anyhow::Result<CatalogEntry> {
        CatalogStore::create(self, entry).await
    }

    async fn update(&self, entry: CatalogEntry) -> anyhow::Result<CatalogEntry> {
        CatalogStore::update(self, entry).await
    }
}

// ============================================================================
// Resolution
// ============================================================================

/// Действие по таблице (есть локально, есть на платформе)
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReconcileAction {
    /// (да, да): обновить товар платформы и кэш локальной записи
    UpdateBoth,
    /// (да, нет): создать товар на платформе, записать новый id в локальную запись
    CreateRemote,
    /// (нет, да): создать локальную запись со ссылкой на найденный товар
    CreateLocal,
    /// (нет, нет): создать товар на платформе, затем локальную запись
    CreateBoth,
}

#[derive(Debug, Clone)]
pub struct Resolution {
    pub local: Option<CatalogEntry>,
    pub remote: Option<RemoteMatch>,
}

impl Resolution {
    pub fn action(&self) -> ReconcileAction {
        match (self.local.is_some(), self.remote.is_some()) {
            (true, true) => ReconcileAction::UpdateBoth,
            (true, false) => ReconcileAction::CreateRemote,
            (false, true) => ReconcileAction::CreateLocal,
            (false, false) => ReconcileAction::CreateBoth,
        }
    }
}

/// Итог применения записи
#[derive(Debug, Clone)]
pub struct Applied {
    pub action: ReconcileAction,
    pub entry: CatalogEntry,
    /// Остаток, который нужно выставить (отправляется пакетами)
    pub inventory: Option<InventorySet>,
}

fn pick_by_sku(candidates: Vec<RemoteProduct>, sku: &str) -> Option<RemoteMatch> {
    candidates.into_iter().find_map(|product| {
        product
            .variants
            .iter()
            .find(|v| v.sku.as_deref().map(str::trim) == Some(sku))
            .map(|variant| RemoteMatch {
                product_id: product.id.clone(),
                variant_id: Some(variant.id.clone()),
                inventory_item_id: variant.inventory_item_id.clone(),
            })
    })
}

fn pick_by_title(candidates: Vec<RemoteProduct>, title: &str) -> Option<RemoteMatch> {
    let wanted = title.to_lowercase();
    candidates
        .into_iter()
        .find(|p| p.title.trim().to_lowercase() == wanted)
        .map(|product| {
            let variant = product.variants.first();
            RemoteMatch {
                product_id: product.id.clone(),
                variant_id: variant.map(|v| v.id.clone()),
                inventory_item_id: variant.and_then(|v| v.inventory_item_id.clone()),
            }
        })
}

pub fn product_input(record: &ReconciliationRecord, status: Option<ProductStatus>) -> ProductInput {
    ProductInput {
        title: platform_title(record),
        description_html: record.description.clone(),
        vendor: record.vendor.clone(),
        product_type: record.product_type.clone(),
        tags: record.tags.clone(),
        status,
    }
}

fn variant_input(record: &ReconciliationRecord, variant_id: Option<String>) -> VariantInput {
    VariantInput {
        id: variant_id,
        price: record.variant.price,
        compare_at_price: record.variant.compare_at_price,
        sku: record.sku().map(str::to_string),
        barcode: record.variant.barcode.clone(),
    }
}

/// Название для платформы: без названия используется SKU
fn platform_title(record: &ReconciliationRecord) -> String {
    record
        .trimmed_title()
        .or_else(|| record.sku())
        .unwrap_or_default()
        .to_string()
}

/// Сверка и применение записей для одного магазина
pub struct Reconciler<'a> {
    pub shop: &'a str,
    pub local: &'a dyn LocalCatalog,
    pub remote: &'a dyn RemoteCatalog,
}

impl<'a> Reconciler<'a> {
    pub fn new(shop: &'a str, local: &'a dyn LocalCatalog, remote: &'a dyn RemoteCatalog) -> Self {
        Self { shop, local, remote }
    }

    /// Найти запись в обоих каталогах
    pub async fn resolve(&self, record: &ReconciliationRecord) -> anyhow::Result<Resolution> {
        let sku = record.sku();
        let title = record.trimmed_title();
        if sku.is_none() && title.is_none() {
            anyhow::bail!("Запись без SKU и названия не может быть сопоставлена");
        }

        let local = self.local.find_by_identity(self.shop, sku, title).await?;
        let remote = self.find_remote(record).await?;
        Ok(Resolution { local, remote })
    }

    async fn find_remote(&self, record: &ReconciliationRecord) -> anyhow::Result<Option<RemoteMatch>> {
        if let Some(sku) = record.sku() {
            let candidates = self.remote.query_product_by_sku(sku).await?;
            if let Some(found) = pick_by_sku(candidates, sku) {
                return Ok(Some(found));
            }
        }
        if let Some(title) = record.trimmed_title() {
            let candidates = self.remote.query_product_by_title(title).await?;
            if let Some(found) = pick_by_title(candidates, title) {
                return Ok(Some(found));
            }
        }
        if let Some(barcode) = record.variant.barcode.as_deref().map(str::trim).filter(|b| !b.is_empty()) {
            return Ok(self.remote.query_inventory_item_by_barcode(barcode).await?);
        }
        Ok(None)
    }

    /// Выполнить действие по результату сверки
    pub async fn apply(
        &self,
        record: &ReconciliationRecord,
        resolution: Resolution,
        session_id: &str,
        publish_mode: PublishMode,
    ) -> anyhow::Result<Applied> {
        let action = resolution.action();
        let Resolution { local, remote } = resolution;

        let (entry, remote_ids) = match (local, remote) {
            (Some(entry), Some(found)) => {
                let product_id = entry
                    .remote_product_id
                    .clone()
                    .unwrap_or_else(|| found.product_id.clone());
                let variant_id = entry.remote_variant_id.clone().or(found.variant_id.clone());
                self.remote
                    .update_product(&product_id, &product_input(record, None))
                    .await?;
                let variant = self.write_variant(&product_id, record, variant_id).await?;
                let inventory_item_id = variant
                    .as_ref()
                    .and_then(|v| v.inventory_item_id.clone())
                    .or(entry.remote_inventory_item_id.clone())
                    .or(found.inventory_item_id);
                (
                    entry,
                    RemoteMatch {
                        product_id,
                        variant_id: variant.map(|v| v.id),
                        inventory_item_id,
                    },
                )
            }
            (Some(entry), None) => {
                let created = self.create_remote(record, publish_mode).await?;
                (entry, created)
            }
            (None, Some(found)) => {
                let entry = CatalogEntry::new_for_insert(
                    self.shop.to_string(),
                    record.sku().map(str::to_string),
                    platform_title(record),
                );
                (entry, found)
            }
            (None, None) => {
                let created = self.create_remote(record, publish_mode).await?;
                let entry = CatalogEntry::new_for_insert(
                    self.shop.to_string(),
                    record.sku().map(str::to_string),
                    platform_title(record),
                );
                (entry, created)
            }
        };

        let entry = self.write_local(entry, record, &remote_ids, session_id, action).await?;

        let inventory = match (&remote_ids.inventory_item_id, record.variant.inventory_qty) {
            (Some(item_id), Some(quantity)) if action != ReconcileAction::CreateLocal => {
                Some(InventorySet {
                    inventory_item_id: item_id.clone(),
                    quantity,
                })
            }
            _ => None,
        };

        Ok(Applied {
            action,
            entry,
            inventory,
        })
    }

    async fn create_remote(
        &self,
        record: &ReconciliationRecord,
        publish_mode: PublishMode,
    ) -> anyhow::Result<RemoteMatch> {
        let status = match publish_mode {
            PublishMode::Publish => ProductStatus::Active,
            PublishMode::Draft => ProductStatus::Draft,
        };
        let product = self
            .remote
            .create_product(&product_input(record, Some(status)))
            .await?;
        let default_variant = product.variants.first().map(|v| v.id.clone());
        let variant = self.write_variant(&product.id, record, default_variant).await?;

        if publish_mode == PublishMode::Publish {
            if let Err(e) = self.remote.publish_to_all_channels(&product.id).await {
                tracing::warn!("Publish of {} failed (product kept): {}", product.id, e);
            }
        }

        Ok(RemoteMatch {
            product_id: product.id,
            inventory_item_id: variant.as_ref().and_then(|v| v.inventory_item_id.clone()),
            variant_id: variant.map(|v| v.id),
        })
    }

    /// Одна пакетная операция над вариантом: обновление известного варианта
    /// или создание нового
    async fn write_variant(
        &self,
        product_id: &str,
        record: &ReconciliationRecord,
        variant_id: Option<String>,
    ) -> anyhow::Result<Option<RemoteVariant>> {
        let is_update = variant_id.is_some();
        let input = [variant_input(record, variant_id)];
        let variants = if is_update {
            self.remote.bulk_update_variants(product_id, &input).await?
        } else {
            self.remote.bulk_create_variants(product_id, &input).await?
        };
        Ok(variants.into_iter().next())
    }

    async fn write_local(
        &self,
        mut entry: CatalogEntry,
        record: &ReconciliationRecord,
        remote_ids: &RemoteMatch,
        session_id: &str,
        action: ReconcileAction,
    ) -> anyhow::Result<CatalogEntry> {
        if let Some(sku) = record.sku() {
            entry.sku = Some(sku.to_string());
        }
        entry.base.description = platform_title(record);
        entry.refresh_code();
        entry.vendor = record.vendor.clone();
        entry.price = record.variant.price;
        entry.compare_at_price = record.variant.compare_at_price;
        entry.inventory_qty = record.variant.inventory_qty;
        entry.remote_product_id = Some(remote_ids.product_id.clone());
        if remote_ids.variant_id.is_some() {
            entry.remote_variant_id = remote_ids.variant_id.clone();
        }
        if remote_ids.inventory_item_id.is_some() {
            entry.remote_inventory_item_id = remote_ids.inventory_item_id.clone();
        }
        entry.last_session_id = Some(session_id.to_string());

        match action {
            ReconcileAction::UpdateBoth | ReconcileAction::CreateRemote => self.local.update(entry).await,
            ReconcileAction::CreateLocal | ReconcileAction::CreateBoth => self.local.create(entry).await,
        }
    }
}
