//! In-memory реализации хранилищ и платформы для тестов

use super::progress_tracker::SessionStore;
use super::reconciliation::{
    InventorySet, LocalCatalog, PlatformError, ProductInput, RemoteCatalog, RemoteMatch,
    RemoteProduct, RemoteVariant, VariantInput,
};
use async_trait::async_trait;
use contracts::domain::a002_catalog_entry::aggregate::CatalogEntry;
use contracts::usecases::u501_bulk_product_import::ImportSession;
use std::collections::{HashMap, HashSet};
use std::sync::Mutex;

#[derive(Default)]
pub struct InMemoryLocalCatalog {
    entries: Mutex<Vec<CatalogEntry>>,
}

impl InMemoryLocalCatalog {
    pub fn len(&self) -> usize {
        self.entries.lock().unwrap().len()
    }

    pub fn entries(&self) -> Vec<CatalogEntry> {
        self.entries.lock().unwrap().clone()
    }
}

#[async_trait]
impl LocalCatalog for InMemoryLocalCatalog {
    async fn find_by_identity(
        &self,
        shop: &str,
        sku: Option<&str>,
        title: Option<&str>,
    ) -> anyhow::Result<Option<CatalogEntry>> {
        let entries = self.entries.lock().unwrap();
        let in_shop = || entries.iter().filter(|e| e.shop == shop);
        let by_sku = sku.and_then(|sku| in_shop().find(|e| e.sku.as_deref() == Some(sku)));
        let found = by_sku.or_else(|| title.and_then(|t| in_shop().find(|e| e.title() == t)));
        Ok(found.cloned())
    }

    async fn create(&self, mut entry: CatalogEntry) -> anyhow::Result<CatalogEntry> {
        entry.before_write();
        self.entries.lock().unwrap().push(entry.clone());
        Ok(entry)
    }

    async fn update(&self, mut entry: CatalogEntry) -> anyhow::Result<CatalogEntry> {
        entry.before_write();
        let mut entries = self.entries.lock().unwrap();
        let slot = entries
            .iter_mut()
            .find(|e| e.base.id == entry.base.id)
            .ok_or_else(|| anyhow::anyhow!("Not found"))?;
        *slot = entry.clone();
        Ok(entry)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum RemoteCall {
    QueryBySku,
    QueryByTitle,
    QueryByBarcode,
    CreateProduct,
    UpdateProduct,
    BulkCreateVariants,
    BulkUpdateVariants,
    SetInventory(usize),
    Publish,
}

#[derive(Default)]
pub struct InMemoryRemoteCatalog {
    products: Mutex<Vec<RemoteProduct>>,
    calls: Mutex<Vec<RemoteCall>>,
    inventory: Mutex<Vec<InventorySet>>,
    failing_skus: Mutex<HashSet<String>>,
    fail_publish: Mutex<bool>,
    fail_inventory: Mutex<bool>,
    next_id: Mutex<u64>,
}

impl InMemoryRemoteCatalog {
    fn next_id(&self) -> u64 {
        let mut id = self.next_id.lock().unwrap();
        *id += 1;
        *id
    }

    fn record_call(&self, call: RemoteCall) {
        self.calls.lock().unwrap().push(call);
    }

    fn new_variant(&self, input: &VariantInput) -> RemoteVariant {
        let n = self.next_id();
        RemoteVariant {
            id: format!("gid://shop/ProductVariant/{}", n),
            sku: input.sku.clone(),
            barcode: input.barcode.clone(),
            price: input.price,
            inventory_item_id: Some(format!("gid://shop/InventoryItem/{}", n)),
        }
    }

    /// Добавить товар с одним вариантом, возвращает id товара
    pub fn seed_product(&self, title: &str, sku: Option<&str>) -> String {
        let n = self.next_id();
        let id = format!("gid://shop/Product/{}", n);
        self.products.lock().unwrap().push(RemoteProduct {
            id: id.clone(),
            title: title.to_string(),
            variants: vec![RemoteVariant {
                id: format!("gid://shop/ProductVariant/{}", n),
                sku: sku.map(str::to_string),
                barcode: None,
                price: None,
                inventory_item_id: Some(format!("gid://shop/InventoryItem/{}", n)),
            }],
        });
        id
    }

    /// Задать штрихкод первому варианту товара
    pub fn set_barcode(&self, product_id: &str, barcode: &str) {
        let mut products = self.products.lock().unwrap();
        if let Some(variant) = products
            .iter_mut()
            .find(|p| p.id == product_id)
            .and_then(|p| p.variants.first_mut())
        {
            variant.barcode = Some(barcode.to_string());
        }
    }

    /// Запросы по этому SKU будут завершаться ошибкой платформы
    pub fn fail_sku(&self, sku: &str) {
        self.failing_skus.lock().unwrap().insert(sku.to_string());
    }

    pub fn fail_publish(&self) {
        *self.fail_publish.lock().unwrap() = true;
    }

    pub fn fail_inventory(&self) {
        *self.fail_inventory.lock().unwrap() = true;
    }

    pub fn product_count(&self) -> usize {
        self.products.lock().unwrap().len()
    }

    pub fn products(&self) -> Vec<RemoteProduct> {
        self.products.lock().unwrap().clone()
    }

    pub fn calls(&self) -> Vec<RemoteCall> {
        self.calls.lock().unwrap().clone()
    }

    pub fn inventory(&self) -> Vec<InventorySet> {
        self.inventory.lock().unwrap().clone()
    }
}

#[async_trait]
impl RemoteCatalog for InMemoryRemoteCatalog {
    async fn query_product_by_sku(&self, sku: &str) -> Result<Vec<RemoteProduct>, PlatformError> {
        self.record_call(RemoteCall::QueryBySku);
        if self.failing_skus.lock().unwrap().contains(sku) {
            return Err(PlatformError::Status {
                status: 502,
                body: "bad gateway".into(),
            });
        }
        Ok(self
            .products
            .lock()
            .unwrap()
            .iter()
            .filter(|p| p.variants.iter().any(|v| v.sku.as_deref() == Some(sku)))
            .cloned()
            .collect())
    }

    async fn query_product_by_title(&self, title: &str) -> Result<Vec<RemoteProduct>, PlatformError> {
        self.record_call(RemoteCall::QueryByTitle);
        let wanted = title.to_lowercase();
        Ok(self
            .products
            .lock()
            .unwrap()
            .iter()
            .filter(|p| p.title.to_lowercase().contains(&wanted))
            .cloned()
            .collect())
    }

    async fn query_inventory_item_by_barcode(
        &self,
        barcode: &str,
    ) -> Result<Option<RemoteMatch>, PlatformError> {
        self.record_call(RemoteCall::QueryByBarcode);
        let products = self.products.lock().unwrap();
        let found = products.iter().find_map(|p| {
            p.variants
                .iter()
                .find(|v| v.barcode.as_deref() == Some(barcode))
                .map(|v| RemoteMatch {
                    product_id: p.id.clone(),
                    variant_id: Some(v.id.clone()),
                    inventory_item_id: v.inventory_item_id.clone(),
                })
        });
        Ok(found)
    }

    async fn create_product(&self, input: &ProductInput) -> Result<RemoteProduct, PlatformError> {
        self.record_call(RemoteCall::CreateProduct);
        let n = self.next_id();
        let product = RemoteProduct {
            id: format!("gid://shop/Product/{}", n),
            title: input.title.clone(),
            variants: vec![self.new_variant(&VariantInput {
                id: None,
                price: None,
                compare_at_price: None,
                sku: None,
                barcode: None,
            })],
        };
        self.products.lock().unwrap().push(product.clone());
        Ok(product)
    }

    async fn update_product(&self, product_id: &str, input: &ProductInput) -> Result<(), PlatformError> {
        self.record_call(RemoteCall::UpdateProduct);
        let mut products = self.products.lock().unwrap();
        let product = products
            .iter_mut()
            .find(|p| p.id == product_id)
            .ok_or_else(|| PlatformError::UserErrors(format!("Product {} does not exist", product_id)))?;
        product.title = input.title.clone();
        Ok(())
    }

    async fn bulk_create_variants(
        &self,
        product_id: &str,
        variants: &[VariantInput],
    ) -> Result<Vec<RemoteVariant>, PlatformError> {
        self.record_call(RemoteCall::BulkCreateVariants);
        let created: Vec<RemoteVariant> = variants.iter().map(|v| self.new_variant(v)).collect();
        let mut products = self.products.lock().unwrap();
        let product = products
            .iter_mut()
            .find(|p| p.id == product_id)
            .ok_or_else(|| PlatformError::UserErrors(format!("Product {} does not exist", product_id)))?;
        product.variants.extend(created.iter().cloned());
        Ok(created)
    }

    async fn bulk_update_variants(
        &self,
        product_id: &str,
        variants: &[VariantInput],
    ) -> Result<Vec<RemoteVariant>, PlatformError> {
        self.record_call(RemoteCall::BulkUpdateVariants);
        let mut products = self.products.lock().unwrap();
        let product = products
            .iter_mut()
            .find(|p| p.id == product_id)
            .ok_or_else(|| PlatformError::UserErrors(format!("Product {} does not exist", product_id)))?;
        let by_id: HashMap<&str, &VariantInput> = variants
            .iter()
            .filter_map(|v| v.id.as_deref().map(|id| (id, v)))
            .collect();
        let mut updated = Vec::new();
        for variant in product.variants.iter_mut() {
            if let Some(input) = by_id.get(variant.id.as_str()) {
                variant.sku = input.sku.clone();
                variant.barcode = input.barcode.clone();
                variant.price = input.price;
                updated.push(variant.clone());
            }
        }
        Ok(updated)
    }

    async fn set_inventory_on_hand(&self, batch: &[InventorySet]) -> Result<(), PlatformError> {
        self.record_call(RemoteCall::SetInventory(batch.len()));
        if *self.fail_inventory.lock().unwrap() {
            return Err(PlatformError::GraphQl("inventory unavailable".into()));
        }
        self.inventory.lock().unwrap().extend(batch.iter().cloned());
        Ok(())
    }

    async fn publish_to_all_channels(&self, _product_id: &str) -> Result<(), PlatformError> {
        self.record_call(RemoteCall::Publish);
        if *self.fail_publish.lock().unwrap() {
            return Err(PlatformError::UserErrors("no publications".into()));
        }
        Ok(())
    }
}

#[derive(Default)]
pub struct InMemorySessionStore {
    sessions: Mutex<HashMap<String, ImportSession>>,
}

#[async_trait]
impl SessionStore for InMemorySessionStore {
    async fn create_session(&self, session: &ImportSession) -> anyhow::Result<()> {
        self.sessions
            .lock()
            .unwrap()
            .insert(session.id.clone(), session.clone());
        Ok(())
    }

    async fn update_session_counters(&self, session: &ImportSession) -> anyhow::Result<()> {
        let mut sessions = self.sessions.lock().unwrap();
        let slot = sessions
            .get_mut(&session.id)
            .ok_or_else(|| anyhow::anyhow!("Session {} not found", session.id))?;
        *slot = session.clone();
        Ok(())
    }

    async fn get_session(&self, session_id: &str) -> anyhow::Result<Option<ImportSession>> {
        Ok(self.sessions.lock().unwrap().get(session_id).cloned())
    }
}
