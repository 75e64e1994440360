use chrono::Utc;
use contracts::domain::a002_catalog_entry::aggregate::{CatalogEntry, CatalogEntryId};
use contracts::domain::common::{BaseAggregate, EntityMetadata};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use sea_orm::entity::prelude::*;
use sea_orm::{ColumnTrait, EntityTrait, QueryFilter, QueryOrder, Set};

#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "a002_catalog_entry")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: String,
    pub code: String,
    pub description: String,
    pub comment: Option<String>,
    pub shop: String,
    pub sku: Option<String>,
    pub vendor: Option<String>,
    pub price: Option<f64>,
    pub compare_at_price: Option<f64>,
    pub inventory_qty: Option<i64>,
    pub remote_product_id: Option<String>,
    pub remote_variant_id: Option<String>,
    pub remote_inventory_item_id: Option<String>,
    pub last_session_id: Option<String>,
    pub is_deleted: bool,
    pub created_at: Option<chrono::DateTime<chrono::Utc>>,
    pub updated_at: Option<chrono::DateTime<chrono::Utc>>,
    pub version: i32,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}

impl From<Model> for CatalogEntry {
    fn from(m: Model) -> Self {
        let metadata = EntityMetadata {
            created_at: m.created_at.unwrap_or_else(Utc::now),
            updated_at: m.updated_at.unwrap_or_else(Utc::now),
            is_deleted: m.is_deleted,
            version: m.version,
        };
        let uuid = Uuid::parse_str(&m.id).unwrap_or_else(|_| Uuid::new_v4());

        CatalogEntry {
            base: BaseAggregate::with_metadata(
                CatalogEntryId(uuid),
                m.code,
                m.description,
                m.comment,
                metadata,
            ),
            shop: m.shop,
            sku: m.sku,
            vendor: m.vendor,
            price: m.price,
            compare_at_price: m.compare_at_price,
            inventory_qty: m.inventory_qty,
            remote_product_id: m.remote_product_id,
            remote_variant_id: m.remote_variant_id,
            remote_inventory_item_id: m.remote_inventory_item_id,
            last_session_id: m.last_session_id,
        }
    }
}

fn to_active(aggregate: &CatalogEntry) -> ActiveModel {
    ActiveModel {
        id: Set(aggregate.base.id.value().to_string()),
        code: Set(aggregate.base.code.clone()),
        description: Set(aggregate.base.description.clone()),
        comment: Set(aggregate.base.comment.clone()),
        shop: Set(aggregate.shop.clone()),
        sku: Set(aggregate.sku.clone()),
        vendor: Set(aggregate.vendor.clone()),
        price: Set(aggregate.price),
        compare_at_price: Set(aggregate.compare_at_price),
        inventory_qty: Set(aggregate.inventory_qty),
        remote_product_id: Set(aggregate.remote_product_id.clone()),
        remote_variant_id: Set(aggregate.remote_variant_id.clone()),
        remote_inventory_item_id: Set(aggregate.remote_inventory_item_id.clone()),
        last_session_id: Set(aggregate.last_session_id.clone()),
        is_deleted: Set(aggregate.base.metadata.is_deleted),
        created_at: Set(Some(aggregate.base.metadata.created_at)),
        updated_at: Set(Some(aggregate.base.metadata.updated_at)),
        version: Set(aggregate.base.metadata.version),
    }
}

pub async fn get_by_id(db: &DatabaseConnection, id: Uuid) -> anyhow::Result<Option<CatalogEntry>> {
    let result = Entity::find_by_id(id.to_string()).one(db).await?;
    Ok(result.map(Into::into))
}

/// Найти запись магазина по SKU (точное совпадение)
pub async fn get_by_sku(
    db: &DatabaseConnection,
    shop: &str,
    sku: &str,
) -> anyhow::Result<Option<CatalogEntry>> {
    let result = Entity::find()
        .filter(Column::Shop.eq(shop))
        .filter(Column::Sku.eq(sku))
        .filter(Column::IsDeleted.eq(false))
        .order_by_asc(Column::CreatedAt)
        .one(db)
        .await?;
    Ok(result.map(Into::into))
}

/// Найти запись магазина по названию (точное совпадение)
pub async fn get_by_title(
    db: &DatabaseConnection,
    shop: &str,
    title: &str,
) -> anyhow::Result<Option<CatalogEntry>> {
    let result = Entity::find()
        .filter(Column::Shop.eq(shop))
        .filter(Column::Description.eq(title))
        .filter(Column::IsDeleted.eq(false))
        .order_by_asc(Column::CreatedAt)
        .one(db)
        .await?;
    Ok(result.map(Into::into))
}

pub async fn list_by_shop(db: &DatabaseConnection, shop: &str) -> anyhow::Result<Vec<CatalogEntry>> {
    let items = Entity::find()
        .filter(Column::Shop.eq(shop))
        .filter(Column::IsDeleted.eq(false))
        .order_by_asc(Column::Code)
        .all(db)
        .await?
        .into_iter()
        .map(Into::into)
        .collect();
    Ok(items)
}

pub async fn insert(db: &DatabaseConnection, aggregate: &CatalogEntry) -> anyhow::Result<Uuid> {
    let uuid = aggregate.base.id.value();
    to_active(aggregate).insert(db).await?;
    Ok(uuid)
}

pub async fn update(db: &DatabaseConnection, aggregate: &CatalogEntry) -> anyhow::Result<()> {
    let mut active = to_active(aggregate);
    active.created_at = sea_orm::ActiveValue::NotSet;
    active.update(db).await?;
    Ok(())
}
