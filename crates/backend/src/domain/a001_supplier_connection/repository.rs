use chrono::Utc;
use contracts::domain::a001_supplier_connection::aggregate::{
    SourceKind, SupplierConnection, SupplierConnectionId,
};
use contracts::domain::common::{BaseAggregate, EntityMetadata};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use uuid::Uuid;

use sea_orm::entity::prelude::*;
use sea_orm::{ColumnTrait, EntityTrait, QueryFilter, Set};

#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "a001_supplier_connection")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: String,
    pub code: String,
    pub description: String,
    pub comment: Option<String>,
    pub supplier_name: String,
    pub source_kind: String,
    pub endpoint_url: Option<String>,
    pub api_key: Option<String>,
    /// JSON-объект с дополнительными заголовками
    pub extra_headers: String,
    pub is_deleted: bool,
    pub created_at: Option<chrono::DateTime<chrono::Utc>>,
    pub updated_at: Option<chrono::DateTime<chrono::Utc>>,
    pub version: i32,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}

impl From<Model> for SupplierConnection {
    fn from(m: Model) -> Self {
        let metadata = EntityMetadata {
            created_at: m.created_at.unwrap_or_else(Utc::now),
            updated_at: m.updated_at.unwrap_or_else(Utc::now),
            is_deleted: m.is_deleted,
            version: m.version,
        };
        let uuid = Uuid::parse_str(&m.id).unwrap_or_else(|_| Uuid::new_v4());
        let extra_headers: BTreeMap<String, String> =
            serde_json::from_str(&m.extra_headers).unwrap_or_default();

        SupplierConnection {
            base: BaseAggregate::with_metadata(
                SupplierConnectionId(uuid),
                m.code,
                m.description,
                m.comment,
                metadata,
            ),
            supplier_name: m.supplier_name,
            source_kind: SourceKind::from_str_lossy(&m.source_kind),
            endpoint_url: m.endpoint_url,
            api_key: m.api_key,
            extra_headers,
        }
    }
}

fn to_active(aggregate: &SupplierConnection) -> anyhow::Result<ActiveModel> {
    Ok(ActiveModel {
        id: Set(aggregate.base.id.value().to_string()),
        code: Set(aggregate.base.code.clone()),
        description: Set(aggregate.base.description.clone()),
        comment: Set(aggregate.base.comment.clone()),
        supplier_name: Set(aggregate.supplier_name.clone()),
        source_kind: Set(aggregate.source_kind.as_str().to_string()),
        endpoint_url: Set(aggregate.endpoint_url.clone()),
        api_key: Set(aggregate.api_key.clone()),
        extra_headers: Set(serde_json::to_string(&aggregate.extra_headers)?),
        is_deleted: Set(aggregate.base.metadata.is_deleted),
        created_at: Set(Some(aggregate.base.metadata.created_at)),
        updated_at: Set(Some(aggregate.base.metadata.updated_at)),
        version: Set(aggregate.base.metadata.version),
    })
}

pub async fn list_all(db: &DatabaseConnection) -> anyhow::Result<Vec<SupplierConnection>> {
    let mut items: Vec<SupplierConnection> = Entity::find()
        .filter(Column::IsDeleted.eq(false))
        .all(db)
        .await?
        .into_iter()
        .map(Into::into)
        .collect();
    items.sort_by(|a, b| {
        a.supplier_name
            .to_lowercase()
            .cmp(&b.supplier_name.to_lowercase())
    });
    Ok(items)
}

pub async fn get_by_id(
    db: &DatabaseConnection,
    id: Uuid,
) -> anyhow::Result<Option<SupplierConnection>> {
    let result = Entity::find_by_id(id.to_string())
        .filter(Column::IsDeleted.eq(false))
        .one(db)
        .await?;
    Ok(result.map(Into::into))
}

pub async fn insert(db: &DatabaseConnection, aggregate: &SupplierConnection) -> anyhow::Result<Uuid> {
    let uuid = aggregate.base.id.value();
    to_active(aggregate)?.insert(db).await?;
    Ok(uuid)
}

pub async fn update(db: &DatabaseConnection, aggregate: &SupplierConnection) -> anyhow::Result<()> {
    let mut active = to_active(aggregate)?;
    active.created_at = sea_orm::ActiveValue::NotSet;
    active.update(db).await?;
    Ok(())
}

pub async fn soft_delete(db: &DatabaseConnection, id: Uuid) -> anyhow::Result<bool> {
    use sea_orm::sea_query::Expr;
    let result = Entity::update_many()
        .col_expr(Column::IsDeleted, Expr::value(true))
        .col_expr(Column::UpdatedAt, Expr::value(Utc::now()))
        .filter(Column::Id.eq(id.to_string()))
        .filter(Column::IsDeleted.eq(false))
        .exec(db)
        .await?;
    Ok(result.rows_affected > 0)
}
