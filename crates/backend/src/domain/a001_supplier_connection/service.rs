use super::repository;
use contracts::domain::a001_supplier_connection::aggregate::{
    ConnectionKey, SupplierConnection, SupplierConnectionDto,
};
use sea_orm::DatabaseConnection;
use std::collections::HashSet;
use uuid::Uuid;

/// Ошибки сохранения подключения, на которые реагирует обработчик HTTP
#[derive(Debug, thiserror::Error)]
pub enum ConnectionError {
    #[error("Подключение к поставщику '{supplier_name}' с этой точкой доступа уже существует")]
    Duplicate { supplier_name: String },
    #[error("Validation failed: {0}")]
    Validation(String),
    #[error("Подключение не найдено")]
    NotFound,
}

/// Ключи всех сохраненных подключений, кроме `exclude`
async fn existing_keys(
    db: &DatabaseConnection,
    exclude: Option<Uuid>,
) -> anyhow::Result<HashSet<ConnectionKey>> {
    Ok(repository::list_all(db)
        .await?
        .into_iter()
        .filter(|c| Some(c.base.id.value()) != exclude)
        .map(|c| c.connection_key())
        .collect())
}

fn check_unique(
    aggregate: &SupplierConnection,
    keys: &HashSet<ConnectionKey>,
) -> Result<(), ConnectionError> {
    if keys.contains(&aggregate.connection_key()) {
        return Err(ConnectionError::Duplicate {
            supplier_name: aggregate.supplier_name.clone(),
        });
    }
    Ok(())
}

/// Создание нового подключения к поставщику
pub async fn create(db: &DatabaseConnection, dto: SupplierConnectionDto) -> anyhow::Result<Uuid> {
    let code = dto
        .code
        .clone()
        .unwrap_or_else(|| format!("SUP-{}", &Uuid::new_v4().to_string()[..8]));
    let mut aggregate = SupplierConnection::new_for_insert(
        code,
        dto.supplier_name.clone(),
        dto.source_kind,
        dto.endpoint_url.clone(),
        dto.api_key.clone(),
        dto.comment.clone(),
    );
    aggregate.extra_headers = dto.extra_headers;

    aggregate.validate().map_err(ConnectionError::Validation)?;
    check_unique(&aggregate, &existing_keys(db, None).await?)?;

    aggregate.before_write();
    repository::insert(db, &aggregate).await
}

/// Обновление существующего подключения
pub async fn update(db: &DatabaseConnection, dto: SupplierConnectionDto) -> anyhow::Result<Uuid> {
    let id = dto
        .id
        .as_ref()
        .and_then(|s| Uuid::parse_str(s).ok())
        .ok_or_else(|| ConnectionError::Validation("Invalid ID".into()))?;

    let mut aggregate = repository::get_by_id(db, id)
        .await?
        .ok_or(ConnectionError::NotFound)?;
    aggregate.update(&dto);

    aggregate.validate().map_err(ConnectionError::Validation)?;
    check_unique(&aggregate, &existing_keys(db, Some(id)).await?)?;

    aggregate.before_write();
    repository::update(db, &aggregate).await?;
    Ok(id)
}

/// Мягкое удаление подключения
pub async fn delete(db: &DatabaseConnection, id: Uuid) -> anyhow::Result<bool> {
    repository::soft_delete(db, id).await
}

pub async fn get_by_id(db: &DatabaseConnection, id: Uuid) -> anyhow::Result<Option<SupplierConnection>> {
    repository::get_by_id(db, id).await
}

pub async fn list_all(db: &DatabaseConnection) -> anyhow::Result<Vec<SupplierConnection>> {
    repository::list_all(db).await
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::shared::data::db::in_memory_connection;
    use contracts::domain::a001_supplier_connection::aggregate::SourceKind;

    fn api_dto(name: &str, url: &str) -> SupplierConnectionDto {
        SupplierConnectionDto {
            supplier_name: name.into(),
            source_kind: SourceKind::Api,
            endpoint_url: Some(url.into()),
            api_key: Some("key".into()),
            ..Default::default()
        }
    }

    #[tokio::test]
    async fn test_duplicate_connection_is_rejected() {
        let db = in_memory_connection().await.unwrap();
        create(&db, api_dto("Acme", "https://api.acme.io/products"))
            .await
            .unwrap();

        let err = create(&db, api_dto(" ACME ", "https://API.acme.io/products/?page=2"))
            .await
            .unwrap_err();
        assert!(matches!(
            err.downcast_ref::<ConnectionError>(),
            Some(ConnectionError::Duplicate { .. })
        ));

        create(&db, api_dto("Acme", "https://api.acme.io/v2/products"))
            .await
            .unwrap();
        assert_eq!(list_all(&db).await.unwrap().len(), 2);
    }

    #[tokio::test]
    async fn test_update_keeps_own_key_and_delete() {
        let db = in_memory_connection().await.unwrap();
        let id = create(&db, api_dto("Acme", "https://api.acme.io/products"))
            .await
            .unwrap();

        let mut dto = api_dto("Acme", "https://api.acme.io/products");
        dto.id = Some(id.to_string());
        dto.extra_headers.insert("X-Store".into(), "7".into());
        update(&db, dto).await.unwrap();

        let saved = get_by_id(&db, id).await.unwrap().unwrap();
        assert_eq!(saved.extra_headers.get("X-Store").map(String::as_str), Some("7"));

        assert!(delete(&db, id).await.unwrap());
        assert!(!delete(&db, id).await.unwrap());
        assert!(get_by_id(&db, id).await.unwrap().is_none());
    }
}
