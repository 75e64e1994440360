use crate::domain::common::{AggregateId, AggregateRoot, BaseAggregate, EntityMetadata, Origin};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use url::Url;

// ============================================================================
// ID Type
// ============================================================================

crate::uuid_aggregate_id!(
    /// Уникальный идентификатор подключения к поставщику
    SupplierConnectionId
);

// ============================================================================
// Enums
// ============================================================================

/// Вид источника данных поставщика
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, Default)]
#[serde(rename_all = "snake_case")]
pub enum SourceKind {
    /// Файл CSV, загружаемый вручную
    #[default]
    Csv,
    /// HTTP API с постраничной выдачей
    Api,
}

impl SourceKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Csv => "csv",
            Self::Api => "api",
        }
    }

    pub fn from_str_lossy(s: &str) -> Self {
        match s.trim().to_lowercase().as_str() {
            "api" => Self::Api,
            _ => Self::Csv,
        }
    }
}

/// Составной ключ подключения для поиска дублей
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ConnectionKey {
    pub supplier_name: String,
    pub endpoint_identity: String,
}

impl ConnectionKey {
    pub fn new(supplier_name: &str, source_kind: SourceKind, endpoint_url: Option<&str>) -> Self {
        Self {
            supplier_name: supplier_name.trim().to_lowercase(),
            endpoint_identity: endpoint_identity(source_kind, endpoint_url),
        }
    }
}

/// Нормализованная идентичность точки доступа.
///
/// Для API: URL разбирается по WHATWG (схема и хост в нижнем регистре,
/// порт по умолчанию и сегменты `.`/`..` убираются), путь без завершающего
/// `/`, query и fragment отбрасываются. Для CSV точки доступа нет, поэтому у
/// поставщика может быть только одно CSV-подключение.
pub fn endpoint_identity(source_kind: SourceKind, endpoint_url: Option<&str>) -> String {
    match (source_kind, endpoint_url.map(str::trim).filter(|u| !u.is_empty())) {
        (SourceKind::Api, Some(raw)) => {
            let parsed = Url::parse(raw).or_else(|e| match e {
                url::ParseError::RelativeUrlWithoutBase => Url::parse(&format!("https://{}", raw)),
                other => Err(other),
            });
            match parsed {
                Ok(url) => {
                    let mut identity = format!("{}://{}", url.scheme(), url.host_str().unwrap_or(""));
                    if let Some(port) = url.port() {
                        identity.push_str(&format!(":{}", port));
                    }
                    identity.push_str(url.path().trim_end_matches('/'));
                    identity
                }
                Err(_) => raw.to_lowercase(),
            }
        }
        (kind, _) => kind.as_str().to_string(),
    }
}

// ============================================================================
// Aggregate Root
// ============================================================================

/// Сохраненное подключение к поставщику (источник товаров для импорта)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SupplierConnection {
    #[serde(flatten)]
    pub base: BaseAggregate<SupplierConnectionId>,

    pub supplier_name: String,

    pub source_kind: SourceKind,

    /// URL первой страницы API (для CSV не заполняется)
    pub endpoint_url: Option<String>,

    /// Ключ API, передается как Bearer-токен
    pub api_key: Option<String>,

    /// Дополнительные заголовки запроса
    #[serde(default)]
    pub extra_headers: BTreeMap<String, String>,
}

impl SupplierConnection {
    /// Создать новое подключение для вставки в БД
    pub fn new_for_insert(
        code: String,
        supplier_name: String,
        source_kind: SourceKind,
        endpoint_url: Option<String>,
        api_key: Option<String>,
        comment: Option<String>,
    ) -> Self {
        let mut base = BaseAggregate::new(
            SupplierConnectionId::new_v4(),
            code,
            supplier_name.clone(),
        );
        base.comment = comment;

        Self {
            base,
            supplier_name,
            source_kind,
            endpoint_url,
            api_key,
            extra_headers: BTreeMap::new(),
        }
    }

    pub fn to_string_id(&self) -> String {
        self.base.id.as_string()
    }

    pub fn connection_key(&self) -> ConnectionKey {
        ConnectionKey::new(
            &self.supplier_name,
            self.source_kind,
            self.endpoint_url.as_deref(),
        )
    }

    /// Обновить данные из DTO
    pub fn update(&mut self, dto: &SupplierConnectionDto) {
        if let Some(code) = dto.code.clone() {
            self.base.code = code;
        }
        self.base.description = dto.supplier_name.clone();
        self.base.comment = dto.comment.clone();
        self.supplier_name = dto.supplier_name.clone();
        self.source_kind = dto.source_kind;
        self.endpoint_url = dto.endpoint_url.clone();
        self.api_key = dto.api_key.clone();
        self.extra_headers = dto.extra_headers.clone();
    }

    pub fn validate(&self) -> Result<(), String> {
        if self.supplier_name.trim().is_empty() {
            return Err("Наименование поставщика не может быть пустым".into());
        }
        if self.base.code.trim().is_empty() {
            return Err("Код не может быть пустым".into());
        }
        if self.source_kind == SourceKind::Api {
            let url = self.endpoint_url.as_deref().map(str::trim).unwrap_or("");
            if url.is_empty() {
                return Err("Для API-подключения нужно указать URL".into());
            }
            if !(url.starts_with("http://") || url.starts_with("https://")) {
                return Err("URL должен начинаться с http:// или https://".into());
            }
        }
        Ok(())
    }

    /// Хук перед записью
    pub fn before_write(&mut self) {
        self.base.touch();
    }
}

impl AggregateRoot for SupplierConnection {
    type Id = SupplierConnectionId;

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
        "a001"
    }

    fn collection_name() -> &'static str {
        "supplier_connection"
    }

    fn element_name() -> &'static str {
        "Подключение поставщика"
    }

    fn origin() -> Origin {
        Origin::Self_
    }
}

// ============================================================================
// Forms / DTOs
// ============================================================================

/// DTO для создания/обновления подключения к поставщику
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct SupplierConnectionDto {
    pub id: Option<String>,
    pub code: Option<String>,
    pub comment: Option<String>,
    pub supplier_name: String,
    #[serde(default)]
    pub source_kind: SourceKind,
    pub endpoint_url: Option<String>,
    pub api_key: Option<String>,
    #[serde(default)]
    pub extra_headers: BTreeMap<String, String>,
}
