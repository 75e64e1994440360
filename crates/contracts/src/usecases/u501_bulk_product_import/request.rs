use super::mapping::{AttributeFilter, FieldMapping};
use super::markup::MarkupConfig;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Доступ к API поставщика
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ApiCredentials {
    /// URL первой страницы
    pub url: String,
    /// Передается как `Authorization: Bearer ...`
    pub api_key: Option<String>,
    #[serde(default)]
    pub headers: BTreeMap<String, String>,
}

/// Источник записей
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum DataSource {
    /// Содержимое CSV-файла
    Csv { csv_payload: String },
    /// API поставщика
    Api { credentials: ApiCredentials },
    /// Сохраненное подключение (a001). Для CSV-подключения содержимое
    /// файла передается в `csv_payload`.
    Connection {
        connection_id: String,
        #[serde(default)]
        csv_payload: Option<String>,
    },
}

/// Что делать с созданными товарами на платформе
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PublishMode {
    /// Создать активными и опубликовать во всех каналах продаж
    #[default]
    Publish,
    /// Создать черновиками без публикации
    Draft,
}

/// Запрос на запуск импорта
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ImportRequest {
    /// Магазин (домен платформы)
    pub shop: String,
    pub data_source: DataSource,
    pub field_mapping: FieldMapping,
    #[serde(default)]
    pub attribute_filter: AttributeFilter,
    #[serde(default)]
    pub markup_config: MarkupConfig,
    #[serde(default)]
    pub publish_mode: PublishMode,
}

/// Запрос предварительного просмотра выборки (без записи)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PreviewRequest {
    pub data_source: DataSource,
    #[serde(default)]
    pub field_mapping: FieldMapping,
    #[serde(default)]
    pub attribute_filter: AttributeFilter,
    /// Атрибуты, для которых вернуть список значений
    #[serde(default)]
    pub attribute_keys: Vec<String>,
}
