use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Ответ на запрос импорта
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ImportResponse {
    /// Уникальный ID сессии импорта
    pub session_id: String,
    pub status: ImportStartStatus,
    pub message: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ImportStartStatus {
    Started,
    Failed,
}

/// Значение атрибута и число записей с ним
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AttributeValueCount {
    pub value: String,
    pub count: usize,
}

/// Результат предварительного просмотра
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PreviewResponse {
    /// Записей в источнике (после отброса пустых строк)
    pub total: usize,
    /// Записей, прошедших фильтр (все атрибуты одновременно)
    pub matched: usize,
    /// Пустых строк CSV
    pub skipped: usize,
    /// Заголовки CSV или ключи первой записи API
    pub headers: Vec<String>,
    pub attribute_values: BTreeMap<String, Vec<AttributeValueCount>>,
}
