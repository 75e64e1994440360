use super::markup::MarkupType;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Данные варианта товара
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct VariantData {
    pub price: Option<f64>,
    pub compare_at_price: Option<f64>,
    pub sku: Option<String>,
    pub barcode: Option<String>,
    pub inventory_qty: Option<i64>,
    pub image_url: Option<String>,
}

/// Отметка о примененной наценке (для аудита)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MarkupAudit {
    pub markup_applied: bool,
    pub markup_type: MarkupType,
    pub markup_value: f64,
}

/// Каноническая запись товара, единая для CSV и API источников
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ReconciliationRecord {
    pub title: String,
    pub description: Option<String>,
    pub vendor: Option<String>,
    pub product_type: Option<String>,
    #[serde(default)]
    pub tags: Vec<String>,
    pub variant: VariantData,
    pub markup: Option<MarkupAudit>,
    /// Исходные значения: отображенные атрибуты и поля источника
    #[serde(default)]
    pub attributes: BTreeMap<String, String>,
}

impl ReconciliationRecord {
    /// SKU без пробелов по краям, если он не пустой
    pub fn sku(&self) -> Option<&str> {
        self.variant
            .sku
            .as_deref()
            .map(str::trim)
            .filter(|s| !s.is_empty())
    }

    pub fn trimmed_title(&self) -> Option<&str> {
        Some(self.title.trim()).filter(|t| !t.is_empty())
    }

    /// Ключ идентичности: SKU, а при его отсутствии название
    pub fn identity_key(&self) -> Option<&str> {
        self.sku().or_else(|| self.trimmed_title())
    }

    /// Подпись для прогресса
    pub fn display_label(&self) -> String {
        match (self.trimmed_title(), self.sku()) {
            (Some(title), _) => title.to_string(),
            (None, Some(sku)) => sku.to_string(),
            (None, None) => "(без названия)".to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_identity_key_prefers_sku() {
        let mut record = ReconciliationRecord {
            title: "Desk Lamp".into(),
            ..Default::default()
        };
        assert_eq!(record.identity_key(), Some("Desk Lamp"));

        record.variant.sku = Some(" LMP-1 ".into());
        assert_eq!(record.identity_key(), Some("LMP-1"));

        record.variant.sku = Some("   ".into());
        assert_eq!(record.identity_key(), Some("Desk Lamp"));
    }

    #[test]
    fn test_identity_key_empty_record() {
        let record = ReconciliationRecord::default();
        assert_eq!(record.identity_key(), None);
        assert_eq!(record.display_label(), "(без названия)");
    }
}
