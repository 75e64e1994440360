use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};

/// Канонические атрибуты товара, в которые отображаются поля источника
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum TargetField {
    #[serde(rename = "title")]
    Title,
    #[serde(rename = "description")]
    Description,
    #[serde(rename = "vendor")]
    Vendor,
    #[serde(rename = "type")]
    ProductType,
    #[serde(rename = "tags")]
    Tags,
    #[serde(rename = "price")]
    Price,
    #[serde(rename = "compareAtPrice")]
    CompareAtPrice,
    #[serde(rename = "sku")]
    Sku,
    #[serde(rename = "barcode")]
    Barcode,
    #[serde(rename = "inventoryQty")]
    InventoryQty,
    #[serde(rename = "imageUrl")]
    ImageUrl,
}

impl TargetField {
    pub const ALL: [TargetField; 11] = [
        TargetField::Title,
        TargetField::Description,
        TargetField::Vendor,
        TargetField::ProductType,
        TargetField::Tags,
        TargetField::Price,
        TargetField::CompareAtPrice,
        TargetField::Sku,
        TargetField::Barcode,
        TargetField::InventoryQty,
        TargetField::ImageUrl,
    ];

    /// Атрибуты, без которых импорт не запускается
    pub const REQUIRED: [TargetField; 3] =
        [TargetField::Title, TargetField::Price, TargetField::Sku];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Title => "title",
            Self::Description => "description",
            Self::Vendor => "vendor",
            Self::ProductType => "type",
            Self::Tags => "tags",
            Self::Price => "price",
            Self::CompareAtPrice => "compareAtPrice",
            Self::Sku => "sku",
            Self::Barcode => "barcode",
            Self::InventoryQty => "inventoryQty",
            Self::ImageUrl => "imageUrl",
        }
    }

    /// Разбор имени атрибута без учета регистра, `_` и `-`
    /// ("compare_at_price" и "compareAtPrice" дают один атрибут)
    pub fn from_name(name: &str) -> Option<Self> {
        let squashed: String = name
            .chars()
            .filter(|c| *c != '_' && *c != '-' && !c.is_whitespace())
            .flat_map(char::to_lowercase)
            .collect();
        Self::ALL
            .into_iter()
            .find(|t| t.as_str().to_lowercase() == squashed)
            .or(match squashed.as_str() {
                "producttype" => Some(Self::ProductType),
                "inventoryquantity" | "quantity" | "qty" => Some(Self::InventoryQty),
                "image" => Some(Self::ImageUrl),
                _ => None,
            })
    }
}

impl std::fmt::Display for TargetField {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Одна пара отображения "ключ источника → канонический атрибут"
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FieldMappingEntry {
    pub source_key: String,
    pub target: TargetField,
}

/// Упорядоченное отображение полей источника
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct FieldMapping(pub Vec<FieldMappingEntry>);

impl FieldMapping {
    pub fn new(entries: Vec<FieldMappingEntry>) -> Self {
        Self(entries)
    }

    pub fn entries(&self) -> &[FieldMappingEntry] {
        &self.0
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Ключ источника для атрибута (последнее совпадение побеждает,
    /// как и при копировании значений)
    pub fn source_for(&self, target: TargetField) -> Option<&str> {
        self.0
            .iter()
            .rev()
            .find(|e| e.target == target)
            .map(|e| e.source_key.as_str())
    }

    /// Обязательные атрибуты, не покрытые отображением
    pub fn missing_required(&self) -> Vec<TargetField> {
        TargetField::REQUIRED
            .into_iter()
            .filter(|t| self.source_for(*t).is_none())
            .collect()
    }
}

/// Фильтр по атрибутам: ключ → множество допустимых исходных значений.
/// Пустое множество или пустой фильтр пропускают все записи.
pub type AttributeFilter = BTreeMap<String, BTreeSet<String>>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_target_field_from_name() {
        assert_eq!(TargetField::from_name("compare_at_price"), Some(TargetField::CompareAtPrice));
        assert_eq!(TargetField::from_name("compareAtPrice"), Some(TargetField::CompareAtPrice));
        assert_eq!(TargetField::from_name("Type"), Some(TargetField::ProductType));
        assert_eq!(TargetField::from_name("qty"), Some(TargetField::InventoryQty));
        assert_eq!(TargetField::from_name("color"), None);
    }

    #[test]
    fn test_missing_required() {
        let mapping = FieldMapping::new(vec![FieldMappingEntry {
            source_key: "Name".into(),
            target: TargetField::Title,
        }]);
        assert_eq!(
            mapping.missing_required(),
            vec![TargetField::Price, TargetField::Sku]
        );
    }

    #[test]
    fn test_mapping_serializes_as_list() {
        let json = r#"[{"source_key":"Cost","target":"price"},{"source_key":"Old","target":"compareAtPrice"}]"#;
        let mapping: FieldMapping = serde_json::from_str(json).unwrap();
        assert_eq!(mapping.source_for(TargetField::Price), Some("Cost"));
        assert_eq!(mapping.source_for(TargetField::CompareAtPrice), Some("Old"));
    }
}
