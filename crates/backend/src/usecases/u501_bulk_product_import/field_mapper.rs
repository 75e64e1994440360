use super::source_adapter::SourceRecord;
use contracts::usecases::u501_bulk_product_import::{
    FieldMapping, ReconciliationRecord, TargetField, VariantData,
};
use std::collections::BTreeMap;

/// Запись после отображения: канонический атрибут → исходное значение
pub type MappedRecord = BTreeMap<TargetField, String>;

/// Скопировать значения источника в канонические атрибуты.
/// Отсутствующий в записи ключ оставляет атрибут пустым.
pub fn apply_mapping(source: &SourceRecord, mapping: &FieldMapping) -> MappedRecord {
    mapping
        .entries()
        .iter()
        .filter_map(|entry| {
            source
                .get(&entry.source_key)
                .map(|value| (entry.target, value.to_string()))
        })
        .collect()
}

/// Обратное отображение: восстановить значения источника
pub fn invert(mapped: &MappedRecord, mapping: &FieldMapping) -> SourceRecord {
    mapping
        .entries()
        .iter()
        .filter_map(|entry| {
            mapped
                .get(&entry.target)
                .map(|value| (entry.source_key.clone(), value.clone()))
        })
        .collect()
}

/// Разбор числа без строгого формата: "$1,299.50" → 1299.50, "12,5" → 12.5
pub fn parse_number(raw: &str) -> Option<f64> {
    let cleaned: String = raw
        .chars()
        .filter(|c| c.is_ascii_digit() || matches!(c, '.' | ',' | '-'))
        .collect();
    if !cleaned.chars().any(|c| c.is_ascii_digit()) {
        return None;
    }

    let normalized = if cleaned.contains('.') {
        cleaned.replace(',', "")
    } else if cleaned.matches(',').count() == 1 {
        let decimals = cleaned.rsplit(',').next().map(str::len).unwrap_or(0);
        if decimals == 3 {
            cleaned.replace(',', "")
        } else {
            cleaned.replace(',', ".")
        }
    } else {
        cleaned.replace(',', "")
    };

    normalized.parse::<f64>().ok().filter(|v| v.is_finite())
}

fn parse_quantity(raw: &str) -> Option<i64> {
    parse_number(raw).map(|v| v.trunc() as i64)
}

/// Теги из строки через запятую, без пустых и повторов
pub fn split_tags(raw: &str) -> Vec<String> {
    let mut tags: Vec<String> = Vec::new();
    for tag in raw.split(',').map(str::trim).filter(|t| !t.is_empty()) {
        if !tags.iter().any(|t| t == tag) {
            tags.push(tag.to_string());
        }
    }
    tags
}

fn non_empty(value: Option<&String>) -> Option<String> {
    value
        .map(|v| v.trim())
        .filter(|v| !v.is_empty())
        .map(str::to_string)
}

/// Нормализовать запись источника в каноническую запись.
///
/// `attributes` хранит все поля источника и исходные значения атрибутов
/// (под их каноническими именами), чтобы условия наценки и фильтры
/// могли обращаться к любому из них.
pub fn to_reconciliation_record(source: &SourceRecord, mapping: &FieldMapping) -> ReconciliationRecord {
    let mapped = apply_mapping(source, mapping);

    let mut attributes = source.0.clone();
    for (target, value) in &mapped {
        attributes.insert(target.as_str().to_string(), value.clone());
    }

    let description = non_empty(mapped.get(&TargetField::Description))
        .map(|html| ammonia::clean(&html))
        .filter(|html| !html.trim().is_empty());

    ReconciliationRecord {
        title: non_empty(mapped.get(&TargetField::Title)).unwrap_or_default(),
        description,
        vendor: non_empty(mapped.get(&TargetField::Vendor)),
        product_type: non_empty(mapped.get(&TargetField::ProductType)),
        tags: mapped
            .get(&TargetField::Tags)
            .map(|t| split_tags(t))
            .unwrap_or_default(),
        variant: VariantData {
            price: mapped.get(&TargetField::Price).and_then(|v| parse_number(v)),
            compare_at_price: mapped
                .get(&TargetField::CompareAtPrice)
                .and_then(|v| parse_number(v)),
            sku: non_empty(mapped.get(&TargetField::Sku)),
            barcode: non_empty(mapped.get(&TargetField::Barcode)),
            inventory_qty: mapped
                .get(&TargetField::InventoryQty)
                .and_then(|v| parse_quantity(v)),
            image_url: non_empty(mapped.get(&TargetField::ImageUrl)),
        },
        markup: None,
        attributes,
    }
}
