//! Правила наценки.
//!
//! Условия проверяются один раз на запись; итог по режиму ALL/ANY решает,
//! применять ли наценку, а порядок специфичности выбирает, какое именно
//! условие применить. Ошибок здесь нет: неподходящие данные просто
//! оставляют запись без изменений.

use super::field_mapper::parse_number;
use contracts::usecases::u501_bulk_product_import::{
    MarkupAudit, MarkupCondition, MarkupConfig, MarkupOperator, MarkupType, MatchMode,
    ReconciliationRecord, TargetField,
};

/// Диапазон условия between. `max == 0` означает "без верхней границы".
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PriceRange {
    pub min: f64,
    pub max: f64,
}

impl PriceRange {
    /// Разбор "min-max"; пустой max равнозначен 0
    pub fn parse(raw: &str) -> Option<Self> {
        let raw = raw.trim();
        // Знак минуса у min не считается разделителем
        let split_at = raw
            .char_indices()
            .skip(1)
            .find(|(_, c)| *c == '-')
            .map(|(i, _)| i)?;
        let (min, max) = (&raw[..split_at], &raw[split_at + 1..]);
        let min = parse_number(min)?;
        let max = if max.trim().is_empty() {
            0.0
        } else {
            parse_number(max)?
        };
        Some(Self { min, max })
    }

    pub fn is_unbounded(&self) -> bool {
        self.max == 0.0
    }

    pub fn contains(&self, value: f64) -> bool {
        value >= self.min && (self.is_unbounded() || value <= self.max)
    }

    pub fn width(&self) -> f64 {
        if self.is_unbounded() {
            f64::INFINITY
        } else {
            self.max - self.min
        }
    }
}

pub fn round_price(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

/// Цена записи: цена варианта, иначе значение атрибута price
fn record_price(record: &ReconciliationRecord) -> Option<f64> {
    record.variant.price.or_else(|| {
        record
            .attributes
            .get(TargetField::Price.as_str())
            .and_then(|raw| parse_number(raw))
    })
}

/// Текстовое значение поля условия
fn field_text(record: &ReconciliationRecord, field: &str) -> Option<String> {
    let from_record = match TargetField::from_name(field) {
        Some(TargetField::Title) => record.trimmed_title().map(str::to_string),
        Some(TargetField::Description) => record.description.clone(),
        Some(TargetField::Vendor) => record.vendor.clone(),
        Some(TargetField::ProductType) => record.product_type.clone(),
        Some(TargetField::Sku) => record.sku().map(str::to_string),
        Some(TargetField::Barcode) => record.variant.barcode.clone(),
        Some(TargetField::ImageUrl) => record.variant.image_url.clone(),
        Some(TargetField::CompareAtPrice) => record.variant.compare_at_price.map(|p| p.to_string()),
        Some(TargetField::InventoryQty) => record.variant.inventory_qty.map(|q| q.to_string()),
        Some(TargetField::Price) => record_price(record).map(|p| p.to_string()),
        Some(TargetField::Tags) | None => None,
    };
    from_record.or_else(|| {
        record.attributes.get(field).cloned().or_else(|| {
            record
                .attributes
                .iter()
                .find(|(key, _)| key.eq_ignore_ascii_case(field))
                .map(|(_, value)| value.clone())
        })
    })
}

fn field_number(record: &ReconciliationRecord, field: &str) -> Option<f64> {
    if TargetField::from_name(field) == Some(TargetField::Price) {
        return record_price(record);
    }
    field_text(record, field).and_then(|text| parse_number(&text))
}

fn text_matches(operator: MarkupOperator, actual: &str, expected: &str) -> bool {
    let actual = actual.trim().to_lowercase();
    let expected = expected.trim().to_lowercase();
    match operator {
        MarkupOperator::Eq => actual == expected,
        MarkupOperator::Neq => actual != expected,
        MarkupOperator::Starts => actual.starts_with(&expected),
        MarkupOperator::Ends => actual.ends_with(&expected),
        MarkupOperator::Contains => actual.contains(&expected),
        MarkupOperator::Ncontains => !actual.contains(&expected),
        MarkupOperator::Gt | MarkupOperator::Lt | MarkupOperator::Between => false,
    }
}

fn tags_match(operator: MarkupOperator, tags: &[String], expected: &str) -> bool {
    match operator {
        // Отрицательные операторы: ни один тег не подходит
        MarkupOperator::Neq => !tags.iter().any(|t| text_matches(MarkupOperator::Eq, t, expected)),
        MarkupOperator::Ncontains => {
            !tags.iter().any(|t| text_matches(MarkupOperator::Contains, t, expected))
        }
        MarkupOperator::Gt | MarkupOperator::Lt | MarkupOperator::Between => false,
        positive => tags.iter().any(|t| text_matches(positive, t, expected)),
    }
}

/// Проверить одно условие для записи
pub fn check_condition(record: &ReconciliationRecord, condition: &MarkupCondition) -> bool {
    let field = condition.field.trim();
    match condition.operator {
        MarkupOperator::Gt | MarkupOperator::Lt => {
            match (field_number(record, field), parse_number(&condition.value)) {
                (Some(actual), Some(expected)) if condition.operator == MarkupOperator::Gt => {
                    actual > expected
                }
                (Some(actual), Some(expected)) => actual < expected,
                _ => false,
            }
        }
        MarkupOperator::Between => {
            match (field_number(record, field), PriceRange::parse(&condition.value)) {
                (Some(actual), Some(range)) => range.contains(actual),
                _ => false,
            }
        }
        operator if TargetField::from_name(field) == Some(TargetField::Tags) => {
            tags_match(operator, &record.tags, &condition.value)
        }
        operator => {
            let actual = field_text(record, field).unwrap_or_default();
            text_matches(operator, &actual, &condition.value)
        }
    }
}

/// Индексы условий в порядке специфичности: сначала between по возрастанию
/// ширины диапазона, затем остальные в исходном порядке
pub fn specificity_order(conditions: &[MarkupCondition]) -> Vec<usize> {
    let width = |c: &MarkupCondition| {
        PriceRange::parse(&c.value)
            .map(|r| r.width())
            .unwrap_or(f64::INFINITY)
    };
    let mut between: Vec<usize> = (0..conditions.len())
        .filter(|i| conditions[*i].operator == MarkupOperator::Between)
        .collect();
    between.sort_by(|a, b| width(&conditions[*a]).total_cmp(&width(&conditions[*b])));

    let others = (0..conditions.len()).filter(|i| conditions[*i].operator != MarkupOperator::Between);
    between.into_iter().chain(others).collect()
}

fn markup_price(price: f64, condition: &MarkupCondition) -> f64 {
    let raised = match condition.markup_type {
        MarkupType::Percent => price * (1.0 + condition.markup_amount / 100.0),
        MarkupType::Fixed => price + condition.markup_amount,
    };
    round_price(raised)
}

/// Применить наценку к записи. Возвращает примененное условие.
pub fn apply_markup<'a>(
    record: &mut ReconciliationRecord,
    config: &'a MarkupConfig,
) -> Option<&'a MarkupCondition> {
    if config.is_empty() {
        return None;
    }

    let results: Vec<bool> = config
        .conditions
        .iter()
        .map(|c| check_condition(record, c))
        .collect();
    let gate = match config.match_mode {
        MatchMode::All => results.iter().all(|r| *r),
        MatchMode::Any => results.iter().any(|r| *r),
    };
    if !gate {
        return None;
    }

    let Some(chosen) = specificity_order(&config.conditions)
        .into_iter()
        .find(|i| results[*i])
        .map(|i| &config.conditions[i])
    else {
        tracing::debug!("Markup gate passed but no condition applies to '{}'", record.display_label());
        return None;
    };

    let Some(price) = record_price(record) else {
        tracing::debug!("Markup skipped for '{}': no price", record.display_label());
        return None;
    };

    let new_price = markup_price(price, chosen);
    record.variant.price = Some(new_price);
    record.variant.compare_at_price = Some(new_price);
    record.markup = Some(MarkupAudit {
        markup_applied: true,
        markup_type: chosen.markup_type,
        markup_value: chosen.markup_amount,
    });
    tracing::debug!(
        "Markup {} {} applied to '{}': {} -> {}",
        chosen.markup_type.as_str(),
        chosen.markup_amount,
        record.display_label(),
        price,
        new_price
    );
    Some(chosen)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn condition(
        field: &str,
        operator: MarkupOperator,
        value: &str,
        markup_type: MarkupType,
        amount: f64,
    ) -> MarkupCondition {
        MarkupCondition {
            field: field.into(),
            operator,
            value: value.into(),
            markup_type,
            markup_amount: amount,
        }
    }

    fn priced(price: f64) -> ReconciliationRecord {
        let mut record = ReconciliationRecord {
            title: "Lamp".into(),
            vendor: Some("Acme".into()),
            tags: vec!["Garden".into(), "Outdoor".into()],
            ..Default::default()
        };
        record.variant.price = Some(price);
        record
    }

    #[test]
    fn test_price_range_parse() {
        assert_eq!(PriceRange::parse("100-200"), Some(PriceRange { min: 100.0, max: 200.0 }));
        assert_eq!(PriceRange::parse("50-0"), Some(PriceRange { min: 50.0, max: 0.0 }));
        assert_eq!(PriceRange::parse("50-"), Some(PriceRange { min: 50.0, max: 0.0 }));
        assert_eq!(PriceRange::parse("cheap"), None);
        assert!(PriceRange::parse("50-0").unwrap().contains(1_000_000.0));
        assert!(!PriceRange::parse("100-200").unwrap().contains(200.01));
    }

    #[test]
    fn test_narrowest_between_wins() {
        let config = MarkupConfig {
            conditions: vec![
                condition("price", MarkupOperator::Between, "50-300", MarkupType::Percent, 5.0),
                condition("price", MarkupOperator::Between, "100-200", MarkupType::Percent, 10.0),
            ],
            match_mode: MatchMode::All,
        };
        let mut record = priced(150.0);
        let applied = apply_markup(&mut record, &config).unwrap();
        assert_eq!(applied.value, "100-200");
        assert_eq!(record.variant.price, Some(165.0));
        assert_eq!(record.variant.compare_at_price, Some(165.0));
    }

    #[test]
    fn test_any_mode_single_match() {
        let config = MarkupConfig {
            conditions: vec![
                condition("vendor", MarkupOperator::Eq, "Other", MarkupType::Fixed, 100.0),
                condition("title", MarkupOperator::Contains, "LAMP", MarkupType::Fixed, 2.5),
            ],
            match_mode: MatchMode::Any,
        };
        let mut record = priced(10.0);
        apply_markup(&mut record, &config);
        assert_eq!(record.variant.price, Some(12.5));
        let audit = record.markup.unwrap();
        assert!(audit.markup_applied);
        assert_eq!(audit.markup_type, MarkupType::Fixed);
        assert_eq!(audit.markup_value, 2.5);
    }

    #[test]
    fn test_all_mode_requires_every_condition() {
        let config = MarkupConfig {
            conditions: vec![
                condition("vendor", MarkupOperator::Eq, "acme", MarkupType::Fixed, 5.0),
                condition("price", MarkupOperator::Gt, "100", MarkupType::Fixed, 5.0),
            ],
            match_mode: MatchMode::All,
        };
        let mut record = priced(20.0);
        assert!(apply_markup(&mut record, &config).is_none());
        assert_eq!(record.variant.price, Some(20.0));
        assert!(record.markup.is_none());
    }

    #[test]
    fn test_tags_use_membership() {
        let record = priced(10.0);
        let check = |op, value: &str| {
            check_condition(&record, &condition("tags", op, value, MarkupType::Fixed, 1.0))
        };
        assert!(check(MarkupOperator::Eq, "garden"));
        assert!(!check(MarkupOperator::Eq, "gard"));
        assert!(check(MarkupOperator::Starts, "out"));
        assert!(check(MarkupOperator::Ends, "DEN"));
        assert!(!check(MarkupOperator::Neq, "outdoor"));
        assert!(check(MarkupOperator::Ncontains, "kitchen"));
        assert!(!check(MarkupOperator::Gt, "1"));
    }

    #[test]
    fn test_unparseable_numbers_do_not_match() {
        let mut record = priced(10.0);
        record.attributes.insert("weight".into(), "heavy".into());
        assert!(!check_condition(
            &record,
            &condition("weight", MarkupOperator::Gt, "1", MarkupType::Fixed, 1.0)
        ));
        assert!(!check_condition(
            &record,
            &condition("price", MarkupOperator::Lt, "abc", MarkupType::Fixed, 1.0)
        ));
    }

    #[test]
    fn test_price_falls_back_to_mapped_attribute() {
        let mut record = ReconciliationRecord::default();
        record.attributes.insert("price".into(), "$40".into());
        let config = MarkupConfig {
            conditions: vec![condition("price", MarkupOperator::Gt, "30", MarkupType::Percent, 50.0)],
            match_mode: MatchMode::All,
        };
        apply_markup(&mut record, &config);
        assert_eq!(record.variant.price, Some(60.0));
    }

    #[test]
    fn test_missing_price_leaves_record_unchanged() {
        let mut record = ReconciliationRecord {
            vendor: Some("Acme".into()),
            ..Default::default()
        };
        let config = MarkupConfig {
            conditions: vec![condition("vendor", MarkupOperator::Eq, "Acme", MarkupType::Fixed, 5.0)],
            match_mode: MatchMode::All,
        };
        assert!(apply_markup(&mut record, &config).is_none());
        assert_eq!(record.variant.price, None);
        assert!(record.markup.is_none());
    }

    #[test]
    fn test_specificity_order() {
        let conditions = vec![
            condition("vendor", MarkupOperator::Eq, "Acme", MarkupType::Fixed, 1.0),
            condition("price", MarkupOperator::Between, "10-0", MarkupType::Fixed, 1.0),
            condition("price", MarkupOperator::Between, "10-20", MarkupType::Fixed, 1.0),
            condition("price", MarkupOperator::Gt, "5", MarkupType::Fixed, 1.0),
        ];
        assert_eq!(specificity_order(&conditions), vec![2, 1, 0, 3]);
    }
}
