//! Отбор записей по выбранным значениям атрибутов.
//!
//! Два режима: строгий (все атрибуты одновременно, для счетчиков
//! предпросмотра) и по токенам (любой токен любого атрибута, для
//! итогового набора импорта).

use super::field_mapper::parse_number;
use contracts::usecases::u501_bulk_product_import::{
    AttributeFilter, AttributeValueCount, ReconciliationRecord,
};
use std::collections::{BTreeMap, BTreeSet, HashMap};

const PRICE_TOLERANCE: f64 = 0.01;

fn is_price_key(key: &str) -> bool {
    key.to_lowercase().contains("price")
}

fn value_matches(key: &str, value: &str, allowed: &str) -> bool {
    let value = value.trim();
    let allowed = allowed.trim();
    if is_price_key(key) {
        if let (Some(a), Some(b)) = (parse_number(value), parse_number(allowed)) {
            return (a - b).abs() <= PRICE_TOLERANCE + 1e-9;
        }
    }
    value == allowed
}

/// Атрибуты фильтра, по которым действительно выбраны значения
fn active_filters(filter: &AttributeFilter) -> impl Iterator<Item = (&String, &BTreeSet<String>)> {
    filter.iter().filter(|(_, allowed)| !allowed.is_empty())
}

fn matches_strict(record: &ReconciliationRecord, filter: &AttributeFilter) -> bool {
    active_filters(filter).all(|(key, allowed)| {
        record
            .attributes
            .get(key)
            .map(|value| allowed.iter().any(|a| value_matches(key, value, a)))
            .unwrap_or(false)
    })
}

fn matches_any_token(record: &ReconciliationRecord, filter: &AttributeFilter) -> bool {
    let mut active = active_filters(filter).peekable();
    if active.peek().is_none() {
        return true;
    }
    active.any(|(key, allowed)| {
        record.attributes.get(key).is_some_and(|value| {
            value
                .split(',')
                .map(str::trim)
                .filter(|token| !token.is_empty())
                .any(|token| allowed.iter().any(|a| value_matches(key, token, a)))
        })
    })
}

/// Строгий отбор: запись проходит, если по каждому атрибуту фильтра
/// ее значение входит в выбранные
pub fn select_strict<'a>(
    records: &'a [ReconciliationRecord],
    filter: &AttributeFilter,
) -> Vec<&'a ReconciliationRecord> {
    records.iter().filter(|r| matches_strict(r, filter)).collect()
}

/// Отбор по токенам: значение атрибута делится по запятым, запись проходит,
/// если хотя бы один токен хотя бы одного атрибута входит в выбранные
pub fn select_any_token(
    records: Vec<ReconciliationRecord>,
    filter: &AttributeFilter,
) -> Vec<ReconciliationRecord> {
    records
        .into_iter()
        .filter(|r| matches_any_token(r, filter))
        .collect()
}

/// Значения атрибутов с количеством записей (по убыванию количества)
pub fn distinct_values(
    records: &[ReconciliationRecord],
    keys: &[String],
) -> BTreeMap<String, Vec<AttributeValueCount>> {
    keys.iter()
        .map(|key| {
            let mut counts: HashMap<&str, usize> = HashMap::new();
            for value in records.iter().filter_map(|r| r.attributes.get(key)) {
                let value = value.trim();
                if !value.is_empty() {
                    *counts.entry(value).or_default() += 1;
                }
            }
            let mut values: Vec<AttributeValueCount> = counts
                .into_iter()
                .map(|(value, count)| AttributeValueCount {
                    value: value.to_string(),
                    count,
                })
                .collect();
            values.sort_by(|a, b| b.count.cmp(&a.count).then_with(|| a.value.cmp(&b.value)));
            (key.clone(), values)
        })
        .collect()
}
