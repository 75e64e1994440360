use serde::{Deserialize, Serialize};

/// Оператор условия наценки
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MarkupOperator {
    Eq,
    Neq,
    Starts,
    Ends,
    Contains,
    Ncontains,
    Gt,
    Lt,
    /// Диапазон вида "min-max", max = 0 означает "без верхней границы"
    Between,
}

/// Способ применения наценки
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MarkupType {
    /// price * (1 + amount / 100)
    Percent,
    /// price + amount
    Fixed,
}

impl MarkupType {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Percent => "percent",
            Self::Fixed => "fixed",
        }
    }
}

/// Режим сопоставления условий
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum MatchMode {
    /// Все условия должны выполняться
    #[default]
    #[serde(rename = "ALL", alias = "all")]
    All,
    /// Достаточно одного условия
    #[serde(rename = "ANY", alias = "any")]
    Any,
}

/// Условие наценки
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MarkupCondition {
    /// Атрибут записи: "price", "tags", "vendor" или любой ключ источника
    pub field: String,
    pub operator: MarkupOperator,
    /// Значение для сравнения (для between: "100-200")
    pub value: String,
    pub markup_type: MarkupType,
    pub markup_amount: f64,
}

/// Набор условий наценки
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct MarkupConfig {
    #[serde(default)]
    pub conditions: Vec<MarkupCondition>,
    #[serde(default)]
    pub match_mode: MatchMode,
}

impl MarkupConfig {
    pub fn is_empty(&self) -> bool {
        self.conditions.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_markup_config_deserializes() {
        let json = r#"{
            "conditions": [
                {"field": "price", "operator": "between", "value": "100-200", "markup_type": "percent", "markup_amount": 10}
            ],
            "match_mode": "ANY"
        }"#;
        let config: MarkupConfig = serde_json::from_str(json).unwrap();
        assert_eq!(config.match_mode, MatchMode::Any);
        assert_eq!(config.conditions[0].operator, MarkupOperator::Between);
        assert_eq!(config.conditions[0].markup_amount, 10.0);
    }

    #[test]
    fn test_markup_config_defaults() {
        let config: MarkupConfig = serde_json::from_str("{}").unwrap();
        assert!(config.is_empty());
        assert_eq!(config.match_mode, MatchMode::All);
    }
}
