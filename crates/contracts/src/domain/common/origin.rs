use serde::{Deserialize, Serialize};

/// Источник данных для агрегата
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Origin {
    /// Выгрузка поставщика (CSV или API)
    Supplier,
    /// Собственная система
    #[serde(rename = "self")]
    Self_,
}

impl Origin {
    pub fn as_str(&self) -> &'static str {
        match self {
            Origin::Supplier => "supplier",
            Origin::Self_ => "self",
        }
    }
}

impl std::fmt::Display for Origin {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}
