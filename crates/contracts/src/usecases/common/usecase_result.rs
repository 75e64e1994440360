use serde::{Deserialize, Serialize};

/// Результат выполнения UseCase
pub type UseCaseResult<T> = Result<T, UseCaseError>;

/// Коды ошибок UseCase (поле `code` в теле ответа)
pub mod codes {
    pub const VALIDATION: &str = "VALIDATION_ERROR";
    pub const NOT_FOUND: &str = "NOT_FOUND";
    /// Для магазина уже идет импорт
    pub const CONFLICT: &str = "CONFLICT";
    /// Платформа магазина не настроена
    pub const NOT_CONFIGURED: &str = "NOT_CONFIGURED";
    /// Поставщик или платформа вернули ошибку
    pub const EXTERNAL: &str = "EXTERNAL_ERROR";
    pub const INTERNAL: &str = "INTERNAL_ERROR";
}

/// Ошибка UseCase. Сериализуется как тело ответа HTTP при неуспехе.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UseCaseError {
    pub code: String,
    pub message: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub details: Option<String>,
}

impl UseCaseError {
    pub fn new(code: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            code: code.into(),
            message: message.into(),
            details: None,
        }
    }

    pub fn with_details(mut self, details: impl Into<String>) -> Self {
        self.details = Some(details.into());
        self
    }

    pub fn validation(message: impl Into<String>) -> Self {
        Self::new(codes::VALIDATION, message)
    }

    pub fn not_found(message: impl Into<String>) -> Self {
        Self::new(codes::NOT_FOUND, message)
    }

    pub fn conflict(message: impl Into<String>) -> Self {
        Self::new(codes::CONFLICT, message)
    }

    pub fn not_configured(message: impl Into<String>) -> Self {
        Self::new(codes::NOT_CONFIGURED, message)
    }

    pub fn external(message: impl Into<String>) -> Self {
        Self::new(codes::EXTERNAL, message)
    }

    pub fn internal(message: impl Into<String>) -> Self {
        Self::new(codes::INTERNAL, message)
    }

    /// Ошибка вызвана запросом клиента, а не сбоем сервера
    pub fn is_client_error(&self) -> bool {
        matches!(
            self.code.as_str(),
            codes::VALIDATION | codes::NOT_FOUND | codes::CONFLICT
        )
    }
}

impl std::fmt::Display for UseCaseError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match &self.details {
            Some(details) => write!(f, "[{}] {}: {}", self.code, self.message, details),
            None => write!(f, "[{}] {}", self.code, self.message),
        }
    }
}

impl std::error::Error for UseCaseError {}

impl From<anyhow::Error> for UseCaseError {
    fn from(err: anyhow::Error) -> Self {
        UseCaseError::internal(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_display_includes_details() {
        let err = UseCaseError::validation("Не сопоставлены обязательные поля").with_details("price, sku");
        assert_eq!(
            err.to_string(),
            "[VALIDATION_ERROR] Не сопоставлены обязательные поля: price, sku"
        );
        assert!(err.is_client_error());
        assert!(!UseCaseError::not_configured("no [commerce]").is_client_error());
    }

    #[test]
    fn test_details_are_omitted_when_empty() {
        let json = serde_json::to_value(UseCaseError::conflict("busy")).unwrap();
        assert_eq!(json, serde_json::json!({"code": "CONFLICT", "message": "busy"}));
    }
}
