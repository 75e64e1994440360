use once_cell::sync::OnceCell;
use serde::Deserialize;
use std::path::{Path, PathBuf};

static CONFIG: OnceCell<Config> = OnceCell::new();

#[derive(Debug, Deserialize, Clone)]
pub struct Config {
    pub database: DatabaseConfig,
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub import: ImportConfig,
    /// Доступ к платформе магазина. Без этой секции импорт не запускается,
    /// предпросмотр работает.
    pub commerce: Option<CommerceConfig>,
}

#[derive(Debug, Deserialize, Clone)]
pub struct DatabaseConfig {
    pub path: String,
}

#[derive(Debug, Deserialize, Clone)]
pub struct ServerConfig {
    #[serde(default = "default_port")]
    pub port: u16,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            port: default_port(),
        }
    }
}

#[derive(Debug, Deserialize, Clone)]
pub struct ImportConfig {
    /// Таймаут одного запроса страницы API поставщика
    #[serde(default = "default_page_timeout_secs")]
    pub page_timeout_secs: u64,
    /// Предел числа страниц API за один запуск
    #[serde(default = "default_max_pages")]
    pub max_pages: usize,
    /// Сколько установок остатков отправлять одним запросом
    #[serde(default = "default_inventory_batch_size")]
    pub inventory_batch_size: usize,
}

impl Default for ImportConfig {
    fn default() -> Self {
        Self {
            page_timeout_secs: default_page_timeout_secs(),
            max_pages: default_max_pages(),
            inventory_batch_size: default_inventory_batch_size(),
        }
    }
}

#[derive(Debug, Deserialize, Clone)]
pub struct CommerceConfig {
    /// Домен магазина, например "acme.myshopify.com"
    pub shop_domain: String,
    pub access_token: String,
    #[serde(default = "default_api_version")]
    pub api_version: String,
    /// Склад, на котором выставляются остатки (GID)
    pub location_id: Option<String>,
}

fn default_port() -> u16 {
    3000
}

fn default_page_timeout_secs() -> u64 {
    30
}

fn default_max_pages() -> usize {
    1000
}

fn default_inventory_batch_size() -> usize {
    200
}

fn default_api_version() -> String {
    "2024-07".to_string()
}

/// Default configuration embedded in the binary
const DEFAULT_CONFIG: &str = r#"
[database]
path = "target/db/app.db"

[server]
port = 3000

[import]
page_timeout_secs = 30
max_pages = 1000
inventory_batch_size = 200
"#;

/// Load configuration from config.toml file
///
/// Search order:
/// 1. Next to the executable (for production)
/// 2. Falls back to embedded default config
pub fn load_config() -> anyhow::Result<Config> {
    if let Ok(exe_path) = std::env::current_exe() {
        if let Some(exe_dir) = exe_path.parent() {
            let config_path = exe_dir.join("config.toml");

            if config_path.exists() {
                tracing::info!("Loading config from: {}", config_path.display());
                let contents = std::fs::read_to_string(&config_path)?;
                let config: Config = toml::from_str(&contents)?;
                return Ok(config);
            } else {
                tracing::warn!("config.toml not found at: {}", config_path.display());
            }
        }
    }

    tracing::info!("Using default embedded configuration");
    let config: Config = toml::from_str(DEFAULT_CONFIG)?;
    Ok(config)
}

/// Загрузить конфигурацию и сохранить ее для всего процесса
pub fn initialize() -> anyhow::Result<&'static Config> {
    let config = load_config()?;
    Ok(CONFIG.get_or_init(|| config))
}

/// Текущая конфигурация. До `initialize` (например, в тестах)
/// возвращается встроенная конфигурация по умолчанию.
pub fn get_config() -> &'static Config {
    CONFIG.get_or_init(|| {
        toml::from_str(DEFAULT_CONFIG).unwrap_or_else(|e| {
            tracing::error!("Embedded config is invalid: {}", e);
            Config {
                database: DatabaseConfig {
                    path: "target/db/app.db".to_string(),
                },
                server: ServerConfig::default(),
                import: ImportConfig::default(),
                commerce: None,
            }
        })
    })
}

/// Get the database file path from configuration
/// Resolves relative paths relative to the executable directory
pub fn get_database_path(config: &Config) -> anyhow::Result<PathBuf> {
    let db_path_str = &config.database.path;
    let db_path = Path::new(db_path_str);

    if db_path.is_absolute() {
        return Ok(db_path.to_path_buf());
    }

    if let Ok(exe_path) = std::env::current_exe() {
        if let Some(exe_dir) = exe_path.parent() {
            return Ok(exe_dir.join(db_path));
        }
    }

    Ok(PathBuf::from(db_path_str))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_loads() {
        let config: Config = toml::from_str(DEFAULT_CONFIG).unwrap();
        assert_eq!(config.database.path, "target/db/app.db");
        assert_eq!(config.server.port, 3000);
        assert_eq!(config.import.inventory_batch_size, 200);
        assert!(config.commerce.is_none());
    }

    #[test]
    fn test_sections_are_optional() {
        let config: Config = toml::from_str(
            r#"
            [database]
            path = "db.sqlite"

            [commerce]
            shop_domain = "acme.myshopify.com"
            access_token = "shpat_x"
            "#,
        )
        .unwrap();
        assert_eq!(config.import.max_pages, 1000);
        assert_eq!(config.import.page_timeout_secs, 30);
        let commerce = config.commerce.unwrap();
        assert_eq!(commerce.api_version, "2024-07");
        assert!(commerce.location_id.is_none());
    }
}
