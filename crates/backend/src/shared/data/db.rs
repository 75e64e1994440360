use once_cell::sync::OnceCell;
use sea_orm::{ConnectionTrait, Database, DatabaseBackend, DatabaseConnection, Statement};

static DB_CONN: OnceCell<DatabaseConnection> = OnceCell::new();

/// Минимальная схема: таблица создается, если ее еще нет
const TABLES: &[(&str, &str)] = &[
    (
        "a001_supplier_connection",
        r#"
        CREATE TABLE a001_supplier_connection (
            id TEXT PRIMARY KEY NOT NULL,
            code TEXT NOT NULL DEFAULT '',
            description TEXT NOT NULL,
            comment TEXT,
            supplier_name TEXT NOT NULL,
            source_kind TEXT NOT NULL DEFAULT 'csv',
            endpoint_url TEXT,
            api_key TEXT,
            extra_headers TEXT NOT NULL DEFAULT '{}',
            is_deleted INTEGER NOT NULL DEFAULT 0,
            created_at TEXT,
            updated_at TEXT,
            version INTEGER NOT NULL DEFAULT 0
        );
        "#,
    ),
    (
        "a002_catalog_entry",
        r#"
        CREATE TABLE a002_catalog_entry (
            id TEXT PRIMARY KEY NOT NULL,
            code TEXT NOT NULL DEFAULT '',
            description TEXT NOT NULL,
            comment TEXT,
            shop TEXT NOT NULL,
            sku TEXT,
            vendor TEXT,
            price REAL,
            compare_at_price REAL,
            inventory_qty INTEGER,
            remote_product_id TEXT,
            remote_variant_id TEXT,
            remote_inventory_item_id TEXT,
            last_session_id TEXT,
            is_deleted INTEGER NOT NULL DEFAULT 0,
            created_at TEXT,
            updated_at TEXT,
            version INTEGER NOT NULL DEFAULT 0
        );
        CREATE INDEX IF NOT EXISTS idx_a002_shop_sku ON a002_catalog_entry (shop, sku);
        CREATE INDEX IF NOT EXISTS idx_a002_shop_title ON a002_catalog_entry (shop, description);
        "#,
    ),
    (
        "u501_import_session",
        r#"
        CREATE TABLE u501_import_session (
            id TEXT PRIMARY KEY NOT NULL,
            shop TEXT NOT NULL,
            status TEXT NOT NULL DEFAULT 'pending',
            total_count INTEGER NOT NULL DEFAULT 0,
            imported_count INTEGER NOT NULL DEFAULT 0,
            failed_count INTEGER NOT NULL DEFAULT 0,
            current_label TEXT,
            last_error TEXT,
            started_at TEXT NOT NULL,
            updated_at TEXT NOT NULL,
            completed_at TEXT
        );
        "#,
    ),
];

pub async fn initialize_database() -> anyhow::Result<()> {
    let config = crate::shared::config::get_config();
    let db_path = crate::shared::config::get_database_path(config)?;
    let conn = open_database(&db_path.to_string_lossy()).await?;
    ensure_schema(&conn).await?;

    DB_CONN
        .set(conn)
        .map_err(|_| anyhow::anyhow!("Failed to set DB_CONN"))?;
    Ok(())
}

async fn open_database(db_file: &str) -> anyhow::Result<DatabaseConnection> {
    if let Some(parent) = std::path::Path::new(db_file).parent() {
        std::fs::create_dir_all(parent)?;
    }
    let absolute_path = if std::path::Path::new(db_file).is_absolute() {
        std::path::PathBuf::from(db_file)
    } else {
        std::env::current_dir()?.join(db_file)
    };
    // Normalize path separators and ensure proper URL form on Windows
    let normalized = absolute_path.to_string_lossy().replace('\\', "/");
    let needs_leading_slash = !normalized.starts_with('/') && normalized.contains(':');
    let prefix = if needs_leading_slash { "/" } else { "" };
    let db_url = format!("sqlite://{}{}?mode=rwc", prefix, normalized);
    tracing::info!("Opening database: {}", db_url);
    Ok(Database::connect(&db_url).await?)
}

/// Создать недостающие таблицы
pub async fn ensure_schema(conn: &DatabaseConnection) -> anyhow::Result<()> {
    for (table_name, create_sql) in TABLES {
        let check_sql = format!(
            "SELECT name FROM sqlite_master WHERE type='table' AND name='{}';",
            table_name
        );
        let existing = conn
            .query_all(Statement::from_string(DatabaseBackend::Sqlite, check_sql))
            .await?;
        if !existing.is_empty() {
            continue;
        }

        tracing::info!("Creating {} table", table_name);
        for statement in create_sql.split(';').map(str::trim).filter(|s| !s.is_empty()) {
            conn.execute(Statement::from_string(
                DatabaseBackend::Sqlite,
                statement.to_string(),
            ))
            .await?;
        }
    }
    Ok(())
}

pub fn get_connection() -> &'static DatabaseConnection {
    DB_CONN
        .get()
        .expect("Database connection has not been initialized")
}

/// Подключение к чистой базе в памяти (для тестов репозиториев)
#[cfg(test)]
pub async fn in_memory_connection() -> anyhow::Result<DatabaseConnection> {
    let conn = Database::connect("sqlite::memory:").await?;
    ensure_schema(&conn).await?;
    Ok(conn)
}
