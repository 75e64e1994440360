//! Чтение записей поставщика: CSV-текст или постраничный JSON API.
//!
//! Результат обоих источников один: список плоских записей
//! "ключ → строковое значение".

use async_trait::async_trait;
use contracts::usecases::u501_bulk_product_import::ApiCredentials;
use serde_json::Value;
use std::collections::{BTreeMap, HashSet};
use std::time::Duration;

use crate::shared::format::body_preview;

/// Порядок важен: при равном числе вхождений побеждает более ранний
const CSV_DELIMITERS: [u8; 4] = [b',', b';', b'\t', b'|'];

/// Ключи массива товаров в ответе API, по приоритету
const ITEM_ARRAY_KEYS: [&str; 4] = ["data", "products", "items", "results"];

/// Пути к ссылке на следующую страницу, по приоритету
const NEXT_PAGE_PATHS: [&[&str]; 6] = [
    &["next_page_url"],
    &["nextPageUrl"],
    &["next"],
    &["links", "next"],
    &["meta", "next_page_url"],
    &["pagination", "next_page_url"],
];

#[derive(Debug, thiserror::Error)]
pub enum SourceError {
    #[error("CSV пуст: нет строки заголовков")]
    EmptyCsv,
    #[error("Ошибка разбора CSV: {0}")]
    Csv(#[from] csv::Error),
    #[error("Некорректный URL API '{url}': {message}")]
    InvalidUrl { url: String, message: String },
    #[error("Запрос {url} не выполнен: {message}")]
    Http { url: String, message: String },
    #[error("API вернул статус {status} для {url}: {body}")]
    Status {
        url: String,
        status: u16,
        body: String,
    },
    #[error("Ответ {url} не является JSON: {message}")]
    InvalidJson { url: String, message: String },
}

/// Одна запись источника (после разворачивания вложенных объектов API)
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SourceRecord(pub BTreeMap<String, String>);

impl SourceRecord {
    pub fn get(&self, key: &str) -> Option<&str> {
        self.0.get(key).map(String::as_str)
    }

    pub fn insert(&mut self, key: impl Into<String>, value: impl Into<String>) {
        self.0.insert(key.into(), value.into());
    }

    pub fn keys(&self) -> impl Iterator<Item = &String> {
        self.0.keys()
    }

    pub fn is_blank(&self) -> bool {
        self.0.values().all(|v| v.trim().is_empty())
    }
}

impl<K: Into<String>, V: Into<String>> FromIterator<(K, V)> for SourceRecord {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        Self(
            iter.into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        )
    }
}

/// Прочитанный источник
#[derive(Debug, Clone, Default)]
pub struct SourceBatch {
    pub records: Vec<SourceRecord>,
    /// Заголовки CSV или ключи первой записи API
    pub headers: Vec<String>,
    /// Отброшенные пустые строки CSV
    pub skipped: usize,
}

// ============================================================================
// CSV
// ============================================================================

/// Разделитель с наибольшим числом вхождений в строке заголовков
pub fn detect_delimiter(header_line: &str) -> u8 {
    let mut best = CSV_DELIMITERS[0];
    let mut best_count = 0;
    for delimiter in CSV_DELIMITERS {
        let count = header_line.bytes().filter(|b| *b == delimiter).count();
        if count > best_count {
            best = delimiter;
            best_count = count;
        }
    }
    best
}

fn clean_header(raw: &str) -> String {
    raw.trim().trim_matches('"').trim().to_string()
}

/// Число полностью пустых строк вне кавычек: csv пропускает их молча
fn count_empty_lines(body: &str) -> usize {
    let mut in_quotes = false;
    let mut empty = 0;
    for line in body.lines() {
        if !in_quotes && line.is_empty() {
            empty += 1;
        }
        if line.matches('"').count() % 2 == 1 {
            in_quotes = !in_quotes;
        }
    }
    empty
}

/// Разобрать CSV-текст в записи
pub fn read_csv(payload: &str) -> Result<SourceBatch, SourceError> {
    let payload = payload.strip_prefix('\u{feff}').unwrap_or(payload);

    // Заголовок - первая непустая строка, ведущие пробельные строки отбрасываем
    let mut offset = 0;
    let mut header_line = None;
    for line in payload.split_inclusive('\n') {
        if !line.trim().is_empty() {
            header_line = Some(line);
            break;
        }
        offset += line.len();
    }
    let header_line = header_line.ok_or(SourceError::EmptyCsv)?;
    let payload = &payload[offset..];
    let delimiter = detect_delimiter(header_line);

    let mut reader = csv::ReaderBuilder::new()
        .delimiter(delimiter)
        .has_headers(true)
        .flexible(true)
        .from_reader(payload.as_bytes());

    let headers: Vec<String> = reader.headers()?.iter().map(clean_header).collect();

    let mut records = Vec::new();
    let mut skipped = count_empty_lines(payload);
    for row in reader.records() {
        let row = row?;
        let record: SourceRecord = headers
            .iter()
            .zip(row.iter())
            .filter(|(header, _)| !header.is_empty())
            .map(|(header, value)| (header.clone(), value.trim().to_string()))
            .collect();

        if record.is_blank() {
            skipped += 1;
            continue;
        }
        records.push(record);
    }

    tracing::info!(
        "CSV parsed: delimiter={:?}, columns={}, records={}, skipped={}",
        delimiter as char,
        headers.len(),
        records.len(),
        skipped
    );

    Ok(SourceBatch {
        records,
        headers,
        skipped,
    })
}

// ============================================================================
// JSON API
// ============================================================================

/// Загрузка одной страницы API поставщика
#[async_trait]
pub trait PageFetcher: Send + Sync {
    async fn fetch_page(&self, url: &str, credentials: &ApiCredentials) -> Result<Value, SourceError>;
}

/// HTTP-клиент страниц API поставщика
pub struct HttpPageFetcher {
    client: reqwest::Client,
}

impl HttpPageFetcher {
    pub fn new(timeout: Duration) -> Result<Self, SourceError> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| SourceError::Http {
                url: String::new(),
                message: format!("Failed to create HTTP client: {}", e),
            })?;
        Ok(Self { client })
    }
}

#[async_trait]
impl PageFetcher for HttpPageFetcher {
    async fn fetch_page(&self, url: &str, credentials: &ApiCredentials) -> Result<Value, SourceError> {
        let mut request = self
            .client
            .get(url)
            .header(reqwest::header::ACCEPT, "application/json");
        if let Some(key) = credentials.api_key.as_deref().filter(|k| !k.trim().is_empty()) {
            request = request.bearer_auth(key.trim());
        }
        for (name, value) in &credentials.headers {
            request = request.header(name.as_str(), value.as_str());
        }

        tracing::debug!("Supplier API request: GET {}", url);
        let response = request.send().await.map_err(|e| SourceError::Http {
            url: url.to_string(),
            message: e.to_string(),
        })?;

        let status = response.status();
        let body = response.text().await.map_err(|e| SourceError::Http {
            url: url.to_string(),
            message: e.to_string(),
        })?;

        if !status.is_success() {
            tracing::error!("Supplier API request failed: {} {}", status, body_preview(&body, 500));
            return Err(SourceError::Status {
                url: url.to_string(),
                status: status.as_u16(),
                body: body_preview(&body, 500),
            });
        }

        tracing::debug!("Supplier API response preview: {}", body_preview(&body, 500));
        serde_json::from_str(&body).map_err(|e| SourceError::InvalidJson {
            url: url.to_string(),
            message: e.to_string(),
        })
    }
}

/// Найти массив товаров в ответе: корневой массив, известные ключи,
/// затем первое свойство-массив
pub fn extract_items(page: &Value) -> &[Value] {
    if let Some(items) = page.as_array() {
        return items;
    }
    let Some(object) = page.as_object() else {
        return &[];
    };
    ITEM_ARRAY_KEYS
        .iter()
        .find_map(|key| object.get(*key).and_then(Value::as_array))
        .or_else(|| object.values().find_map(Value::as_array))
        .map(Vec::as_slice)
        .unwrap_or(&[])
}

/// Ссылка на следующую страницу; относительная ссылка разрешается
/// относительно текущей страницы
pub fn next_page_url(page: &Value, current_url: &str) -> Option<String> {
    let link = NEXT_PAGE_PATHS.iter().find_map(|path| {
        path.iter()
            .try_fold(page, |node, key| node.get(*key))
            .and_then(Value::as_str)
            .map(str::trim)
            .filter(|s| !s.is_empty())
    })?;

    match reqwest::Url::parse(link) {
        Ok(url) => Some(url.to_string()),
        Err(_) => reqwest::Url::parse(current_url)
            .and_then(|base| base.join(link))
            .map(|url| url.to_string())
            .ok(),
    }
}

/// Развернуть элемент ответа в плоскую запись:
/// `{"variant":{"price":1}}` → `variant.price`, массив объектов → `variants.0.sku`,
/// массив скаляров → значения через ", "
pub fn flatten_item(item: &Value) -> SourceRecord {
    let mut record = SourceRecord::default();
    match item {
        Value::Object(_) => flatten_into(&mut record, "", item),
        other => {
            if let Some(text) = scalar_text(other) {
                record.insert("value", text);
            }
        }
    }
    record
}

fn flatten_into(record: &mut SourceRecord, prefix: &str, value: &Value) {
    let key_for = |name: &str| {
        if prefix.is_empty() {
            name.to_string()
        } else {
            format!("{}.{}", prefix, name)
        }
    };
    match value {
        Value::Object(map) => {
            for (name, child) in map {
                flatten_into(record, &key_for(name), child);
            }
        }
        Value::Array(items) if items.iter().any(|v| v.is_object() || v.is_array()) => {
            for (index, child) in items.iter().enumerate() {
                flatten_into(record, &key_for(&index.to_string()), child);
            }
        }
        Value::Array(items) => {
            let joined = items
                .iter()
                .filter_map(scalar_text)
                .collect::<Vec<_>>()
                .join(", ");
            record.insert(prefix, joined);
        }
        scalar => {
            if let Some(text) = scalar_text(scalar) {
                record.insert(prefix, text);
            }
        }
    }
}

fn scalar_text(value: &Value) -> Option<String> {
    match value {
        Value::Null => None,
        Value::String(s) => Some(s.clone()),
        Value::Bool(b) => Some(b.to_string()),
        Value::Number(n) => Some(n.to_string()),
        Value::Array(_) | Value::Object(_) => None,
    }
}

/// Обойти все страницы API, начиная с `credentials.url`
pub async fn read_api(
    fetcher: &dyn PageFetcher,
    credentials: &ApiCredentials,
    max_pages: usize,
) -> Result<SourceBatch, SourceError> {
    let first_url = credentials.url.trim().to_string();
    reqwest::Url::parse(&first_url).map_err(|e| SourceError::InvalidUrl {
        url: first_url.clone(),
        message: e.to_string(),
    })?;

    let mut records: Vec<SourceRecord> = Vec::new();
    let mut visited: HashSet<String> = HashSet::new();
    let mut next = Some(first_url);
    let mut pages = 0usize;

    while let Some(url) = next.take() {
        if pages >= max_pages {
            tracing::warn!("Supplier API page limit reached ({}), stopping pagination", max_pages);
            break;
        }
        if !visited.insert(url.clone()) {
            tracing::warn!("Supplier API returned an already fetched page {}, stopping", url);
            break;
        }

        let page = match fetcher.fetch_page(&url, credentials).await {
            Ok(page) => page,
            Err(e) if records.is_empty() => return Err(e),
            Err(e) => {
                tracing::warn!(
                    "Supplier API page {} failed, keeping {} records collected so far: {}",
                    url,
                    records.len(),
                    e
                );
                break;
            }
        };
        pages += 1;

        let items = extract_items(&page);
        tracing::info!("Supplier API page {}: {} items", pages, items.len());
        records.extend(items.iter().map(flatten_item).filter(|r| !r.is_blank()));

        next = next_page_url(&page, &url);
    }

    let headers = records
        .first()
        .map(|r| r.keys().cloned().collect())
        .unwrap_or_default();

    Ok(SourceBatch {
        records,
        headers,
        skipped: 0,
    })
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use serde_json::json;
    use std::collections::HashMap;
    use std::sync::Mutex;

    /// Страницы API в памяти: url → ответ (или ошибка, если страницы нет)
    pub struct StaticPages {
        pub pages: HashMap<String, Value>,
        pub requested: Mutex<Vec<String>>,
    }

    impl StaticPages {
        pub fn new(pages: Vec<(&str, Value)>) -> Self {
            Self {
                pages: pages.into_iter().map(|(u, v)| (u.to_string(), v)).collect(),
                requested: Mutex::new(Vec::new()),
            }
        }
    }

    #[async_trait]
    impl PageFetcher for StaticPages {
        async fn fetch_page(&self, url: &str, _credentials: &ApiCredentials) -> Result<Value, SourceError> {
            self.requested.lock().unwrap().push(url.to_string());
            self.pages.get(url).cloned().ok_or_else(|| SourceError::Status {
                url: url.to_string(),
                status: 500,
                body: "boom".into(),
            })
        }
    }

    fn credentials(url: &str) -> ApiCredentials {
        ApiCredentials {
            url: url.into(),
            ..Default::default()
        }
    }

    #[test]
    fn test_detect_delimiter() {
        assert_eq!(detect_delimiter("a;b;c"), b';');
        assert_eq!(detect_delimiter("a,b;c,d"), b',');
        assert_eq!(detect_delimiter("a\tb\tc"), b'\t');
        assert_eq!(detect_delimiter("a|b,c|d"), b'|');
        assert_eq!(detect_delimiter("single"), b',');
        // Равное число: выигрывает более ранний в списке
        assert_eq!(detect_delimiter("a;b,c"), b',');
    }

    #[test]
    fn test_read_csv_drops_blank_rows() {
        let payload = "\u{feff}\"SKU\"; Title ;Price\nA-1;Lamp;20\n;;\nB-2;\"Desk; oak\";35.5\n";
        let batch = read_csv(payload).unwrap();
        assert_eq!(batch.headers, vec!["SKU", "Title", "Price"]);
        assert_eq!(batch.records.len(), 2);
        assert_eq!(batch.skipped, 1);
        assert_eq!(batch.records[1].get("Title"), Some("Desk; oak"));
        assert_eq!(batch.records[0].get("SKU"), Some("A-1"));
    }

    #[test]
    fn test_read_csv_empty_line_between_rows() {
        let batch = read_csv("sku,title\nA,Lamp\n\nB,Desk\n").unwrap();
        assert_eq!(batch.records.len(), 2);
        assert_eq!(batch.records[1].get("sku"), Some("B"));
        assert_eq!(batch.skipped, 1);
    }

    #[test]
    fn test_read_csv_empty_line_inside_quotes_is_not_skipped() {
        let batch = read_csv("sku,title\nA,\"Lamp\n\nbrass\"\n\nB,Desk\n").unwrap();
        assert_eq!(batch.records.len(), 2);
        assert_eq!(batch.records[0].get("title"), Some("Lamp\n\nbrass"));
        assert_eq!(batch.skipped, 1);
    }

    #[test]
    fn test_read_csv_leading_whitespace_lines() {
        let batch = read_csv("   \nsku,title\nA,Lamp\nB,Desk\n").unwrap();
        assert_eq!(batch.headers, vec!["sku", "title"]);
        assert_eq!(batch.records.len(), 2);
        assert_eq!(batch.records[0].get("sku"), Some("A"));
        assert_eq!(batch.skipped, 0);
    }

    #[test]
    fn test_read_csv_ragged_rows() {
        let batch = read_csv("sku,title,price\nA,Lamp\nB,Desk,10,extra\n").unwrap();
        assert_eq!(batch.records[0].get("price"), None);
        assert_eq!(batch.records[1].get("price"), Some("10"));
    }

    #[test]
    fn test_read_csv_empty_payload() {
        assert!(matches!(read_csv("  \n\n"), Err(SourceError::EmptyCsv)));
    }

    #[test]
    fn test_extract_items_priority() {
        assert_eq!(extract_items(&json!([{"a": 1}])).len(), 1);
        assert_eq!(
            extract_items(&json!({"items": [1, 2], "data": [1]})).len(),
            1
        );
        assert_eq!(
            extract_items(&json!({"meta": {}, "catalogue": [1, 2, 3]})).len(),
            3
        );
        assert!(extract_items(&json!({"count": 0})).is_empty());
    }

    #[test]
    fn test_next_page_url_variants() {
        let current = "https://api.acme.io/v1/products?page=1";
        assert_eq!(
            next_page_url(&json!({"links": {"next": "/v1/products?page=2"}}), current),
            Some("https://api.acme.io/v1/products?page=2".to_string())
        );
        assert_eq!(
            next_page_url(&json!({"nextPageUrl": "https://cdn.acme.io/p2"}), current),
            Some("https://cdn.acme.io/p2".to_string())
        );
        assert_eq!(
            next_page_url(&json!({"next": "", "meta": {"next_page_url": "?page=3"}}), current),
            Some("https://api.acme.io/v1/products?page=3".to_string())
        );
        assert_eq!(next_page_url(&json!({"next": null}), current), None);
    }

    #[test]
    fn test_flatten_item() {
        let record = flatten_item(&json!({
            "title": "Lamp",
            "variant": {"price": 19.5, "sku": "L-1"},
            "variants": [{"sku": "A"}, {"sku": "B"}],
            "tags": ["red", "metal"],
            "discontinued": null
        }));
        assert_eq!(record.get("variant.price"), Some("19.5"));
        assert_eq!(record.get("variants.1.sku"), Some("B"));
        assert_eq!(record.get("tags"), Some("red, metal"));
        assert_eq!(record.get("discontinued"), None);
    }

    #[tokio::test]
    async fn test_read_api_follows_pages_until_repeat() {
        let fetcher = StaticPages::new(vec![
            (
                "https://api.acme.io/p1",
                json!({"data": [{"sku": "A"}], "next": "https://api.acme.io/p2"}),
            ),
            (
                "https://api.acme.io/p2",
                json!({"data": [{"sku": "B"}], "next": "https://api.acme.io/p1"}),
            ),
        ]);
        let batch = read_api(&fetcher, &credentials("https://api.acme.io/p1"), 1000)
            .await
            .unwrap();
        assert_eq!(batch.records.len(), 2);
        assert_eq!(batch.headers, vec!["sku"]);
        assert_eq!(fetcher.requested.lock().unwrap().len(), 2);
    }

    #[tokio::test]
    async fn test_read_api_truncates_on_later_failure() {
        let fetcher = StaticPages::new(vec![(
            "https://api.acme.io/p1",
            json!({"products": [{"sku": "A"}, {"sku": "B"}], "next_page_url": "https://api.acme.io/p2"}),
        )]);
        let batch = read_api(&fetcher, &credentials("https://api.acme.io/p1"), 1000)
            .await
            .unwrap();
        assert_eq!(batch.records.len(), 2);
    }

    #[tokio::test]
    async fn test_read_api_first_page_failure_is_error() {
        let fetcher = StaticPages::new(vec![]);
        let result = read_api(&fetcher, &credentials("https://api.acme.io/p1"), 1000).await;
        assert!(matches!(result, Err(SourceError::Status { status: 500, .. })));
    }

    #[tokio::test]
    async fn test_read_api_respects_page_cap() {
        let fetcher = StaticPages::new(vec![
            ("https://api.acme.io/p1", json!({"items": [{"sku": "A"}], "next": "/p2"})),
            ("https://api.acme.io/p2", json!({"items": [{"sku": "B"}], "next": "/p3"})),
        ]);
        let batch = read_api(&fetcher, &credentials("https://api.acme.io/p1"), 1)
            .await
            .unwrap();
        assert_eq!(batch.records.len(), 1);
    }
}
