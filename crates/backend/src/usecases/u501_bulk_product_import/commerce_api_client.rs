use super::reconciliation::{
    InventorySet, PlatformError, ProductInput, RemoteCatalog, RemoteMatch, RemoteProduct,
    RemoteVariant, VariantInput,
};
use async_trait::async_trait;
use serde_json::{json, Map, Value};

use crate::shared::config::CommerceConfig;
use crate::shared::format::body_preview;

const PRODUCT_FIELDS: &str = r#"
    id
    title
    variants(first: 100) {
        edges { node { id sku barcode price inventoryItem { id } } }
    }
"#;

/// GraphQL-клиент Admin API платформы магазина
pub struct CommerceApiClient {
    client: reqwest::Client,
    endpoint: String,
    access_token: String,
    location_id: Option<String>,
}

impl CommerceApiClient {
    pub fn new(config: &CommerceConfig) -> Result<Self, PlatformError> {
        if config.shop_domain.trim().is_empty() || config.access_token.trim().is_empty() {
            return Err(PlatformError::NotConfigured(
                "shop_domain и access_token обязательны".into(),
            ));
        }
        let client = reqwest::Client::builder()
            .timeout(std::time::Duration::from_secs(30))
            .build()
            .map_err(|e| PlatformError::Http(format!("Failed to create HTTP client: {}", e)))?;
        Ok(Self {
            client,
            endpoint: format!(
                "https://{}/admin/api/{}/graphql.json",
                config.shop_domain.trim().trim_end_matches('/'),
                config.api_version
            ),
            access_token: config.access_token.clone(),
            location_id: config.location_id.clone(),
        })
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    /// Выполнить запрос и вернуть поле `data`
    async fn execute(&self, query: &str, variables: Value) -> Result<Value, PlatformError> {
        let response = self
            .client
            .post(&self.endpoint)
            .header("X-Shopify-Access-Token", &self.access_token)
            .json(&json!({ "query": query, "variables": variables }))
            .send()
            .await
            .map_err(|e| PlatformError::Http(e.to_string()))?;

        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|e| PlatformError::Http(e.to_string()))?;

        if !status.is_success() {
            tracing::error!("Commerce API request failed: {} {}", status, body_preview(&body, 500));
            return Err(PlatformError::Status {
                status: status.as_u16(),
                body: body_preview(&body, 500),
            });
        }
        tracing::debug!("Commerce API response preview: {}", body_preview(&body, 500));

        let mut payload: Value = serde_json::from_str(&body).map_err(|e| {
            PlatformError::UnexpectedResponse(format!("{}: {}", e, body_preview(&body, 200)))
        })?;
        if let Some(errors) = payload.get("errors").filter(|e| !e.is_null()) {
            return Err(PlatformError::GraphQl(graphql_error_text(errors)));
        }
        match payload.get_mut("data").map(Value::take) {
            Some(data) if !data.is_null() => Ok(data),
            _ => Err(PlatformError::UnexpectedResponse("missing data".into())),
        }
    }

    async fn search_products(&self, search: String) -> Result<Vec<RemoteProduct>, PlatformError> {
        let query = format!(
            "query($q: String!) {{ products(first: 10, query: $q) {{ edges {{ node {{ {} }} }} }} }}",
            PRODUCT_FIELDS
        );
        let data = self.execute(&query, json!({ "q": search })).await?;
        let products = edges(&data["products"]).filter_map(parse_product).collect();
        Ok(products)
    }

    async fn publication_ids(&self) -> Result<Vec<String>, PlatformError> {
        let data = self
            .execute(
                "query { publications(first: 50) { edges { node { id } } } }",
                json!({}),
            )
            .await?;
        let ids = edges(&data["publications"])
            .filter_map(|node| node["id"].as_str().map(str::to_string))
            .collect();
        Ok(ids)
    }
}

// ============================================================================
// Response/request helpers
// ============================================================================

fn graphql_error_text(errors: &Value) -> String {
    errors
        .as_array()
        .map(|list| {
            list.iter()
                .filter_map(|e| e["message"].as_str())
                .collect::<Vec<_>>()
                .join("; ")
        })
        .filter(|text| !text.is_empty())
        .unwrap_or_else(|| errors.to_string())
}

/// Узлы connection-поля `{edges: [{node}]}`
/// Первый вариант из ответа productVariants с id товара и складской позиции
fn parse_variant_match(data: &Value) -> Option<RemoteMatch> {
    edges(&data["productVariants"]).find_map(|node| {
        Some(RemoteMatch {
            product_id: node["product"]["id"].as_str()?.to_string(),
            variant_id: node["id"].as_str().map(str::to_string),
            inventory_item_id: node["inventoryItem"]["id"].as_str().map(str::to_string),
        })
    })
}

fn edges(connection: &Value) -> impl Iterator<Item = &Value> {
    connection["edges"]
        .as_array()
        .map(|list| list.as_slice())
        .unwrap_or(&[])
        .iter()
        .map(|edge| &edge["node"])
}

/// Ошибка, если payload мутации содержит userErrors
fn check_user_errors(payload: &Value) -> Result<(), PlatformError> {
    let messages: Vec<String> = payload["userErrors"]
        .as_array()
        .map(|list| list.as_slice())
        .unwrap_or(&[])
        .iter()
        .map(|e| {
            let field = e["field"]
                .as_array()
                .map(|f| {
                    f.iter()
                        .filter_map(Value::as_str)
                        .collect::<Vec<_>>()
                        .join(".")
                })
                .unwrap_or_default();
            let message = e["message"].as_str().unwrap_or("unknown error");
            if field.is_empty() {
                message.to_string()
            } else {
                format!("{}: {}", field, message)
            }
        })
        .collect();
    if messages.is_empty() {
        Ok(())
    } else {
        Err(PlatformError::UserErrors(messages.join("; ")))
    }
}

fn parse_variant(node: &Value) -> Option<RemoteVariant> {
    Some(RemoteVariant {
        id: node["id"].as_str()?.to_string(),
        sku: node["sku"].as_str().map(str::to_string).filter(|s| !s.is_empty()),
        barcode: node["barcode"].as_str().map(str::to_string).filter(|s| !s.is_empty()),
        price: match &node["price"] {
            Value::String(s) => s.parse().ok(),
            other => other.as_f64(),
        },
        inventory_item_id: node["inventoryItem"]["id"].as_str().map(str::to_string),
    })
}

fn parse_product(node: &Value) -> Option<RemoteProduct> {
    Some(RemoteProduct {
        id: node["id"].as_str()?.to_string(),
        title: node["title"].as_str().unwrap_or_default().to_string(),
        variants: edges(&node["variants"]).filter_map(parse_variant).collect(),
    })
}

/// Строка поиска `field:"value"` с экранированием кавычек
fn search_term(field: &str, value: &str) -> String {
    let escaped = value.replace('\\', "\\\\").replace('"', "\\\"");
    format!("{}:\"{}\"", field, escaped)
}

fn money(value: f64) -> String {
    format!("{:.2}", value)
}

fn product_input_json(input: &ProductInput, product_id: Option<&str>) -> Value {
    let mut fields = Map::new();
    if let Some(id) = product_id {
        fields.insert("id".into(), json!(id));
    }
    fields.insert("title".into(), json!(input.title));
    if let Some(html) = &input.description_html {
        fields.insert("descriptionHtml".into(), json!(html));
    }
    if let Some(vendor) = &input.vendor {
        fields.insert("vendor".into(), json!(vendor));
    }
    if let Some(product_type) = &input.product_type {
        fields.insert("productType".into(), json!(product_type));
    }
    if !input.tags.is_empty() {
        fields.insert("tags".into(), json!(input.tags));
    }
    if let Some(status) = input.status {
        fields.insert("status".into(), json!(status.as_str()));
    }
    Value::Object(fields)
}

fn variant_input_json(input: &VariantInput) -> Value {
    let mut fields = Map::new();
    if let Some(id) = &input.id {
        fields.insert("id".into(), json!(id));
    }
    if let Some(price) = input.price {
        fields.insert("price".into(), json!(money(price)));
    }
    if let Some(compare_at) = input.compare_at_price {
        fields.insert("compareAtPrice".into(), json!(money(compare_at)));
    }
    if let Some(barcode) = &input.barcode {
        fields.insert("barcode".into(), json!(barcode));
    }
    if let Some(sku) = &input.sku {
        fields.insert("inventoryItem".into(), json!({ "sku": sku }));
    }
    Value::Object(fields)
}

// ============================================================================
// RemoteCatalog
// ============================================================================

#[async_trait]
impl RemoteCatalog for CommerceApiClient {
    async fn query_product_by_sku(&self, sku: &str) -> Result<Vec<RemoteProduct>, PlatformError> {
        self.search_products(search_term("sku", sku)).await
    }

    async fn query_product_by_title(&self, title: &str) -> Result<Vec<RemoteProduct>, PlatformError> {
        self.search_products(search_term("title", title)).await
    }

    async fn query_inventory_item_by_barcode(
        &self,
        barcode: &str,
    ) -> Result<Option<RemoteMatch>, PlatformError> {
        let data = self
            .execute(
                "query($q: String!) { productVariants(first: 1, query: $q) { edges { node { id product { id } inventoryItem { id } } } } }",
                json!({ "q": search_term("barcode", barcode) }),
            )
            .await?;
        let found = parse_variant_match(&data);
        Ok(found)
    }

    async fn create_product(&self, input: &ProductInput) -> Result<RemoteProduct, PlatformError> {
        let query = format!(
            "mutation($input: ProductInput!) {{ productCreate(input: $input) {{ product {{ {} }} userErrors {{ field message }} }} }}",
            PRODUCT_FIELDS
        );
        let data = self
            .execute(&query, json!({ "input": product_input_json(input, None) }))
            .await?;
        let payload = &data["productCreate"];
        check_user_errors(payload)?;
        let product = parse_product(&payload["product"])
            .ok_or_else(|| PlatformError::UnexpectedResponse("productCreate returned no product".into()))?;
        tracing::info!("Created product {} '{}'", product.id, product.title);
        Ok(product)
    }

    async fn update_product(&self, product_id: &str, input: &ProductInput) -> Result<(), PlatformError> {
        let data = self
            .execute(
                "mutation($input: ProductInput!) { productUpdate(input: $input) { product { id } userErrors { field message } } }",
                json!({ "input": product_input_json(input, Some(product_id)) }),
            )
            .await?;
        check_user_errors(&data["productUpdate"])
    }

    async fn bulk_create_variants(
        &self,
        product_id: &str,
        variants: &[VariantInput],
    ) -> Result<Vec<RemoteVariant>, PlatformError> {
        let data = self
            .execute(
                "mutation($productId: ID!, $variants: [ProductVariantsBulkInput!]!) { productVariantsBulkCreate(productId: $productId, variants: $variants, strategy: REMOVE_STANDALONE_VARIANT) { productVariants { id sku barcode price inventoryItem { id } } userErrors { field message } } }",
                json!({
                    "productId": product_id,
                    "variants": variants.iter().map(variant_input_json).collect::<Vec<_>>(),
                }),
            )
            .await?;
        let payload = &data["productVariantsBulkCreate"];
        check_user_errors(payload)?;
        Ok(payload["productVariants"]
            .as_array()
            .map(|list| list.iter().filter_map(parse_variant).collect())
            .unwrap_or_default())
    }

    async fn bulk_update_variants(
        &self,
        product_id: &str,
        variants: &[VariantInput],
    ) -> Result<Vec<RemoteVariant>, PlatformError> {
        let data = self
            .execute(
                "mutation($productId: ID!, $variants: [ProductVariantsBulkInput!]!) { productVariantsBulkUpdate(productId: $productId, variants: $variants) { productVariants { id sku barcode price inventoryItem { id } } userErrors { field message } } }",
                json!({
                    "productId": product_id,
                    "variants": variants.iter().map(variant_input_json).collect::<Vec<_>>(),
                }),
            )
            .await?;
        let payload = &data["productVariantsBulkUpdate"];
        check_user_errors(payload)?;
        Ok(payload["productVariants"]
            .as_array()
            .map(|list| list.iter().filter_map(parse_variant).collect())
            .unwrap_or_default())
    }

    async fn set_inventory_on_hand(&self, batch: &[InventorySet]) -> Result<(), PlatformError> {
        if batch.is_empty() {
            return Ok(());
        }
        let location_id = self
            .location_id
            .as_deref()
            .ok_or_else(|| PlatformError::NotConfigured("commerce.location_id не задан".into()))?;
        let quantities: Vec<Value> = batch
            .iter()
            .map(|set| {
                json!({
                    "inventoryItemId": set.inventory_item_id,
                    "locationId": location_id,
                    "quantity": set.quantity,
                })
            })
            .collect();
        let data = self
            .execute(
                "mutation($input: InventorySetOnHandQuantitiesInput!) { inventorySetOnHandQuantities(input: $input) { userErrors { field message } } }",
                json!({ "input": { "reason": "correction", "setQuantities": quantities } }),
            )
            .await?;
        check_user_errors(&data["inventorySetOnHandQuantities"])
    }

    async fn publish_to_all_channels(&self, product_id: &str) -> Result<(), PlatformError> {
        let publications = self.publication_ids().await?;
        if publications.is_empty() {
            tracing::warn!("No sales channels to publish {} to", product_id);
            return Ok(());
        }
        let input: Vec<Value> = publications
            .iter()
            .map(|id| json!({ "publicationId": id }))
            .collect();
        let data = self
            .execute(
                "mutation($id: ID!, $input: [PublicationInput!]!) { publishablePublish(id: $id, input: $input) { userErrors { field message } } }",
                json!({ "id": product_id, "input": input }),
            )
            .await?;
        check_user_errors(&data["publishablePublish"])
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::usecases::u501_bulk_product_import::reconciliation::ProductStatus;

    fn config() -> CommerceConfig {
        CommerceConfig {
            shop_domain: "acme.myshopify.com/".into(),
            access_token: "shpat_test".into(),
            api_version: "2024-07".into(),
            location_id: None,
        }
    }

    #[test]
    fn test_endpoint_from_config() {
        let client = CommerceApiClient::new(&config()).unwrap();
        assert_eq!(
            client.endpoint(),
            "https://acme.myshopify.com/admin/api/2024-07/graphql.json"
        );

        let mut missing = config();
        missing.access_token = " ".into();
        assert!(matches!(
            CommerceApiClient::new(&missing),
            Err(PlatformError::NotConfigured(_))
        ));
    }

    #[test]
    fn test_parse_variant_match_by_barcode() {
        let data = json!({"productVariants": {"edges": [
            {"node": {"id": "gid://shopify/ProductVariant/7", "product": {"id": "gid://shopify/Product/5"},
                      "inventoryItem": {"id": "gid://shopify/InventoryItem/9"}}}
        ]}});
        let found = parse_variant_match(&data).unwrap();
        assert_eq!(found.product_id, "gid://shopify/Product/5");
        assert_eq!(found.variant_id.as_deref(), Some("gid://shopify/ProductVariant/7"));
        assert_eq!(found.inventory_item_id.as_deref(), Some("gid://shopify/InventoryItem/9"));

        let empty = json!({"productVariants": {"edges": []}});
        assert!(parse_variant_match(&empty).is_none());

        let no_product = json!({"productVariants": {"edges": [{"node": {"id": "v"}}]}});
        assert!(parse_variant_match(&no_product).is_none());
    }

    #[test]
    fn test_parse_product() {
        let node = json!({
            "id": "gid://shopify/Product/1",
            "title": "Lamp",
            "variants": {"edges": [
                {"node": {"id": "gid://shopify/ProductVariant/2", "sku": "L-1", "barcode": "", "price": "19.90",
                          "inventoryItem": {"id": "gid://shopify/InventoryItem/3"}}}
            ]}
        });
        let product = parse_product(&node).unwrap();
        assert_eq!(product.variants.len(), 1);
        let variant = &product.variants[0];
        assert_eq!(variant.sku.as_deref(), Some("L-1"));
        assert_eq!(variant.barcode, None);
        assert_eq!(variant.price, Some(19.9));
        assert_eq!(variant.inventory_item_id.as_deref(), Some("gid://shopify/InventoryItem/3"));
    }

    #[test]
    fn test_user_errors_become_platform_error() {
        assert!(check_user_errors(&json!({"userErrors": []})).is_ok());
        let err = check_user_errors(&json!({
            "userErrors": [{"field": ["input", "title"], "message": "can't be blank"}]
        }))
        .unwrap_err();
        assert_eq!(err.to_string(), "Platform rejected input: input.title: can't be blank");
    }

    #[test]
    fn test_search_term_escapes_quotes() {
        assert_eq!(search_term("sku", "A-1"), "sku:\"A-1\"");
        assert_eq!(search_term("title", "12\" Pan"), "title:\"12\\\" Pan\"");
    }

    #[test]
    fn test_input_json_omits_missing_fields() {
        let product = ProductInput {
            title: "Lamp".into(),
            description_html: None,
            vendor: Some("Acme".into()),
            product_type: None,
            tags: vec![],
            status: Some(ProductStatus::Draft),
        };
        assert_eq!(
            product_input_json(&product, Some("gid://1")),
            json!({"id": "gid://1", "title": "Lamp", "vendor": "Acme", "status": "DRAFT"})
        );

        let variant = VariantInput {
            id: None,
            price: Some(25.0),
            compare_at_price: Some(25.0),
            sku: Some("L-1".into()),
            barcode: None,
        };
        assert_eq!(
            variant_input_json(&variant),
            json!({"price": "25.00", "compareAtPrice": "25.00", "inventoryItem": {"sku": "L-1"}})
        );
    }
}
