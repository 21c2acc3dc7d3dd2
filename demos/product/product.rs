//! Product resource backed by the in-memory store

use anyhow::{Result, anyhow};
use api_maker::prelude::*;
use chrono::{DateTime, Utc};
use regex::Regex;
use serde_json::{Map, Value};
use std::sync::LazyLock;
use uuid::Uuid;

static SKU: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"^[A-Z]{3}-\d{4}$").unwrap());

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Product {
    #[serde(default)]
    pub id: String,

    pub name: String,

    pub price: f64,

    #[serde(default)]
    pub sku: Option<String>,

    #[serde(default)]
    pub kind: String,

    #[serde(default)]
    pub created_at: Option<DateTime<Utc>>,

    #[serde(default)]
    pub updated_at: Option<DateTime<Utc>>,

    #[serde(skip)]
    store: InMemoryStore<Product>,
}

impl Product {
    /// Empty product bound to `store`
    pub fn with_store(store: InMemoryStore<Product>) -> Self {
        Self {
            store,
            ..Self::default()
        }
    }

    /// Copy suitable for storage (no store handle)
    fn detached(&self) -> Self {
        Self {
            store: InMemoryStore::default(),
            ..self.clone()
        }
    }

    fn load(&mut self, record: Product) {
        let store = self.store.clone();
        *self = record;
        self.store = store;
    }
}

#[async_trait]
impl Model for Product {
    async fn save(&mut self) -> Result<()> {
        let now = Utc::now();
        if self.id.is_empty() {
            self.id = Uuid::new_v4().to_string();
            self.created_at = Some(now);
        }
        self.updated_at = Some(now);

        self.store.insert(self.id.clone(), self.detached())
    }

    async fn get_one(&mut self, id: &str) -> Result<()> {
        let record = self
            .store
            .get(id)?
            .ok_or_else(|| anyhow!("product {} not found", id))?;
        self.load(record);
        Ok(())
    }

    async fn list(&self, filter: &dyn Filter, pagination: &Pagination) -> Result<Listing<Self>> {
        self.store.query(&filter.filters(), pagination)
    }

    async fn remove(&mut self, id: &str) -> Result<()> {
        let record = self.store.remove(id)?;
        self.load(record);
        Ok(())
    }

    fn absorb(&mut self, projected: Self) {
        self.load(projected);
    }
}

/// Payload of `POST /product/create` and `PUT /product/update/{id}`
#[derive(Debug, Serialize, Deserialize, Validate)]
pub struct AddProductForm {
    #[validate(length(min = 1, max = 100))]
    pub name: String,

    pub price: f64,

    #[serde(default)]
    pub sku: Option<String>,
}

impl Form<Product> for AddProductForm {
    fn refine(&self) -> Result<()> {
        if self.price <= 0.0 {
            return Err(anyhow!("price must be greater than 0"));
        }
        if let Some(sku) = &self.sku {
            if !SKU.is_match(sku) {
                return Err(anyhow!("sku '{}' must look like ABC-1234", sku));
            }
        }
        Ok(())
    }

    fn bind(&self, product: &mut Product) -> Result<()> {
        product.name = self.name.trim().to_string();
        if product.kind.is_empty() {
            product.kind = "general".to_string();
        }
        Ok(())
    }
}

/// Query filter of `GET /product/list`
#[derive(Debug, Default, Serialize, Deserialize)]
pub struct ProductFilter {
    pub name: Option<String>,
    pub kind: Option<String>,
}

impl Filter for ProductFilter {
    fn filters(&self) -> Map<String, Value> {
        let mut filters = Map::new();
        if let Some(name) = &self.name {
            filters.insert("name".into(), Value::from(name.as_str()));
        }
        if let Some(kind) = &self.kind {
            filters.insert("kind".into(), Value::from(kind.as_str()));
        }
        filters
    }
}

/// Before-save hook classifying the product from the `type` parameter
pub fn classify(product: &mut Product, params: &[HookParam]) -> Result<()> {
    let kind = HookParam::find_str(params, "type")
        .ok_or_else(|| anyhow!("missing 'type' parameter"))?;
    product.kind = kind.to_string();
    Ok(())
}
