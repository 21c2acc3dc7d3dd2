//! Product API served from `demos/product/api.yaml`
//!
//! ```sh
//! cargo run --example product
//! curl -X POST localhost:1111/product/create \
//!     -H 'x-user-id: 6f1c...' -H 'x-tenant-id: 0a2b...' \
//!     -d '{"name": "lamp", "price": 30}'
//! curl 'localhost:1111/product/list?sort=price:desc&limit=5'
//! ```

mod product;

use anyhow::Result;
use api_maker::prelude::*;
use api_maker::telemetry::init_tracing;

use product::{AddProductForm, Product, ProductFilter, classify};

#[tokio::main]
async fn main() -> Result<()> {
    init_tracing();

    let path = std::env::args()
        .nth(1)
        .unwrap_or_else(|| concat!(env!("CARGO_MANIFEST_DIR"), "/demos/product/api.yaml").to_string());

    let store = InMemoryStore::<Product>::new();
    let products = Resource::<Product, AddProductForm, ProductFilter>::new("product", move || {
        Product::with_store(store.clone())
    })
    .before_save(Hook::from_fn(classify).with_param("type", "standard"));

    ServerBuilder::new()
        .with_config_file(&path)?
        .with_auth_provider(HeaderAuthProvider)
        .register(products)
        .serve()
        .await
}
