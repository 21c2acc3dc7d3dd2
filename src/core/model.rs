//! Capability traits implemented by each resource
//!
//! The pipeline never knows the concrete resource. It drives three
//! capabilities supplied by the resource owner:
//!
//! - [`Model`]: one resource instance bound to persistence
//! - [`Form`]: validated transport input for Create/Update
//! - [`Filter`]: the predicate of a List query
//!
//! The framework is agnostic to the underlying storage mechanism; see
//! [`crate::storage::InMemoryStore`] for a ready-made backing collection.

use anyhow::Result;
use async_trait::async_trait;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use validator::Validate;

use super::pagination::Pagination;

/// One page of a List query
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Listing<T> {
    /// Number of items matching the filter, across all pages
    pub total_counts: i64,

    /// Number of pages for the requested limit
    pub total_pages: i64,

    /// Items of the requested page
    pub items: Vec<T>,
}

impl<T> Listing<T> {
    pub fn new(total_counts: i64, total_pages: i64, items: Vec<T>) -> Self {
        Self {
            total_counts,
            total_pages,
            items,
        }
    }

    pub fn empty() -> Self {
        Self::new(0, 0, Vec::new())
    }
}

/// Persistence capability of a resource instance
///
/// The pipeline borrows the model for the duration of one request and only
/// mutates it through these calls; construction and disposal belong to the
/// caller.
#[async_trait]
pub trait Model: Serialize + DeserializeOwned + Send + Sync + 'static {
    /// Persist the current state (insert or update)
    async fn save(&mut self) -> Result<()>;

    /// Load the resource identified by `id` into `self`
    async fn get_one(&mut self, id: &str) -> Result<()>;

    /// Query a page of resources
    async fn list(&self, filter: &dyn Filter, pagination: &Pagination) -> Result<Listing<Self>>;

    /// Delete the resource identified by `id`
    async fn remove(&mut self, id: &str) -> Result<()>;

    /// Take over the fields of a model produced by projection
    ///
    /// The default replaces `self` wholesale. Models holding state that is
    /// not serialized (a store handle, a connection) override this to keep
    /// it.
    fn absorb(&mut self, projected: Self) {
        *self = projected;
    }
}

/// Transport-shaped input of a write operation
///
/// Structural constraints are declared with `#[derive(Validate)]`;
/// [`Form::refine`] adds checks the derive cannot express and
/// [`Form::bind`] finalizes the model after the same-name field copy.
pub trait Form<M: Model>: Serialize + DeserializeOwned + Validate + Send {
    /// Resource-specific validation run after the declared constraints
    fn refine(&self) -> Result<()> {
        Ok(())
    }

    /// Derive or overwrite model fields beyond the generic field copy
    fn bind(&self, model: &mut M) -> Result<()>;
}

/// Predicate of a List query
pub trait Filter: Send + Sync {
    /// Field name to expected value
    fn filters(&self) -> Map<String, Value>;
}

/// Filter matching everything
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize)]
pub struct NoFilter {}

impl Filter for NoFilter {
    fn filters(&self) -> Map<String, Value> {
        Map::new()
    }
}

impl Filter for Map<String, Value> {
    fn filters(&self) -> Map<String, Value> {
        self.clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_no_filter_is_empty() {
        assert!(NoFilter::default().filters().is_empty());
    }

    #[test]
    fn test_map_filter_is_itself() {
        let mut map = Map::new();
        map.insert("name".into(), json!("lamp"));
        assert_eq!(map.filters()["name"], json!("lamp"));
    }

    #[test]
    fn test_listing_helpers() {
        let listing: Listing<u8> = Listing::empty();
        assert_eq!(listing.total_counts, 0);
        assert!(listing.items.is_empty());

        let listing = Listing::new(3, 1, vec![1, 2, 3]);
        assert_eq!(listing.total_pages, 1);
    }
}
