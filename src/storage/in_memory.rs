//! In-memory record store for testing and development

use anyhow::{Context, Result, anyhow};
use indexmap::IndexMap;
use serde::Serialize;
use serde_json::{Map, Value};
use std::cmp::Ordering;
use std::sync::{Arc, RwLock};

use crate::core::model::Listing;
use crate::core::pagination::Pagination;

/// In-memory record store keyed by id
///
/// Records keep insertion order, which is the default list order. Clones
/// share the same records. Uses RwLock for thread-safe access.
#[derive(Debug)]
pub struct InMemoryStore<T> {
    records: Arc<RwLock<IndexMap<String, T>>>,
}

impl<T> Clone for InMemoryStore<T> {
    fn clone(&self) -> Self {
        Self {
            records: Arc::clone(&self.records),
        }
    }
}

impl<T> Default for InMemoryStore<T> {
    fn default() -> Self {
        Self {
            records: Arc::new(RwLock::new(IndexMap::new())),
        }
    }
}

impl<T> InMemoryStore<T>
where
    T: Serialize + Clone + Send + Sync,
{
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert or replace the record stored under `id`
    pub fn insert(&self, id: impl Into<String>, record: T) -> Result<()> {
        let mut records = self
            .records
            .write()
            .map_err(|e| anyhow!("Failed to acquire write lock: {}", e))?;

        records.insert(id.into(), record);
        Ok(())
    }

    /// Get the record stored under `id`
    pub fn get(&self, id: &str) -> Result<Option<T>> {
        let records = self
            .records
            .read()
            .map_err(|e| anyhow!("Failed to acquire read lock: {}", e))?;

        Ok(records.get(id).cloned())
    }

    /// Remove the record stored under `id`, failing if there is none
    pub fn remove(&self, id: &str) -> Result<T> {
        let mut records = self
            .records
            .write()
            .map_err(|e| anyhow!("Failed to acquire write lock: {}", e))?;

        records
            .shift_remove(id)
            .ok_or_else(|| anyhow!("record {} not found", id))
    }

    pub fn len(&self) -> Result<usize> {
        let records = self
            .records
            .read()
            .map_err(|e| anyhow!("Failed to acquire read lock: {}", e))?;

        Ok(records.len())
    }

    pub fn is_empty(&self) -> Result<bool> {
        Ok(self.len()? == 0)
    }

    /// Query one page of records
    ///
    /// A record matches when every non-null filter value equals the
    /// record's field of the same name; filter strings also match the
    /// textual form of numbers and booleans so that query-string filters
    /// work on typed fields. The result is sorted by
    /// [`Pagination::sort_key`] and sliced by page and limit.
    pub fn query(&self, filters: &Map<String, Value>, pagination: &Pagination) -> Result<Listing<T>> {
        let snapshot: Vec<T> = {
            let records = self
                .records
                .read()
                .map_err(|e| anyhow!("Failed to acquire read lock: {}", e))?;
            records.values().cloned().collect()
        };

        let mut matching = Vec::new();
        for record in snapshot {
            let encoded = serde_json::to_value(&record).context("cannot encode record")?;
            if matches_filters(&encoded, filters) {
                matching.push((encoded, record));
            }
        }

        if let Some((field, descending)) = pagination.sort_key() {
            matching.sort_by(|(a, _), (b, _)| {
                let ordering = compare_values(a.get(field), b.get(field));
                if descending { ordering.reverse() } else { ordering }
            });
        }

        let total_counts = matching.len() as i64;
        let page = matching.into_iter().map(|(_, record)| record).skip(pagination.offset());

        let items: Vec<T> = if pagination.is_unlimited() {
            page.collect()
        } else {
            page.take(pagination.limit as usize).collect()
        };

        Ok(Listing::new(
            total_counts,
            pagination.total_pages(total_counts),
            items,
        ))
    }
}

fn matches_filters(record: &Value, filters: &Map<String, Value>) -> bool {
    filters.iter().all(|(field, expected)| {
        if expected.is_null() {
            return true;
        }

        match (record.get(field), expected) {
            (Some(actual), expected) if actual == expected => true,
            (Some(Value::Number(n)), Value::String(s)) => n.to_string() == *s,
            (Some(Value::Bool(b)), Value::String(s)) => b.to_string() == *s,
            _ => false,
        }
    })
}

fn compare_values(a: Option<&Value>, b: Option<&Value>) -> Ordering {
    match (a, b) {
        (Some(Value::Number(x)), Some(Value::Number(y))) => {
            let (x, y) = (x.as_f64().unwrap_or(0.0), y.as_f64().unwrap_or(0.0));
            x.partial_cmp(&y).unwrap_or(Ordering::Equal)
        }
        (Some(Value::String(x)), Some(Value::String(y))) => x.cmp(y),
        (Some(Value::Bool(x)), Some(Value::Bool(y))) => x.cmp(y),
        (None | Some(Value::Null), None | Some(Value::Null)) => Ordering::Equal,
        (None | Some(Value::Null), _) => Ordering::Less,
        (_, None | Some(Value::Null)) => Ordering::Greater,
        (Some(x), Some(y)) => x.to_string().cmp(&y.to_string()),
    }
}
