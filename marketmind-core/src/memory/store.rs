//! Long-term, cross-thread key-value store. Namespaced, optionally searchable.
//!
//! Distinct from [`crate::memory::Checkpointer`]: a `Store` holds memory that
//! outlives any single thread (user preferences, cached lookups), keyed by a
//! [`Namespace`] (e.g. `[user_id, "watchlist"]`).

use std::collections::HashMap;
use std::time::SystemTime;

use async_trait::async_trait;
use serde_json::Value;
use thiserror::Error;

/// Hierarchical path identifying a group of keys, e.g. `["user-42", "watchlist"]`.
pub type Namespace = Vec<String>;

/// Error produced by a `Store` implementation.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("store error: {0}")]
    Storage(String),

    #[error("not found: {0}")]
    NotFound(String),
}

/// A stored value plus its namespace, key, and timestamps.
#[derive(Debug, Clone, PartialEq)]
pub struct Item {
    pub namespace: Namespace,
    pub key: String,
    pub value: Value,
    pub created_at: SystemTime,
    pub updated_at: SystemTime,
}

impl Item {
    pub fn with_timestamps(
        namespace: Namespace,
        key: String,
        value: Value,
        created_at: SystemTime,
        updated_at: SystemTime,
    ) -> Self {
        Self {
            namespace,
            key,
            value,
            created_at,
            updated_at,
        }
    }
}

/// An `Item` returned from `search`, optionally carrying a relevance score.
#[derive(Debug, Clone, PartialEq)]
pub struct SearchItem {
    pub item: Item,
    pub score: Option<f32>,
}

impl SearchItem {
    pub fn from_item(item: Item) -> Self {
        Self { item, score: None }
    }
}

/// Field comparison applied to a search's matching items.
#[derive(Debug, Clone, PartialEq)]
pub enum FilterOp {
    Eq(Value),
    Ne(Value),
    Gt(Value),
    Gte(Value),
    Lt(Value),
    Lte(Value),
}

/// How a `MatchCondition`'s path is compared against a candidate namespace.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NamespaceMatchType {
    Prefix,
    Suffix,
}

/// A namespace filter: match a candidate's prefix or suffix against `path`
/// (a literal `"*"` segment matches any single segment).
#[derive(Debug, Clone, PartialEq)]
pub struct MatchCondition {
    pub path: Namespace,
    pub match_type: NamespaceMatchType,
}

/// Options controlling `Store::search`.
#[derive(Debug, Clone, Default)]
pub struct SearchOptions {
    pub query: Option<String>,
    pub filter: Option<HashMap<String, FilterOp>>,
    pub limit: usize,
    pub offset: usize,
}

impl SearchOptions {
    pub fn new() -> Self {
        Self {
            query: None,
            filter: None,
            limit: 10,
            offset: 0,
        }
    }

    pub fn with_query(mut self, query: impl Into<String>) -> Self {
        self.query = Some(query.into());
        self
    }

    pub fn with_filter(mut self, filter: HashMap<String, FilterOp>) -> Self {
        self.filter = Some(filter);
        self
    }

    pub fn with_limit(mut self, limit: usize) -> Self {
        self.limit = limit;
        self
    }

    pub fn with_offset(mut self, offset: usize) -> Self {
        self.offset = offset;
        self
    }
}

/// Options controlling `Store::list_namespaces`.
#[derive(Debug, Clone)]
pub struct ListNamespacesOptions {
    pub match_conditions: Vec<MatchCondition>,
    pub max_depth: Option<usize>,
    pub limit: usize,
    pub offset: usize,
}

impl Default for ListNamespacesOptions {
    fn default() -> Self {
        Self::new()
    }
}

impl ListNamespacesOptions {
    pub fn new() -> Self {
        Self {
            match_conditions: Vec::new(),
            max_depth: None,
            limit: usize::MAX,
            offset: 0,
        }
    }

    pub fn with_prefix(mut self, path: Namespace) -> Self {
        self.match_conditions.push(MatchCondition {
            path,
            match_type: NamespaceMatchType::Prefix,
        });
        self
    }

    pub fn with_suffix(mut self, path: Namespace) -> Self {
        self.match_conditions.push(MatchCondition {
            path,
            match_type: NamespaceMatchType::Suffix,
        });
        self
    }

    pub fn with_max_depth(mut self, max_depth: usize) -> Self {
        self.max_depth = Some(max_depth);
        self
    }

    pub fn with_limit(mut self, limit: usize) -> Self {
        self.limit = limit;
        self
    }
}

/// One operation in a `Store::batch` call.
#[derive(Debug, Clone)]
pub enum StoreOp {
    Get {
        namespace: Namespace,
        key: String,
    },
    /// `value: None` deletes the key.
    Put {
        namespace: Namespace,
        key: String,
        value: Option<Value>,
    },
    Search {
        namespace_prefix: Namespace,
        options: SearchOptions,
    },
    ListNamespaces {
        options: ListNamespacesOptions,
    },
}

/// Result of one `StoreOp`, in the same order as the batch's ops.
#[derive(Debug, Clone)]
pub enum StoreOpResult {
    Get(Option<Item>),
    Put,
    Search(Vec<SearchItem>),
    ListNamespaces(Vec<Namespace>),
}

/// A lightweight search hit: key, value, optional relevance score.
#[derive(Debug, Clone, PartialEq)]
pub struct StoreSearchHit {
    pub key: String,
    pub value: Value,
    pub score: Option<f32>,
}

/// Cross-thread key-value store, namespaced and batch/search capable.
#[async_trait]
pub trait Store: Send + Sync {
    async fn put(&self, namespace: &Namespace, key: &str, value: &Value) -> Result<(), StoreError>;

    async fn get(&self, namespace: &Namespace, key: &str) -> Result<Option<Value>, StoreError>;

    async fn get_item(&self, namespace: &Namespace, key: &str) -> Result<Option<Item>, StoreError>;

    async fn delete(&self, namespace: &Namespace, key: &str) -> Result<(), StoreError>;

    async fn list(&self, namespace: &Namespace) -> Result<Vec<String>, StoreError>;

    async fn search(
        &self,
        namespace_prefix: &Namespace,
        options: SearchOptions,
    ) -> Result<Vec<SearchItem>, StoreError>;

    async fn list_namespaces(
        &self,
        options: ListNamespacesOptions,
    ) -> Result<Vec<Namespace>, StoreError>;

    async fn batch(&self, ops: Vec<StoreOp>) -> Result<Vec<StoreOpResult>, StoreError>;

    /// Convenience search returning flat hits instead of `SearchItem`.
    async fn search_simple(
        &self,
        namespace: &Namespace,
        query: Option<&str>,
        limit: Option<usize>,
    ) -> Result<Vec<StoreSearchHit>, StoreError>;
}
