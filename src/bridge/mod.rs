//! Bridge contract
//!
//! Request and result types shared with the host, plus the adapter trait
//! every bridge implements.

pub mod pagination;

use crate::error::Result;
use async_trait::async_trait;
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};

pub use pagination::normalize_pagination_metadata;

/// Pagination hints supplied by the caller
pub type Metadata = BTreeMap<String, String>;

/// A single bridge query
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BridgeRequest {
    pub structure: String,
    #[serde(default)]
    pub query: Option<String>,
    #[serde(default)]
    pub parameters: HashMap<String, String>,
    #[serde(default)]
    pub fields: Option<Vec<String>>,
    #[serde(default)]
    pub metadata: Metadata,
}

impl BridgeRequest {
    pub fn new(structure: impl Into<String>) -> Self {
        Self {
            structure: structure.into(),
            ..Default::default()
        }
    }

    pub fn with_query(mut self, query: impl Into<String>) -> Self {
        self.query = Some(query.into());
        self
    }

    pub fn with_parameter(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.parameters.insert(name.into(), value.into());
        self
    }

    pub fn with_fields<I, S>(mut self, fields: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.fields = Some(fields.into_iter().map(Into::into).collect());
        self
    }

    pub fn with_metadata(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.metadata.insert(key.into(), value.into());
        self
    }

    /// Requested fields joined for logging
    pub fn field_string(&self) -> String {
        self.fields
            .as_ref()
            .map(|fields| fields.join(","))
            .unwrap_or_default()
    }
}

/// A record keyed by field name, in requested field order.
///
/// An empty record (no attributes at all) means no record was found.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct Record {
    attributes: Option<IndexMap<String, Option<String>>>,
}

impl Record {
    pub fn new(attributes: IndexMap<String, Option<String>>) -> Self {
        Self {
            attributes: Some(attributes),
        }
    }

    pub fn empty() -> Self {
        Self::default()
    }

    pub fn is_empty(&self) -> bool {
        self.attributes.is_none()
    }

    /// Value of `field`; `None` when the field is absent or has no value
    pub fn get(&self, field: &str) -> Option<&str> {
        self.attributes
            .as_ref()
            .and_then(|attributes| attributes.get(field))
            .and_then(|value| value.as_deref())
    }

    pub fn attributes(&self) -> Option<&IndexMap<String, Option<String>>> {
        self.attributes.as_ref()
    }

    /// Field names in insertion order
    pub fn field_names(&self) -> Vec<&str> {
        self.attributes
            .iter()
            .flat_map(|attributes| attributes.keys().map(String::as_str))
            .collect()
    }
}

/// Search results
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct RecordList {
    pub fields: Vec<String>,
    pub records: Vec<Record>,
    pub metadata: Metadata,
}

/// Host-facing bridge operations
#[async_trait]
pub trait BridgeAdapter: Send + Sync {
    /// Display name reported to the host
    fn name(&self) -> &str;

    fn version(&self) -> &str;

    /// Number of records matching the request
    async fn count(&self, request: &BridgeRequest) -> Result<u64>;

    /// The single record matching the request, or an empty record
    async fn retrieve(&self, request: &BridgeRequest) -> Result<Record>;

    /// Every record matching the request
    async fn search(&self, request: &BridgeRequest) -> Result<RecordList>;
}
