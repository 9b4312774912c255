//! Collection envelopes and the bulk-delete report.

use serde::{Deserialize, Serialize};

use crate::error::ApiErrorDetail;
use crate::meta::{Meta, MetaWrapper};

/// Who executed the request; present on list responses.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Context {
    pub employee: MetaWrapper,
}

/// One page of a list endpoint.
///
/// `rows` holds this page only; `total()` is the size of the whole
/// collection on the server.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct List<T> {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub context: Option<Context>,
    pub meta: Meta,
    #[serde(default = "Vec::new")]
    pub rows: Vec<T>,
}

impl<T> List<T> {
    /// Number of rows across all pages.
    pub fn total(&self) -> u64 {
        self.meta.size.unwrap_or(self.rows.len() as u64)
    }

    /// Offset of the row following this page, if the server holds more.
    pub fn next_offset(&self) -> Option<u64> {
        let next = self.meta.offset.unwrap_or(0) + self.rows.len() as u64;
        (!self.rows.is_empty() && next < self.total()).then_some(next)
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }
}

impl<T> IntoIterator for List<T> {
    type Item = T;
    type IntoIter = std::vec::IntoIter<T>;

    fn into_iter(self) -> Self::IntoIter {
        self.rows.into_iter()
    }
}

/// A nested collection inside an entity, e.g. `positions`.
///
/// Unless expanded, the server sends only `meta` with the collection size.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MetaArray<T> {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub meta: Option<Meta>,
    #[serde(default = "Vec::new", skip_serializing_if = "Vec::is_empty")]
    pub rows: Vec<T>,
}

impl<T> MetaArray<T> {
    pub fn from_rows(rows: Vec<T>) -> Self {
        Self { meta: None, rows }
    }

    pub fn size(&self) -> u64 {
        self.meta
            .as_ref()
            .and_then(|meta| meta.size)
            .unwrap_or(self.rows.len() as u64)
    }
}

/// Outcome of deleting one item of a bulk request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeleteManyItem {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub info: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub errors: Vec<ApiErrorDetail>,
}

impl DeleteManyItem {
    pub fn is_success(&self) -> bool {
        self.errors.is_empty()
    }
}

/// Per-item report of a bulk delete, in request order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct DeleteManyResponse(pub Vec<DeleteManyItem>);

impl DeleteManyResponse {
    pub fn items(&self) -> &[DeleteManyItem] {
        &self.0
    }

    pub fn success_count(&self) -> usize {
        self.0.iter().filter(|item| item.is_success()).count()
    }

    pub fn failure_count(&self) -> usize {
        self.0.len() - self.success_count()
    }

    /// Indexes (request order) and errors of the items that were not deleted.
    pub fn failures(&self) -> impl Iterator<Item = (usize, &[ApiErrorDetail])> {
        self.0
            .iter()
            .enumerate()
            .filter(|(_, item)| !item.is_success())
            .map(|(index, item)| (index, item.errors.as_slice()))
    }

    pub fn all_succeeded(&self) -> bool {
        self.failure_count() == 0
    }
}
