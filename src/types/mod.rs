//! Response envelopes and entity records.
//!
//! The executor hands back raw JSON; these types give it shape. Entity
//! records only name the fields most callers need and keep everything else
//! in their `extra` map, so any field selection round-trips.

mod entities;

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::Value;

pub use entities::{
    Candidate, ClientContact, ClientCorporation, CorporateUser, JobOrder, JobSubmission,
    Placement, Shift,
};

/// A record type with a fixed upstream entity name.
pub trait Entity: DeserializeOwned + Send {
    /// Entity name as used in REST paths, e.g. `Candidate`.
    const ENTITY_TYPE: &'static str;
}

/// One page of a `search` or `query` response.
#[derive(Deserialize, Serialize, Debug, Clone, PartialEq)]
pub struct Page<T> {
    /// Matching records overall. `query` responses omit it.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub total: Option<u64>,
    #[serde(default)]
    pub start: u64,
    #[serde(default)]
    pub count: u64,
    #[serde(default = "Vec::new")]
    pub data: Vec<T>,
}

impl<T> Page<T> {
    /// The `start` of the following page, or `None` once results are exhausted.
    ///
    /// With a `total` the walk stops at `start + count >= total`. Without one
    /// it stops on a short page (fewer records than `requested`). An empty
    /// page always ends the walk, as does a `start + count` past `u64::MAX`.
    pub fn next_start(&self, requested: Option<u64>) -> Option<u64> {
        if self.count == 0 || self.data.is_empty() {
            return None;
        }
        let next = self.start.checked_add(self.count)?;
        match (self.total, requested) {
            (Some(total), _) => (next < total).then_some(next),
            (None, Some(requested)) if self.count < requested => None,
            (None, _) => Some(next),
        }
    }
}

/// A list response that may or may not be wrapped in a [`Page`].
///
/// Also the shape of to-many association fields, which arrive either as a
/// bare list or as `{"total": n, "data": [...]}`.
#[derive(Deserialize, Serialize, Debug, Clone, PartialEq)]
#[serde(untagged)]
pub enum Listing<T> {
    Bare(Vec<T>),
    Paged(Page<T>),
}

impl<T> Listing<T> {
    pub fn into_data(self) -> Vec<T> {
        match self {
            Listing::Bare(data) => data,
            Listing::Paged(page) => page.data,
        }
    }

    pub fn data(&self) -> &[T] {
        match self {
            Listing::Bare(data) => data,
            Listing::Paged(page) => &page.data,
        }
    }
}

/// `{"data": ...}` wrapper around entity lookups.
#[derive(Deserialize, Serialize, Debug, Clone, PartialEq)]
pub struct EntityResponse<T> {
    pub data: OneOrMany<T>,
}

/// A single record for one id, a list for several.
#[derive(Deserialize, Serialize, Debug, Clone, PartialEq)]
#[serde(untagged)]
pub enum OneOrMany<T> {
    Many(Vec<T>),
    One(T),
}

impl<T> OneOrMany<T> {
    pub fn into_vec(self) -> Vec<T> {
        match self {
            OneOrMany::Many(items) => items,
            OneOrMany::One(item) => vec![item],
        }
    }
}

/// Result of a create, update or delete.
#[derive(Deserialize, Serialize, Debug, Clone, PartialEq, Default)]
#[serde(rename_all = "camelCase")]
pub struct ChangeResponse {
    pub changed_entity_type: Option<String>,
    pub changed_entity_id: Option<i64>,
    pub change_type: Option<String>,
    pub data: Option<Value>,
}

/// Session liveness, from `GET ping`.
#[derive(Deserialize, Serialize, Debug, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Ping {
    /// Expiry as epoch milliseconds.
    pub session_expires: i64,
}
