//! The destination directory: where the dispatch engine gets its targets.
//!
//! [`Directory`] is the pluggable seam. The engine only ever calls
//! [`Directory::list`] and treats the result as a point-in-time snapshot;
//! the remaining operations back the `/destinations` REST API.
//! [`MemoryDirectory`](memory::MemoryDirectory) is seeded from the config
//! file, and the optional `mongodb` backend keeps destinations in a
//! collection.

pub mod memory;

#[cfg(feature = "mongodb")]
pub mod mongodb;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::config::model::DestinationConfig;
use crate::error::HopperError;

/// A configured forwarding target.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Destination {
    pub id: String,
    pub url: String,
    /// Empty matches every inbound method.
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub method: String,
    #[serde(default)]
    pub is_active: bool,
    #[serde(default)]
    pub is_default: bool,
}

impl Destination {
    /// Active and accepting `method`. The comparison is case-sensitive.
    #[must_use]
    pub fn accepts(&self, method: &str) -> bool {
        self.is_active && (self.method.is_empty() || self.method == method)
    }
}

/// Body of `POST /destinations`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewDestination {
    pub url: String,
    #[serde(default)]
    pub method: String,
    #[serde(default)]
    pub is_active: bool,
    #[serde(default)]
    pub is_default: bool,
}

impl From<DestinationConfig> for NewDestination {
    fn from(cfg: DestinationConfig) -> Self {
        Self {
            url: cfg.url,
            method: cfg.method,
            is_active: cfg.active,
            is_default: cfg.default,
        }
    }
}

/// Body of `PUT /destinations/{id}`.
///
/// `url` and `method` are only applied when present and non-empty; the
/// flags are applied whenever present.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DestinationPatch {
    #[serde(default)]
    pub url: Option<String>,
    #[serde(default)]
    pub method: Option<String>,
    #[serde(default)]
    pub is_active: Option<bool>,
    #[serde(default)]
    pub is_default: Option<bool>,
}

impl DestinationPatch {
    pub(crate) fn apply(&self, dest: &mut Destination) {
        if let Some(url) = self.url.as_ref().filter(|u| !u.is_empty()) {
            dest.url.clone_from(url);
        }
        if let Some(method) = self.method.as_ref().filter(|m| !m.is_empty()) {
            dest.method.clone_from(method);
        }
        if let Some(active) = self.is_active {
            dest.is_active = active;
        }
        if let Some(default) = self.is_default {
            dest.is_default = default;
        }
    }
}

// async_trait is required here because Directory is shared as Arc<dyn Directory>.
#[async_trait]
pub trait Directory: Send + Sync {
    fn name(&self) -> &'static str;

    async fn list(&self) -> Result<Vec<Destination>, HopperError>;

    async fn get(&self, id: &str) -> Result<Option<Destination>, HopperError>;

    /// Insert a destination. Creating a default demotes every other one.
    async fn create(&self, new: NewDestination) -> Result<Destination, HopperError>;

    /// Returns `None` when `id` is unknown.
    async fn update(
        &self,
        id: &str,
        patch: DestinationPatch,
    ) -> Result<Option<Destination>, HopperError>;

    /// Returns `false` when `id` is unknown.
    async fn delete(&self, id: &str) -> Result<bool, HopperError>;
}
