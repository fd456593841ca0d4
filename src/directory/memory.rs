//! In-process [`Directory`] backed by a `tokio::sync::RwLock<Vec<_>>`.
//!
//! List order is insertion order, which is also the tie-break order the
//! dispatch engine uses.

use async_trait::async_trait;
use tokio::sync::RwLock;

use super::{Destination, DestinationPatch, Directory, NewDestination};
use crate::config::model::DestinationConfig;
use crate::error::HopperError;

#[derive(Debug, Default)]
pub struct MemoryDirectory {
    destinations: RwLock<Vec<Destination>>,
}

impl MemoryDirectory {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Seed from config entries, assigning fresh ids.
    #[must_use]
    pub fn from_config(entries: &[DestinationConfig]) -> Self {
        let destinations = entries
            .iter()
            .cloned()
            .map(|cfg| with_new_id(cfg.into()))
            .collect();
        Self {
            destinations: RwLock::new(destinations),
        }
    }
}

fn with_new_id(new: NewDestination) -> Destination {
    Destination {
        id: uuid::Uuid::new_v4().to_string(),
        url: new.url,
        method: new.method,
        is_active: new.is_active,
        is_default: new.is_default,
    }
}

fn demote_others(destinations: &mut [Destination], keep: &str) {
    for d in destinations.iter_mut().filter(|d| d.id != keep) {
        d.is_default = false;
    }
}

#[async_trait]
impl Directory for MemoryDirectory {
    fn name(&self) -> &'static str {
        "memory"
    }

    async fn list(&self) -> Result<Vec<Destination>, HopperError> {
        Ok(self.destinations.read().await.clone())
    }

    async fn get(&self, id: &str) -> Result<Option<Destination>, HopperError> {
        Ok(self
            .destinations
            .read()
            .await
            .iter()
            .find(|d| d.id == id)
            .cloned())
    }

    async fn create(&self, new: NewDestination) -> Result<Destination, HopperError> {
        let dest = with_new_id(new);
        let mut destinations = self.destinations.write().await;
        if dest.is_default {
            demote_others(&mut destinations, &dest.id);
        }
        destinations.push(dest.clone());
        Ok(dest)
    }

    async fn update(
        &self,
        id: &str,
        patch: DestinationPatch,
    ) -> Result<Option<Destination>, HopperError> {
        let mut destinations = self.destinations.write().await;
        let Some(dest) = destinations.iter_mut().find(|d| d.id == id) else {
            return Ok(None);
        };
        patch.apply(dest);
        let updated = dest.clone();
        if updated.is_default {
            demote_others(&mut destinations, id);
        }
        Ok(Some(updated))
    }

    async fn delete(&self, id: &str) -> Result<bool, HopperError> {
        let mut destinations = self.destinations.write().await;
        let before = destinations.len();
        destinations.retain(|d| d.id != id);
        Ok(destinations.len() != before)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn new_dest(url: &str, default: bool) -> NewDestination {
        NewDestination {
            url: url.into(),
            method: String::new(),
            is_active: true,
            is_default: default,
        }
    }

    #[tokio::test]
    async fn create_assigns_unique_ids_in_order() {
        let dir = MemoryDirectory::new();
        let a = dir.create(new_dest("http://a:80", false)).await.unwrap();
        let b = dir.create(new_dest("http://b:80", false)).await.unwrap();
        assert_ne!(a.id, b.id);

        let listed = dir.list().await.unwrap();
        assert_eq!(listed, vec![a, b]);
    }

    #[tokio::test]
    async fn new_default_demotes_previous_default() {
        let dir = MemoryDirectory::new();
        let a = dir.create(new_dest("http://a:80", true)).await.unwrap();
        let b = dir.create(new_dest("http://b:80", true)).await.unwrap();

        assert!(!dir.get(&a.id).await.unwrap().unwrap().is_default);
        assert!(dir.get(&b.id).await.unwrap().unwrap().is_default);
    }

    #[tokio::test]
    async fn update_promotes_and_demotes() {
        let dir = MemoryDirectory::new();
        let a = dir.create(new_dest("http://a:80", true)).await.unwrap();
        let b = dir.create(new_dest("http://b:80", false)).await.unwrap();

        let patch = DestinationPatch {
            is_default: Some(true),
            ..DestinationPatch::default()
        };
        let updated = dir.update(&b.id, patch).await.unwrap().unwrap();
        assert!(updated.is_default);
        assert!(!dir.get(&a.id).await.unwrap().unwrap().is_default);
    }

    #[tokio::test]
    async fn update_unknown_id_returns_none() {
        let dir = MemoryDirectory::new();
        let result = dir
            .update("missing", DestinationPatch::default())
            .await
            .unwrap();
        assert!(result.is_none());
    }

    #[tokio::test]
    async fn delete_reports_whether_anything_was_removed() {
        let dir = MemoryDirectory::new();
        let a = dir.create(new_dest("http://a:80", false)).await.unwrap();
        assert!(dir.delete(&a.id).await.unwrap());
        assert!(!dir.delete(&a.id).await.unwrap());
        assert!(dir.list().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn seeded_from_config_keeps_flags() {
        let dir = MemoryDirectory::from_config(&[
            DestinationConfig {
                url: "http://a:80".into(),
                method: "POST".into(),
                active: false,
                default: true,
            },
            DestinationConfig {
                url: "http://b:80".into(),
                method: String::new(),
                active: true,
                default: false,
            },
        ]);
        let listed = dir.list().await.unwrap();
        assert_eq!(listed.len(), 2);
        assert_eq!(listed[0].method, "POST");
        assert!(!listed[0].is_active);
        assert!(listed[0].is_default);
        assert!(listed[1].is_active);
    }
}
