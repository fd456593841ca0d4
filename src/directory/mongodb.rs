//! MongoDB-backed [`Directory`] implementation.
//!
//! Destinations live in the `destinations` collection, one document per
//! destination:
//!
//! ```json
//! { "_id": ObjectId, "url": "http://...", "method": "POST", "isActive": true, "isDefault": false }
//! ```
//!
//! Documents are listed in `_id` order so the dispatch tie-break stays
//! stable across calls.

use async_trait::async_trait;
use futures::TryStreamExt;
use mongodb::bson::oid::ObjectId;
use mongodb::bson::{doc, Document};
use mongodb::{Client, Collection};

use super::{Destination, DestinationPatch, Directory, NewDestination};
use crate::error::HopperError;

const COLLECTION_NAME: &str = "destinations";

fn db_err(e: impl Into<Box<dyn std::error::Error + Send + Sync>>) -> HopperError {
    HopperError::Directory {
        backend: "mongodb",
        source: e.into(),
    }
}

pub struct MongoDirectory {
    collection: Collection<Document>,
}

impl MongoDirectory {
    pub async fn connect(url: &str, database: &str) -> Result<Self, HopperError> {
        let client = Client::with_uri_str(url).await.map_err(db_err)?;

        client
            .database(database)
            .run_command(doc! { "ping": 1 })
            .await
            .map_err(db_err)?;

        tracing::info!(database = %database, "connected to mongodb");

        Ok(Self {
            collection: client
                .database(database)
                .collection::<Document>(COLLECTION_NAME),
        })
    }

    async fn demote_others(&self, keep: ObjectId) -> Result<(), HopperError> {
        self.collection
            .update_many(
                doc! { "_id": { "$ne": keep }, "isDefault": true },
                doc! { "$set": { "isDefault": false } },
            )
            .await
            .map_err(db_err)?;
        Ok(())
    }
}

/// Unknown or malformed ids behave like a missing document.
fn parse_id(id: &str) -> Option<ObjectId> {
    ObjectId::parse_str(id).ok()
}

fn from_document(document: &Document) -> Result<Destination, HopperError> {
    let id = document.get_object_id("_id").map_err(db_err)?;
    Ok(Destination {
        id: id.to_hex(),
        url: document.get_str("url").unwrap_or_default().to_string(),
        method: document.get_str("method").unwrap_or_default().to_string(),
        is_active: document.get_bool("isActive").unwrap_or(false),
        is_default: document.get_bool("isDefault").unwrap_or(false),
    })
}

#[async_trait]
impl Directory for MongoDirectory {
    fn name(&self) -> &'static str {
        "mongodb"
    }

    async fn list(&self) -> Result<Vec<Destination>, HopperError> {
        let documents: Vec<Document> = self
            .collection
            .find(doc! {})
            .sort(doc! { "_id": 1 })
            .await
            .map_err(db_err)?
            .try_collect()
            .await
            .map_err(db_err)?;

        documents.iter().map(from_document).collect()
    }

    async fn get(&self, id: &str) -> Result<Option<Destination>, HopperError> {
        let Some(oid) = parse_id(id) else {
            return Ok(None);
        };
        self.collection
            .find_one(doc! { "_id": oid })
            .await
            .map_err(db_err)?
            .as_ref()
            .map(from_document)
            .transpose()
    }

    async fn create(&self, new: NewDestination) -> Result<Destination, HopperError> {
        let oid = ObjectId::new();
        let mut document = doc! {
            "_id": oid,
            "url": new.url.as_str(),
            "isActive": new.is_active,
            "isDefault": new.is_default,
        };
        if !new.method.is_empty() {
            document.insert("method", new.method.as_str());
        }

        self.collection
            .insert_one(document)
            .await
            .map_err(db_err)?;

        if new.is_default {
            self.demote_others(oid).await?;
        }

        Ok(Destination {
            id: oid.to_hex(),
            url: new.url,
            method: new.method,
            is_active: new.is_active,
            is_default: new.is_default,
        })
    }

    async fn update(
        &self,
        id: &str,
        patch: DestinationPatch,
    ) -> Result<Option<Destination>, HopperError> {
        let Some(oid) = parse_id(id) else {
            return Ok(None);
        };

        let mut set = Document::new();
        if let Some(url) = patch.url.as_ref().filter(|u| !u.is_empty()) {
            set.insert("url", url.as_str());
        }
        if let Some(method) = patch.method.as_ref().filter(|m| !m.is_empty()) {
            set.insert("method", method.as_str());
        }
        if let Some(active) = patch.is_active {
            set.insert("isActive", active);
        }
        if let Some(default) = patch.is_default {
            set.insert("isDefault", default);
        }

        if !set.is_empty() {
            let result = self
                .collection
                .update_one(doc! { "_id": oid }, doc! { "$set": set })
                .await
                .map_err(db_err)?;
            if result.matched_count == 0 {
                return Ok(None);
            }
        }

        if patch.is_default == Some(true) {
            self.demote_others(oid).await?;
        }

        self.get(id).await
    }

    async fn delete(&self, id: &str) -> Result<bool, HopperError> {
        let Some(oid) = parse_id(id) else {
            return Ok(false);
        };
        let result = self
            .collection
            .delete_one(doc! { "_id": oid })
            .await
            .map_err(db_err)?;
        Ok(result.deleted_count > 0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn document_maps_to_destination() {
        let oid = ObjectId::new();
        let document = doc! {
            "_id": oid,
            "url": "http://a:80",
            "isActive": true,
            "isDefault": true,
        };
        let dest = from_document(&document).unwrap();
        assert_eq!(dest.id, oid.to_hex());
        assert!(dest.method.is_empty());
        assert!(dest.is_active && dest.is_default);
    }

    #[test]
    fn malformed_ids_are_ignored() {
        assert!(parse_id("not-an-object-id").is_none());
    }
}
