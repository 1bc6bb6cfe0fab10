use std::collections::HashMap;
use std::sync::RwLock;

use anyhow::{Result, anyhow};

use crate::Store;
use crate::models::{self, Collection, Document, Filter};

/// In-process store. Documents are kept in insertion order per collection.
#[derive(Default)]
pub struct MemoryStore {
    collections: RwLock<HashMap<Collection, Vec<Document>>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl Store for MemoryStore {
    fn find_one(&self, collection: Collection, filter: &Filter) -> Result<Option<Document>> {
        let collections = self
            .collections
            .read()
            .map_err(|e| anyhow!("Store lock poisoned: {}", e))?;
        Ok(collections
            .get(&collection)
            .and_then(|docs| docs.iter().find(|doc| filter.matches(doc)))
            .cloned())
    }

    fn find_many(&self, collection: Collection, filter: &Filter) -> Result<Vec<Document>> {
        let collections = self
            .collections
            .read()
            .map_err(|e| anyhow!("Store lock poisoned: {}", e))?;
        Ok(collections
            .get(&collection)
            .map(|docs| docs.iter().filter(|doc| filter.matches(doc)).cloned().collect())
            .unwrap_or_default())
    }

    fn insert(&self, collection: Collection, doc: Document) -> Result<Document> {
        let doc = models::stamp(doc);
        let mut collections = self
            .collections
            .write()
            .map_err(|e| anyhow!("Store lock poisoned: {}", e))?;
        collections.entry(collection).or_default().push(doc.clone());
        Ok(doc)
    }

    fn update_fields(&self, collection: Collection, id: &str, patch: Document) -> Result<bool> {
        let filter = Filter::Id(id.to_owned());
        let mut collections = self
            .collections
            .write()
            .map_err(|e| anyhow!("Store lock poisoned: {}", e))?;

        let Some(doc) = collections
            .get_mut(&collection)
            .and_then(|docs| docs.iter_mut().find(|doc| filter.matches(doc)))
        else {
            return Ok(false);
        };

        models::merge(doc, models::sanitize_patch(patch));
        Ok(true)
    }
}
