//! In-memory backend for testing and ephemeral use.
//!
//! [`InMemoryBackend`] keeps every folder as a `BTreeMap` of name to bytes
//! behind a `RwLock`, so listings come back sorted for free. It implements
//! the full [`Backend`] trait and is suitable for unit tests and embedding.

use std::collections::{BTreeMap, HashMap};
use std::io::{Cursor, Read};
use std::path::Path;
use std::sync::RwLock;

use crate::error::{StoreError, StoreResult};
use crate::object::ObjectRef;
use crate::traits::{join_key, Backend};

/// An in-memory implementation of [`Backend`]. Data is lost on drop.
#[derive(Debug, Default)]
pub struct InMemoryBackend {
    folders: RwLock<HashMap<String, BTreeMap<String, Vec<u8>>>>,
}

impl InMemoryBackend {
    /// Create a new empty backend.
    pub fn new() -> Self {
        Self::default()
    }

    /// Seed an object directly, creating the folder if needed.
    pub fn put(&self, folder: &str, name: &str, content: impl Into<Vec<u8>>) {
        let mut folders = self.folders.write().expect("lock poisoned");
        folders
            .entry(folder.to_string())
            .or_default()
            .insert(name.to_string(), content.into());
    }

    /// Fetch an object's bytes, if present.
    pub fn get(&self, folder: &str, name: &str) -> Option<Vec<u8>> {
        let folders = self.folders.read().expect("lock poisoned");
        folders.get(folder)?.get(name).cloned()
    }

    /// All object names in a folder, sorted.
    pub fn names(&self, folder: &str) -> Vec<String> {
        let folders = self.folders.read().expect("lock poisoned");
        folders
            .get(folder)
            .map(|f| f.keys().cloned().collect())
            .unwrap_or_default()
    }
}

impl Backend for InMemoryBackend {
    fn list_objects(&self, folder: &str, prefix: &str) -> StoreResult<Vec<ObjectRef>> {
        let folders = self.folders.read().map_err(|e| StoreError::List {
            path: folder.to_string(),
            reason: format!("lock poisoned: {e}"),
        })?;
        let Some(objects) = folders.get(folder) else {
            return Err(StoreError::List {
                path: folder.to_string(),
                reason: "no such folder".to_string(),
            });
        };
        Ok(objects
            .iter()
            .filter(|(name, _)| name.starts_with(prefix))
            .map(|(name, data)| ObjectRef::new(name.clone(), data.len() as u64))
            .collect())
    }

    fn get_object(&self, folder: &str, name: &str) -> StoreResult<Box<dyn Read + Send>> {
        self.get(folder, name)
            .map(|data| Box::new(Cursor::new(data)) as Box<dyn Read + Send>)
            .ok_or_else(|| StoreError::Read {
                path: join_key(&[folder, name]),
                reason: "no such object".to_string(),
            })
    }

    fn write_object(
        &self,
        artifact: &Path,
        folder: &str,
        name: &str,
        prefix: &str,
    ) -> StoreResult<()> {
        let data = std::fs::read(artifact).map_err(|e| StoreError::Write {
            path: join_key(&[folder, prefix, name]),
            reason: e.to_string(),
        })?;
        self.put(folder, &join_key(&[prefix, name]), data);
        Ok(())
    }

    fn delete_objects(&self, folder: &str, objects: &[ObjectRef]) -> StoreResult<()> {
        let mut folders = self.folders.write().map_err(|e| StoreError::Delete {
            path: folder.to_string(),
            reason: format!("lock poisoned: {e}"),
        })?;
        let Some(contents) = folders.get_mut(folder) else {
            return Err(StoreError::Delete {
                path: folder.to_string(),
                reason: "no such folder".to_string(),
            });
        };
        for obj in objects {
            contents.remove(&obj.name);
        }
        Ok(())
    }

    fn info(&self) -> String {
        "memory".to_string()
    }
}
