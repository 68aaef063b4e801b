//! File backend - a single JSON document is the system of record.
//!
//! The working set is an in-memory map from `"<TypeName>.<id>"` to entity. `save` writes
//! every representation to the document; `reload` replaces the working set with the
//! document's contents. Deletes touch only the working set and never cascade: children of
//! a deleted parent stay addressable by key until they are destroyed themselves, but they
//! drop out of the parent's relationship lookups because those filter on live foreign keys.
//!
//! Relationship lookups are linear scans over the working set.

use super::{Objects, Relation, Storage};
use crate::{
    errors::{Error, Result},
    models::{Entity, EntityKind, Representation},
};
use std::{
    collections::BTreeMap,
    path::{Path, PathBuf},
};
use tracing::{debug, info, instrument};

/// JSON-document storage.
#[derive(Debug, Clone)]
pub struct FileStorage {
    path: PathBuf,
    objects: Objects,
}

impl FileStorage {
    /// Creates an empty working set backed by the document at `path`.
    #[must_use]
    pub fn new(path: impl AsRef<Path>) -> Self {
        Self {
            path: path.as_ref().to_path_buf(),
            objects: Objects::new(),
        }
    }

    /// Location of the JSON document.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    fn io_error(&self, source: std::io::Error) -> Error {
        Error::Io {
            path: self.path.clone(),
            source,
        }
    }

    /// Writes the working set to the document, replacing it atomically.
    #[instrument(skip(self), fields(path = %self.path.display()))]
    fn write_document(&self) -> Result<()> {
        let document: BTreeMap<&String, Representation> = self
            .objects
            .iter()
            .map(|(key, entity)| (key, entity.to_representation()))
            .collect();
        let contents = serde_json::to_string(&document)?;

        let mut staging = self.path.clone().into_os_string();
        staging.push(".tmp");
        let staging = PathBuf::from(staging);
        std::fs::write(&staging, contents).map_err(|e| self.io_error(e))?;
        std::fs::rename(&staging, &self.path).map_err(|e| self.io_error(e))?;

        info!("Saved {} objects", document.len());
        Ok(())
    }

    #[instrument(skip(self), fields(path = %self.path.display()))]
    fn read_document(&self) -> Result<Option<Objects>> {
        if !self.path.exists() {
            debug!("No document to load");
            return Ok(None);
        }
        let contents = std::fs::read_to_string(&self.path).map_err(|e| self.io_error(e))?;
        let document: BTreeMap<String, Representation> = serde_json::from_str(&contents)?;

        let mut objects = Objects::new();
        for representation in document.values() {
            let entity = Entity::from_representation(representation)?;
            objects.insert(entity.key(), entity);
        }
        info!("Loaded {} objects", objects.len());
        Ok(Some(objects))
    }
}

impl Storage for FileStorage {
    async fn all(&self, kind: Option<EntityKind>) -> Result<Objects> {
        Ok(self
            .objects
            .iter()
            .filter(|(_, entity)| kind.is_none_or(|k| entity.kind() == k))
            .map(|(key, entity)| (key.clone(), entity.clone()))
            .collect())
    }

    fn new(&mut self, entity: Entity) {
        debug!(key = %entity.key(), "Registering object");
        self.objects.insert(entity.key(), entity);
    }

    async fn save(&mut self) -> Result<()> {
        self.write_document()
    }

    async fn delete(&mut self, entity: Option<&Entity>) -> Result<()> {
        if let Some(entity) = entity {
            if self.objects.remove(&entity.key()).is_some() {
                debug!(key = %entity.key(), "Removed object");
            }
        }
        Ok(())
    }

    async fn reload(&mut self) -> Result<()> {
        if let Some(objects) = self.read_document()? {
            self.objects = objects;
        }
        Ok(())
    }

    async fn close(&mut self) {}

    async fn related(&self, parent: &Entity, relation: Relation) -> Result<Vec<Entity>> {
        relation.check_parent(parent)?;
        // The stored copy is authoritative; the caller's value may predate a link.
        let Some(parent) = self.objects.get(&parent.key()) else {
            return Ok(Vec::new());
        };
        Ok(self
            .objects
            .values()
            .filter(|child| child.kind() == relation.child() && relation.matches(parent, child))
            .cloned()
            .collect())
    }
}
