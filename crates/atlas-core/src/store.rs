//! The storage contract and an in-process implementation.
//!
//! [`ResourceStore`] is the seam between the reference workflows and
//! whatever actually holds the repository: an HTTP site, a filesystem, or
//! the in-memory [`MemoryStore`] bundled here for embedders and tests.

use dashmap::{DashMap, DashSet};

use crate::codec;
use crate::error::{Error, Result};
use crate::markup::MarkupDocument;
use crate::resource_id;
use crate::rewrite::ResourceGraphNode;

/// One entry of a folder listing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResourceEntry {
    pub path: String,
    pub is_folder: bool,
}

/// Storage operations the workflows are built on.
///
/// `enumerate_references` must answer for identifiers that no longer
/// physically exist: after a move the old identifier is queried to find the
/// documents still pointing at it. Referencing resources are those whose
/// content embeds the exact identifier. `list_resources` returns the whole
/// subtree of a folder, documents and subfolders, in a stable sorted order.
pub trait ResourceStore {
    fn get(&self, id: &str) -> Result<ResourceGraphNode>;
    fn save(&self, id: &str, resource: &ResourceGraphNode) -> Result<()>;
    fn delete(&self, id: &str) -> Result<()>;
    fn resource_exists(&self, id: &str) -> Result<bool>;
    fn move_resource(&self, old_id: &str, new_id: &str, overwrite: bool) -> Result<()>;
    fn copy_resource(&self, old_id: &str, new_id: &str, overwrite: bool) -> Result<()>;
    fn move_folder(&self, old_path: &str, new_path: &str, overwrite: bool) -> Result<()>;
    fn copy_folder(&self, old_path: &str, new_path: &str, overwrite: bool) -> Result<()>;
    fn enumerate_references(&self, id: &str) -> Result<Vec<String>>;
    fn list_resources(&self, folder_path: &str) -> Result<Vec<ResourceEntry>>;
}

/// In-process store over concurrent maps.
///
/// Documents are kept as serialized XML bytes keyed by identifier; empty
/// folders are tracked separately, non-empty ones are implied by their
/// contents. Each store owns a freshly minted session id for
/// `Session:<id>//` resources.
pub struct MemoryStore {
    documents: DashMap<String, Vec<u8>>,
    folders: DashSet<String>,
    session: String,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self {
            documents: DashMap::new(),
            folders: DashSet::new(),
            session: resource_id::mint_session_id(),
        }
    }

    pub fn session_id(&self) -> &str {
        &self.session
    }

    /// Store a document from raw XML, bypassing the typed codec. Handy for
    /// seeding a repository.
    pub fn put_xml(&self, id: &str, xml: &str) -> Result<()> {
        resource_id::validate(id)?;
        if resource_id::is_folder(id) {
            return Err(Error::InvalidIdentifier {
                id: id.to_string(),
                reason: "a folder cannot hold document content",
            });
        }
        self.documents.insert(id.to_string(), xml.as_bytes().to_vec());
        Ok(())
    }

    pub fn create_folder(&self, path: &str) -> Result<()> {
        let path = resource_id::fix_folder_path(path)?;
        self.folders.insert(path);
        Ok(())
    }

    fn take_document(&self, id: &str) -> Result<Vec<u8>> {
        self.documents
            .remove(id)
            .map(|(_, bytes)| bytes)
            .ok_or_else(|| Error::NotFound(id.to_string()))
    }

    fn folder_targets(&self, old_path: &str, new_path: &str) -> Result<Vec<(String, String)>> {
        let old_path = resource_id::fix_folder_path(old_path)?;
        let new_path = resource_id::fix_folder_path(new_path)?;
        let moves = self
            .documents
            .iter()
            .filter_map(|entry| {
                let rel = entry.key().strip_prefix(old_path.as_str())?.to_string();
                Some((entry.key().clone(), format!("{new_path}{rel}")))
            })
            .collect();
        Ok(moves)
    }

    fn check_overwrite(&self, targets: &[(String, String)], overwrite: bool) -> Result<()> {
        if overwrite {
            return Ok(());
        }
        for (_, target) in targets {
            if self.documents.contains_key(target) {
                return Err(Error::AlreadyExists(target.clone()));
            }
        }
        Ok(())
    }
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

impl ResourceStore for MemoryStore {
    fn get(&self, id: &str) -> Result<ResourceGraphNode> {
        let bytes = self
            .documents
            .get(id)
            .ok_or_else(|| Error::NotFound(id.to_string()))?;
        codec::decode(id, bytes.value())
    }

    fn save(&self, id: &str, resource: &ResourceGraphNode) -> Result<()> {
        resource_id::validate(id)?;
        if resource_id::is_folder(id) {
            return Err(Error::InvalidIdentifier {
                id: id.to_string(),
                reason: "a folder cannot hold document content",
            });
        }
        let bytes = codec::encode(resource)?;
        self.documents.insert(id.to_string(), bytes);
        Ok(())
    }

    fn delete(&self, id: &str) -> Result<()> {
        if resource_id::is_folder(id) {
            let folder = resource_id::fix_folder_path(id)?;
            self.documents.retain(|key, _| !key.starts_with(&folder));
            self.folders.retain(|key| !key.starts_with(&folder));
            return Ok(());
        }
        self.take_document(id).map(|_| ())
    }

    fn resource_exists(&self, id: &str) -> Result<bool> {
        if resource_id::is_folder(id) {
            let implied = self
                .documents
                .iter()
                .any(|entry| entry.key().starts_with(id));
            return Ok(implied || self.folders.contains(id));
        }
        Ok(self.documents.contains_key(id))
    }

    fn move_resource(&self, old_id: &str, new_id: &str, overwrite: bool) -> Result<()> {
        if !overwrite && self.documents.contains_key(new_id) {
            return Err(Error::AlreadyExists(new_id.to_string()));
        }
        let bytes = self.take_document(old_id)?;
        self.documents.insert(new_id.to_string(), bytes);
        Ok(())
    }

    fn copy_resource(&self, old_id: &str, new_id: &str, overwrite: bool) -> Result<()> {
        if !overwrite && self.documents.contains_key(new_id) {
            return Err(Error::AlreadyExists(new_id.to_string()));
        }
        let bytes = self
            .documents
            .get(old_id)
            .map(|entry| entry.value().clone())
            .ok_or_else(|| Error::NotFound(old_id.to_string()))?;
        self.documents.insert(new_id.to_string(), bytes);
        Ok(())
    }

    fn move_folder(&self, old_path: &str, new_path: &str, overwrite: bool) -> Result<()> {
        let targets = self.folder_targets(old_path, new_path)?;
        self.check_overwrite(&targets, overwrite)?;
        for (old_key, new_key) in targets {
            if let Some((_, bytes)) = self.documents.remove(&old_key) {
                self.documents.insert(new_key, bytes);
            }
        }
        let old_path = resource_id::fix_folder_path(old_path)?;
        let new_path = resource_id::fix_folder_path(new_path)?;
        let relocated: Vec<String> = self
            .folders
            .iter()
            .filter(|f| f.key().starts_with(&old_path))
            .map(|f| f.key().clone())
            .collect();
        for folder in relocated {
            self.folders.remove(&folder);
            self.folders
                .insert(format!("{new_path}{}", &folder[old_path.len()..]));
        }
        self.folders.remove(&old_path);
        self.folders.insert(new_path);
        Ok(())
    }

    fn copy_folder(&self, old_path: &str, new_path: &str, overwrite: bool) -> Result<()> {
        let targets = self.folder_targets(old_path, new_path)?;
        self.check_overwrite(&targets, overwrite)?;
        for (old_key, new_key) in targets {
            if let Some(bytes) = self.documents.get(&old_key).map(|e| e.value().clone()) {
                self.documents.insert(new_key, bytes);
            }
        }
        self.folders
            .insert(resource_id::fix_folder_path(new_path)?);
        Ok(())
    }

    fn enumerate_references(&self, id: &str) -> Result<Vec<String>> {
        let mut owners: Vec<String> = self
            .documents
            .iter()
            .filter_map(|entry| {
                let document = match MarkupDocument::parse(entry.value()) {
                    Ok(document) => document,
                    Err(err) => {
                        tracing::debug!(path = %entry.key(), error = %err, "skipping unparsable document during reference scan");
                        return None;
                    }
                };
                document
                    .resource_id_values()
                    .iter()
                    .any(|value| *value == id)
                    .then(|| entry.key().clone())
            })
            .collect();
        owners.sort();
        Ok(owners)
    }

    fn list_resources(&self, folder_path: &str) -> Result<Vec<ResourceEntry>> {
        let folder = resource_id::fix_folder_path(folder_path)?;
        let mut entries: std::collections::BTreeMap<String, bool> =
            std::collections::BTreeMap::new();

        for entry in self.documents.iter() {
            let Some(rel) = entry.key().strip_prefix(folder.as_str()) else {
                continue;
            };
            entries.insert(entry.key().clone(), false);
            // Parent folders of the document are part of the subtree too.
            for (idx, ch) in rel.char_indices() {
                if ch == '/' {
                    entries.insert(format!("{folder}{}", &rel[..=idx]), true);
                }
            }
        }
        for explicit in self.folders.iter() {
            if explicit.key().starts_with(&folder) && explicit.key() != &folder {
                entries.insert(explicit.key().clone(), true);
            }
        }

        Ok(entries
            .into_iter()
            .map(|(path, is_folder)| ResourceEntry { path, is_folder })
            .collect())
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    fn seeded_store() -> MemoryStore {
        let store = MemoryStore::new();
        store
            .put_xml(
                "Library://Data/Roads.FeatureSource",
                r#"<FeatureSource><Provider>OSGeo.SDF</Provider></FeatureSource>"#,
            )
            .unwrap();
        store
            .put_xml(
                "Library://Data/Roads.LayerDefinition",
                r#"<LayerDefinition>
  <ResourceId>Library://Data/Roads.FeatureSource</ResourceId>
  <FeatureClass>Default:Roads</FeatureClass>
  <Geometry>Geometry</Geometry>
</LayerDefinition>"#,
            )
            .unwrap();
        store
            .put_xml(
                "Library://Maps/City.MapDefinition",
                r#"<MapDefinition>
  <Name>City</Name>
  <CoordinateSystem>WGS84</CoordinateSystem>
  <MapLayer>
    <Name>Roads</Name>
    <ResourceId>Library://Data/Roads.LayerDefinition</ResourceId>
  </MapLayer>
</MapDefinition>"#,
            )
            .unwrap();
        store
    }

    #[test]
    fn enumerates_references_in_sorted_order() {
        let store = seeded_store();
        store
            .put_xml(
                "Library://Apps/Viewer.WebLayout",
                r#"<WebLayout><Title>V</Title><Map><ResourceId>Library://Data/Roads.LayerDefinition</ResourceId></Map></WebLayout>"#,
            )
            .unwrap();

        let owners = store
            .enumerate_references("Library://Data/Roads.LayerDefinition")
            .unwrap();
        assert_eq!(
            owners,
            vec![
                "Library://Apps/Viewer.WebLayout",
                "Library://Maps/City.MapDefinition",
            ]
        );
    }

    #[test]
    fn reference_enumeration_answers_for_missing_identifiers() {
        let store = seeded_store();
        store.delete("Library://Data/Roads.FeatureSource").unwrap();

        // The layer still points at the deleted identifier.
        let owners = store
            .enumerate_references("Library://Data/Roads.FeatureSource")
            .unwrap();
        assert_eq!(owners, vec!["Library://Data/Roads.LayerDefinition"]);
    }

    #[test]
    fn move_folder_relocates_subtree() {
        let store = seeded_store();
        store
            .move_folder("Library://Data/", "Library://Archive/Data/", true)
            .unwrap();

        assert!(!store
            .resource_exists("Library://Data/Roads.FeatureSource")
            .unwrap());
        assert!(store
            .resource_exists("Library://Archive/Data/Roads.FeatureSource")
            .unwrap());
    }

    #[test]
    fn copy_folder_keeps_originals() {
        let store = seeded_store();
        store
            .copy_folder("Library://Data/", "Library://Backup/", true)
            .unwrap();

        assert!(store
            .resource_exists("Library://Data/Roads.FeatureSource")
            .unwrap());
        assert!(store
            .resource_exists("Library://Backup/Roads.FeatureSource")
            .unwrap());
    }

    #[test]
    fn move_resource_respects_overwrite_flag() {
        let store = seeded_store();
        let err = store.move_resource(
            "Library://Data/Roads.FeatureSource",
            "Library://Maps/City.MapDefinition",
            false,
        );
        assert!(matches!(err, Err(Error::AlreadyExists(_))));
    }

    #[test]
    fn listing_covers_subtree_with_folders() {
        let store = seeded_store();
        store
            .put_xml(
                "Library://Data/Imported/Rivers.FeatureSource",
                r#"<FeatureSource><Provider>OSGeo.SHP</Provider></FeatureSource>"#,
            )
            .unwrap();

        let entries = store.list_resources("Library://Data/").unwrap();
        let paths: Vec<(String, bool)> = entries
            .into_iter()
            .map(|e| (e.path, e.is_folder))
            .collect();
        assert_eq!(
            paths,
            vec![
                ("Library://Data/Imported/".to_string(), true),
                (
                    "Library://Data/Imported/Rivers.FeatureSource".to_string(),
                    false
                ),
                ("Library://Data/Roads.FeatureSource".to_string(), false),
                ("Library://Data/Roads.LayerDefinition".to_string(), false),
            ]
        );
    }

    #[test]
    fn get_returns_typed_model_for_known_suffix() {
        let store = seeded_store();
        let node = store.get("Library://Maps/City.MapDefinition").unwrap();
        assert!(matches!(
            node,
            ResourceGraphNode::Typed(crate::model::TypedResource::MapDefinition(_))
        ));
    }
}
