//! Filesystem-backed resource store.
//!
//! A repository directory mirrors the `Library://` tree: documents are XML
//! files named `<name>.<Type>`, folders are directories. Session resources
//! are connection-scoped and have no place on disk, so session identifiers
//! are rejected.

use std::fs;
use std::path::{Path, PathBuf};

use atlas_core::codec;
use atlas_core::error::{Error, Result};
use atlas_core::markup::MarkupDocument;
use atlas_core::resource_id::LIBRARY_ROOT;
use atlas_core::rewrite::ResourceGraphNode;
use atlas_core::store::{ResourceEntry, ResourceStore};
use walkdir::WalkDir;

pub struct FsStore {
    root: PathBuf,
}

impl FsStore {
    pub fn new(root: impl Into<PathBuf>) -> Result<Self> {
        let root = root.into();
        if !root.is_dir() {
            return Err(Error::Store(format!(
                "repository root {} is not a directory",
                root.display()
            )));
        }
        Ok(Self { root })
    }

    fn resolve(&self, id: &str) -> Result<PathBuf> {
        let rel = id
            .strip_prefix(LIBRARY_ROOT)
            .ok_or_else(|| Error::InvalidIdentifier {
                id: id.to_string(),
                reason: "the filesystem store only holds Library:// resources",
            })?;
        let rel = rel.trim_end_matches('/');
        if rel.split('/').any(|segment| segment == "..") {
            return Err(Error::InvalidIdentifier {
                id: id.to_string(),
                reason: "path segments may not traverse upwards",
            });
        }
        Ok(self.root.join(rel))
    }

    fn id_for(&self, path: &Path, is_folder: bool) -> Option<String> {
        let rel = path.strip_prefix(&self.root).ok()?;
        let mut joined = rel
            .components()
            .map(|c| c.as_os_str().to_string_lossy())
            .collect::<Vec<_>>()
            .join("/");
        if is_folder {
            joined.push('/');
        }
        Some(format!("{LIBRARY_ROOT}{joined}"))
    }

    fn read_document(&self, id: &str) -> Result<Vec<u8>> {
        let path = self.resolve(id)?;
        fs::read(&path).map_err(|err| match err.kind() {
            std::io::ErrorKind::NotFound => Error::NotFound(id.to_string()),
            _ => Error::Io(err),
        })
    }
}

impl ResourceStore for FsStore {
    fn get(&self, id: &str) -> Result<ResourceGraphNode> {
        let bytes = self.read_document(id)?;
        codec::decode(id, &bytes)
    }

    fn save(&self, id: &str, resource: &ResourceGraphNode) -> Result<()> {
        let path = self.resolve(id)?;
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        fs::write(&path, codec::encode(resource)?)?;
        Ok(())
    }

    fn delete(&self, id: &str) -> Result<()> {
        let path = self.resolve(id)?;
        let result = if id.ends_with('/') {
            fs::remove_dir_all(&path)
        } else {
            fs::remove_file(&path)
        };
        result.map_err(|err| match err.kind() {
            std::io::ErrorKind::NotFound => Error::NotFound(id.to_string()),
            _ => Error::Io(err),
        })
    }

    fn resource_exists(&self, id: &str) -> Result<bool> {
        Ok(self.resolve(id)?.exists())
    }

    fn move_resource(&self, old_id: &str, new_id: &str, overwrite: bool) -> Result<()> {
        let old_path = self.resolve(old_id)?;
        let new_path = self.resolve(new_id)?;
        if !old_path.is_file() {
            return Err(Error::NotFound(old_id.to_string()));
        }
        if !overwrite && new_path.exists() {
            return Err(Error::AlreadyExists(new_id.to_string()));
        }
        if let Some(parent) = new_path.parent() {
            fs::create_dir_all(parent)?;
        }
        fs::rename(&old_path, &new_path)?;
        Ok(())
    }

    fn copy_resource(&self, old_id: &str, new_id: &str, overwrite: bool) -> Result<()> {
        let old_path = self.resolve(old_id)?;
        let new_path = self.resolve(new_id)?;
        if !old_path.is_file() {
            return Err(Error::NotFound(old_id.to_string()));
        }
        if !overwrite && new_path.exists() {
            return Err(Error::AlreadyExists(new_id.to_string()));
        }
        if let Some(parent) = new_path.parent() {
            fs::create_dir_all(parent)?;
        }
        fs::copy(&old_path, &new_path)?;
        Ok(())
    }

    fn move_folder(&self, old_path: &str, new_path: &str, overwrite: bool) -> Result<()> {
        let source = self.resolve(old_path)?;
        let target = self.resolve(new_path)?;
        if !source.is_dir() {
            return Err(Error::NotFound(old_path.to_string()));
        }
        if target.exists() {
            if !overwrite {
                return Err(Error::AlreadyExists(new_path.to_string()));
            }
            fs::remove_dir_all(&target)?;
        }
        if let Some(parent) = target.parent() {
            fs::create_dir_all(parent)?;
        }
        fs::rename(&source, &target)?;
        Ok(())
    }

    fn copy_folder(&self, old_path: &str, new_path: &str, overwrite: bool) -> Result<()> {
        let source = self.resolve(old_path)?;
        let target = self.resolve(new_path)?;
        if !source.is_dir() {
            return Err(Error::NotFound(old_path.to_string()));
        }
        if target.exists() && !overwrite {
            return Err(Error::AlreadyExists(new_path.to_string()));
        }
        for entry in WalkDir::new(&source).sort_by_file_name() {
            let entry = entry.map_err(|err| Error::Store(err.to_string()))?;
            let rel = entry
                .path()
                .strip_prefix(&source)
                .map_err(|err| Error::Store(err.to_string()))?;
            let dest = target.join(rel);
            if entry.file_type().is_dir() {
                fs::create_dir_all(&dest)?;
            } else {
                if let Some(parent) = dest.parent() {
                    fs::create_dir_all(parent)?;
                }
                fs::copy(entry.path(), &dest)?;
            }
        }
        Ok(())
    }

    fn enumerate_references(&self, id: &str) -> Result<Vec<String>> {
        let mut owners = Vec::new();
        for entry in WalkDir::new(&self.root).sort_by_file_name() {
            let entry = entry.map_err(|err| Error::Store(err.to_string()))?;
            if !entry.file_type().is_file() {
                continue;
            }
            let bytes = fs::read(entry.path())?;
            let document = match MarkupDocument::parse(&bytes) {
                Ok(document) => document,
                Err(err) => {
                    tracing::debug!(path = %entry.path().display(), error = %err, "skipping unparsable file during reference scan");
                    continue;
                }
            };
            if document.resource_id_values().iter().any(|value| *value == id) {
                if let Some(owner) = self.id_for(entry.path(), false) {
                    owners.push(owner);
                }
            }
        }
        owners.sort();
        Ok(owners)
    }

    fn list_resources(&self, folder_path: &str) -> Result<Vec<ResourceEntry>> {
        let base = self.resolve(folder_path)?;
        if !base.is_dir() {
            return Err(Error::NotFound(folder_path.to_string()));
        }
        let mut entries = Vec::new();
        for entry in WalkDir::new(&base).min_depth(1).sort_by_file_name() {
            let entry = entry.map_err(|err| Error::Store(err.to_string()))?;
            let is_folder = entry.file_type().is_dir();
            if let Some(path) = self.id_for(entry.path(), is_folder) {
                entries.push(ResourceEntry { path, is_folder });
            }
        }
        entries.sort_by(|a, b| a.path.cmp(&b.path));
        Ok(entries)
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use atlas_core::model::TypedResource;
    use atlas_core::orchestrate::{move_folder_with_references, CancelFlag, NullProgress};

    fn write_repo_file(root: &Path, rel: &str, content: &str) {
        let path = root.join(rel);
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(path, content).unwrap();
    }

    fn seeded_repo() -> tempfile::TempDir {
        let dir = tempfile::tempdir().unwrap();
        write_repo_file(
            dir.path(),
            "Data/Roads.FeatureSource",
            "<FeatureSource><Provider>OSGeo.SDF</Provider></FeatureSource>",
        );
        write_repo_file(
            dir.path(),
            "Layers/Roads.LayerDefinition",
            "<LayerDefinition>\n  <ResourceId>Library://Data/Roads.FeatureSource</ResourceId>\n  <FeatureClass>Default:Roads</FeatureClass>\n  <Geometry>Geometry</Geometry>\n</LayerDefinition>",
        );
        dir
    }

    #[test]
    fn rejects_session_identifiers() {
        let dir = seeded_repo();
        let store = FsStore::new(dir.path()).unwrap();
        let err = store.get("Session:abc//Scratch/X.FeatureSource");
        assert!(matches!(err, Err(Error::InvalidIdentifier { .. })));
    }

    #[test]
    fn rejects_upward_traversal() {
        let dir = seeded_repo();
        let store = FsStore::new(dir.path()).unwrap();
        let err = store.get("Library://../secrets.FeatureSource");
        assert!(matches!(err, Err(Error::InvalidIdentifier { .. })));
    }

    #[test]
    fn enumerates_references_across_the_tree() {
        let dir = seeded_repo();
        let store = FsStore::new(dir.path()).unwrap();
        let owners = store
            .enumerate_references("Library://Data/Roads.FeatureSource")
            .unwrap();
        assert_eq!(owners, vec!["Library://Layers/Roads.LayerDefinition"]);
    }

    #[test]
    fn listing_reports_documents_and_folders() {
        let dir = seeded_repo();
        let store = FsStore::new(dir.path()).unwrap();
        let entries = store.list_resources("Library://").unwrap();
        let folders: Vec<&str> = entries
            .iter()
            .filter(|e| e.is_folder)
            .map(|e| e.path.as_str())
            .collect();
        assert_eq!(folders, vec!["Library://Data/", "Library://Layers/"]);
    }

    #[test]
    fn folder_move_workflow_runs_against_the_filesystem() {
        let dir = seeded_repo();
        let store = FsStore::new(dir.path()).unwrap();

        let outcome = move_folder_with_references(
            &store,
            "Library://Data",
            "Library://Archive/Data",
            &mut NullProgress,
            &CancelFlag::new(),
        )
        .unwrap();

        assert!(outcome.completed());
        assert!(dir.path().join("Archive/Data/Roads.FeatureSource").is_file());
        assert!(!dir.path().join("Data").exists());

        let node = store.get("Library://Layers/Roads.LayerDefinition").unwrap();
        let ResourceGraphNode::Typed(TypedResource::LayerDefinition(layer)) = node else {
            panic!("expected a typed layer definition");
        };
        assert_eq!(
            layer.resource_id,
            "Library://Archive/Data/Roads.FeatureSource"
        );
    }
}
