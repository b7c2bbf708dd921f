//! Local filesystem backend.
//!
//! Folders are directories, objects are regular files directly inside them.
//! Listing is single-level (no recursion into subdirectories) and sorted
//! lexicographically so chunk boundaries are reproducible across runs.

use std::fs;
use std::io::Read;
use std::path::{Path, PathBuf};

use crate::error::{StoreError, StoreResult};
use crate::object::ObjectRef;
use crate::traits::Backend;

/// Filesystem implementation of [`Backend`].
#[derive(Debug, Default)]
pub struct FsBackend;

impl FsBackend {
    /// Create a new filesystem backend.
    pub fn new() -> Self {
        Self
    }
}

impl Backend for FsBackend {
    fn list_objects(&self, folder: &str, prefix: &str) -> StoreResult<Vec<ObjectRef>> {
        let entries = fs::read_dir(folder).map_err(|e| StoreError::List {
            path: folder.to_string(),
            reason: e.to_string(),
        })?;

        let mut result = Vec::new();
        for entry in entries {
            let entry = entry.map_err(|e| StoreError::List {
                path: folder.to_string(),
                reason: e.to_string(),
            })?;
            let name = entry.file_name().to_string_lossy().into_owned();
            if !name.starts_with(prefix) {
                continue;
            }
            let meta = entry.metadata().map_err(|e| StoreError::List {
                path: format!("{folder}/{name}"),
                reason: e.to_string(),
            })?;
            if !meta.is_file() {
                continue;
            }
            result.push(ObjectRef::new(name, meta.len()));
        }
        result.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(result)
    }

    fn get_object(&self, folder: &str, name: &str) -> StoreResult<Box<dyn Read + Send>> {
        let path = Path::new(folder).join(name);
        let file = fs::File::open(&path).map_err(|e| StoreError::Read {
            path: path.display().to_string(),
            reason: e.to_string(),
        })?;
        Ok(Box::new(file))
    }

    fn write_object(
        &self,
        artifact: &Path,
        folder: &str,
        name: &str,
        prefix: &str,
    ) -> StoreResult<()> {
        let target: PathBuf = [folder, prefix, name].iter().collect();
        if let Some(parent) = target.parent() {
            fs::create_dir_all(parent).map_err(|e| StoreError::Write {
                path: target.display().to_string(),
                reason: e.to_string(),
            })?;
        }
        fs::copy(artifact, &target).map_err(|e| StoreError::Write {
            path: target.display().to_string(),
            reason: e.to_string(),
        })?;
        Ok(())
    }

    fn delete_objects(&self, folder: &str, objects: &[ObjectRef]) -> StoreResult<()> {
        for obj in objects {
            let path = Path::new(folder).join(&obj.name);
            fs::remove_file(&path).map_err(|e| StoreError::Delete {
                path: path.display().to_string(),
                reason: e.to_string(),
            })?;
        }
        Ok(())
    }

    fn info(&self) -> String {
        "fs".to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn write_file(dir: &Path, name: &str, content: &[u8]) {
        let mut f = fs::File::create(dir.join(name)).unwrap();
        f.write_all(content).unwrap();
    }

    #[test]
    fn list_is_sorted_and_prefix_filtered() {
        let dir = tempfile::tempdir().unwrap();
        write_file(dir.path(), "b.csv", b"bbb");
        write_file(dir.path(), "a.csv", b"aa");
        write_file(dir.path(), "other.txt", b"x");

        let backend = FsBackend::new();
        let folder = dir.path().to_str().unwrap();

        let all = backend.list_objects(folder, "").unwrap();
        assert_eq!(
            all,
            vec![
                ObjectRef::new("a.csv", 2),
                ObjectRef::new("b.csv", 3),
                ObjectRef::new("other.txt", 1),
            ]
        );

        let filtered = backend.list_objects(folder, "a").unwrap();
        assert_eq!(filtered, vec![ObjectRef::new("a.csv", 2)]);
    }

    #[test]
    fn list_skips_subdirectories() {
        let dir = tempfile::tempdir().unwrap();
        write_file(dir.path(), "a.csv", b"aa");
        fs::create_dir(dir.path().join("sub")).unwrap();

        let backend = FsBackend::new();
        let listed = backend
            .list_objects(dir.path().to_str().unwrap(), "")
            .unwrap();
        assert_eq!(listed, vec![ObjectRef::new("a.csv", 2)]);
    }

    #[test]
    fn list_missing_folder_names_it() {
        let backend = FsBackend::new();
        let err = backend.list_objects("/nonexistent-frag-dir", "").unwrap_err();
        assert!(matches!(err, StoreError::List { .. }));
        assert!(err.to_string().contains("/nonexistent-frag-dir"));
    }

    #[test]
    fn get_object_streams_content() {
        let dir = tempfile::tempdir().unwrap();
        write_file(dir.path(), "a.csv", b"hello");

        let backend = FsBackend::new();
        let mut reader = backend
            .get_object(dir.path().to_str().unwrap(), "a.csv")
            .unwrap();
        let mut buf = Vec::new();
        reader.read_to_end(&mut buf).unwrap();
        assert_eq!(buf, b"hello");
    }

    #[test]
    fn write_object_creates_intermediate_directories() {
        let src = tempfile::tempdir().unwrap();
        let dst = tempfile::tempdir().unwrap();
        write_file(src.path(), "artifact.gz", b"payload");

        let backend = FsBackend::new();
        backend
            .write_object(
                &src.path().join("artifact.gz"),
                dst.path().to_str().unwrap(),
                "year=2024/month=01/week=01/abc.csv.gz",
                "archive",
            )
            .unwrap();

        let written = dst
            .path()
            .join("archive/year=2024/month=01/week=01/abc.csv.gz");
        assert_eq!(fs::read(written).unwrap(), b"payload");
    }

    #[test]
    fn delete_objects_removes_files() {
        let dir = tempfile::tempdir().unwrap();
        write_file(dir.path(), "a.csv", b"a");
        write_file(dir.path(), "b.csv", b"b");

        let backend = FsBackend::new();
        let folder = dir.path().to_str().unwrap();
        backend
            .delete_objects(
                folder,
                &[ObjectRef::new("a.csv", 1), ObjectRef::new("b.csv", 1)],
            )
            .unwrap();
        assert!(backend.list_objects(folder, "").unwrap().is_empty());
    }

    #[test]
    fn delete_missing_object_reports_path() {
        let dir = tempfile::tempdir().unwrap();
        let backend = FsBackend::new();
        let err = backend
            .delete_objects(
                dir.path().to_str().unwrap(),
                &[ObjectRef::new("ghost.csv", 1)],
            )
            .unwrap_err();
        assert!(matches!(err, StoreError::Delete { .. }));
        assert!(err.to_string().contains("ghost.csv"));
    }
}
