//! Directory-backed file store.
//!
//! A resource is a directory; each variable is stored as a flat file of native-endian element
//! bytes (`<variable>.dat`) next to a JSON metadata sidecar (`<variable>.json`) recording its
//! data type and shape. The layout is this store's private convention, not part of the
//! protocol.

use crate::array;
use crate::error::ActiveStorageError;
use crate::models::{DType, RawBlock, Slice};
use crate::storage::{Dataset, Store};

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Variable metadata sidecar contents.
#[derive(Debug, Deserialize, Serialize)]
struct VariableMeta {
    /// Data type of the elements
    dtype: DType,
    /// Shape of the full variable
    shape: Vec<usize>,
}

/// A store of directory-backed resources.
#[derive(Debug, Default)]
pub struct FileStore;

impl FileStore {
    /// Return a new FileStore.
    pub fn new() -> Self {
        Self
    }

    /// Write a full variable block into a resource directory, creating it if needed.
    ///
    /// Writes the element data file and its metadata sidecar. Existing files are overwritten.
    pub fn write_variable(
        path: &Path,
        variable: &str,
        block: &RawBlock,
    ) -> Result<(), ActiveStorageError> {
        let access_error = |source| ActiveStorageError::ResourceAccess {
            path: path.display().to_string(),
            source,
        };
        std::fs::create_dir_all(path).map_err(access_error)?;
        let meta = VariableMeta {
            dtype: block.dtype,
            shape: block.shape.clone(),
        };
        let meta = serde_json::to_vec(&meta)?;
        std::fs::write(path.join(format!("{variable}.json")), meta).map_err(access_error)?;
        std::fs::write(path.join(format!("{variable}.dat")), &block.body).map_err(access_error)?;
        Ok(())
    }
}

impl Store for FileStore {
    fn open(&self, path: &Path) -> Result<Box<dyn Dataset + '_>, ActiveStorageError> {
        std::fs::metadata(path).map_err(|source| ActiveStorageError::ResourceAccess {
            path: path.display().to_string(),
            source,
        })?;
        Ok(Box::new(FileDataset {
            path: path.to_path_buf(),
        }))
    }
}

/// An open directory-backed resource.
#[derive(Debug)]
struct FileDataset {
    path: PathBuf,
}

impl Dataset for FileDataset {
    fn block(&self, variable: &str, selection: &[Slice]) -> Result<RawBlock, ActiveStorageError> {
        let meta_path = self.path.join(format!("{variable}.json"));
        let meta =
            std::fs::read(&meta_path).map_err(|_| ActiveStorageError::VariableNotFound {
                path: self.path.display().to_string(),
                variable: variable.to_string(),
            })?;
        let meta: VariableMeta = serde_json::from_slice(&meta)?;
        let data_path = self.path.join(format!("{variable}.dat"));
        let body = std::fs::read(&data_path).map_err(|source| {
            ActiveStorageError::ResourceAccess {
                path: data_path.display().to_string(),
                source,
            }
        })?;
        let full = RawBlock {
            body: body.into(),
            dtype: meta.dtype,
            shape: meta.shape,
        };
        array::extract(&full, selection)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use crate::operation::Reduction;
    // Bring trait into scope to use as_bytes method.
    use zerocopy::AsBytes;

    fn write_test_variable(dir: &Path) {
        let block =
            RawBlock::from_elements::<f64>(DType::Float64, vec![2, 3], &[1.0, 2.0, 3.0, 4.0, 5.0, 6.0])
                .unwrap();
        FileStore::write_variable(dir, "q", &block).unwrap();
    }

    #[test]
    fn write_then_read_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        write_test_variable(dir.path());
        let store = FileStore::new();
        let dataset = store.open(dir.path()).unwrap();
        let selection = vec![Slice::new(0, 2, 1), Slice::new(1, 3, 1)];
        let block = dataset.block("q", &selection).unwrap();
        assert_eq!(vec![2, 2], block.shape);
        assert_eq!([2.0_f64, 3.0, 5.0, 6.0].as_bytes(), block.body);
    }

    #[test]
    fn reduce_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        write_test_variable(dir.path());
        let store = FileStore::new();
        let dataset = store.open(dir.path()).unwrap();
        let selection = vec![Slice::new(0, 2, 1), Slice::new(0, 3, 1)];
        let response = dataset.reduce("q", &selection, Reduction::Mean).unwrap();
        assert_eq!(21.0_f64.as_bytes(), response.body);
        assert_eq!(6, response.count);
    }

    #[test]
    fn open_missing_resource() {
        let store = FileStore::new();
        match store.open(Path::new("/nonexistent/resource")).unwrap_err() {
            ActiveStorageError::ResourceAccess { path, source: _ } => {
                assert_eq!("/nonexistent/resource", path)
            }
            err => panic!("unexpected error {:?}", err),
        }
    }

    #[test]
    fn missing_variable() {
        let dir = tempfile::tempdir().unwrap();
        write_test_variable(dir.path());
        let store = FileStore::new();
        let dataset = store.open(dir.path()).unwrap();
        let selection = vec![Slice::new(0, 2, 1), Slice::new(0, 3, 1)];
        match dataset.block("u", &selection).unwrap_err() {
            ActiveStorageError::VariableNotFound { path, variable } => {
                assert_eq!(dir.path().display().to_string(), path);
                assert_eq!("u", variable);
            }
            err => panic!("unexpected error {:?}", err),
        }
    }

    #[test]
    fn corrupt_metadata() {
        let dir = tempfile::tempdir().unwrap();
        write_test_variable(dir.path());
        std::fs::write(dir.path().join("q.json"), b"not json").unwrap();
        let store = FileStore::new();
        let dataset = store.open(dir.path()).unwrap();
        let selection = vec![Slice::new(0, 2, 1), Slice::new(0, 3, 1)];
        match dataset.block("q", &selection).unwrap_err() {
            ActiveStorageError::Metadata(_) => (),
            err => panic!("unexpected error {:?}", err),
        }
    }
}
