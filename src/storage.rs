//! Backing resource capability.
//!
//! The file format holding an array variable is an external collaborator: this module only
//! defines the boundary through which a resource is opened, a named variable is sliced and the
//! resource is released. Implementations that sit next to compute-capable storage can also
//! answer reduction requests directly by overriding [Dataset::reduce].

pub mod file;

pub use file::FileStore;

use crate::array;
use crate::error::ActiveStorageError;
use crate::models::{ChunkResponse, RawBlock, Slice};
use crate::operation::Reduction;
use crate::operations;

use std::path::{Path, PathBuf};

/// A source of openable array resources.
pub trait Store: std::fmt::Debug + Send + Sync {
    /// Open the resource at a path.
    ///
    /// Fails with [ResourceAccess](ActiveStorageError::ResourceAccess) naming the path when the
    /// resource does not exist or cannot be opened. The returned dataset releases the resource
    /// when dropped, so a read that fails part way through never leaves the resource open.
    fn open(&self, path: &Path) -> Result<Box<dyn Dataset + '_>, ActiveStorageError>;
}

/// An open resource holding named array variables.
pub trait Dataset: std::fmt::Debug {
    /// Read the sub-block of a named variable addressed by a selection.
    ///
    /// Fails with [VariableNotFound](ActiveStorageError::VariableNotFound) when the variable is
    /// absent from the resource.
    fn block(&self, variable: &str, selection: &[Slice]) -> Result<RawBlock, ActiveStorageError>;

    /// Compute the partial statistic of a named variable over a selection.
    ///
    /// The default implementation reads the addressed sub-block and folds it locally, which is
    /// semantically identical to a reduction performed by the storage layer itself. Stores
    /// backed by compute-capable storage should override this to avoid moving the block.
    fn reduce(
        &self,
        variable: &str,
        selection: &[Slice],
        operation: Reduction,
    ) -> Result<ChunkResponse, ActiveStorageError> {
        let block = self.block(variable, selection)?;
        operations::reduce_chunk(&block, operation)
    }
}

/// An in-memory store of resources, for tests and embedding.
#[derive(Debug, Default)]
pub struct MemoryStore {
    resources: hashbrown::HashMap<PathBuf, hashbrown::HashMap<String, RawBlock>>,
}

impl MemoryStore {
    /// Return a new, empty MemoryStore.
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert a full variable block into a resource, creating the resource if needed.
    pub fn insert(
        &mut self,
        path: impl Into<PathBuf>,
        variable: impl Into<String>,
        block: RawBlock,
    ) {
        self.resources
            .entry(path.into())
            .or_default()
            .insert(variable.into(), block);
    }
}

impl Store for MemoryStore {
    fn open(&self, path: &Path) -> Result<Box<dyn Dataset + '_>, ActiveStorageError> {
        let variables =
            self.resources
                .get(path)
                .ok_or_else(|| ActiveStorageError::ResourceAccess {
                    path: path.display().to_string(),
                    source: std::io::Error::from(std::io::ErrorKind::NotFound),
                })?;
        Ok(Box::new(MemoryDataset {
            path: path.to_path_buf(),
            variables,
        }))
    }
}

#[derive(Debug)]
struct MemoryDataset<'a> {
    path: PathBuf,
    variables: &'a hashbrown::HashMap<String, RawBlock>,
}

impl Dataset for MemoryDataset<'_> {
    fn block(&self, variable: &str, selection: &[Slice]) -> Result<RawBlock, ActiveStorageError> {
        let full =
            self.variables
                .get(variable)
                .ok_or_else(|| ActiveStorageError::VariableNotFound {
                    path: self.path.display().to_string(),
                    variable: variable.to_string(),
                })?;
        array::extract(full, selection)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use crate::models::DType;
    // Bring trait into scope to use as_bytes method.
    use zerocopy::AsBytes;

    fn test_store() -> MemoryStore {
        let mut store = MemoryStore::new();
        let block =
            RawBlock::from_elements::<i64>(DType::Int64, vec![2, 2], &[1, 2, 3, 4]).unwrap();
        store.insert("data.nc", "t", block);
        store
    }

    fn full_selection() -> Vec<Slice> {
        vec![Slice::new(0, 2, 1), Slice::new(0, 2, 1)]
    }

    #[test]
    fn open_missing_resource() {
        let store = test_store();
        match store.open(Path::new("other.nc")).unwrap_err() {
            ActiveStorageError::ResourceAccess { path, source: _ } => {
                assert_eq!("other.nc", path)
            }
            err => panic!("unexpected error {:?}", err),
        }
    }

    #[test]
    fn block_missing_variable() {
        let store = test_store();
        let dataset = store.open(Path::new("data.nc")).unwrap();
        match dataset.block("u", &full_selection()).unwrap_err() {
            ActiveStorageError::VariableNotFound { path, variable } => {
                assert_eq!("data.nc", path);
                assert_eq!("u", variable);
            }
            err => panic!("unexpected error {:?}", err),
        }
    }

    #[test]
    fn block_slices_variable() {
        let store = test_store();
        let dataset = store.open(Path::new("data.nc")).unwrap();
        let selection = vec![Slice::new(1, 2, 1), Slice::new(0, 2, 1)];
        let block = dataset.block("t", &selection).unwrap();
        assert_eq!(vec![1, 2], block.shape);
        assert_eq!([3_i64, 4].as_bytes(), block.body);
    }

    #[test]
    fn reduce_default_implementation() {
        let store = test_store();
        let dataset = store.open(Path::new("data.nc")).unwrap();
        let response = dataset
            .reduce("t", &full_selection(), Reduction::Max)
            .unwrap();
        assert_eq!(4_i64.as_bytes(), response.body);
        assert_eq!(4, response.count);
    }
}
