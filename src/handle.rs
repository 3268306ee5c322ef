//! Lazy handle on a chunked, file-backed array variable.

use crate::aggregate::Aggregator;
use crate::error::ActiveStorageError;
use crate::models::{DType, Payload, ReductionAxes, Slice};
use crate::operation::{ChunkFunction, Element, Reduction};
use crate::storage::Store;

use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{event, Level};

/// Operation state attached to a configured handle.
///
/// Copied by value when a handle is configured, so configuring one handle never affects the
/// state of another derived from the same base.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ActiveOperation {
    /// The configured reduction
    pub reduction: Reduction,
    /// The axes the reduction collapses
    pub axes: ReductionAxes,
}

/// A lazy handle on one array variable within a backing resource.
///
/// The handle knows where the variable lives and what it looks like; element data is only
/// touched by [read](ArrayHandle::read), one index range at a time. An external
/// chunked-execution engine is expected to hold one handle and issue a read per chunk, possibly
/// from many threads at once: each read is self-contained and handles share no mutable state.
///
/// Attaching an active operation copies the handle, so any number of independently configured
/// handles can be derived from one base without interference.
#[derive(Clone, Debug)]
pub struct ArrayHandle {
    store: Arc<dyn Store>,
    path: PathBuf,
    variable: String,
    dtype: DType,
    shape: Vec<usize>,
    operation: Option<ActiveOperation>,
}

impl ArrayHandle {
    /// Return a new, unconfigured ArrayHandle.
    ///
    /// # Arguments
    ///
    /// * `store`: Capability used to open the backing resource
    /// * `path`: Location of the backing resource
    /// * `variable`: Name of the variable within the resource
    /// * `dtype`: Element data type of the variable
    /// * `shape`: Shape of the full variable
    pub fn new(
        store: Arc<dyn Store>,
        path: impl Into<PathBuf>,
        variable: impl Into<String>,
        dtype: DType,
        shape: Vec<usize>,
    ) -> Self {
        Self {
            store,
            path: path.into(),
            variable: variable.into(),
            dtype,
            shape,
            operation: None,
        }
    }

    /// Returns the location of the backing resource.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Returns the name of the variable within the resource.
    pub fn variable(&self) -> &str {
        &self.variable
    }

    /// Returns the element data type.
    pub fn dtype(&self) -> DType {
        self.dtype
    }

    /// Returns the shape of the full variable.
    pub fn shape(&self) -> &[usize] {
        &self.shape
    }

    // Rank and element count are always derived from the shape so they cannot drift from it.

    /// Returns the number of dimensions.
    pub fn ndim(&self) -> usize {
        self.shape.len()
    }

    /// Returns the total number of elements.
    pub fn size(&self) -> usize {
        self.shape.iter().product()
    }

    /// Returns the configured operation state, if any.
    pub fn active_operation(&self) -> Option<ActiveOperation> {
        self.operation
    }

    /// Returns the configured reduction, if any.
    pub fn operation(&self) -> Option<Reduction> {
        self.operation.map(|operation| operation.reduction)
    }

    /// Return a copy of this handle with an active operation configured.
    ///
    /// The receiver is not modified.
    pub fn with_operation(&self, reduction: Reduction) -> Self {
        let mut handle = self.clone();
        handle.operation = Some(ActiveOperation {
            reduction,
            axes: ReductionAxes::All,
        });
        handle
    }

    /// Return a copy of this handle with an active operation configured by name.
    ///
    /// Fails with [InvalidOperation](ActiveStorageError::InvalidOperation) when the name is
    /// outside the supported set, before any I/O occurs. The receiver is not modified.
    pub fn with_operation_name(&self, name: &str) -> Result<Self, ActiveStorageError> {
        Ok(self.with_operation(name.parse()?))
    }

    /// Returns the per-chunk compute step bound to the configured operation.
    ///
    /// This is what an external reduction engine plugs in as its chunk-local reduction when
    /// active storage is engaged; its signature and record contract match the non-active
    /// equivalent, so the surrounding reduction machinery runs unmodified.
    ///
    /// Fails with [NoOperationConfigured](ActiveStorageError::NoOperationConfigured) when no
    /// operation is set.
    pub fn chunk_function<T: Element>(&self) -> Result<ChunkFunction<T>, ActiveStorageError> {
        self.operation()
            .map(Reduction::chunk_fn)
            .ok_or(ActiveStorageError::NoOperationConfigured)
    }

    /// Returns an [Aggregator] bound to the configured operation and this handle's identity.
    ///
    /// Fails with [NoOperationConfigured](ActiveStorageError::NoOperationConfigured) when no
    /// operation is set.
    pub fn aggregator(&self) -> Result<Aggregator, ActiveStorageError> {
        let operation = self
            .operation()
            .ok_or(ActiveStorageError::NoOperationConfigured)?;
        Ok(Aggregator::new(
            operation,
            self.ndim(),
            self.path.clone(),
            self.variable.clone(),
        ))
    }

    /// Read the sub-block addressed by a selection.
    ///
    /// Opens the backing resource, extracts the addressed data and releases the resource before
    /// returning, on every exit path. With no operation configured the result is a plain
    /// numeric block; with an operation configured the storage layer answers with the chunk's
    /// partial statistic, returned as a rank-preserved partial-result record.
    ///
    /// Failures are scoped to this invocation: the handle and its configuration remain valid
    /// for subsequent reads.
    pub fn read<T: Element>(&self, selection: &[Slice]) -> Result<Payload<T>, ActiveStorageError> {
        if selection.len() != self.ndim() {
            return Err(ActiveStorageError::SelectionShape {
                expected: self.ndim(),
                got: selection.len(),
            });
        }
        let dataset = self.store.open(&self.path)?;
        match self.operation() {
            Some(operation) => {
                event!(
                    Level::DEBUG,
                    path = %self.path.display(),
                    variable = %self.variable,
                    %operation,
                    "active read"
                );
                let response = dataset.reduce(&self.variable, selection, operation)?;
                if response.dtype != self.dtype {
                    return Err(ActiveStorageError::DTypeMismatch {
                        expected: self.dtype,
                        found: response.dtype,
                    });
                }
                let partial = operation.chunk_fn::<T>()(&response)?;
                Ok(Payload::Partial(partial.rank_preserved(self.ndim())?))
            }
            None => {
                event!(
                    Level::DEBUG,
                    path = %self.path.display(),
                    variable = %self.variable,
                    "block read"
                );
                let block = dataset.block(&self.variable, selection)?;
                if block.dtype != self.dtype {
                    return Err(ActiveStorageError::DTypeMismatch {
                        expected: self.dtype,
                        found: block.dtype,
                    });
                }
                let array = crate::array::build_array::<T>(&block.body, &block.shape)?.to_owned();
                Ok(Payload::Block(array))
            }
        }
    }
}

impl std::fmt::Display for ArrayHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "file={} {}{:?}",
            self.path.display(),
            self.variable,
            self.shape
        )
    }
}
