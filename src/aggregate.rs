//! Merging of per-chunk partial results.
//!
//! The merge step is a pure function of its inputs: minimum and maximum are associative and
//! commutative, and the mean's count/sum pair is associative and commutative by construction.
//! An external engine is therefore free to combine partials in any order or tree shape without
//! coordinating between workers.

use crate::error::ActiveStorageError;
use crate::models::PartialReduction;
use crate::operation::{Element, Reduction};
use crate::operations::{max_element, min_element};

use ndarray::{ArrayD, ErrorKind, IxDyn, ShapeError, Zip};
use std::path::PathBuf;
use tracing::{event, Level};

impl<T> PartialReduction<T> {
    /// Return this record with every field reshaped to the rank of the full array, with each
    /// reduced axis at extent 1.
    ///
    /// The external chunk-aggregation machinery aligns partials by position along unreduced
    /// axes; a collapsed axis instead of a size-1 axis makes it miscompute or fail with a rank
    /// mismatch, so this reshape is applied to every record returned upstream.
    pub fn rank_preserved(self, ndim: usize) -> Result<Self, ActiveStorageError> {
        let shape = vec![1; ndim];
        match self {
            Self::Min { min } => Ok(Self::Min {
                min: reshape(min, &shape)?,
            }),
            Self::Max { max } => Ok(Self::Max {
                max: reshape(max, &shape)?,
            }),
            Self::Mean { n, total } => Ok(Self::Mean {
                n: reshape(n, &shape)?,
                total: reshape(total, &shape)?,
            }),
        }
    }
}

fn reshape<A>(array: ArrayD<A>, shape: &[usize]) -> Result<ArrayD<A>, ActiveStorageError> {
    array
        .into_shape(IxDyn(shape))
        .map_err(ActiveStorageError::ShapeInvalid)
}

/// Apply a binary operation elementwise across two equally shaped arrays.
fn zip_elementwise<A: Copy>(
    a: ArrayD<A>,
    b: ArrayD<A>,
    f: impl Fn(A, A) -> A,
) -> Result<ArrayD<A>, ActiveStorageError> {
    if a.shape() != b.shape() {
        return Err(ActiveStorageError::ShapeInvalid(ShapeError::from_kind(
            ErrorKind::IncompatibleShape,
        )));
    }
    Ok(Zip::from(&a).and(&b).map_collect(|x, y| f(*x, *y)))
}

/// Merges chunk partial-result records for one configured array handle.
///
/// Built from the handle via [aggregator](crate::handle::ArrayHandle::aggregator), so a record
/// for any other operation can be attributed to the handle's resource and variable when
/// rejected.
#[derive(Clone, Debug)]
pub struct Aggregator {
    operation: Reduction,
    ndim: usize,
    path: PathBuf,
    variable: String,
}

impl Aggregator {
    pub(crate) fn new(
        operation: Reduction,
        ndim: usize,
        path: PathBuf,
        variable: String,
    ) -> Self {
        Self {
            operation,
            ndim,
            path,
            variable,
        }
    }

    /// Returns the operation this aggregator merges for.
    pub fn operation(&self) -> Reduction {
        self.operation
    }

    /// Merge one or more partial-result records into a single record.
    ///
    /// The result is as if the operation had been applied to the concatenation of the
    /// contributing chunks: elementwise extremes for minimum and maximum, summed count and sum
    /// accumulators for mean. Every field of the result is reshaped to the full array's rank
    /// with reduced axes at extent 1.
    ///
    /// Fails with [EmptyArray](ActiveStorageError::EmptyArray) when no records are supplied and
    /// with [UnsupportedOperation](ActiveStorageError::UnsupportedOperation) when a record
    /// belongs to a different operation than the aggregator is configured for.
    pub fn aggregate<T: Element>(
        &self,
        partials: Vec<PartialReduction<T>>,
    ) -> Result<PartialReduction<T>, ActiveStorageError> {
        event!(
            Level::DEBUG,
            operation = %self.operation,
            partials = partials.len(),
            "aggregating partial results"
        );
        let mut partials = partials.into_iter();
        let first = partials.next().ok_or(ActiveStorageError::EmptyArray {
            operation: self.operation.name(),
        })?;
        if first.operation() != self.operation {
            return Err(self.unsupported(first.operation()));
        }
        let merged = partials.try_fold(first, |acc, next| self.merge(acc, next))?;
        merged.rank_preserved(self.ndim)
    }

    fn merge<T: Element>(
        &self,
        acc: PartialReduction<T>,
        next: PartialReduction<T>,
    ) -> Result<PartialReduction<T>, ActiveStorageError> {
        match (acc, next) {
            (PartialReduction::Min { min: a }, PartialReduction::Min { min: b }) => {
                Ok(PartialReduction::Min {
                    min: zip_elementwise(a, b, min_element)?,
                })
            }
            (PartialReduction::Max { max: a }, PartialReduction::Max { max: b }) => {
                Ok(PartialReduction::Max {
                    max: zip_elementwise(a, b, max_element)?,
                })
            }
            (
                PartialReduction::Mean { n: n_a, total: total_a },
                PartialReduction::Mean { n: n_b, total: total_b },
            ) => Ok(PartialReduction::Mean {
                n: zip_elementwise(n_a, n_b, |x, y| x + y)?,
                total: zip_elementwise(total_a, total_b, |x, y| x + y)?,
            }),
            (_, next) => Err(self.unsupported(next.operation())),
        }
    }

    fn unsupported(&self, operation: Reduction) -> ActiveStorageError {
        ActiveStorageError::UnsupportedOperation {
            operation: operation.name().to_string(),
            path: self.path.display().to_string(),
            variable: self.variable.clone(),
        }
    }
}
