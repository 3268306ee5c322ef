//! Data types and associated functions and methods

use crate::error::ActiveStorageError;
use crate::operation::{Element, Reduction};

use bytes::Bytes;
use ndarray::ArrayD;
use serde::{Deserialize, Serialize};
use strum_macros::Display;
// Bring trait into scope to use as_bytes method.
use zerocopy::AsBytes;

/// Supported numerical data types
#[derive(Clone, Copy, Debug, Deserialize, Display, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum DType {
    /// [i32]
    Int32,
    /// [i64]
    Int64,
    /// [u32]
    Uint32,
    /// [u64]
    Uint64,
    /// [f32]
    Float32,
    /// [f64]
    Float64,
}

impl DType {
    /// Returns the size of the associated type in bytes.
    pub fn size_of(self) -> usize {
        match self {
            Self::Int32 => std::mem::size_of::<i32>(),
            Self::Int64 => std::mem::size_of::<i64>(),
            Self::Uint32 => std::mem::size_of::<u32>(),
            Self::Uint64 => std::mem::size_of::<u64>(),
            Self::Float32 => std::mem::size_of::<f32>(),
            Self::Float64 => std::mem::size_of::<f64>(),
        }
    }
}

/// A slice of a single dimension of an array
///
/// The API uses NumPy slice semantics:
///
/// When start or end is negative:
/// * positive_start = start + length
/// * positive_end = end + length
///
/// Start and end are clamped:
/// * positive_start = min(positive_start, 0)
/// * positive_end = max(positive_end, length)
///
/// When the stride is positive:
/// * positive_start <= i < positive_end
///
/// When the stride is negative:
/// * positive_end <= i < positive_start
// NOTE: In serde, structs can be deserialised from sequences or maps. This allows us to support
// the [<start>, <end>, <stride>] form, with the convenience of named fields.
#[derive(Clone, Copy, Debug, Deserialize, PartialEq, Serialize)]
#[serde(deny_unknown_fields)]
pub struct Slice {
    /// Start of the slice
    pub start: isize,
    /// End of the slice
    pub end: isize,
    /// Stride size
    pub stride: isize,
}

impl Slice {
    /// Return a new Slice object.
    pub fn new(start: isize, end: isize, stride: isize) -> Self {
        Slice { start, end, stride }
    }
}

/// Axes over which a configured operation reduces.
///
/// Reductions currently collapse every axis of the array; per-axis reductions would require the
/// per-chunk partial computation to track which axes were reduced, which this protocol does not
/// model.
#[derive(Clone, Copy, Debug, Default, Deserialize, PartialEq, Eq, Serialize)]
pub enum ReductionAxes {
    /// Reduce over every axis of the array.
    #[default]
    All,
}

/// A plain block of numeric data read from a backing resource.
///
/// The element bytes are opaque until paired with the data type and shape.
#[derive(Clone, Debug, Deserialize, PartialEq, Serialize)]
pub struct RawBlock {
    /// Element data in native byte order
    pub body: Bytes,
    /// Data type of the elements
    pub dtype: DType,
    /// Shape of the block
    pub shape: Vec<usize>,
}

impl RawBlock {
    /// Return a RawBlock built from a typed element slice.
    ///
    /// Fails if the product of the shape extents does not equal the number of elements.
    pub fn from_elements<T: Element>(
        dtype: DType,
        shape: Vec<usize>,
        elements: &[T],
    ) -> Result<RawBlock, ActiveStorageError> {
        if shape.iter().product::<usize>() != elements.len() {
            return Err(ActiveStorageError::ShapeInvalid(
                ndarray::ShapeError::from_kind(ndarray::ErrorKind::IncompatibleShape),
            ));
        }
        Ok(RawBlock {
            body: Bytes::copy_from_slice(elements.as_bytes()),
            dtype,
            shape,
        })
    }
}

/// Per-chunk record returned by the storage-side partial computation.
///
/// This is the wire-level form of a chunk's partial result: the reduced value bytes together
/// with the metadata needed to decode them, plus the count of elements that contributed. The
/// typed chunk functions of [Reduction](crate::operation::Reduction) decode it into a
/// [PartialReduction].
#[derive(Clone, Debug, Deserialize, PartialEq, Serialize)]
pub struct ChunkResponse {
    /// Reduced value data. May be a scalar or multi-dimensional array.
    pub body: Bytes,
    /// Data type of the reduced value
    pub dtype: DType,
    /// Shape of the reduced value
    pub shape: Vec<usize>,
    /// Number of elements operated on to generate the value
    pub count: i64,
}

impl ChunkResponse {
    /// Return a ChunkResponse object
    pub fn new(body: Bytes, dtype: DType, shape: Vec<usize>, count: i64) -> ChunkResponse {
        ChunkResponse {
            body,
            dtype,
            shape,
            count,
        }
    }
}

/// A chunk's partial result in the form the downstream reduction engine consumes.
///
/// The variants carry the operation-specific fields: a single extreme for minimum and maximum,
/// and separate count and sum accumulators for mean. Mean is deliberately not collapsed to a
/// single value here: reconstructing it from count and sum is what weights chunks of unequal
/// size correctly, and the final division belongs to the engine's finalise step.
#[derive(Clone, Debug, PartialEq)]
pub enum PartialReduction<T> {
    /// Minimum seen so far
    Min {
        /// The extreme value
        min: ArrayD<T>,
    },
    /// Maximum seen so far
    Max {
        /// The extreme value
        max: ArrayD<T>,
    },
    /// Mean accumulators
    Mean {
        /// Count of contributing elements
        n: ArrayD<i64>,
        /// Sum of contributing elements
        total: ArrayD<T>,
    },
}

impl<T> PartialReduction<T> {
    /// Returns the operation this record is a partial result for.
    pub fn operation(&self) -> Reduction {
        match self {
            Self::Min { .. } => Reduction::Min,
            Self::Max { .. } => Reduction::Max,
            Self::Mean { .. } => Reduction::Mean,
        }
    }
}

/// Result of reading an index range from an array handle.
///
/// A read returns either a plain numeric block or a partial-result record, never an ambiguous
/// untyped value.
#[derive(Clone, Debug, PartialEq)]
pub enum Payload<T> {
    /// Plain numeric block from an ordinary read
    Block(ArrayD<T>),
    /// Partial-result record from an active read
    Partial(PartialReduction<T>),
}

impl<T> Payload<T> {
    /// Returns the plain block, if this payload is one.
    pub fn into_block(self) -> Option<ArrayD<T>> {
        match self {
            Self::Block(block) => Some(block),
            Self::Partial(_) => None,
        }
    }

    /// Returns the partial-result record, if this payload is one.
    pub fn into_partial(self) -> Option<PartialReduction<T>> {
        match self {
            Self::Block(_) => None,
            Self::Partial(partial) => Some(partial),
        }
    }
}
