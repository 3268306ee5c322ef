//! Active storage operations.
//!
//! The supported operations form a small, closed set, so they are enumerated explicitly rather
//! than dispatched through a name-keyed table: an exhaustive match catches an unsupported
//! operation at compile time instead of as a runtime lookup failure.

use crate::array;
use crate::error::ActiveStorageError;
use crate::models::{ChunkResponse, PartialReduction};

use ndarray::ArrayD;
use serde::{Deserialize, Serialize};

/// Trait for array elements.
pub trait Element:
    Clone
    + Copy
    + PartialOrd
    + num_traits::Bounded
    + num_traits::FromPrimitive
    + num_traits::Zero
    + std::fmt::Debug
    + std::ops::Add<Output = Self>
    + zerocopy::AsBytes
    + zerocopy::FromBytes
{
}

/// Blanket implementation of Element.
impl<T> Element for T where
    T: Clone
        + Copy
        + PartialOrd
        + num_traits::Bounded
        + num_traits::FromPrimitive
        + num_traits::Zero
        + std::fmt::Debug
        + std::ops::Add<Output = Self>
        + zerocopy::AsBytes
        + zerocopy::FromBytes
{
}

/// A reduction that can be pushed down to the storage layer.
///
/// Adding an operation means adding a variant here, a chunk conversion in [chunk_fn]
/// (Reduction::chunk_fn), a fold in [operations](crate::operations) and a merge rule in
/// [aggregate](crate::aggregate); nothing else changes.
#[derive(Clone, Copy, Debug, Deserialize, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Reduction {
    /// Minimum of the selected elements
    Min,
    /// Maximum of the selected elements
    Max,
    /// Arithmetic mean of the selected elements
    Mean,
}

/// The per-chunk compute step used by the external reduction engine.
///
/// Converts the wire-level record returned by the storage layer into the typed partial-result
/// record the engine's combine step expects.
pub type ChunkFunction<T> =
    fn(&ChunkResponse) -> Result<PartialReduction<T>, ActiveStorageError>;

impl Reduction {
    /// Returns the operation's wire name.
    pub const fn name(self) -> &'static str {
        match self {
            Self::Min => "min",
            Self::Max => "max",
            Self::Mean => "mean",
        }
    }

    /// Returns the chunk function for this operation.
    ///
    /// The returned function is a drop-in replacement for the engine's default chunk-local
    /// reduction step: it has the same success and failure contract and produces a record with
    /// the same fields, so the same reduction-tree machinery runs unmodified whether active
    /// storage is engaged or not. Minimum and maximum pass the already-computed extreme
    /// through; mean re-expresses the response's value and count as the sum and count
    /// accumulators the downstream merge step expects.
    pub fn chunk_fn<T: Element>(self) -> ChunkFunction<T> {
        match self {
            Self::Min => min_chunk::<T>,
            Self::Max => max_chunk::<T>,
            Self::Mean => mean_chunk::<T>,
        }
    }
}

impl std::fmt::Display for Reduction {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

impl std::str::FromStr for Reduction {
    type Err = ActiveStorageError;

    /// Parse an operation name.
    ///
    /// Any name outside the supported set fails with
    /// [InvalidOperation](ActiveStorageError::InvalidOperation), synchronously, before any I/O
    /// occurs.
    fn from_str(name: &str) -> Result<Self, Self::Err> {
        match name {
            "min" => Ok(Self::Min),
            "max" => Ok(Self::Max),
            "mean" => Ok(Self::Mean),
            _ => Err(ActiveStorageError::InvalidOperation {
                operation: name.to_string(),
            }),
        }
    }
}

/// Chunk calculations for the minimum.
///
/// Assumes that the calculation has already been done, i.e. that the response value is already
/// the chunk's minimum.
fn min_chunk<T: Element>(
    response: &ChunkResponse,
) -> Result<PartialReduction<T>, ActiveStorageError> {
    let min = array::build_array::<T>(&response.body, &response.shape)?.to_owned();
    Ok(PartialReduction::Min { min })
}

/// Chunk calculations for the maximum.
///
/// Assumes that the calculation has already been done, i.e. that the response value is already
/// the chunk's maximum.
fn max_chunk<T: Element>(
    response: &ChunkResponse,
) -> Result<PartialReduction<T>, ActiveStorageError> {
    let max = array::build_array::<T>(&response.body, &response.shape)?.to_owned();
    Ok(PartialReduction::Max { max })
}

/// Chunk calculations for the mean.
///
/// The response value is the chunk's sum and the response count the number of contributing
/// elements; both are kept so that chunks of unequal size weight correctly when merged.
fn mean_chunk<T: Element>(
    response: &ChunkResponse,
) -> Result<PartialReduction<T>, ActiveStorageError> {
    let total = array::build_array::<T>(&response.body, &response.shape)?.to_owned();
    let n = ArrayD::from_elem(total.raw_dim(), response.count);
    Ok(PartialReduction::Mean { n, total })
}
