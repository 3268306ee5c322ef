//! This crate provides the client side of the active storage pattern: instead of reading every
//! element of a large, chunked, file-backed array into memory and reducing it centrally, each
//! storage-side chunk independently computes a partial statistic (minimum, maximum or mean), and
//! only those statistics travel over the boundary between storage and compute. The partial
//! results are then merged into a final answer that is indistinguishable from reducing the fully
//! materialised array.
//!
//! The crate is organised around three components:
//!
//! * [ArrayHandle](handle::ArrayHandle), a lazy handle on one array variable within a backing
//!   resource. An active reduction is attached by copying the handle, so independent operations
//!   can be derived from one base handle without interference.
//! * A closed set of [Reduction](operation::Reduction) operations, each pairing a storage-side
//!   partial computation with the record contract the downstream reduction engine expects.
//! * An [Aggregator](aggregate::Aggregator) that merges per-chunk partial results into a single
//!   rank-preserved record.
//!
//! Chunk scheduling is deliberately out of scope: an external chunked-execution engine decides
//! how to partition the array, invokes [read](handle::ArrayHandle::read) once per chunk, and
//! combines the returned partials in any order using the aggregator.
//!
//! The implementation is built on a number of open source components.
//!
//! * [ndarray] provides [NumPy](https://numpy.org)-like n-dimensional arrays used in numerical
//!   computation.
//! * [Serde](serde) performs (de)serialisation of wire-facing data types.
//! * [zerocopy] converts between raw bytes and typed element slices on the storage boundary.
//! * [thiserror] derives the crate's error type.
//! * [tracing] provides structured logging of the read and aggregation paths.

pub mod aggregate;
pub mod array;
pub mod error;
pub mod handle;
pub mod models;
pub mod operation;
pub mod operations;
pub mod storage;
#[cfg(test)]
pub mod test_utils;
pub mod tracing;
