//! Functions and utilities for working with [ndarray] objects.

use crate::error::ActiveStorageError;
use crate::models::{DType, RawBlock, Slice};
use crate::operation::Element;

use bytes::Bytes;
use core::convert::TryFrom;
use ndarray::prelude::*;
// Bring trait into scope to use as_bytes method.
use zerocopy::AsBytes;

/// Convert from Bytes to `&[T]`.
///
/// Zerocopy provides a mechanism for converting between types.
/// Correct alignment of the data is necessary.
///
/// # Arguments
///
/// * `data`: Bytes containing data to convert.
fn from_bytes<T: zerocopy::FromBytes>(data: &Bytes) -> Result<&[T], ActiveStorageError> {
    let layout = zerocopy::LayoutVerified::<_, [T]>::new_slice(&data[..]).ok_or(
        ActiveStorageError::FromBytes {
            type_name: std::any::type_name::<T>(),
        },
    )?;
    Ok(layout.into_slice())
}

/// Returns an [ndarray::ArrayView] over the data in a byte buffer.
///
/// The array view borrows the data, so no copying takes place.
///
/// # Arguments
///
/// * `data`: Bytes containing the element data. Must be at least as aligned as an instance of
///   `T`.
/// * `shape`: The shape of the array.
pub fn build_array<'a, T: zerocopy::FromBytes>(
    data: &'a Bytes,
    shape: &[usize],
) -> Result<ArrayView<'a, T, IxDyn>, ActiveStorageError> {
    let data = from_bytes::<T>(data)?;
    ArrayView::<T, _>::from_shape(IxDyn(shape), data).map_err(ActiveStorageError::ShapeInvalid)
}

/// Returns an array index in NumPy semantics converted to an index with ndarray semantics.
///
/// The resulting value will be clamped such that it is safe for indexing in ndarray.
/// This allows us to accept selections with NumPy's less restrictive semantics.
/// When the stride is negative (`reverse` is `true`), the result is offset by one to allow for
/// NumPy's non-inclusive start and inclusive end in this scenario.
///
/// # Arguments
///
/// * `index`: Selection index
/// * `length`: Length of corresponding axis
/// * `reverse`: Whether the stride is negative
fn to_ndarray_index(index: isize, length: usize, reverse: bool) -> isize {
    let length_isize = isize::try_from(length).expect("length too large");
    let result = if reverse { index + 1 } else { index };
    if index < 0 {
        std::cmp::max(result + length_isize, 0)
    } else {
        std::cmp::min(result, length_isize)
    }
}

/// Convert a [crate::models::Slice] object with indices in NumPy semantics to an
/// [ndarray::SliceInfoElem::Slice] with ndarray semantics.
///
/// See [ndarray docs](https://docs.rs/ndarray/0.15.6/ndarray/macro.s.html#negative-step) for
/// information about ndarray's handling of negative strides.
fn to_ndarray_slice(slice: &Slice, length: usize) -> ndarray::SliceInfoElem {
    let reverse = slice.stride < 0;
    let start = to_ndarray_index(slice.start, length, reverse);
    let end = to_ndarray_index(slice.end, length, reverse);
    let (start, end) = if reverse { (end, start) } else { (start, end) };
    ndarray::SliceInfoElem::Slice {
        start,
        end: Some(end),
        step: slice.stride,
    }
}

/// Returns an [ndarray] SliceInfo object corresponding to the selection.
pub fn build_slice_info(
    selection: &[Slice],
    shape: &[usize],
) -> ndarray::SliceInfo<Vec<ndarray::SliceInfoElem>, IxDyn, IxDyn> {
    let si: Vec<ndarray::SliceInfoElem> = std::iter::zip(selection, shape)
        .map(|(slice, length)| to_ndarray_slice(slice, *length))
        .collect();
    ndarray::SliceInfo::try_from(si).expect("SliceInfo should not fail for IxDyn")
}

/// Validate a selection against an array shape.
///
/// The selection must address every axis and must not contain a zero stride.
pub fn validate_selection(selection: &[Slice], shape: &[usize]) -> Result<(), ActiveStorageError> {
    if selection.len() != shape.len() {
        return Err(ActiveStorageError::SelectionShape {
            expected: shape.len(),
            got: selection.len(),
        });
    }
    if selection.iter().any(|slice| slice.stride == 0) {
        return Err(ActiveStorageError::SelectionStride);
    }
    Ok(())
}

/// Extract the sub-block of a full variable block addressed by a selection.
///
/// Dispatches on the block's data type to copy the selected elements into a new contiguous
/// block.
pub fn extract(block: &RawBlock, selection: &[Slice]) -> Result<RawBlock, ActiveStorageError> {
    match block.dtype {
        DType::Int32 => extract_t::<i32>(block, selection),
        DType::Int64 => extract_t::<i64>(block, selection),
        DType::Uint32 => extract_t::<u32>(block, selection),
        DType::Uint64 => extract_t::<u64>(block, selection),
        DType::Float32 => extract_t::<f32>(block, selection),
        DType::Float64 => extract_t::<f64>(block, selection),
    }
}

fn extract_t<T: Element>(
    block: &RawBlock,
    selection: &[Slice],
) -> Result<RawBlock, ActiveStorageError> {
    validate_selection(selection, &block.shape)?;
    let array = build_array::<T>(&block.body, &block.shape)?;
    let slice_info = build_slice_info(selection, &block.shape);
    let sliced = array.slice(slice_info);
    let elements = sliced.iter().copied().collect::<Vec<T>>();
    // Need to copy to provide ownership to caller.
    let body = Bytes::copy_from_slice(elements.as_bytes());
    Ok(RawBlock {
        body,
        dtype: block.dtype,
        shape: sliced.shape().to_vec(),
    })
}
