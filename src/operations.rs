//! Storage-side partial computations.
//!
//! Each supported operation reduces a chunk's block to a single partial statistic. In a
//! deployment with compute-capable storage these folds run at or near the storage layer; the
//! default [Dataset](crate::storage::Dataset) implementation runs them locally against the
//! freshly read block, which is semantically equivalent.

use crate::array;
use crate::error::ActiveStorageError;
use crate::models::{ChunkResponse, DType, RawBlock};
use crate::operation::{Element, Reduction};

use bytes::Bytes;
// Bring trait into scope to use as_bytes method.
use zerocopy::AsBytes;

/// Returns the smaller of two elements.
// TODO: How to handle NaN correctly? NumPy propagates NaN from min/max while the nan-ignoring
// variants live in separate functions. Decide which behaviour to follow before exposing float
// NaN data. Panic for now.
pub(crate) fn min_element<T: Element>(x: T, y: T) -> T {
    match x.partial_cmp(&y) {
        Some(std::cmp::Ordering::Greater) => y,
        Some(_) => x,
        None => panic!("unexpected undefined order error for min"),
    }
}

/// Returns the larger of two elements.
pub(crate) fn max_element<T: Element>(x: T, y: T) -> T {
    match x.partial_cmp(&y) {
        Some(std::cmp::Ordering::Less) => y,
        Some(_) => x,
        None => panic!("unexpected undefined order error for max"),
    }
}

/// Compute the partial statistic of a chunk's block for an operation.
///
/// The reduction collapses every axis of the block to a scalar. Dispatches to a typed fold
/// based on the block's data type.
pub fn reduce_chunk(
    block: &RawBlock,
    operation: Reduction,
) -> Result<ChunkResponse, ActiveStorageError> {
    match block.dtype {
        DType::Int32 => reduce_chunk_t::<i32>(block, operation),
        DType::Int64 => reduce_chunk_t::<i64>(block, operation),
        DType::Uint32 => reduce_chunk_t::<u32>(block, operation),
        DType::Uint64 => reduce_chunk_t::<u64>(block, operation),
        DType::Float32 => reduce_chunk_t::<f32>(block, operation),
        DType::Float64 => reduce_chunk_t::<f64>(block, operation),
    }
}

fn reduce_chunk_t<T: Element>(
    block: &RawBlock,
    operation: Reduction,
) -> Result<ChunkResponse, ActiveStorageError> {
    let array = array::build_array::<T>(&block.body, &block.shape)?;
    if array.is_empty() {
        return Err(ActiveStorageError::EmptyArray {
            operation: operation.name(),
        });
    }
    let (value, count) = match operation {
        Reduction::Min => array.fold((T::max_value(), 0_i64), |(running_min, count), val| {
            (min_element(running_min, *val), count + 1)
        }),
        Reduction::Max => array.fold((T::min_value(), 0_i64), |(running_max, count), val| {
            (max_element(running_max, *val), count + 1)
        }),
        // The mean travels as its sum and count so that chunks of unequal size merge with the
        // correct weighting.
        Reduction::Mean => array.fold((T::zero(), 0_i64), |(sum, count), val| {
            (sum + *val, count + 1)
        }),
    };
    // Need to copy to provide ownership to caller.
    let body = Bytes::copy_from_slice(value.as_bytes());
    Ok(ChunkResponse::new(body, block.dtype, vec![], count))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn max_i64_1d() {
        // data:
        // A Vec<u8> of 8 elements == a single i64 value
        // where each element is 2 hexadecimal digits
        // and the order is reversed on little-endian systems
        // so [1, 2, 3] is 0x030201 as an i64 in hexadecimal
        let block = RawBlock {
            body: Bytes::copy_from_slice(&[1, 2, 3, 4, 5, 6, 7, 8]),
            dtype: DType::Int64,
            shape: vec![1],
        };
        let response = reduce_chunk(&block, Reduction::Max).unwrap();
        let expected: i64 = 0x0807060504030201;
        assert_eq!(expected.as_bytes(), response.body);
        assert_eq!(8, response.body.len());
        assert_eq!(DType::Int64, response.dtype);
        assert_eq!(vec![0; 0], response.shape);
        assert_eq!(1, response.count);
    }

    #[test]
    fn min_u32_1d() {
        let block =
            RawBlock::from_elements::<u32>(DType::Uint32, vec![2], &[0x04030201, 0x08070605])
                .unwrap();
        let response = reduce_chunk(&block, Reduction::Min).unwrap();
        let expected: u32 = 0x04030201;
        assert_eq!(expected.as_bytes(), response.body);
        assert_eq!(4, response.body.len());
        assert_eq!(DType::Uint32, response.dtype);
        assert_eq!(vec![0; 0], response.shape);
        assert_eq!(2, response.count);
    }

    #[test]
    fn max_f32_1d_infinity() {
        let block =
            RawBlock::from_elements::<f32>(DType::Float32, vec![2], &[1.0, f32::INFINITY]).unwrap();
        let response = reduce_chunk(&block, Reduction::Max).unwrap();
        let expected = f32::INFINITY;
        assert_eq!(expected.as_bytes(), response.body);
        assert_eq!(2, response.count);
    }

    #[test]
    fn min_f32_1d_infinity_first() {
        let block =
            RawBlock::from_elements::<f32>(DType::Float32, vec![2], &[f32::INFINITY, 1.0]).unwrap();
        let response = reduce_chunk(&block, Reduction::Min).unwrap();
        let expected = 1.0_f32;
        assert_eq!(expected.as_bytes(), response.body);
        assert_eq!(2, response.count);
    }

    #[test]
    #[should_panic(expected = "unexpected undefined order error for min")]
    fn min_f32_1d_nan() {
        let block =
            RawBlock::from_elements::<f32>(DType::Float32, vec![2], &[1.0, f32::NAN]).unwrap();
        let _ = reduce_chunk(&block, Reduction::Min);
    }

    #[test]
    #[should_panic(expected = "unexpected undefined order error for max")]
    fn max_f32_1d_nan_first() {
        let block =
            RawBlock::from_elements::<f32>(DType::Float32, vec![2], &[f32::NAN, 1.0]).unwrap();
        let _ = reduce_chunk(&block, Reduction::Max);
    }

    #[test]
    fn mean_u32_2d() {
        let block =
            RawBlock::from_elements::<u32>(DType::Uint32, vec![2, 2], &[1, 2, 3, 4]).unwrap();
        let response = reduce_chunk(&block, Reduction::Mean).unwrap();
        let expected: u32 = 10;
        assert_eq!(expected.as_bytes(), response.body);
        assert_eq!(DType::Uint32, response.dtype);
        assert_eq!(vec![0; 0], response.shape);
        assert_eq!(4, response.count);
    }

    #[test]
    fn mean_f64_2d_matches_direct_sum() {
        let data = (0..6).map(|i| i as f64).collect::<Vec<f64>>();
        let block = RawBlock::from_elements::<f64>(DType::Float64, vec![2, 3], &data).unwrap();
        let response = reduce_chunk(&block, Reduction::Mean).unwrap();
        let expected: f64 = data.iter().sum();
        assert_eq!(expected.as_bytes(), response.body);
        assert_eq!(6, response.count);
    }

    #[test]
    fn empty_selection() {
        let block = RawBlock::from_elements::<f64>(DType::Float64, vec![0], &[]).unwrap();
        match reduce_chunk(&block, Reduction::Min).unwrap_err() {
            ActiveStorageError::EmptyArray { operation } => assert_eq!("min", operation),
            err => panic!("unexpected error {:?}", err),
        }
    }

    #[test]
    fn partial_cmp_behaviour() {
        assert_eq!(
            f64::INFINITY.partial_cmp(&1.0),
            Some(std::cmp::Ordering::Greater)
        );
        assert_eq!(f64::NAN.partial_cmp(&1.0), None);
    }
}
