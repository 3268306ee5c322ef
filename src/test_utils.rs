use crate::handle::ArrayHandle;
use crate::models::{DType, RawBlock, Slice};
use crate::storage::MemoryStore;

use std::sync::Arc;

/// The 5x8 ramp of values 0..40 used as the test variable.
pub(crate) fn test_values() -> Vec<f64> {
    (0..40).map(f64::from).collect()
}

/// Create a memory store holding the test variable "q" in resource "file.nc".
pub(crate) fn test_store() -> Arc<MemoryStore> {
    let mut store = MemoryStore::new();
    let block =
        RawBlock::from_elements::<f64>(DType::Float64, vec![5, 8], &test_values()).unwrap();
    store.insert("file.nc", "q", block);
    Arc::new(store)
}

/// Create an unconfigured handle on the test variable.
pub(crate) fn test_handle() -> ArrayHandle {
    ArrayHandle::new(test_store(), "file.nc", "q", DType::Float64, vec![5, 8])
}

/// Return one selection per chunk of a grid partitioning `shape` into blocks of `chunks`.
///
/// Trailing chunks are smaller when the chunk size does not divide the extent.
pub(crate) fn chunk_selections(shape: &[usize], chunks: &[usize]) -> Vec<Vec<Slice>> {
    let per_dim = shape
        .iter()
        .zip(chunks)
        .map(|(&length, &step)| {
            (0..length)
                .step_by(step)
                .map(|start| {
                    let end = std::cmp::min(start + step, length);
                    Slice::new(start as isize, end as isize, 1)
                })
                .collect::<Vec<_>>()
        })
        .collect::<Vec<_>>();
    let mut selections: Vec<Vec<Slice>> = vec![vec![]];
    for slices in per_dim {
        let mut next = Vec::new();
        for selection in &selections {
            for slice in &slices {
                let mut selection = selection.clone();
                selection.push(*slice);
                next.push(selection);
            }
        }
        selections = next;
    }
    selections
}
