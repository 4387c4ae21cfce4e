//! Bounded top-K selection over classifier output scores

use std::cmp::{Ordering, Reverse};
use std::collections::BinaryHeap;

use serde::{Deserialize, Serialize};

use crate::dtype::{Element, ElementType, TensorData};
use crate::TensorError;

/// Dequantized score of one output position
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ScoredIndex {
    /// Confidence score, [0, 1] for quantized outputs
    pub score: f32,
    /// Position in the output tensor
    pub index: usize,
}

/// Heap entry; ranks by `(score, index)`, so on equal scores the later
/// position wins
struct Ranked(ScoredIndex);

impl Ord for Ranked {
    fn cmp(&self, other: &Self) -> Ordering {
        self.0
            .score
            .total_cmp(&other.0.score)
            .then_with(|| self.0.index.cmp(&other.0.index))
    }
}

impl PartialOrd for Ranked {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl PartialEq for Ranked {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for Ranked {}

/// Select the `k` best scores of the first `length` elements of `buffer`.
///
/// `dtype` picks the dequantization and must match the buffer's element
/// type. Results are in descending `(score, index)` order, so equal scores
/// list the higher index first and eviction drops the lower one. Scores below `threshold` (and NaN) never qualify.
pub fn select_top_k(
    buffer: &TensorData,
    length: usize,
    k: usize,
    threshold: f32,
    dtype: &ElementType,
) -> Result<Vec<ScoredIndex>, TensorError> {
    if !dtype.is_supported() {
        return Err(TensorError::UnsupportedDtype(dtype.to_string()));
    }
    if buffer.element_type() != *dtype {
        return Err(TensorError::DtypeMismatch {
            expected: dtype.to_string(),
            actual: buffer.element_type().to_string(),
        });
    }
    if length > buffer.len() {
        return Err(TensorError::SizeMismatch {
            expected: length,
            actual: buffer.len(),
        });
    }

    Ok(match buffer {
        TensorData::F32(v) => select_top_k_typed(&v[..length], k, threshold),
        TensorData::I8(v) => select_top_k_typed(&v[..length], k, threshold),
        TensorData::U8(v) => select_top_k_typed(&v[..length], k, threshold),
    })
}

/// Typed selection kernel behind [`select_top_k`]
pub fn select_top_k_typed<T: Element>(values: &[T], k: usize, threshold: f32) -> Vec<ScoredIndex> {
    // Scores live in [0, 1]
    if k == 0 || threshold > 1.0 || values.is_empty() {
        return Vec::new();
    }

    // Min-heap holding the current best k
    let mut heap: BinaryHeap<Reverse<Ranked>> = BinaryHeap::with_capacity(k + 1);

    for (index, value) in values.iter().enumerate() {
        let score = value.dequantize();
        if !(score >= threshold) {
            continue;
        }

        heap.push(Reverse(Ranked(ScoredIndex { score, index })));
        if heap.len() > k {
            heap.pop();
        }
    }

    // Ascending order of Reverse<_> is descending rank
    heap.into_sorted_vec().into_iter().map(|Reverse(Ranked(s))| s).collect()
}
