//! Exact nearest-neighbor index over fixed-dimension `f32` vectors.
//!
//! [`FlatIndex`] stores vectors contiguously in insertion order; a
//! vector's id is its position. Search is a brute-force scan computing
//! squared Euclidean distance to every stored vector, so results are
//! exact. The dimension is fixed by the first insert.

use std::cmp::Ordering;

use crate::error::IndexError;
use crate::vector::squared_l2;

/// One search result: a stored vector's id and its distance to the query.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Neighbor {
    pub id: u64,
    /// Squared L2 distance.
    pub distance: f32,
}

/// Append-only flat L2 index.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FlatIndex {
    dims: Option<usize>,
    /// Row-major: vector `i` occupies `data[i * dims..(i + 1) * dims]`.
    data: Vec<f32>,
    len: usize,
}

impl FlatIndex {
    pub fn new() -> Self {
        Self::default()
    }

    /// An empty index whose dimension is already fixed.
    pub fn with_dims(dims: usize) -> Result<Self, IndexError> {
        if dims == 0 {
            return Err(IndexError::EmptyVector);
        }
        Ok(Self {
            dims: Some(dims),
            data: Vec::new(),
            len: 0,
        })
    }

    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Established dimension, or `None` before the first insert.
    pub fn dims(&self) -> Option<usize> {
        self.dims
    }

    /// Borrow the stored vector with the given id.
    pub fn vector(&self, id: u64) -> Option<&[f32]> {
        let dims = self.dims?;
        let i = usize::try_from(id).ok()?;
        if i >= self.len {
            return None;
        }
        Some(&self.data[i * dims..(i + 1) * dims])
    }

    /// Append a vector and return its id (the prior length).
    ///
    /// The first insert fixes the dimension. A vector of any other length
    /// afterwards fails with [`IndexError::DimensionMismatch`] and leaves
    /// the index unchanged.
    pub fn add(&mut self, vector: &[f32]) -> Result<u64, IndexError> {
        self.check_insert(vector)?;
        self.dims.get_or_insert(vector.len());
        self.data.extend_from_slice(vector);
        let id = self.len as u64;
        self.len += 1;
        Ok(id)
    }

    /// Validate a vector against the index without inserting it.
    pub fn check_insert(&self, vector: &[f32]) -> Result<(), IndexError> {
        if vector.is_empty() {
            return Err(IndexError::EmptyVector);
        }
        match self.dims {
            Some(dims) if dims != vector.len() => Err(IndexError::DimensionMismatch {
                expected: dims,
                actual: vector.len(),
            }),
            _ => Ok(()),
        }
    }

    /// Return the `k` stored vectors closest to `query`, nearest first.
    ///
    /// Ties are broken by lower id. Fewer than `k` results come back when
    /// the index holds fewer vectors; `k == 0` and an empty index yield no
    /// results.
    pub fn search(&self, query: &[f32], k: usize) -> Result<Vec<Neighbor>, IndexError> {
        let Some(dims) = self.dims else {
            return Ok(Vec::new());
        };
        if query.len() != dims {
            return Err(IndexError::DimensionMismatch {
                expected: dims,
                actual: query.len(),
            });
        }
        if k == 0 {
            return Ok(Vec::new());
        }

        let mut scored: Vec<Neighbor> = self
            .data
            .chunks_exact(dims)
            .enumerate()
            .map(|(i, v)| Neighbor {
                id: i as u64,
                distance: squared_l2(query, v),
            })
            .collect();

        if k < scored.len() {
            scored.select_nth_unstable_by(k - 1, rank);
            scored.truncate(k);
        }
        scored.sort_by(rank);
        Ok(scored)
    }

    /// Rebuild an index from raw row-major data, as read from disk.
    pub(crate) fn from_raw(dims: usize, data: Vec<f32>) -> Result<Self, IndexError> {
        if dims == 0 {
            if !data.is_empty() {
                return Err(IndexError::Corrupt(
                    "zero-dimension index carries vector data".to_string(),
                ));
            }
            return Ok(Self::new());
        }
        if data.len() % dims != 0 {
            return Err(IndexError::Corrupt(format!(
                "{} floats is not a multiple of dimension {}",
                data.len(),
                dims
            )));
        }
        let len = data.len() / dims;
        Ok(Self {
            dims: Some(dims),
            data,
            len,
        })
    }

    pub(crate) fn raw_data(&self) -> &[f32] {
        &self.data
    }
}

/// Ascending distance, then ascending id. NaN distances sort last.
fn rank(a: &Neighbor, b: &Neighbor) -> Ordering {
    let by_distance = match (a.distance.is_nan(), b.distance.is_nan()) {
        (true, false) => Ordering::Greater,
        (false, true) => Ordering::Less,
        _ => a
            .distance
            .partial_cmp(&b.distance)
            .unwrap_or(Ordering::Equal),
    };
    by_distance.then_with(|| a.id.cmp(&b.id))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> FlatIndex {
        let mut index = FlatIndex::new();
        index.add(&[0.0, 0.0]).unwrap();
        index.add(&[1.0, 0.0]).unwrap();
        index.add(&[0.0, 5.0]).unwrap();
        index
    }

    #[test]
    fn ids_are_sequential() {
        let mut index = FlatIndex::new();
        assert_eq!(index.add(&[1.0]).unwrap(), 0);
        assert_eq!(index.add(&[2.0]).unwrap(), 1);
        assert_eq!(index.add(&[3.0]).unwrap(), 2);
        assert_eq!(index.len(), 3);
        assert_eq!(index.vector(1), Some(&[2.0f32][..]));
        assert_eq!(index.vector(3), None);
    }

    #[test]
    fn nearest_two_of_three() {
        let hits = sample().search(&[0.0, 0.0], 2).unwrap();
        let ids: Vec<u64> = hits.iter().map(|h| h.id).collect();
        assert_eq!(ids, vec![0, 1]);
        assert_eq!(hits[0].distance, 0.0);
        assert_eq!(hits[1].distance, 1.0);
    }

    #[test]
    fn k_larger_than_len_returns_everything_sorted() {
        let hits = sample().search(&[0.0, 4.0], 10).unwrap();
        let ids: Vec<u64> = hits.iter().map(|h| h.id).collect();
        assert_eq!(ids, vec![2, 0, 1]);
    }

    #[test]
    fn k_zero_is_empty() {
        assert!(sample().search(&[0.0, 0.0], 0).unwrap().is_empty());
    }

    #[test]
    fn empty_index_search_is_empty() {
        assert!(FlatIndex::new().search(&[1.0, 2.0, 3.0], 5).unwrap().is_empty());
    }

    #[test]
    fn ties_break_on_lower_id() {
        let mut index = FlatIndex::new();
        index.add(&[1.0, 0.0]).unwrap();
        index.add(&[0.0, 1.0]).unwrap();
        index.add(&[-1.0, 0.0]).unwrap();
        index.add(&[0.0, -1.0]).unwrap();
        let ids: Vec<u64> = index
            .search(&[0.0, 0.0], 3)
            .unwrap()
            .iter()
            .map(|h| h.id)
            .collect();
        assert_eq!(ids, vec![0, 1, 2]);
    }

    #[test]
    fn add_wrong_dimension_fails_without_change() {
        let mut index = sample();
        let err = index.add(&[1.0, 2.0, 3.0]).unwrap_err();
        assert!(matches!(
            err,
            IndexError::DimensionMismatch {
                expected: 2,
                actual: 3
            }
        ));
        assert_eq!(index.len(), 3);
    }

    #[test]
    fn search_wrong_dimension_fails() {
        let err = sample().search(&[1.0], 1).unwrap_err();
        assert!(matches!(err, IndexError::DimensionMismatch { .. }));
    }

    #[test]
    fn empty_vector_rejected() {
        let mut index = FlatIndex::new();
        assert!(matches!(index.add(&[]), Err(IndexError::EmptyVector)));
        assert_eq!(index.dims(), None);
    }

    #[test]
    fn nan_distances_rank_last() {
        let mut index = FlatIndex::new();
        index.add(&[f32::NAN, 0.0]).unwrap();
        index.add(&[3.0, 0.0]).unwrap();
        let ids: Vec<u64> = index
            .search(&[0.0, 0.0], 2)
            .unwrap()
            .iter()
            .map(|h| h.id)
            .collect();
        assert_eq!(ids, vec![1, 0]);
    }
}
