// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2026 entstream contributors

use crate::error::{Error, Result};

/// An array of values paired with an optional logical-position index.
///
/// Dense form: the index is empty and `values[i]` lives at slot `i`.
/// Sparse form: `index[i]` names the logical slot of `values[i]`, so a field
/// can carry only the populated subset of a larger domain while keeping
/// positional identity. Invariant: the index is empty or has exactly one
/// entry per value.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct IdxArray<T> {
    values: Vec<T>,
    index: Vec<i32>,
}

impl<T> IdxArray<T> {
    pub fn new() -> Self {
        Self {
            values: Vec::new(),
            index: Vec::new(),
        }
    }

    /// Dense array with no index layer.
    pub fn dense(values: Vec<T>) -> Self {
        Self {
            values,
            index: Vec::new(),
        }
    }

    /// Build from both halves, checking the index is empty or matches the
    /// value count.
    pub fn from_parts(values: Vec<T>, index: Vec<i32>) -> Result<Self> {
        if !index.is_empty() && index.len() != values.len() {
            return Err(Error::BadIndexLength {
                values: values.len(),
                index: index.len(),
            });
        }
        Ok(Self { values, index })
    }

    pub fn values(&self) -> &[T] {
        &self.values
    }

    pub fn index(&self) -> &[i32] {
        &self.index
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub fn has_index(&self) -> bool {
        !self.index.is_empty()
    }

    pub fn clear(&mut self) {
        self.values.clear();
        self.index.clear();
    }

    pub fn into_parts(self) -> (Vec<T>, Vec<i32>) {
        (self.values, self.index)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_dense_form_has_no_index() {
        let arr = IdxArray::dense(vec![1.0f64, 2.0]);
        assert!(!arr.has_index());
        assert_eq!(arr.values(), &[1.0, 2.0]);
        assert!(arr.index().is_empty());
    }

    #[test]
    fn test_sparse_slots_may_exceed_value_count() {
        let arr = IdxArray::from_parts(vec![1.0f32, 2.0], vec![3, 7]).expect("valid");
        assert!(arr.has_index());
        assert_eq!(arr.index(), &[3, 7]);
    }

    #[test]
    fn test_from_parts_rejects_length_mismatch() {
        let err = IdxArray::from_parts(vec![10i32, 20], vec![0, 1, 2]).unwrap_err();
        assert_eq!(
            err,
            Error::BadIndexLength {
                values: 2,
                index: 3
            }
        );
    }

    #[test]
    fn test_clear_empties_both_halves() {
        let mut arr = IdxArray::from_parts(vec![5u8, 6], vec![4, 9]).expect("valid");
        arr.clear();
        assert!(arr.is_empty());
        assert!(!arr.has_index());
    }
}
