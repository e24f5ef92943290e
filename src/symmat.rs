/* This file is part of dendrodist.
 *
 * Copyright (C) 2026 Dyne.org foundation
 *
 * This program is free software: you can redistribute it and/or modify
 * it under the terms of the GNU Affero General Public License as
 * published by the Free Software Foundation, either version 3 of the
 * License, or (at your option) any later version.
 *
 * This program is distributed in the hope that it will be useful,
 * but WITHOUT ANY WARRANTY; without even the implied warranty of
 * MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE.  See the
 * GNU Affero General Public License for more details.
 *
 * You should have received a copy of the GNU Affero General Public License
 * along with this program.  If not, see <https://www.gnu.org/licenses/>.
 */

use crate::{
    error::{Error, Result},
    index::IndexTable,
    triangular::TriangularStore,
};

/// A symmetric matrix over a set of named keys, backed by a packed
/// upper-triangle [`TriangularStore`].
///
/// Unset cells read as `default`; `get`/`set` on `(a, b)` is identical to
/// `(b, a)`.
#[derive(Clone, Debug, PartialEq)]
pub struct SymMat<T> {
    indices: IndexTable,
    store: TriangularStore<T>,
    default: T,
}

impl<T: Clone + PartialEq> SymMat<T> {
    pub fn new(indices: IndexTable, default: T) -> Self {
        let n = indices.len();
        let store = TriangularStore::new(n, default.clone());
        Self { indices, store, default }
    }

    /// Assemble a `SymMat` from an already-built index table and triangular
    /// store, e.g. when reconstructing one from a serialized container.
    pub fn from_parts(indices: IndexTable, store: TriangularStore<T>, default: T) -> Self {
        Self { indices, store, default }
    }

    pub fn indices(&self) -> &IndexTable {
        &self.indices
    }

    pub fn default_value(&self) -> &T {
        &self.default
    }

    pub fn len(&self) -> usize {
        self.indices.len()
    }

    pub fn is_empty(&self) -> bool {
        self.indices.is_empty()
    }

    pub fn get(&self, a: &str, b: &str) -> Result<&T> {
        let i = self.indices.index_of(a).ok_or_else(|| Error::UnknownKey(a.to_string()))?;
        let j = self.indices.index_of(b).ok_or_else(|| Error::UnknownKey(b.to_string()))?;
        Ok(self.store.get(i, j))
    }

    pub fn get_by_index(&self, i: usize, j: usize) -> &T {
        self.store.get(i, j)
    }

    pub fn set(&mut self, a: &str, b: &str, value: T) -> Result<()> {
        let i = self.indices.index_of(a).ok_or_else(|| Error::UnknownKey(a.to_string()))?;
        let j = self.indices.index_of(b).ok_or_else(|| Error::UnknownKey(b.to_string()))?;
        self.set_by_index(i, j, value);
        Ok(())
    }

    pub fn set_by_index(&mut self, i: usize, j: usize, value: T) {
        self.store.set(i, j, value);
    }

    pub fn store(&self) -> &TriangularStore<T> {
        &self.store
    }

    /// Produce a new `SymMat` containing only the rows/columns for
    /// `keys \ drop`, preserving surviving values, in sorted order of the
    /// surviving keys. Cost: O(M^2) where M is the survivor count.
    pub fn remove_keys(&self, drop: &[String]) -> Self {
        let drop_set: std::collections::HashSet<&str> = drop.iter().map(String::as_str).collect();
        let mut survivors: Vec<&str> =
            self.indices.keys().filter(|k| !drop_set.contains(*k)).collect();
        survivors.sort_unstable();

        let mut new_indices = IndexTable::new();
        for key in &survivors {
            // Survivors are derived from `self.indices`, so insertion cannot
            // collide; an error here would indicate a logic bug.
            new_indices.add_key(*key).expect("survivor keys are unique by construction");
        }

        let mut new_mat = SymMat::new(new_indices, self.default.clone());
        for (a_idx, a) in survivors.iter().enumerate() {
            for b in survivors.iter().skip(a_idx) {
                let value = self.get(a, b).expect("survivor key exists in source matrix").clone();
                new_mat.set(a, b, value).expect("survivor key exists in new matrix");
            }
        }
        new_mat
    }

    /// Materialise the full `N x N` symmetric matrix together with the
    /// labels in canonical (row/column) order.
    pub fn as_dense(&self) -> (Vec<String>, Vec<Vec<T>>)
    where
        T: std::ops::Add<Output = T> + std::ops::Sub<Output = T>,
    {
        let n = self.len();
        let labels: Vec<String> = self.indices.keys().map(str::to_string).collect();
        let mut out = vec![vec![self.default.clone(); n]; n];
        for i in 0..n {
            for j in i..n {
                let v = self.store.get(i, j).clone();
                out[i][j] = v.clone();
                out[j][i] = v;
            }
        }
        (labels, out)
    }
}
