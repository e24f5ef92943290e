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

/// Maps a coordinate pair into the packed upper-triangle row-major
/// enumeration used by [`TriangularStore`].
///
/// `i` and `j` may be given in either order; the pair is canonicalised to
/// `p = min(i, j)`, `q = max(i, j)` before computing the offset.
pub fn offset(n: usize, i: usize, j: usize) -> usize {
    let (p, q) = if i <= j { (i, j) } else { (j, i) };
    p * n - triangular_number(p) + (q - p)
}

/// Inverse of [`offset`]: recovers the canonical `(p, q)` pair (`p <= q`)
/// that produced a given offset. Diagnostic-only; not on the construction
/// hot path.
pub fn inverse_offset(n: usize, off: usize) -> (usize, usize) {
    let nf = n as f64;
    let offf = off as f64;
    let p = (((2.0 * nf + 1.0) - ((2.0 * nf + 1.0).powi(2) - 8.0 * offf).sqrt()) / 2.0).floor()
        as usize;
    let q = off - p * n + triangular_number(p) + p;
    (p, q)
}

/// `p * (p - 1) / 2`, computed without underflowing `usize` at `p == 0`.
fn triangular_number(p: usize) -> usize {
    if p == 0 {
        0
    } else {
        p * (p - 1) / 2
    }
}

/// A flat vector storing the upper triangle (including the diagonal) of an
/// `N x N` symmetric matrix, in row-major order, length `N(N+1)/2`.
#[derive(Clone, Debug, PartialEq)]
pub struct TriangularStore<T> {
    n: usize,
    data: Vec<T>,
}

impl<T: Clone> TriangularStore<T> {
    pub fn new(n: usize, default: T) -> Self {
        Self { n, data: vec![default; n * (n + 1) / 2] }
    }

    pub fn from_vec(n: usize, data: Vec<T>) -> Self {
        debug_assert_eq!(data.len(), n * (n + 1) / 2);
        Self { n, data }
    }

    pub fn n(&self) -> usize {
        self.n
    }

    pub fn as_slice(&self) -> &[T] {
        &self.data
    }

    pub fn into_vec(self) -> Vec<T> {
        self.data
    }

    pub fn get(&self, i: usize, j: usize) -> &T {
        &self.data[offset(self.n, i, j)]
    }

    pub fn set(&mut self, i: usize, j: usize, value: T) {
        let off = offset(self.n, i, j);
        self.data[off] = value;
    }
}
