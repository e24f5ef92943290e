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

use crate::{builder::Method, error::Result, symmat::SymMat};

/// Narrowest unsigned integer type able to hold every entry of a NODE-mode
/// matrix, used only at the serialization boundary ([`crate::store`]).
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum NodeWidth {
    U8,
    U16,
    U32,
    U64,
}

impl NodeWidth {
    pub fn narrowest_for(values: &[u64]) -> Self {
        let max = values.iter().copied().max().unwrap_or(0);
        if max <= u64::from(u8::MAX) {
            Self::U8
        } else if max <= u64::from(u16::MAX) {
            Self::U16
        } else if max <= u64::from(u32::MAX) {
            Self::U32
        } else {
            Self::U64
        }
    }
}

/// An all-pairs distance matrix over a tree's leaves.
///
/// A `Pdm` is produced by [`crate::builder::PDMBuilder`]; the two variants
/// mirror the two [`Method`]s — PATRISTIC accumulates as `f64`, NODE as a
/// plain edge count (`u64`, narrowed only when serialized).
#[derive(Clone, Debug, PartialEq)]
pub enum Pdm {
    Patristic { mat: SymMat<f64>, tree_length: f64 },
    Node { mat: SymMat<u64>, tree_length: u64 },
}

impl Pdm {
    pub(crate) fn from_patristic(mat: SymMat<f64>, tree_length: f64) -> Self {
        Self::Patristic { mat, tree_length }
    }

    pub(crate) fn from_node(mat: SymMat<u64>, tree_length: u64) -> Self {
        Self::Node { mat, tree_length }
    }

    pub fn method(&self) -> Method {
        match self {
            Self::Patristic { .. } => Method::Patristic,
            Self::Node { .. } => Method::Node,
        }
    }

    /// Sum of every edge weight (PATRISTIC) or every edge (NODE, as a
    /// count) in the tree this matrix was built from.
    pub fn tree_length(&self) -> f64 {
        match self {
            Self::Patristic { tree_length, .. } => *tree_length,
            Self::Node { tree_length, .. } => *tree_length as f64,
        }
    }

    pub fn len(&self) -> usize {
        match self {
            Self::Patristic { mat, .. } => mat.len(),
            Self::Node { mat, .. } => mat.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Taxon labels in canonical (insertion/sorted) order — the row/column
    /// order of [`Pdm::as_dense`].
    pub fn taxa(&self) -> Vec<String> {
        match self {
            Self::Patristic { mat, .. } => mat.indices().keys().map(str::to_string).collect(),
            Self::Node { mat, .. } => mat.indices().keys().map(str::to_string).collect(),
        }
    }

    pub fn get(&self, a: &str, b: &str) -> Result<f64> {
        match self {
            Self::Patristic { mat, .. } => Ok(*mat.get(a, b)?),
            Self::Node { mat, .. } => Ok(*mat.get(a, b)? as f64),
        }
    }

    /// `get(a, b) / tree_length()`. `NaN` if the tree has zero length (a
    /// single bare leaf).
    pub fn get_normalised(&self, a: &str, b: &str) -> Result<f64> {
        Ok(self.get(a, b)? / self.tree_length())
    }

    /// Materialise the full dense matrix together with its row/column
    /// labels, optionally dividing every entry by [`Pdm::tree_length`].
    pub fn as_dense(&self, normalised: bool) -> (Vec<String>, Vec<Vec<f64>>) {
        let (labels, dense) = match self {
            Self::Patristic { mat, .. } => mat.as_dense(),
            Self::Node { mat, .. } => {
                let (labels, dense) = mat.as_dense();
                let dense = dense.into_iter().map(|row| row.into_iter().map(|v| v as f64).collect()).collect();
                (labels, dense)
            }
        };
        if !normalised {
            return (labels, dense);
        }
        let len = self.tree_length();
        let dense = dense.into_iter().map(|row| row.into_iter().map(|v| v / len).collect()).collect();
        (labels, dense)
    }

    /// Drop the named taxa and return the induced sub-matrix over the
    /// survivors, in sorted order.
    pub fn remove_keys(&self, drop: &[String]) -> Self {
        match self {
            Self::Patristic { mat, tree_length } => Self::Patristic { mat: mat.remove_keys(drop), tree_length: *tree_length },
            Self::Node { mat, tree_length } => Self::Node { mat: mat.remove_keys(drop), tree_length: *tree_length },
        }
    }

    /// `None` for PATRISTIC matrices; for NODE matrices, the narrowest
    /// unsigned width able to represent every stored entry.
    pub fn node_width(&self) -> Option<NodeWidth> {
        match self {
            Self::Patristic { .. } => None,
            Self::Node { mat, .. } => Some(NodeWidth::narrowest_for(mat.store().as_slice())),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::builder::PDMBuilder;
    use crate::tree::TreeModel;

    fn two_leaf_pd() -> Pdm {
        let mut t = TreeModel::new();
        let root = t.add_node(None);
        let a = t.add_node(Some("A".to_string()));
        let b = t.add_node(Some("B".to_string()));
        t.add_edge(root, a, Some(1.0)).unwrap();
        t.add_edge(root, b, Some(3.0)).unwrap();
        PDMBuilder::build(&t, Method::Patristic).unwrap()
    }

    #[test]
    fn normalised_distance_divides_by_tree_length() {
        let pd = two_leaf_pd();
        assert_eq!(pd.get_normalised("A", "B").unwrap(), 1.0);
    }

    #[test]
    fn as_dense_matches_method_and_is_symmetric() {
        let pd = two_leaf_pd();
        let (labels, dense) = pd.as_dense(false);
        assert_eq!(labels, vec!["A", "B"]);
        assert_eq!(dense[0][1], dense[1][0]);
        assert_eq!(dense[0][1], 4.0);
    }

    #[test]
    fn node_width_narrows_to_fit_small_matrices() {
        let mut t = TreeModel::new();
        let root = t.add_node(None);
        let a = t.add_node(Some("A".to_string()));
        let b = t.add_node(Some("B".to_string()));
        t.add_edge(root, a, Some(1.0)).unwrap();
        t.add_edge(root, b, Some(1.0)).unwrap();
        let nd = PDMBuilder::build(&t, Method::Node).unwrap();
        assert_eq!(nd.node_width(), Some(NodeWidth::U8));
        assert_eq!(two_leaf_pd().node_width(), None);
    }
}
