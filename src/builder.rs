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

use std::collections::HashMap;

use itertools::Itertools;

use crate::{
    error::{Error, Result},
    index::IndexTable,
    pdm::Pdm,
    symmat::SymMat,
    tree::{NodeId, TreeModel},
};

/// Which kind of leaf-leaf distance to compute.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum Method {
    /// Sum of edge weights along the unique leaf-leaf path.
    Patristic,
    /// Number of edges along the unique leaf-leaf path.
    Node,
}

impl Method {
    pub fn parse(s: &str) -> Result<Self> {
        match s {
            "pd" => Ok(Self::Patristic),
            "node" => Ok(Self::Node),
            other => Err(Error::UnknownMethod(other.to_string())),
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Patristic => "pd",
            Self::Node => "node",
        }
    }
}

/// Tunables for [`PDMBuilder::build_with_options`]. Not a file-based config
/// layer — this crate is a library, not a daemon — just the one knob the
/// distilled spec calls out as optional (§5).
#[derive(Copy, Clone, Debug, Default)]
pub struct BuildOptions {
    /// Evaluate each depth level's Cartesian-merge step with `rayon` data
    /// parallelism. Has no effect unless the crate's `parallel` feature is
    /// enabled, in which case this silently falls back to sequential
    /// evaluation.
    pub parallel: bool,
}

/// Per-node accumulator: parallel arrays of (leaf index, distance from that
/// leaf up to the node owning this `Acc`).
#[derive(Clone, Debug)]
struct Acc {
    leaf_idx: Vec<usize>,
    dist: Vec<f64>,
}

impl Acc {
    fn leaf(idx: usize) -> Self {
        Self { leaf_idx: vec![idx], dist: vec![0.0] }
    }

    fn add_weight(&mut self, w: f64) {
        for d in &mut self.dist {
            *d += w;
        }
    }

    fn concat(parts: Vec<Acc>) -> Self {
        let cap = parts.iter().map(|p| p.leaf_idx.len()).sum();
        let mut leaf_idx = Vec::with_capacity(cap);
        let mut dist = Vec::with_capacity(cap);
        for p in parts {
            leaf_idx.extend(p.leaf_idx);
            dist.extend(p.dist);
        }
        Self { leaf_idx, dist }
    }
}

/// The distance engine: merges per-node leaf-distance lists bottom-up and
/// fills a [`SymMat`] via Cartesian sums across sibling subtrees.
pub struct PDMBuilder;

impl PDMBuilder {
    pub fn build(tree: &TreeModel, method: Method) -> Result<Pdm> {
        Self::build_with_options(tree, method, BuildOptions::default())
    }

    pub fn build_with_options(tree: &TreeModel, method: Method, opts: BuildOptions) -> Result<Pdm> {
        log::info!("building PDM: method={:?} nodes={}", method, tree.len());
        let root = tree.validate()?;

        let (indices, leaf_idx_of) = Self::index_leaves(tree)?;
        let n = indices.len();
        log::debug!("indexed {n} taxa");

        let mut acc: HashMap<NodeId, Acc> = HashMap::with_capacity(tree.len());
        let mut triples: Vec<(usize, usize, f64)> = Vec::new();
        let mut tree_length = 0.0f64;

        let buckets = tree.depth_buckets(root);
        for (depth, bucket) in buckets.into_iter().enumerate().rev() {
            log::trace!("processing depth {depth} ({} nodes)", bucket.len());

            let computed = Self::compute_bucket(tree, &bucket, &leaf_idx_of, &acc, opts.parallel)?;

            for (node, mut merged, node_triples) in computed {
                triples.extend(node_triples);
                for &child in tree.children(node) {
                    acc.remove(&child);
                }
                let w = Self::edge_contribution(tree, node, root, method)?;
                merged.add_weight(w);
                tree_length += w;
                acc.insert(node, merged);
            }
        }

        let mat = match method {
            Method::Patristic => {
                let mut mat = SymMat::new(indices, 0.0f64);
                for (i, j, d) in triples {
                    mat.set_by_index(i, j, d);
                }
                Pdm::from_patristic(mat, tree_length)
            }
            Method::Node => {
                let mut mat = SymMat::new(indices, 0u64);
                for (i, j, d) in triples {
                    mat.set_by_index(i, j, d.round() as u64);
                }
                Pdm::from_node(mat, tree_length.round() as u64)
            }
        };

        Ok(mat)
    }

    /// Assign a dense index to every leaf's taxon label, in ascending
    /// lexicographic order, failing on unlabeled or duplicate leaves.
    fn index_leaves(tree: &TreeModel) -> Result<(IndexTable, HashMap<NodeId, usize>)> {
        let mut labeled: Vec<(String, NodeId)> = Vec::new();
        for id in tree.node_ids() {
            if tree.is_leaf(id) {
                match tree.taxon(id) {
                    Some(label) if !label.is_empty() => labeled.push((label.to_string(), id)),
                    _ => {
                        log::warn!("leaf node {id} has no taxon label");
                        return Err(Error::UnlabeledLeaf);
                    }
                }
            }
        }
        labeled.sort_by(|a, b| a.0.cmp(&b.0));

        let mut indices = IndexTable::new();
        let mut leaf_idx_of = HashMap::with_capacity(labeled.len());
        for (label, node) in labeled {
            let idx = indices.add_key(label)?;
            leaf_idx_of.insert(node, idx);
        }
        Ok((indices, leaf_idx_of))
    }

    /// The parent-edge contribution for `node`: 0 if it's the root, else the
    /// validated edge weight (PATRISTIC) or a flat 1 (NODE).
    fn edge_contribution(tree: &TreeModel, node: NodeId, root: NodeId, method: Method) -> Result<f64> {
        if node == root {
            return Ok(0.0);
        }
        match method {
            Method::Node => Ok(1.0),
            Method::Patristic => {
                let w = tree.edge_weight(node).ok_or_else(|| {
                    log::warn!("node {node} is missing an edge weight in patristic mode");
                    Error::MissingEdgeWeight
                })?;
                if !w.is_finite() || w < 0.0 {
                    log::warn!("node {node} has an invalid edge weight: {w}");
                    return Err(Error::InvalidEdgeWeight(w));
                }
                Ok(w)
            }
        }
    }

    /// Compute every node in `bucket`'s merged accumulator and the
    /// leaf-pair distances that belong at it (step 1 of the algorithm),
    /// optionally fanning the bucket out across `rayon`'s thread pool.
    fn compute_bucket(
        tree: &TreeModel,
        bucket: &[NodeId],
        leaf_idx_of: &HashMap<NodeId, usize>,
        acc: &HashMap<NodeId, Acc>,
        parallel: bool,
    ) -> Result<Vec<(NodeId, Acc, Vec<(usize, usize, f64)>)>> {
        #[cfg(feature = "parallel")]
        if parallel {
            use rayon::prelude::*;
            return Ok(bucket
                .par_iter()
                .map(|&node| {
                    let (merged, triples) = Self::merge_children(tree, node, leaf_idx_of, acc);
                    (node, merged, triples)
                })
                .collect());
        }
        #[cfg(not(feature = "parallel"))]
        let _ = parallel;

        Ok(bucket
            .iter()
            .map(|&node| {
                let (merged, triples) = Self::merge_children(tree, node, leaf_idx_of, acc);
                (node, merged, triples)
            })
            .collect())
    }

    /// Step 1 + the union half of step 2: the Cartesian sums across every
    /// pair of distinct children, and the merged `acc(n)` before the
    /// parent-edge contribution is added.
    fn merge_children(
        tree: &TreeModel,
        node: NodeId,
        leaf_idx_of: &HashMap<NodeId, usize>,
        acc: &HashMap<NodeId, Acc>,
    ) -> (Acc, Vec<(usize, usize, f64)>) {
        if tree.is_leaf(node) {
            let idx = *leaf_idx_of.get(&node).expect("every leaf was indexed before traversal");
            return (Acc::leaf(idx), Vec::new());
        }

        let children = tree.children(node);
        let mut triples = Vec::new();
        for (ca, cb) in children.iter().tuple_combinations() {
            let a = acc.get(ca).expect("child acc computed before its parent");
            let b = acc.get(cb).expect("child acc computed before its parent");
            for (&ai, &ad) in a.leaf_idx.iter().zip(&a.dist) {
                for (&bi, &bd) in b.leaf_idx.iter().zip(&b.dist) {
                    triples.push((ai, bi, ad + bd));
                }
            }
        }

        let parts: Vec<Acc> =
            children.iter().map(|c| acc.get(c).expect("child acc computed before its parent").clone()).collect();
        (Acc::concat(parts), triples)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn e1_two_leaf_tree() {
        let mut t = TreeModel::new();
        let root = t.add_node(None);
        let a = t.add_node(Some("A".to_string()));
        let b = t.add_node(Some("B".to_string()));
        t.add_edge(root, a, Some(1.0)).unwrap();
        t.add_edge(root, b, Some(2.0)).unwrap();

        let pd = PDMBuilder::build(&t, Method::Patristic).unwrap();
        assert_eq!(*pd.get("A", "B").unwrap(), 3.0);
        assert_eq!(pd.tree_length(), 3.0);

        let nd = PDMBuilder::build(&t, Method::Node).unwrap();
        assert_eq!(*nd.get("A", "B").unwrap(), 2.0);
        assert_eq!(nd.tree_length(), 2.0);
    }

    #[test]
    fn e2_balanced_triplet() {
        let mut t = TreeModel::new();
        let root = t.add_node(None);
        let ab = t.add_node(None);
        let a = t.add_node(Some("A".to_string()));
        let b = t.add_node(Some("B".to_string()));
        let c = t.add_node(Some("C".to_string()));
        t.add_edge(root, ab, Some(2.0)).unwrap();
        t.add_edge(root, c, Some(3.0)).unwrap();
        t.add_edge(ab, a, Some(1.0)).unwrap();
        t.add_edge(ab, b, Some(1.0)).unwrap();

        let pd = PDMBuilder::build(&t, Method::Patristic).unwrap();
        assert_eq!(*pd.get("A", "B").unwrap(), 2.0);
        assert_eq!(*pd.get("A", "C").unwrap(), 6.0);
        assert_eq!(*pd.get("B", "C").unwrap(), 6.0);
        assert_eq!(pd.taxa(), vec!["A", "B", "C"]);

        let nd = PDMBuilder::build(&t, Method::Node).unwrap();
        assert_eq!(*nd.get("A", "B").unwrap(), 2.0);
        assert_eq!(*nd.get("A", "C").unwrap(), 3.0);
        assert_eq!(*nd.get("B", "C").unwrap(), 3.0);
    }

    #[test]
    fn e3_trifurcation() {
        let mut t = TreeModel::new();
        let root = t.add_node(None);
        let abc = t.add_node(None);
        let a = t.add_node(Some("A".to_string()));
        let b = t.add_node(Some("B".to_string()));
        let c = t.add_node(Some("C".to_string()));
        let d = t.add_node(Some("D".to_string()));
        t.add_edge(root, abc, Some(0.5)).unwrap();
        t.add_edge(root, d, Some(4.0)).unwrap();
        t.add_edge(abc, a, Some(1.0)).unwrap();
        t.add_edge(abc, b, Some(1.0)).unwrap();
        t.add_edge(abc, c, Some(1.0)).unwrap();

        let pd = PDMBuilder::build(&t, Method::Patristic).unwrap();
        assert_eq!(*pd.get("A", "B").unwrap(), 2.0);
        assert_eq!(*pd.get("A", "C").unwrap(), 2.0);
        assert_eq!(*pd.get("B", "C").unwrap(), 2.0);
        assert_eq!(*pd.get("A", "D").unwrap(), 5.5);
        assert_eq!(*pd.get("B", "D").unwrap(), 5.5);
        assert_eq!(*pd.get("C", "D").unwrap(), 5.5);

        let nd = PDMBuilder::build(&t, Method::Node).unwrap();
        assert_eq!(*nd.get("A", "B").unwrap(), 2.0);
        assert_eq!(*nd.get("A", "D").unwrap(), 3.0);
    }

    #[test]
    fn e4_unary_chain() {
        let mut t = TreeModel::new();
        let root = t.add_node(None);
        let unary = t.add_node(None);
        let a = t.add_node(Some("A".to_string()));
        let b = t.add_node(Some("B".to_string()));
        t.add_edge(root, unary, Some(1.0)).unwrap();
        t.add_edge(root, b, Some(3.0)).unwrap();
        t.add_edge(unary, a, Some(1.0)).unwrap();

        let pd = PDMBuilder::build(&t, Method::Patristic).unwrap();
        assert_eq!(*pd.get("A", "B").unwrap(), 5.0);
    }

    #[test]
    fn e5_duplicate_label_is_rejected() {
        let mut t = TreeModel::new();
        let root = t.add_node(None);
        let ab = t.add_node(None);
        let a1 = t.add_node(Some("A".to_string()));
        let a2 = t.add_node(Some("A".to_string()));
        let b = t.add_node(Some("B".to_string()));
        t.add_edge(root, ab, Some(1.0)).unwrap();
        t.add_edge(root, b, Some(2.0)).unwrap();
        t.add_edge(ab, a1, Some(1.0)).unwrap();
        t.add_edge(ab, a2, Some(1.0)).unwrap();

        assert!(matches!(PDMBuilder::build(&t, Method::Patristic), Err(Error::DuplicateTaxon(_))));
    }

    #[test]
    fn single_leaf_tree_has_zero_diagonal_only() {
        let mut t = TreeModel::new();
        t.add_node(Some("A".to_string()));
        let pd = PDMBuilder::build(&t, Method::Patristic).unwrap();
        assert_eq!(pd.len(), 1);
        assert_eq!(*pd.get("A", "A").unwrap(), 0.0);
        assert_eq!(pd.tree_length(), 0.0);
    }

    #[test]
    fn unlabeled_leaf_is_rejected() {
        let mut t = TreeModel::new();
        let root = t.add_node(None);
        let a = t.add_node(None);
        t.add_edge(root, a, Some(1.0)).unwrap();
        assert!(matches!(PDMBuilder::build(&t, Method::Patristic), Err(Error::UnlabeledLeaf)));
    }

    #[test]
    fn missing_edge_weight_in_patristic_mode_is_rejected() {
        let mut t = TreeModel::new();
        let root = t.add_node(None);
        let a = t.add_node(Some("A".to_string()));
        let b = t.add_node(Some("B".to_string()));
        t.add_edge(root, a, None).unwrap();
        t.add_edge(root, b, Some(1.0)).unwrap();
        assert!(matches!(PDMBuilder::build(&t, Method::Patristic), Err(Error::MissingEdgeWeight)));
        // NODE mode never looks at edge weights, so the same tree builds fine.
        assert!(PDMBuilder::build(&t, Method::Node).is_ok());
    }

    #[test]
    fn negative_edge_weight_is_rejected() {
        let mut t = TreeModel::new();
        let root = t.add_node(None);
        let a = t.add_node(Some("A".to_string()));
        let b = t.add_node(Some("B".to_string()));
        t.add_edge(root, a, Some(-1.0)).unwrap();
        t.add_edge(root, b, Some(1.0)).unwrap();
        assert!(matches!(PDMBuilder::build(&t, Method::Patristic), Err(Error::InvalidEdgeWeight(_))));
    }

    #[test]
    fn disconnected_tree_is_rejected() {
        let mut t = TreeModel::new();
        let root = t.add_node(None);
        let a = t.add_node(Some("A".to_string()));
        t.add_edge(root, a, Some(1.0)).unwrap();
        t.add_node(Some("Z".to_string()));
        assert!(matches!(PDMBuilder::build(&t, Method::Patristic), Err(Error::MalformedTree(_))));
    }
}
