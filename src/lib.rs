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

//! All-pairs phylogenetic distance matrices from weighted trees.
//!
//! Build a [`TreeModel`] node-by-node (`add_node`/`add_edge`), hand it to
//! [`PDMBuilder::build`] to get a [`Pdm`], then query pairwise distances or
//! serialize the whole matrix with [`PdmStore`]. This crate has no Newick
//! parser and no CLI of its own — parsing a tree file into a `TreeModel` is
//! the caller's job.

pub mod builder;
pub mod error;
pub mod index;
pub mod pdm;
pub mod store;
pub mod symmat;
pub mod triangular;
pub mod tree;

pub use builder::{BuildOptions, Method, PDMBuilder};
pub use error::{Error, Result};
pub use index::IndexTable;
pub use pdm::{NodeWidth, Pdm};
pub use store::PdmStore;
pub use symmat::SymMat;
pub use tree::{NodeId, TreeModel};
