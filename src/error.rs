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

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("Tree is malformed: {0}")]
    MalformedTree(String),

    #[error("Leaf node has no taxon label")]
    UnlabeledLeaf,

    #[error("Duplicate taxon label: {0}")]
    DuplicateTaxon(String),

    #[error("Non-root node is missing an edge weight in patristic mode")]
    MissingEdgeWeight,

    #[error("Invalid edge weight: {0} (must be finite and non-negative)")]
    InvalidEdgeWeight(f64),

    #[error("Unknown taxon key: {0}")]
    UnknownKey(String),

    #[error("Unknown distance method: {0}")]
    UnknownMethod(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Corrupt PDM store: {0}")]
    CorruptStore(String),
}
