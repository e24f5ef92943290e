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

use indexmap::IndexSet;

use crate::error::{Error, Result};

/// Ordered, injective mapping from taxon name to a dense integer index.
///
/// Keys are added one at a time via [`IndexTable::add_key`] and keep the
/// order in which they were inserted; that order is the canonical row/column
/// order of every matrix built over this table.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct IndexTable {
    keys: IndexSet<String>,
}

impl IndexTable {
    pub fn new() -> Self {
        Self { keys: IndexSet::new() }
    }

    /// Insert `key`, returning its dense index. Fails if `key` is already
    /// present.
    pub fn add_key(&mut self, key: impl Into<String>) -> Result<usize> {
        let key = key.into();
        if self.keys.contains(&key) {
            log::warn!("duplicate taxon label: {key}");
            return Err(Error::DuplicateTaxon(key));
        }
        let (idx, _) = self.keys.insert_full(key);
        Ok(idx)
    }

    pub fn contains(&self, key: &str) -> bool {
        self.keys.contains(key)
    }

    pub fn index_of(&self, key: &str) -> Option<usize> {
        self.keys.get_index_of(key)
    }

    pub fn key_at(&self, idx: usize) -> Option<&str> {
        self.keys.get_index(idx).map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.keys.len()
    }

    pub fn is_empty(&self) -> bool {
        self.keys.is_empty()
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.keys.iter().map(String::as_str)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn insertion_order_is_canonical_order() {
        let mut t = IndexTable::new();
        assert_eq!(t.add_key("b").unwrap(), 0);
        assert_eq!(t.add_key("a").unwrap(), 1);
        assert_eq!(t.add_key("c").unwrap(), 2);
        assert_eq!(t.keys().collect::<Vec<_>>(), vec!["b", "a", "c"]);
        assert_eq!(t.index_of("a"), Some(1));
        assert_eq!(t.key_at(2), Some("c"));
    }

    #[test]
    fn duplicate_key_is_rejected() {
        let mut t = IndexTable::new();
        t.add_key("a").unwrap();
        assert!(matches!(t.add_key("a"), Err(Error::DuplicateTaxon(_))));
    }
}
