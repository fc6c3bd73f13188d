//! # Inverted index (§3, §4.4)
//!
//! Maps a predicate id to the set of combination ids that require it,
//! backed by a compressed roaring bitmap per predicate rather than a
//! plain `Vec<u32>` — combination ids are dense and predicates are
//! frequently shared across thousands of combinations, which is exactly
//! roaring's sweet spot.

use roaring::RoaringBitmap;
use std::collections::HashMap;

#[derive(Debug, Default)]
pub struct InvertedIndex {
    by_predicate: HashMap<u32, RoaringBitmap>,
}

impl InvertedIndex {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, predicate_id: u32, combination_id: u32) {
        self.by_predicate
            .entry(predicate_id)
            .or_default()
            .insert(combination_id);
    }

    pub fn combinations_for(&self, predicate_id: u32) -> Option<&RoaringBitmap> {
        self.by_predicate.get(&predicate_id)
    }

    pub fn predicate_count(&self) -> usize {
        self.by_predicate.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn insert_and_lookup_round_trip() {
        let mut index = InvertedIndex::new();
        index.insert(1, 10);
        index.insert(1, 20);
        index.insert(2, 10);

        let combos = index.combinations_for(1).unwrap();
        assert!(combos.contains(10));
        assert!(combos.contains(20));
        assert!(!combos.contains(30));
    }

    #[test]
    fn unknown_predicate_has_no_combinations() {
        let index = InvertedIndex::new();
        assert!(index.combinations_for(99).is_none());
    }
}
