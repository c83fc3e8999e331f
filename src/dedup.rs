//! Duplicate grouping across sources via union-find.
//!
//! The aggregation layer computes one fingerprint per extracted record and
//! unions record ids sharing a fingerprint; the resulting equivalence
//! classes are invariant to the order the sources answered in.

use std::collections::HashMap;

use crate::models::ParsedStream;
use crate::parser::release_name::{clean_title, normalize_for_matching};

/// Disjoint-set structure over string ids with union by rank and path
/// compression. Unlike the textbook structure, `find` on a never-registered
/// id silently creates a singleton, so callers need not pre-register every
/// id.
#[derive(Debug, Default)]
pub struct UnionFind {
    index: HashMap<String, usize>,
    ids: Vec<String>,
    parent: Vec<usize>,
    rank: Vec<u8>,
}

impl UnionFind {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers an id as a singleton set; a no-op when already known.
    pub fn make_set(&mut self, id: &str) -> usize {
        if let Some(&idx) = self.index.get(id) {
            return idx;
        }
        let idx = self.parent.len();
        self.index.insert(id.to_string(), idx);
        self.ids.push(id.to_string());
        self.parent.push(idx);
        self.rank.push(0);
        idx
    }

    /// Representative index for an id, creating a singleton for unseen ids.
    pub fn find(&mut self, id: &str) -> usize {
        let idx = self.make_set(id);
        self.find_root(idx)
    }

    fn find_root(&mut self, mut idx: usize) -> usize {
        while self.parent[idx] != idx {
            // Path halving keeps the compression iterative.
            self.parent[idx] = self.parent[self.parent[idx]];
            idx = self.parent[idx];
        }
        idx
    }

    pub fn union(&mut self, a: &str, b: &str) {
        let root_a = self.find(a);
        let root_b = self.find(b);
        if root_a == root_b {
            return;
        }
        match self.rank[root_a].cmp(&self.rank[root_b]) {
            std::cmp::Ordering::Less => self.parent[root_a] = root_b,
            std::cmp::Ordering::Greater => self.parent[root_b] = root_a,
            std::cmp::Ordering::Equal => {
                self.parent[root_b] = root_a;
                self.rank[root_a] += 1;
            }
        }
    }

    pub fn same_set(&mut self, a: &str, b: &str) -> bool {
        self.find(a) == self.find(b)
    }

    #[must_use]
    pub fn id_of(&self, idx: usize) -> Option<&str> {
        self.ids.get(idx).map(String::as_str)
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.ids.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.ids.is_empty()
    }

    /// Equivalence classes in insertion order: each group lists member ids
    /// in the order they were first seen, and groups are ordered by their
    /// earliest member. Deterministic regardless of union order.
    pub fn groups(&mut self) -> Vec<Vec<String>> {
        let mut by_root: HashMap<usize, usize> = HashMap::new();
        let mut out: Vec<Vec<String>> = Vec::new();
        for idx in 0..self.ids.len() {
            let root = self.find_root(idx);
            let slot = *by_root.entry(root).or_insert_with(|| {
                out.push(Vec::new());
                out.len() - 1
            });
            out[slot].push(self.ids[idx].clone());
        }
        out
    }
}

/// Derived key identifying one distinct release across sources: the torrent
/// info-hash when present, else normalized filename plus size.
#[must_use]
pub fn fingerprint(stream: &ParsedStream) -> String {
    if let Some(hash) = stream.info_hash() {
        return hash.to_lowercase();
    }
    let name = stream
        .filename
        .as_deref()
        .map(|f| normalize_for_matching(&clean_title(f)))
        .unwrap_or_default();
    let size = stream.size.map_or_else(String::new, |s| s.to_string());
    format!("{name}|{size}")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::Torrent;

    #[test]
    fn test_find_on_fresh_id_is_singleton() {
        let mut dsu = UnionFind::new();
        let root = dsu.find("a");
        assert_eq!(dsu.find("a"), root);
        assert_eq!(dsu.len(), 1);
    }

    #[test]
    fn test_union_groups_transitively() {
        let mut dsu = UnionFind::new();
        dsu.union("a", "b");
        dsu.union("b", "c");
        dsu.union("x", "y");
        assert!(dsu.same_set("a", "c"));
        assert!(dsu.same_set("x", "y"));
        assert!(!dsu.same_set("a", "x"));
    }

    #[test]
    fn test_result_invariant_to_union_order() {
        let mut forward = UnionFind::new();
        forward.union("a", "b");
        forward.union("b", "c");

        let mut reverse = UnionFind::new();
        reverse.union("b", "c");
        reverse.union("a", "b");

        assert!(forward.same_set("a", "c"));
        assert!(reverse.same_set("a", "c"));
    }

    #[test]
    fn test_groups_are_deterministic() {
        let mut dsu = UnionFind::new();
        dsu.make_set("a");
        dsu.make_set("b");
        dsu.make_set("c");
        dsu.union("c", "a");
        let groups = dsu.groups();
        assert_eq!(
            groups,
            vec![
                vec!["a".to_string(), "c".to_string()],
                vec!["b".to_string()],
            ]
        );
    }

    #[test]
    fn test_fingerprint_prefers_info_hash() {
        let stream = ParsedStream {
            filename: Some("Movie.2023.1080p.mkv".to_string()),
            size: Some(1000),
            torrent: Some(Torrent {
                info_hash: Some("ABCDEF0123".to_string()),
                ..Torrent::default()
            }),
            ..ParsedStream::default()
        };
        assert_eq!(fingerprint(&stream), "abcdef0123");
    }

    #[test]
    fn test_fingerprint_falls_back_to_name_and_size() {
        let stream = ParsedStream {
            filename: Some("Movie.Title.2023.1080p.mkv".to_string()),
            size: Some(42),
            ..ParsedStream::default()
        };
        assert_eq!(fingerprint(&stream), "movie title 2023 1080p mkv|42");
    }
}
