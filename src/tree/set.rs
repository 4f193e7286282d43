//! Ordered set operations over string lists.
//!
//! Both functions treat their inputs as ordered sets: output order follows
//! first appearance and duplicates are dropped.

use std::collections::HashSet;

/// `a` followed by every element of `b` not already present.
pub fn union(a: &[String], b: &[String]) -> Vec<String> {
    let mut seen = HashSet::with_capacity(a.len() + b.len());
    a.iter()
        .chain(b.iter())
        .filter(|s| seen.insert(s.as_str()))
        .cloned()
        .collect()
}

/// Elements of `a` that are not in `b`, in `a`'s order.
pub fn difference(a: &[String], b: &[String]) -> Vec<String> {
    let excluded: HashSet<&str> = b.iter().map(String::as_str).collect();
    a.iter()
        .filter(|s| !excluded.contains(s.as_str()))
        .cloned()
        .collect()
}
