// matcher.rs - name-based role matching over node ancestry
//
// Geometry roles (collision, visual, pickable, door, ladder) are encoded in
// node names by the client's artists; a node inherits a role from any
// ancestor, so every query walks from the node toward the root.

use regex::Regex;

use crate::scene::{ModelTree, NodeHandle};

fn prefix_matches(name: &str, filter: &str) -> bool {
    // an empty filter string always matches
    filter.is_empty()
        || (name.len() >= filter.len()
            && name.as_bytes()[..filter.len()].eq_ignore_ascii_case(filter.as_bytes()))
}

/// True if the node's ancestry matches the filter set.
///
/// ANY mode (`all == false`): any ancestor's name starting with any filter
/// satisfies the query. ALL mode: ancestors matching any filter are counted
/// walking upward, and the query holds only if the count equals the filter
/// set size once the root has been passed.
pub fn is_matched(tree: &ModelTree, node: NodeHandle, filters: &[&str], all: bool) -> bool {
    let mut match_count = 0usize;
    for handle in tree.ancestry(node) {
        let name = tree.node(handle).name.as_str();
        if filters.iter().any(|f| prefix_matches(name, f)) {
            if all {
                match_count += 1;
            } else {
                return true;
            }
        }
    }
    match_count == filters.len()
}

/// Scans the ancestry toward the root and returns the first node name
/// matched by any of the regexes. Patterns are tested against the lowercased
/// name; the literal name is returned so callers can parse suffixes out of
/// it.
pub fn find_match_regex<'a>(
    tree: &'a ModelTree,
    node: NodeHandle,
    filters: &[Regex],
) -> Option<&'a str> {
    for handle in tree.ancestry(node) {
        let name = &tree.node(handle).name;
        let lowered = name.to_lowercase();
        if filters.iter().any(|r| r.is_match(&lowered)) {
            return Some(name);
        }
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testutil::tree_of;

    #[test]
    fn test_any_mode_matches_ancestor_prefix() {
        // leaf "foliage" under "Collide Box" under root
        let tree = tree_of(&[("root", None), ("Collide Box", Some(0)), ("foliage", Some(1))]);
        assert!(is_matched(&tree, 2, &["collide"], false));
        assert!(!is_matched(&tree, 2, &["visible"], false));
        // prefix match is case-insensitive
        assert!(is_matched(&tree, 1, &["COLLIDE"], false));
    }

    #[test]
    fn test_any_mode_empty_filter_string_matches_everything() {
        let tree = tree_of(&[("whatever", None)]);
        assert!(is_matched(&tree, 0, &[""], false));
    }

    #[test]
    fn test_all_mode_requires_every_filter() {
        let tree = tree_of(&[
            ("tree coll", None),
            ("collisionswitch", Some(0)),
            ("mesh", Some(1)),
        ]);
        // "mesh" matches neither filter, its two ancestors satisfy both
        assert!(is_matched(&tree, 2, &["collisionswitch", "tree coll"], true));
        // only one of the two filters is satisfied before the root
        let partial = tree_of(&[("collisionswitch", None), ("mesh", Some(0))]);
        assert!(!is_matched(&partial, 1, &["collisionswitch", "tree coll"], true));
    }

    #[test]
    fn test_all_mode_is_order_independent() {
        let a_then_b = tree_of(&[("beta", None), ("alpha", Some(0))]);
        let b_then_a = tree_of(&[("alpha", None), ("beta", Some(0))]);
        assert!(is_matched(&a_then_b, 1, &["alpha", "beta"], true));
        assert!(is_matched(&b_then_a, 1, &["alpha", "beta"], true));
    }

    #[test]
    fn test_regex_returns_first_matching_literal_name() {
        let tree = tree_of(&[("root", None), ("Climb1:2", Some(0)), ("rungs", Some(1))]);
        let regexes = vec![Regex::new("^climb([0-9:])+").unwrap()];
        assert_eq!(find_match_regex(&tree, 2, &regexes), Some("Climb1:2"));
        assert_eq!(find_match_regex(&tree, 0, &regexes), None);
    }
}
