use std::collections::VecDeque;

use crate::tree::{NodeId, ProjectTree};

/// How a node should render for the current filter query.
///
/// Hidden nodes stay in the tree; the view simply skips them. A namespace whose
/// own label matches keeps its row even when none of its projects do.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) enum NodeMatch {
    Hidden,
    DirectMatch,
    AncestorOfMatch,
}

impl NodeMatch {
    pub(crate) fn is_visible(self) -> bool {
        self != NodeMatch::Hidden
    }
}

/// Case-sensitive substring test. The empty query matches every label.
pub(crate) fn matches_filter(label: &str, query: &str) -> bool {
    label.contains(query)
}

/// Classifies a single node by scanning its subtree breadth first.
pub(crate) fn classify(tree: &ProjectTree, node: NodeId, query: &str) -> NodeMatch {
    if matches_filter(tree.label(node), query) {
        return NodeMatch::DirectMatch;
    }
    let mut queue: VecDeque<NodeId> = tree.children(node).iter().copied().collect();
    while let Some(id) = queue.pop_front() {
        if matches_filter(tree.label(id), query) {
            return NodeMatch::AncestorOfMatch;
        }
        queue.extend(tree.children(id).iter().copied());
    }
    NodeMatch::Hidden
}

/// Classifies every node in one pass, indexed by `NodeId`.
///
/// Children always carry larger ids than their parents, so walking the ids in
/// reverse sees every subtree before its root.
pub(crate) fn classify_all(tree: &ProjectTree, query: &str) -> Vec<NodeMatch> {
    let mut out = vec![NodeMatch::Hidden; tree.len()];
    let mut subtree_has_match = vec![false; tree.len()];
    for id in (0..tree.len()).rev() {
        let descendant_match = tree
            .children(id)
            .iter()
            .any(|&child| subtree_has_match[child]);
        out[id] = if matches_filter(tree.label(id), query) {
            NodeMatch::DirectMatch
        } else if descendant_match {
            NodeMatch::AncestorOfMatch
        } else {
            NodeMatch::Hidden
        };
        subtree_has_match[id] = out[id] == NodeMatch::DirectMatch || descendant_match;
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::project::ProjectRecord;
    use crate::tree::tests::record;
    use crate::tree::{NodeKind, ROOT};
    use std::collections::HashSet;

    fn scenario_tree() -> ProjectTree {
        ProjectTree::build(&HashSet::from([ProjectRecord::new(
            "repo1",
            "teamA",
            "git@x:teamA/repo1.git",
            "https://x/teamA/repo1.git",
        )]))
    }

    fn sample_tree() -> ProjectTree {
        ProjectTree::build(&HashSet::from([
            record("api", "backend"),
            record("auth", "backend"),
            record("web", "frontend"),
            record("design-system", "frontend"),
            record("notes", "alice"),
        ]))
    }

    #[test]
    fn query_matching_project_hides_nothing_in_its_branch() {
        let tree = scenario_tree();
        let matches = classify_all(&tree, "repo1");
        assert!(matches.iter().all(|m| m.is_visible()));
        let project = tree.ids_of_kind(NodeKind::Project)[0];
        assert_eq!(matches[project], NodeMatch::DirectMatch);
        assert_eq!(matches[ROOT], NodeMatch::AncestorOfMatch);
    }

    #[test]
    fn query_without_matches_hides_every_node() {
        let tree = scenario_tree();
        let matches = classify_all(&tree, "zzz");
        assert!(matches.iter().all(|&m| m == NodeMatch::Hidden));
    }

    #[test]
    fn empty_query_matches_everything() {
        let tree = sample_tree();
        let matches = classify_all(&tree, "");
        assert!(matches.iter().all(|&m| m == NodeMatch::DirectMatch));
    }

    #[test]
    fn matching_is_case_sensitive() {
        let tree = sample_tree();
        let matches = classify_all(&tree, "API");
        assert!(matches.iter().all(|&m| m == NodeMatch::Hidden));
    }

    #[test]
    fn ancestors_of_direct_matches_are_never_hidden() {
        let tree = sample_tree();
        for query in ["api", "front", "x/alice", "git@", "sys", "nothing"] {
            let matches = classify_all(&tree, query);
            for id in 0..tree.len() {
                if matches[id] != NodeMatch::DirectMatch {
                    continue;
                }
                let mut current = tree.parent(id);
                while let Some(ancestor) = current {
                    assert_ne!(matches[ancestor], NodeMatch::Hidden, "query {query}");
                    current = tree.parent(ancestor);
                }
            }
        }
    }

    #[test]
    fn single_pass_agrees_with_per_node_classification() {
        let tree = sample_tree();
        for query in ["", "a", "backend", "web.git", "ssh", "notes"] {
            let all = classify_all(&tree, query);
            for id in 0..tree.len() {
                assert_eq!(all[id], classify(&tree, id, query), "node {id} query {query}");
            }
        }
    }

    #[test]
    fn namespace_label_match_dims_projects_reached_through_urls() {
        let tree = sample_tree();
        let matches = classify_all(&tree, "backend");
        let backend = tree
            .children(ROOT)
            .iter()
            .copied()
            .find(|&id| tree.label(id) == "backend")
            .expect("backend namespace");
        assert_eq!(matches[backend], NodeMatch::DirectMatch);
        // Leaf URLs contain the namespace path, projects themselves do not.
        for &project in tree.children(backend) {
            assert_eq!(matches[project], NodeMatch::AncestorOfMatch);
        }
    }
}
