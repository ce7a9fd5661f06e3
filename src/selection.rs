use std::time::{Duration, Instant};

use crate::tree::{NodeId, NodeKind, ProjectTree};

/// The dialog hosting the picker. Only the confirm gate is driven from here.
pub(crate) trait CheckoutHost {
    fn set_confirm_enabled(&mut self, enabled: bool);
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub(crate) struct SelectionResult {
    pub(crate) valid: bool,
    pub(crate) url: Option<String>,
    pub(crate) should_commit: bool,
}

impl SelectionResult {
    fn invalid() -> Self {
        Self {
            valid: false,
            url: None,
            should_commit: false,
        }
    }
}

#[derive(Clone, Debug, Default)]
pub(crate) struct CheckoutSelection {
    selected_url: Option<String>,
    valid: bool,
}

impl CheckoutSelection {
    pub(crate) fn selected_url(&self) -> Option<&str> {
        self.selected_url.as_deref()
    }

    pub(crate) fn is_valid(&self) -> bool {
        self.valid
    }

    /// URL to hand to the checkout step when the dialog is accepted.
    pub(crate) fn last_selected_url(&self) -> Option<&str> {
        if self.is_valid() {
            self.selected_url.as_deref()
        } else {
            None
        }
    }

    /// Applies a pointer-down (or keyboard equivalent) on `node`.
    ///
    /// The confirm action is disabled first and only re-enabled when the node
    /// is a childless URL leaf of a tree whose root is hidden. Anything else
    /// leaves `selected_url` untouched.
    pub(crate) fn on_node_activated(
        &mut self,
        tree: &ProjectTree,
        node: Option<NodeId>,
        click_count: u8,
        host: &mut dyn CheckoutHost,
    ) -> SelectionResult {
        host.set_confirm_enabled(false);
        self.valid = false;

        let Some(node) = node.filter(|&id| id < tree.len()) else {
            return SelectionResult::invalid();
        };
        let eligible = tree.is_leaf(node)
            && !tree.root_visible()
            && matches!(tree.node(node).kind, NodeKind::Url(_));
        if !eligible {
            return SelectionResult::invalid();
        }

        let url = tree.label(node).to_string();
        self.selected_url = Some(url.clone());
        self.valid = true;
        host.set_confirm_enabled(true);

        SelectionResult {
            valid: true,
            url: Some(url),
            should_commit: click_count == 2,
        }
    }

    /// Invalidates the selection after a refresh or a filter change.
    pub(crate) fn reset(&mut self, host: &mut dyn CheckoutHost) {
        self.valid = false;
        host.set_confirm_enabled(false);
    }
}

/// Turns raw pointer presses into click counts.
#[derive(Clone, Debug, Default)]
pub(crate) struct ClickTracker {
    last: Option<(usize, Instant)>,
}

impl ClickTracker {
    pub(crate) const DOUBLE_CLICK: Duration = Duration::from_millis(400);

    /// Returns 2 when `row` was also pressed within the double-click window, else 1.
    pub(crate) fn register(&mut self, row: usize, now: Instant) -> u8 {
        let is_double = matches!(
            self.last,
            Some((last_row, at)) if last_row == row && now.saturating_duration_since(at) <= Self::DOUBLE_CLICK
        );
        if is_double {
            self.last = None;
            2
        } else {
            self.last = Some((row, now));
            1
        }
    }

    pub(crate) fn clear(&mut self) {
        self.last = None;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tree::tests::record;
    use crate::tree::ROOT;
    use std::collections::HashSet;

    #[derive(Default)]
    struct MockHost {
        confirm: Option<bool>,
    }

    impl CheckoutHost for MockHost {
        fn set_confirm_enabled(&mut self, enabled: bool) {
            self.confirm = Some(enabled);
        }
    }

    fn tree() -> ProjectTree {
        ProjectTree::build(&HashSet::from([record("repo1", "teamA")]))
    }

    fn project_and_leaves(tree: &ProjectTree) -> (NodeId, NodeId, NodeId) {
        let project = tree.ids_of_kind(NodeKind::Project)[0];
        let children = tree.children(project);
        (project, children[0], children[1])
    }

    #[test]
    fn single_click_on_leaf_selects_without_commit() {
        let tree = tree();
        let (_, ssh, _) = project_and_leaves(&tree);
        let mut selection = CheckoutSelection::default();
        let mut host = MockHost::default();

        let result = selection.on_node_activated(&tree, Some(ssh), 1, &mut host);

        assert!(result.valid);
        assert!(!result.should_commit);
        assert_eq!(result.url.as_deref(), Some("git@x:teamA/repo1.git"));
        assert_eq!(selection.last_selected_url(), Some("git@x:teamA/repo1.git"));
        assert_eq!(host.confirm, Some(true));
    }

    #[test]
    fn double_click_on_leaf_commits_its_label() {
        let tree = tree();
        let (_, _, http) = project_and_leaves(&tree);
        let mut selection = CheckoutSelection::default();
        let mut host = MockHost::default();

        let result = selection.on_node_activated(&tree, Some(http), 2, &mut host);

        assert!(result.should_commit);
        assert_eq!(result.url.as_deref(), Some(tree.label(http)));
    }

    #[test]
    fn click_on_project_keeps_previous_url_and_disables_confirm() {
        let tree = tree();
        let (project, ssh, _) = project_and_leaves(&tree);
        let mut selection = CheckoutSelection::default();
        let mut host = MockHost::default();
        selection.on_node_activated(&tree, Some(ssh), 1, &mut host);

        let result = selection.on_node_activated(&tree, Some(project), 1, &mut host);

        assert_eq!(result, SelectionResult::invalid());
        assert_eq!(selection.selected_url(), Some("git@x:teamA/repo1.git"));
        assert!(!selection.is_valid());
        assert_eq!(host.confirm, Some(false));
    }

    #[test]
    fn double_click_on_namespace_never_commits() {
        let tree = tree();
        let namespace = tree.children(ROOT)[0];
        let mut selection = CheckoutSelection::default();
        let mut host = MockHost::default();

        let result = selection.on_node_activated(&tree, Some(namespace), 2, &mut host);

        assert!(!result.should_commit);
        assert!(selection.selected_url().is_none());
    }

    #[test]
    fn unresolved_node_is_invalid() {
        let tree = tree();
        let mut selection = CheckoutSelection::default();
        let mut host = MockHost::default();

        assert_eq!(
            selection.on_node_activated(&tree, None, 1, &mut host),
            SelectionResult::invalid()
        );
        assert_eq!(
            selection.on_node_activated(&tree, Some(999), 2, &mut host),
            SelectionResult::invalid()
        );
        assert_eq!(host.confirm, Some(false));
    }

    #[test]
    fn loading_placeholder_is_not_selectable() {
        let tree = ProjectTree::loading();
        let mut selection = CheckoutSelection::default();
        let mut host = MockHost::default();

        let result = selection.on_node_activated(&tree, Some(ROOT), 2, &mut host);

        assert!(!result.valid);
        assert!(selection.selected_url().is_none());
    }

    #[test]
    fn empty_tree_root_is_not_selectable() {
        let tree = ProjectTree::empty();
        let mut selection = CheckoutSelection::default();
        let mut host = MockHost::default();

        let result = selection.on_node_activated(&tree, Some(ROOT), 1, &mut host);
        assert!(!result.valid);
    }

    #[test]
    fn reset_invalidates_and_disables_confirm() {
        let tree = tree();
        let (_, ssh, _) = project_and_leaves(&tree);
        let mut selection = CheckoutSelection::default();
        let mut host = MockHost::default();
        selection.on_node_activated(&tree, Some(ssh), 1, &mut host);

        selection.reset(&mut host);

        assert!(!selection.is_valid());
        assert!(selection.last_selected_url().is_none());
        assert_eq!(host.confirm, Some(false));
    }

    #[test]
    fn click_tracker_detects_double_press_on_same_row() {
        let mut tracker = ClickTracker::default();
        let start = Instant::now();

        assert_eq!(tracker.register(3, start), 1);
        assert_eq!(tracker.register(3, start + Duration::from_millis(100)), 2);
        assert_eq!(tracker.register(3, start + Duration::from_millis(200)), 1);
        assert_eq!(tracker.register(4, start + Duration::from_millis(250)), 1);
        assert_eq!(
            tracker.register(4, start + Duration::from_millis(250) + ClickTracker::DOUBLE_CLICK * 2),
            1
        );
    }
}
