use std::collections::{BTreeMap, HashSet};

use crate::project::ProjectRecord;

pub(crate) type NodeId = usize;

pub(crate) const ROOT: NodeId = 0;
pub(crate) const ROOT_LABEL: &str = "My Projects";
pub(crate) const LOADING_LABEL: &str = "loading...";

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) enum UrlKind {
    Ssh,
    Http,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) enum NodeKind {
    Root,
    Namespace,
    Project,
    Url(UrlKind),
}

#[derive(Clone, Debug)]
pub(crate) struct Node {
    pub(crate) label: String,
    pub(crate) kind: NodeKind,
    pub(crate) children: Vec<NodeId>,
    pub(crate) expanded: bool,
}

/// Namespace -> project -> clone URL hierarchy.
///
/// Nodes live in an arena indexed by `NodeId`. A child is always pushed after
/// its parent, so every child id is greater than its parent's id; the filter
/// relies on this to classify the whole tree in one reverse pass.
#[derive(Clone, Debug)]
pub(crate) struct ProjectTree {
    nodes: Vec<Node>,
    parent: Vec<Option<NodeId>>,
    root_visible: bool,
}

impl ProjectTree {
    /// Builds the tree for a project set. Namespaces are sorted by label and
    /// projects by name so that the same input always yields the same rows.
    pub(crate) fn build(records: &HashSet<ProjectRecord>) -> Self {
        let mut by_namespace: BTreeMap<&str, Vec<&ProjectRecord>> = BTreeMap::new();
        for record in records {
            by_namespace
                .entry(record.namespace.as_str())
                .or_default()
                .push(record);
        }

        let mut nodes = Vec::new();
        let root = push_node(&mut nodes, ROOT_LABEL, NodeKind::Root);
        nodes[root].expanded = true;

        for (namespace, mut projects) in by_namespace {
            projects.sort();
            let namespace_node = push_node(&mut nodes, namespace, NodeKind::Namespace);
            nodes[namespace_node].expanded = true;
            nodes[root].children.push(namespace_node);

            for project in projects {
                let project_node = push_node(&mut nodes, &project.name, NodeKind::Project);
                let ssh = push_node(&mut nodes, &project.ssh_url, NodeKind::Url(UrlKind::Ssh));
                let http = push_node(&mut nodes, &project.http_url, NodeKind::Url(UrlKind::Http));
                nodes[project_node].children.extend([ssh, http]);
                nodes[namespace_node].children.push(project_node);
            }
        }

        let parent = build_parent_map(&nodes);
        Self {
            nodes,
            parent,
            root_visible: false,
        }
    }

    /// Placeholder shown while a refresh is in flight: a single visible root leaf.
    pub(crate) fn loading() -> Self {
        let mut nodes = Vec::new();
        push_node(&mut nodes, LOADING_LABEL, NodeKind::Root);
        let parent = build_parent_map(&nodes);
        Self {
            nodes,
            parent,
            root_visible: true,
        }
    }

    pub(crate) fn empty() -> Self {
        Self::build(&HashSet::new())
    }

    pub(crate) fn len(&self) -> usize {
        self.nodes.len()
    }

    pub(crate) fn node(&self, id: NodeId) -> &Node {
        &self.nodes[id]
    }

    pub(crate) fn label(&self, id: NodeId) -> &str {
        &self.nodes[id].label
    }

    pub(crate) fn children(&self, id: NodeId) -> &[NodeId] {
        &self.nodes[id].children
    }

    pub(crate) fn parent(&self, id: NodeId) -> Option<NodeId> {
        self.parent.get(id).copied().flatten()
    }

    pub(crate) fn is_leaf(&self, id: NodeId) -> bool {
        self.nodes[id].children.is_empty()
    }

    pub(crate) fn root_visible(&self) -> bool {
        self.root_visible
    }

    pub(crate) fn set_expanded(&mut self, id: NodeId, expanded: bool) {
        if let Some(node) = self.nodes.get_mut(id) {
            node.expanded = expanded;
        }
    }

    #[cfg(test)]
    pub(crate) fn ids_of_kind(&self, kind: NodeKind) -> Vec<NodeId> {
        self.nodes
            .iter()
            .enumerate()
            .filter(|(_, node)| node.kind == kind)
            .map(|(id, _)| id)
            .collect()
    }

    /// Walks up from `id` to the project node that owns it, if any.
    pub(crate) fn project_of(&self, id: NodeId) -> Option<NodeId> {
        let mut current = Some(id);
        while let Some(node_id) = current {
            match self.nodes.get(node_id)?.kind {
                NodeKind::Project => return Some(node_id),
                NodeKind::Url(_) => current = self.parent(node_id),
                NodeKind::Root | NodeKind::Namespace => return None,
            }
        }
        None
    }

    /// The HTTP clone URL leaf under a project node.
    pub(crate) fn http_url_of(&self, project: NodeId) -> Option<&str> {
        self.children(project)
            .iter()
            .find(|&&child| self.nodes[child].kind == NodeKind::Url(UrlKind::Http))
            .map(|&child| self.label(child))
    }
}

fn push_node(nodes: &mut Vec<Node>, label: &str, kind: NodeKind) -> NodeId {
    let id = nodes.len();
    nodes.push(Node {
        label: label.to_string(),
        kind,
        children: Vec::new(),
        expanded: false,
    });
    id
}

fn build_parent_map(nodes: &[Node]) -> Vec<Option<NodeId>> {
    let mut parent = vec![None; nodes.len()];
    for (idx, node) in nodes.iter().enumerate() {
        for &child in &node.children {
            parent[child] = Some(idx);
        }
    }
    parent
}
