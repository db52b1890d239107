//! Immutable plan graph with link classification.
//!
//! The decoded plan is a node array plus child links. `PlanGraph` validates it
//! once (non-empty, dense indices, every link resolves) so that every lookup
//! afterwards is a plain index.

use tracing::{debug, warn};

use crate::error::{Error, Result};
use crate::plan::{ChildLink, PlanNode, PlanNodeKind};

/// Display name shared by every scalar function call node.
pub const FUNCTION_DISPLAY_NAME: &str = "Function";

/// Link type that keeps a scalar child visible in the tree.
pub const SCALAR_LINK_TYPE: &str = "Scalar";

/// A child link together with the node it points at. Never stored.
#[derive(Debug, Clone, Copy)]
pub struct ResolvedChildLink<'a> {
    pub link: &'a ChildLink,
    pub child: &'a PlanNode,
}

/// One scalar child inside a `ChildLinkGroup`.
#[derive(Debug, Clone, Copy)]
pub struct ChildLinkEntry<'a> {
    pub variable: Option<&'a str>,
    pub node: &'a PlanNode,
}

/// Scalar children of one node sharing a link type, in link order.
#[derive(Debug, Clone)]
pub struct ChildLinkGroup<'a> {
    pub link_type: &'a str,
    pub entries: Vec<ChildLinkEntry<'a>>,
}

#[derive(Debug, Clone)]
pub struct PlanGraph {
    nodes: Vec<PlanNode>,
    parents: Vec<Option<usize>>,
}

impl PlanGraph {
    /// Validate the node array and build the child to parent index.
    pub fn new(nodes: Vec<PlanNode>) -> Result<Self> {
        if nodes.is_empty() {
            return Err(Error::GraphConstruction("plan has no nodes".into()));
        }

        let len = nodes.len();
        let mut parents = vec![None; len];
        for (pos, node) in nodes.iter().enumerate() {
            if node.index != pos {
                return Err(Error::GraphConstruction(format!(
                    "node at position {pos} carries index {}",
                    node.index
                )));
            }
            for link in &node.child_links {
                let child = link.child_index;
                if child >= len {
                    return Err(Error::Reference {
                        parent: pos,
                        child,
                        len,
                    });
                }
                match parents[child] {
                    None => parents[child] = Some(pos),
                    Some(first) if first != pos => {
                        warn!(
                            child,
                            first,
                            other = pos,
                            "node has more than one parent; keeping the first"
                        );
                    }
                    Some(_) => {}
                }
            }
        }

        if let Some(parent) = parents[0] {
            warn!(parent, "root node 0 has an incoming link");
        }

        debug!(nodes = len, "plan graph constructed");
        Ok(Self { nodes, parents })
    }

    pub fn nodes(&self) -> &[PlanNode] {
        &self.nodes
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    /// Always false: construction rejects empty plans.
    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    pub fn root(&self) -> &PlanNode {
        &self.nodes[0]
    }

    pub fn node(&self, index: usize) -> Option<&PlanNode> {
        self.nodes.get(index)
    }

    /// Target of `link`; `None` stands for the root.
    ///
    /// Links must come from this graph, whose targets were checked at construction.
    pub fn child(&self, link: Option<&ChildLink>) -> &PlanNode {
        match link {
            Some(l) => &self.nodes[l.child_index],
            None => self.root(),
        }
    }

    pub fn resolve<'a>(&'a self, link: &'a ChildLink) -> ResolvedChildLink<'a> {
        ResolvedChildLink {
            link,
            child: self.child(Some(link)),
        }
    }

    /// The (first) node linking to `index`; `None` for the root or orphans.
    pub fn parent_of(&self, index: usize) -> Option<&PlanNode> {
        self.parents
            .get(index)
            .copied()
            .flatten()
            .map(|p| &self.nodes[p])
    }

    pub fn is_function_call(&self, link: &ChildLink) -> bool {
        self.child(Some(link)).display_name == FUNCTION_DISPLAY_NAME
    }

    /// Function calls linked as a condition (`Residual Condition`, `Seek Condition`, ...) or a split range.
    pub fn is_predicate(&self, link: &ChildLink) -> bool {
        self.is_function_call(link)
            && (link.link_type.ends_with("Condition") || link.link_type == "Split Range")
    }

    /// Relational children are visible; scalar children only through a `Scalar` link.
    ///
    /// The first half looks at the child's kind, the second at the link's
    /// type. `None` is the root link and is always visible.
    pub fn is_visible(&self, link: Option<&ChildLink>) -> bool {
        match link {
            None => true,
            Some(l) => {
                self.child(Some(l)).kind == PlanNodeKind::Relational
                    || l.link_type == SCALAR_LINK_TYPE
            }
        }
    }

    pub fn visible_child_links<'a>(
        &'a self,
        node: &'a PlanNode,
    ) -> impl Iterator<Item = &'a ChildLink> + 'a {
        node.child_links
            .iter()
            .filter(move |l| self.is_visible(Some(*l)))
    }

    /// Stored link type, relabeled `Input` for the implicit first input of an Apply.
    pub fn link_type<'a>(&self, link: &'a ChildLink) -> &'a str {
        match self.parent_of(link.child_index) {
            Some(parent) if is_implicit_apply_input(parent, link) => "Input",
            _ => link.link_type.as_str(),
        }
    }

    /// Dashed edge: the parent calls the child on another cluster node.
    pub fn is_remote_call(&self, parent: &PlanNode, link: &ChildLink) -> bool {
        let Some(target) = parent.metadata.get("subquery_cluster_node") else {
            return false;
        };
        if parent.metadata.get_str("call_type") == "Local" {
            return false;
        }
        target.as_str() == Some(link.child_index.to_string().as_str())
    }

    /// Scalar children of `node` passing `filter`, grouped by link type in first-seen order.
    pub fn scalar_child_links<'a>(
        &'a self,
        node: &'a PlanNode,
        filter: impl Fn(&ChildLink) -> bool,
    ) -> Vec<ChildLinkGroup<'a>> {
        let mut groups: Vec<ChildLinkGroup<'a>> = Vec::new();
        for link in &node.child_links {
            let child = self.child(Some(link));
            if child.kind != PlanNodeKind::Scalar || !filter(link) {
                continue;
            }
            let entry = ChildLinkEntry {
                variable: link.variable(),
                node: child,
            };
            match groups.iter_mut().find(|g| g.link_type == link.link_type) {
                Some(group) => group.entries.push(entry),
                None => groups.push(ChildLinkGroup {
                    link_type: &link.link_type,
                    entries: vec![entry],
                }),
            }
        }
        groups
    }

    pub fn non_variable_child_links<'a>(&'a self, node: &'a PlanNode) -> Vec<ChildLinkGroup<'a>> {
        self.scalar_child_links(node, |l| l.variable().is_none())
    }

    pub fn variable_child_links<'a>(&'a self, node: &'a PlanNode) -> Vec<ChildLinkGroup<'a>> {
        self.scalar_child_links(node, |l| l.variable().is_some())
    }
}

/// An untyped first link of an `...Apply` operator is its input side.
pub fn is_implicit_apply_input(parent: &PlanNode, link: &ChildLink) -> bool {
    link.link_type.is_empty()
        && parent.display_name.ends_with("Apply")
        && parent
            .child_links
            .first()
            .is_some_and(|first| first.child_index == link.child_index)
}
