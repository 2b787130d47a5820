//! Validated, immutable tree definitions.

use std::collections::{BTreeMap, HashMap, HashSet};

use serde::{Deserialize, Serialize};

use crate::error::{Result, TreeError};
use crate::node::Node;

/// A behavior tree: a root id plus a flat map of nodes.
///
/// Constructed only through [`TreeDef::new`], which guarantees:
/// - the root exists
/// - every node's id equals its map key
/// - every referenced child exists
/// - no node is reachable from itself
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TreeDef {
    root: String,
    nodes: BTreeMap<String, Node>,
    /// child id -> parent id, derived from the root. Used to rebuild the
    /// running path from a single running node id.
    #[serde(skip)]
    parents: HashMap<String, String>,
}

impl TreeDef {
    pub fn new(root: impl Into<String>, nodes: BTreeMap<String, Node>) -> Result<Self> {
        let root = root.into();
        validate(&root, &nodes)?;
        let parents = parent_map(&root, &nodes);
        Ok(Self {
            root,
            nodes,
            parents,
        })
    }

    /// Builds a definition from a list of nodes keyed by their own ids.
    pub fn from_nodes(root: impl Into<String>, nodes: impl IntoIterator<Item = Node>) -> Result<Self> {
        let nodes = nodes
            .into_iter()
            .map(|node| (node.id().to_owned(), node))
            .collect();
        Self::new(root, nodes)
    }

    pub fn root(&self) -> &str {
        &self.root
    }

    pub fn node(&self, id: &str) -> Option<&Node> {
        self.nodes.get(id)
    }

    pub fn nodes(&self) -> &BTreeMap<String, Node> {
        &self.nodes
    }

    pub fn parent(&self, id: &str) -> Option<&str> {
        self.parents.get(id).map(String::as_str)
    }

    /// `id` and all of its ancestors up to the root. Empty if `id` is not
    /// part of this tree.
    pub fn path_to(&self, id: &str) -> HashSet<&str> {
        let mut path = HashSet::new();
        let Some((key, _)) = self.nodes.get_key_value(id) else {
            return path;
        };
        let mut current = Some(key.as_str());
        while let Some(node_id) = current {
            path.insert(node_id);
            current = self.parent(node_id);
        }
        path
    }
}

impl<'de> Deserialize<'de> for TreeDef {
    fn deserialize<D>(deserializer: D) -> std::result::Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        #[derive(Deserialize)]
        struct Raw {
            root: String,
            nodes: BTreeMap<String, Node>,
        }

        let raw = Raw::deserialize(deserializer)?;
        TreeDef::new(raw.root, raw.nodes).map_err(serde::de::Error::custom)
    }
}

fn validate(root: &str, nodes: &BTreeMap<String, Node>) -> Result<()> {
    if !nodes.contains_key(root) {
        return Err(TreeError::MissingRoot(root.to_owned()));
    }

    for (key, node) in nodes {
        if node.id() != key {
            return Err(TreeError::MislabeledNode {
                key: key.clone(),
                id: node.id().to_owned(),
            });
        }
        for child in node.children() {
            if !nodes.contains_key(child) {
                return Err(TreeError::MissingChild {
                    parent: key.clone(),
                    child: child.clone(),
                });
            }
        }
    }

    // Depth-first walk with an explicit "on stack" set to reject cycles.
    let mut done: HashSet<&str> = HashSet::new();
    for start in nodes.keys() {
        if done.contains(start.as_str()) {
            continue;
        }
        let mut on_stack: HashSet<&str> = HashSet::new();
        let mut stack: Vec<(&str, usize)> = vec![(start.as_str(), 0)];
        on_stack.insert(start.as_str());

        while let Some((id, next_child)) = stack.pop() {
            let children = nodes[id].children();
            if next_child < children.len() {
                stack.push((id, next_child + 1));
                let child = children[next_child].as_str();
                if on_stack.contains(child) {
                    return Err(TreeError::Cycle(child.to_owned()));
                }
                if !done.contains(child) {
                    on_stack.insert(child);
                    stack.push((child, 0));
                }
            } else {
                on_stack.remove(id);
                done.insert(id);
            }
        }
    }

    Ok(())
}

fn parent_map(root: &str, nodes: &BTreeMap<String, Node>) -> HashMap<String, String> {
    let mut parents = HashMap::new();
    let mut stack = vec![root];
    while let Some(id) = stack.pop() {
        for child in nodes[id].children() {
            // A node shared by several parents keeps the first one reached.
            if !parents.contains_key(child) {
                parents.insert(child.clone(), id.to_owned());
                stack.push(child.as_str());
            }
        }
    }
    parents
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::builder::{action, condition, inverter, sequence};

    #[test]
    fn accepts_valid_tree() {
        let tree = TreeDef::from_nodes(
            "root",
            [
                sequence("root", ["check", "act"]),
                condition("check", "has_target"),
                action("act", "attack"),
            ],
        )
        .unwrap();

        assert_eq!(tree.root(), "root");
        assert_eq!(tree.parent("act"), Some("root"));
        assert_eq!(tree.parent("root"), None);
    }

    #[test]
    fn rejects_missing_root() {
        let err = TreeDef::from_nodes("root", [action("a", "attack")]).unwrap_err();
        assert_eq!(err, TreeError::MissingRoot("root".into()));
    }

    #[test]
    fn rejects_missing_child_naming_it() {
        let err = TreeDef::from_nodes("root", [sequence("root", ["a", "ghost"]), action("a", "x")])
            .unwrap_err();
        assert_eq!(
            err,
            TreeError::MissingChild {
                parent: "root".into(),
                child: "ghost".into()
            }
        );
        assert!(err.to_string().contains("ghost"));
    }

    #[test]
    fn rejects_mislabeled_node() {
        let mut nodes = BTreeMap::new();
        nodes.insert("root".to_owned(), action("other", "x"));
        let err = TreeDef::new("root", nodes).unwrap_err();
        assert!(matches!(err, TreeError::MislabeledNode { .. }));
    }

    #[test]
    fn rejects_cycles() {
        let err = TreeDef::from_nodes(
            "root",
            [sequence("root", ["inv"]), inverter("inv", "root")],
        )
        .unwrap_err();
        assert!(matches!(err, TreeError::Cycle(_)));
    }

    #[test]
    fn path_to_walks_up_to_root() {
        let tree = TreeDef::from_nodes(
            "root",
            [
                sequence("root", ["inner"]),
                sequence("inner", ["leaf"]),
                action("leaf", "x"),
            ],
        )
        .unwrap();

        let path = tree.path_to("leaf");
        assert_eq!(path, HashSet::from(["leaf", "inner", "root"]));
        assert!(tree.path_to("missing").is_empty());
    }

    #[test]
    fn deserialization_validates() {
        let json = r#"{"root":"r","nodes":{"r":{"kind":"inverter","id":"r","child":"x"}}}"#;
        assert!(serde_json::from_str::<TreeDef>(json).is_err());
    }
}
