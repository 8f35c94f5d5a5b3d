//! Drive state: a flat list of nodes describing a tree of documents.
//!
//! A drive is an ordinary document whose global state holds
//! [`DriveNode`] entries, each referencing one child document (or a
//! folder grouping them). The tree shape is encoded through
//! `parent_folder` links rather than nesting, so lookups and moves stay
//! list operations.

use serde::{Deserialize, Serialize};

use crate::model::types::NodeId;

/// The registered document type of a drive.
pub const DRIVE_DOCUMENT_TYPE: &str = "quire/drive";

// ---------------------------------------------------------------------------
// Nodes
// ---------------------------------------------------------------------------

/// Whether a node is a document reference or a folder.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NodeKind {
    /// References a child document.
    File,
    /// Groups other nodes.
    Folder,
}

/// One entry in a drive's global state.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DriveNode {
    /// Unique node id within this drive.
    pub id: NodeId,
    /// Display name; unique names are not enforced, but the populate
    /// procedure skips candidates whose name already exists.
    pub name: String,
    /// File or folder.
    pub kind: NodeKind,
    /// Containing folder, or `None` for a root-level node.
    pub parent_folder: Option<NodeId>,
    /// The referenced document's type (`None` for folders).
    pub document_type: Option<String>,
}

// ---------------------------------------------------------------------------
// State
// ---------------------------------------------------------------------------

/// A drive's global scope state.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DriveState {
    /// All nodes, in insertion order.
    pub nodes: Vec<DriveNode>,
}

/// A drive's local scope state. Currently carries nothing; present so
/// the local log has a well-defined initial state.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DriveLocalState {}

impl DriveState {
    /// Find a node by id (first match, insertion order).
    #[must_use]
    pub fn node(&self, id: &NodeId) -> Option<&DriveNode> {
        self.nodes.iter().find(|n| &n.id == id)
    }

    /// Returns `true` if any node carries this display name.
    #[must_use]
    pub fn has_node_named(&self, name: &str) -> bool {
        self.nodes.iter().any(|n| n.name == name)
    }

    /// Returns `true` if `candidate` lies in the subtree rooted at
    /// `ancestor` (excluding `ancestor` itself).
    #[must_use]
    pub fn is_descendant(&self, ancestor: &NodeId, candidate: &NodeId) -> bool {
        let mut current = self.node(candidate).and_then(|n| n.parent_folder.as_ref());
        // Bounded walk: a well-formed drive has no cycles, but a corrupt
        // one must not hang us.
        for _ in 0..=self.nodes.len() {
            match current {
                Some(parent) if parent == ancestor => return true,
                Some(parent) => {
                    current = self.node(parent).and_then(|n| n.parent_folder.as_ref());
                }
                None => return false,
            }
        }
        false
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    fn id(s: &str) -> NodeId {
        NodeId::new(s).unwrap()
    }

    fn folder(node_id: &str, parent: Option<&str>) -> DriveNode {
        DriveNode {
            id: id(node_id),
            name: node_id.to_owned(),
            kind: NodeKind::Folder,
            parent_folder: parent.map(id),
            document_type: None,
        }
    }

    fn file(node_id: &str, parent: Option<&str>) -> DriveNode {
        DriveNode {
            id: id(node_id),
            name: node_id.to_owned(),
            kind: NodeKind::File,
            parent_folder: parent.map(id),
            document_type: Some("test/notes".to_owned()),
        }
    }

    #[test]
    fn default_state_is_empty() {
        assert!(DriveState::default().nodes.is_empty());
    }

    #[test]
    fn node_lookup_by_id() {
        let state = DriveState {
            nodes: vec![folder("a", None), file("b", Some("a"))],
        };
        assert_eq!(state.node(&id("b")).unwrap().name, "b");
        assert!(state.node(&id("zz")).is_none());
    }

    #[test]
    fn has_node_named_matches_display_name() {
        let state = DriveState {
            nodes: vec![file("a", None)],
        };
        assert!(state.has_node_named("a"));
        assert!(!state.has_node_named("b"));
    }

    #[test]
    fn descendant_walks_parent_chain() {
        let state = DriveState {
            nodes: vec![
                folder("root", None),
                folder("mid", Some("root")),
                file("leaf", Some("mid")),
            ],
        };
        assert!(state.is_descendant(&id("root"), &id("leaf")));
        assert!(state.is_descendant(&id("mid"), &id("leaf")));
        assert!(!state.is_descendant(&id("leaf"), &id("root")));
        assert!(!state.is_descendant(&id("root"), &id("root")));
    }

    #[test]
    fn descendant_survives_a_corrupt_cycle() {
        // a -> b -> a: malformed, but the walk must terminate.
        let state = DriveState {
            nodes: vec![folder("a", Some("b")), folder("b", Some("a"))],
        };
        assert!(!state.is_descendant(&id("zz"), &id("a")));
    }

    #[test]
    fn node_wire_shape() {
        let node = file("n1", None);
        let value = serde_json::to_value(&node).unwrap();
        assert_eq!(value.get("kind").unwrap(), "file");
        assert!(value.get("parentFolder").is_some());
        assert_eq!(value.get("documentType").unwrap(), "test/notes");
    }

    #[test]
    fn state_wire_roundtrip() {
        let state = DriveState {
            nodes: vec![folder("a", None), file("b", Some("a"))],
        };
        let json = serde_json::to_string(&state).unwrap();
        let back: DriveState = serde_json::from_str(&json).unwrap();
        assert_eq!(back, state);
    }
}
