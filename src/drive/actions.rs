//! Drive reducers: add, move, rename, and remove nodes.
//!
//! Adding a child document to a drive is itself dispatched as an
//! `ADD_FILE` action against the drive, never a side-channel write, so
//! the drive's own operation log is the audit trail of its tree's
//! history.
//!
//! Every rejection names its exact site: a missing parent during
//! `ADD_FILE` is a different error kind than a missing move target
//! during `UPDATE_NODE`, even though both are "not found".

use std::collections::BTreeSet;
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::dispatch::Emitter;
use crate::model::types::{NodeId, Scope};
use crate::model::update::Update;
use crate::registry::{DomainError, Registry, RegistryError};

use super::types::{DriveLocalState, DriveNode, DriveState, NodeKind, DRIVE_DOCUMENT_TYPE};

// ---------------------------------------------------------------------------
// Action kinds
// ---------------------------------------------------------------------------

/// Add a file node referencing a child document.
pub const ADD_FILE: &str = "ADD_FILE";
/// Add a folder node.
pub const ADD_FOLDER: &str = "ADD_FOLDER";
/// Rename or move an existing node.
pub const UPDATE_NODE: &str = "UPDATE_NODE";
/// Remove a node (and, for folders, its descendants).
pub const REMOVE_NODE: &str = "REMOVE_NODE";

// ---------------------------------------------------------------------------
// Inputs
// ---------------------------------------------------------------------------

/// Input of [`ADD_FILE`].
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AddFileInput {
    /// Id of the new node.
    pub id: NodeId,
    /// Display name.
    pub name: String,
    /// Containing folder; root level when absent.
    #[serde(default)]
    pub parent_folder: Option<NodeId>,
    /// The referenced document's type.
    pub document_type: String,
}

/// Input of [`ADD_FOLDER`].
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AddFolderInput {
    /// Id of the new node.
    pub id: NodeId,
    /// Display name.
    pub name: String,
    /// Containing folder; root level when absent.
    #[serde(default)]
    pub parent_folder: Option<NodeId>,
}

/// Input of [`UPDATE_NODE`]. Both fields are tri-state: an absent field
/// leaves the node untouched, explicit null clears (only meaningful for
/// `parentFolder`, where it moves the node to the root), and a value
/// replaces.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateNodeInput {
    /// The node to update.
    pub id: NodeId,
    /// New display name. Clearing a name is rejected.
    #[serde(default, skip_serializing_if = "Update::is_absent")]
    pub name: Update<String>,
    /// New containing folder; null moves the node to the root.
    #[serde(default, skip_serializing_if = "Update::is_absent")]
    pub parent_folder: Update<NodeId>,
}

/// Input of [`REMOVE_NODE`].
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RemoveNodeInput {
    /// The node to remove.
    pub id: NodeId,
}

// ---------------------------------------------------------------------------
// Errors
// ---------------------------------------------------------------------------

/// Rejections raised by the drive reducers.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum DriveError {
    /// A node with this id already exists in the drive.
    DuplicateNodeId {
        /// The duplicated id.
        id: NodeId,
    },
    /// `ADD_FILE` referenced a parent folder that does not exist.
    AddFileParentNotFound {
        /// The missing parent id.
        id: NodeId,
    },
    /// `ADD_FOLDER` referenced a parent folder that does not exist.
    AddFolderParentNotFound {
        /// The missing parent id.
        id: NodeId,
    },
    /// `UPDATE_NODE` targeted a node that does not exist.
    UpdateNodeNotFound {
        /// The missing node id.
        id: NodeId,
    },
    /// `UPDATE_NODE` referenced a move target that does not exist.
    UpdateNodeTargetNotFound {
        /// The missing target folder id.
        id: NodeId,
    },
    /// `REMOVE_NODE` targeted a node that does not exist.
    RemoveNodeNotFound {
        /// The missing node id.
        id: NodeId,
    },
    /// The referenced parent exists but is a file, not a folder.
    ParentNotAFolder {
        /// The offending parent id.
        id: NodeId,
    },
    /// A node name was cleared or set to whitespace.
    EmptyNodeName {
        /// The node whose name was rejected.
        id: NodeId,
    },
    /// Moving a node under itself or one of its descendants.
    NodeCycle {
        /// The node being moved.
        id: NodeId,
    },
}

impl DriveError {
    /// The stable discriminator recorded on the converted
    /// [`DomainError`].
    #[must_use]
    pub const fn kind(&self) -> &'static str {
        match self {
            Self::DuplicateNodeId { .. } => "DuplicateNodeId",
            Self::AddFileParentNotFound { .. } => "AddFileParentNotFound",
            Self::AddFolderParentNotFound { .. } => "AddFolderParentNotFound",
            Self::UpdateNodeNotFound { .. } => "UpdateNodeNotFound",
            Self::UpdateNodeTargetNotFound { .. } => "UpdateNodeTargetNotFound",
            Self::RemoveNodeNotFound { .. } => "RemoveNodeNotFound",
            Self::ParentNotAFolder { .. } => "ParentNotAFolder",
            Self::EmptyNodeName { .. } => "EmptyNodeName",
            Self::NodeCycle { .. } => "NodeCycle",
        }
    }
}

impl fmt::Display for DriveError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::DuplicateNodeId { id } => write!(f, "a node with id '{id}' already exists"),
            Self::AddFileParentNotFound { id } => {
                write!(f, "cannot add file: no folder with id '{id}'")
            }
            Self::AddFolderParentNotFound { id } => {
                write!(f, "cannot add folder: no folder with id '{id}'")
            }
            Self::UpdateNodeNotFound { id } => write!(f, "cannot update: no node with id '{id}'"),
            Self::UpdateNodeTargetNotFound { id } => {
                write!(f, "cannot move: no folder with id '{id}'")
            }
            Self::RemoveNodeNotFound { id } => write!(f, "cannot remove: no node with id '{id}'"),
            Self::ParentNotAFolder { id } => write!(f, "node '{id}' is a file, not a folder"),
            Self::EmptyNodeName { id } => write!(f, "node '{id}' must keep a non-empty name"),
            Self::NodeCycle { id } => {
                write!(f, "moving node '{id}' there would create a cycle")
            }
        }
    }
}

impl std::error::Error for DriveError {}

impl From<DriveError> for DomainError {
    fn from(e: DriveError) -> Self {
        let kind = e.kind();
        let message = e.to_string();
        match e {
            DriveError::AddFileParentNotFound { .. }
            | DriveError::AddFolderParentNotFound { .. }
            | DriveError::UpdateNodeNotFound { .. }
            | DriveError::UpdateNodeTargetNotFound { .. }
            | DriveError::RemoveNodeNotFound { .. } => Self::not_found(kind, message),
            DriveError::DuplicateNodeId { .. }
            | DriveError::ParentNotAFolder { .. }
            | DriveError::EmptyNodeName { .. }
            | DriveError::NodeCycle { .. } => Self::invariant(kind, message),
        }
    }
}

// ---------------------------------------------------------------------------
// Reducers
// ---------------------------------------------------------------------------

fn check_new_node(
    state: &DriveState,
    id: &NodeId,
    parent: Option<&NodeId>,
    missing_parent: impl FnOnce(NodeId) -> DriveError,
) -> Result<(), DomainError> {
    // Duplicate-id rejection comes first: nothing is mutated after a
    // rejection of any kind.
    if state.node(id).is_some() {
        return Err(DriveError::DuplicateNodeId { id: id.clone() }.into());
    }
    if let Some(parent_id) = parent {
        match state.node(parent_id) {
            None => return Err(missing_parent(parent_id.clone()).into()),
            Some(node) if node.kind != NodeKind::Folder => {
                return Err(DriveError::ParentNotAFolder {
                    id: parent_id.clone(),
                }
                .into())
            }
            Some(_) => {}
        }
    }
    Ok(())
}

/// `ADD_FILE`: append a file node referencing a child document.
///
/// # Errors
/// Rejects duplicate node ids, missing parents, and file parents.
pub fn add_file(
    state: &mut DriveState,
    input: AddFileInput,
    _emitter: &mut Emitter,
) -> Result<(), DomainError> {
    check_new_node(
        state,
        &input.id,
        input.parent_folder.as_ref(),
        |id| DriveError::AddFileParentNotFound { id },
    )?;
    state.nodes.push(DriveNode {
        id: input.id,
        name: input.name,
        kind: NodeKind::File,
        parent_folder: input.parent_folder,
        document_type: Some(input.document_type),
    });
    Ok(())
}

/// `ADD_FOLDER`: append a folder node.
///
/// # Errors
/// Rejects duplicate node ids, missing parents, and file parents.
pub fn add_folder(
    state: &mut DriveState,
    input: AddFolderInput,
    _emitter: &mut Emitter,
) -> Result<(), DomainError> {
    check_new_node(
        state,
        &input.id,
        input.parent_folder.as_ref(),
        |id| DriveError::AddFolderParentNotFound { id },
    )?;
    state.nodes.push(DriveNode {
        id: input.id,
        name: input.name,
        kind: NodeKind::Folder,
        parent_folder: input.parent_folder,
        document_type: None,
    });
    Ok(())
}

enum ParentChange {
    Keep,
    Root,
    Move(NodeId),
}

/// `UPDATE_NODE`: rename and/or move a node.
///
/// Tri-state per field: absent leaves the field alone, null clears it
/// (moving to the root for `parentFolder`; rejected for `name`), and a
/// value replaces it.
///
/// # Errors
/// Rejects missing nodes, missing or non-folder move targets, cleared
/// names, and moves that would create a cycle.
pub fn update_node(
    state: &mut DriveState,
    input: UpdateNodeInput,
    _emitter: &mut Emitter,
) -> Result<(), DomainError> {
    let Some(position) = state.nodes.iter().position(|n| n.id == input.id) else {
        return Err(DriveError::UpdateNodeNotFound { id: input.id }.into());
    };

    let new_name = match input.name {
        Update::Absent => None,
        Update::Clear => {
            return Err(DriveError::EmptyNodeName { id: input.id }.into());
        }
        Update::Set(name) => {
            if name.trim().is_empty() {
                return Err(DriveError::EmptyNodeName { id: input.id }.into());
            }
            Some(name)
        }
    };

    let parent_change = match input.parent_folder {
        Update::Absent => ParentChange::Keep,
        Update::Clear => ParentChange::Root,
        Update::Set(target) => {
            if target == input.id {
                return Err(DriveError::NodeCycle { id: input.id }.into());
            }
            match state.node(&target) {
                None => {
                    return Err(DriveError::UpdateNodeTargetNotFound { id: target }.into());
                }
                Some(node) if node.kind != NodeKind::Folder => {
                    return Err(DriveError::ParentNotAFolder { id: target }.into());
                }
                Some(_) => {}
            }
            if state.is_descendant(&input.id, &target) {
                return Err(DriveError::NodeCycle { id: input.id }.into());
            }
            ParentChange::Move(target)
        }
    };

    if let Some(node) = state.nodes.get_mut(position) {
        if let Some(name) = new_name {
            node.name = name;
        }
        match parent_change {
            ParentChange::Keep => {}
            ParentChange::Root => node.parent_folder = None,
            ParentChange::Move(target) => node.parent_folder = Some(target),
        }
    }
    Ok(())
}

/// `REMOVE_NODE`: drop a node; removing a folder also removes every
/// node in its subtree.
///
/// # Errors
/// Rejects missing nodes.
pub fn remove_node(
    state: &mut DriveState,
    input: RemoveNodeInput,
    _emitter: &mut Emitter,
) -> Result<(), DomainError> {
    if state.node(&input.id).is_none() {
        return Err(DriveError::RemoveNodeNotFound { id: input.id }.into());
    }

    let mut doomed: BTreeSet<NodeId> = BTreeSet::new();
    doomed.insert(input.id);
    loop {
        let additions: Vec<NodeId> = state
            .nodes
            .iter()
            .filter(|n| !doomed.contains(&n.id))
            .filter(|n| {
                n.parent_folder
                    .as_ref()
                    .is_some_and(|p| doomed.contains(p))
            })
            .map(|n| n.id.clone())
            .collect();
        if additions.is_empty() {
            break;
        }
        doomed.extend(additions);
    }
    state.nodes.retain(|n| !doomed.contains(&n.id));
    Ok(())
}

// ---------------------------------------------------------------------------
// Registration
// ---------------------------------------------------------------------------

/// Register the drive document type and all of its reducers.
///
/// # Errors
/// Returns an error if the drive type is already registered.
pub fn register(registry: &mut Registry) -> Result<(), RegistryError> {
    registry.register_document_type::<DriveState, DriveLocalState>(DRIVE_DOCUMENT_TYPE)?;
    registry.register_action::<DriveState, AddFileInput, _>(
        DRIVE_DOCUMENT_TYPE,
        Scope::Global,
        ADD_FILE,
        add_file,
    )?;
    registry.register_action::<DriveState, AddFolderInput, _>(
        DRIVE_DOCUMENT_TYPE,
        Scope::Global,
        ADD_FOLDER,
        add_folder,
    )?;
    registry.register_action::<DriveState, UpdateNodeInput, _>(
        DRIVE_DOCUMENT_TYPE,
        Scope::Global,
        UPDATE_NODE,
        update_node,
    )?;
    registry.register_action::<DriveState, RemoveNodeInput, _>(
        DRIVE_DOCUMENT_TYPE,
        Scope::Global,
        REMOVE_NODE,
        remove_node,
    )?;
    Ok(())
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
