//! Tree nodes and the borrowed [`VirtualFile`] view.
//!
//! Nodes live in the [`MountPoint`](crate::MountPoint) arena and are
//! addressed by [`NodeId`]. A folder owns its `children` map; `parent` is a
//! plain index back up the tree and never an owning edge.

use std::cell::OnceCell;
use std::cmp::Ordering;
use std::collections::BTreeMap;
use std::fmt;
use std::time::SystemTime;

use crate::error::{VfsError, VfsResult};
use crate::lock::LockHolder;
use crate::mount::MountPoint;
use crate::path::Path;
use crate::types::{NodeType, guess_media_type};

/// Stable handle to a node in a mount's arena.
///
/// The generation changes on [`MountPoint::reset`], which turns every handle
/// issued before the reset into a stale one.
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub struct NodeId {
    index: u32,
    generation: u32,
}

impl NodeId {
    pub(crate) fn new(index: usize, generation: u32) -> Self {
        Self {
            index: u32::try_from(index).expect("arena exceeds u32::MAX nodes"),
            generation,
        }
    }

    pub(crate) fn index(self) -> usize {
        self.index as usize
    }

    pub(crate) fn generation(self) -> u32 {
        self.generation
    }
}

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}@{}", self.index, self.generation)
    }
}

impl fmt::Debug for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "NodeId({self})")
    }
}

/// Kind-specific node state.
#[derive(Debug)]
pub(crate) enum NodeKind {
    File {
        content: Vec<u8>,
        media_type: Option<String>,
        lock: Option<LockHolder>,
    },
    Folder {
        children: BTreeMap<String, NodeId>,
    },
}

/// Arena slot.
#[derive(Debug)]
pub(crate) struct Node {
    pub(crate) name: String,
    pub(crate) parent: Option<NodeId>,
    pub(crate) properties: BTreeMap<String, Vec<String>>,
    pub(crate) last_modified: SystemTime,
    /// Tombstone flag; false once the node was deleted.
    pub(crate) exists: bool,
    /// Cleared whenever `name` or `parent` of this node or an ancestor changes.
    pub(crate) path_cache: OnceCell<Path>,
    pub(crate) kind: NodeKind,
}

impl Node {
    pub(crate) fn file(name: &str, parent: NodeId, content: Vec<u8>) -> Self {
        Self::with_kind(
            name,
            Some(parent),
            NodeKind::File {
                content,
                media_type: None,
                lock: None,
            },
        )
    }

    pub(crate) fn folder(name: &str, parent: Option<NodeId>) -> Self {
        Self::with_kind(
            name,
            parent,
            NodeKind::Folder {
                children: BTreeMap::new(),
            },
        )
    }

    pub(crate) fn with_kind(name: &str, parent: Option<NodeId>, kind: NodeKind) -> Self {
        Self {
            name: name.to_string(),
            parent,
            properties: BTreeMap::new(),
            last_modified: SystemTime::now(),
            exists: true,
            path_cache: OnceCell::new(),
            kind,
        }
    }

    pub(crate) fn is_file(&self) -> bool {
        matches!(self.kind, NodeKind::File { .. })
    }

    pub(crate) fn is_folder(&self) -> bool {
        matches!(self.kind, NodeKind::Folder { .. })
    }

    pub(crate) fn children(&self) -> Option<&BTreeMap<String, NodeId>> {
        match &self.kind {
            NodeKind::Folder { children } => Some(children),
            NodeKind::File { .. } => None,
        }
    }

    /// The lock, ignoring one that has already expired.
    pub(crate) fn live_lock(&self) -> Option<&LockHolder> {
        match &self.kind {
            NodeKind::File {
                lock: Some(lock), ..
            } if !lock.is_expired() => Some(lock),
            _ => None,
        }
    }

    pub(crate) fn touch(&mut self) {
        self.last_modified = SystemTime::now();
    }
}

/// Folders first, then by name.
fn listing_order(a: &VirtualFile<'_>, b: &VirtualFile<'_>) -> Ordering {
    b.is_folder()
        .cmp(&a.is_folder())
        .then_with(|| a.name().cmp(b.name()))
}

/// Read-only view of a live node.
///
/// Obtained from [`MountPoint::file`]; borrows the mount, so no mutation can
/// happen while a view is alive.
#[derive(Clone, Copy)]
pub struct VirtualFile<'a> {
    mount: &'a MountPoint,
    id: NodeId,
    node: &'a Node,
}

impl<'a> VirtualFile<'a> {
    pub(crate) fn new(mount: &'a MountPoint, id: NodeId, node: &'a Node) -> Self {
        Self { mount, id, node }
    }

    pub fn id(&self) -> NodeId {
        self.id
    }

    pub fn name(&self) -> &'a str {
        &self.node.name
    }

    /// Absolute path; computed by walking parents and cached on the node.
    pub fn path(&self) -> Path {
        self.mount.path_of(self.id)
    }

    pub fn node_type(&self) -> NodeType {
        if self.node.is_file() {
            NodeType::File
        } else {
            NodeType::Folder
        }
    }

    pub fn is_file(&self) -> bool {
        self.node.is_file()
    }

    pub fn is_folder(&self) -> bool {
        self.node.is_folder()
    }

    pub fn exists(&self) -> bool {
        self.node.exists
    }

    pub fn is_root(&self) -> bool {
        self.node.parent.is_none()
    }

    pub fn parent(&self) -> Option<VirtualFile<'a>> {
        self.node
            .parent
            .and_then(|parent| self.mount.file(parent).ok())
    }

    pub fn last_modified(&self) -> SystemTime {
        self.node.last_modified
    }

    /// All properties.
    pub fn properties(&self) -> &'a BTreeMap<String, Vec<String>> {
        &self.node.properties
    }

    /// First value of a property.
    pub fn property(&self, name: &str) -> Option<&'a str> {
        self.node
            .properties
            .get(name)
            .and_then(|values| values.first())
            .map(String::as_str)
    }

    /// All values of a property; empty if absent.
    pub fn property_values(&self, name: &str) -> &'a [String] {
        self.node
            .properties
            .get(name)
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    /// File content; `Forbidden` for folders.
    pub fn content(&self) -> VfsResult<&'a [u8]> {
        match &self.node.kind {
            NodeKind::File { content, .. } => Ok(content),
            NodeKind::Folder { .. } => Err(VfsError::forbidden(format!(
                "unable get content. item '{}' is not a file",
                self.path()
            ))),
        }
    }

    /// File content decoded as UTF-8 (lossy).
    pub fn content_as_string(&self) -> VfsResult<String> {
        self.content()
            .map(|bytes| String::from_utf8_lossy(bytes).into_owned())
    }

    /// Content length in bytes; 0 for folders.
    pub fn length(&self) -> u64 {
        match &self.node.kind {
            NodeKind::File { content, .. } => content.len() as u64,
            NodeKind::Folder { .. } => 0,
        }
    }

    /// Stored media type, or one guessed from the name. `None` for folders.
    pub fn media_type(&self) -> Option<&'a str> {
        match &self.node.kind {
            NodeKind::File { media_type, .. } => Some(
                media_type
                    .as_deref()
                    .unwrap_or_else(|| guess_media_type(&self.node.name)),
            ),
            NodeKind::Folder { .. } => None,
        }
    }

    /// True while a non-expired lock is held.
    pub fn is_locked(&self) -> bool {
        self.node.live_lock().is_some()
    }

    /// Children, folders first, then by name.
    pub fn children(&self) -> Vec<VirtualFile<'a>> {
        self.children_filtered(|_| true)
    }

    /// Children accepted by `filter`, in listing order.
    pub fn children_filtered<F>(&self, mut filter: F) -> Vec<VirtualFile<'a>>
    where
        F: FnMut(&VirtualFile<'a>) -> bool,
    {
        let Some(children) = self.node.children() else {
            return Vec::new();
        };
        let mut result: Vec<VirtualFile<'a>> = children
            .values()
            .filter_map(|&child| self.mount.file(child).ok())
            .filter(|child| filter(child))
            .collect();
        result.sort_by(listing_order);
        result
    }

    pub fn count_children(&self) -> usize {
        self.node.children().map_or(0, BTreeMap::len)
    }

    /// Resolve a path relative to this node.
    pub fn child(&self, relative: &Path) -> Option<VirtualFile<'a>> {
        let id = self.mount.resolve_from(self.id, relative)?;
        self.mount.file(id).ok()
    }

    pub fn has_child(&self, relative: &Path) -> bool {
        self.child(relative).is_some()
    }

    /// Depth-first, pre-order walk over this node and its descendants, each
    /// folder's children visited in listing order.
    pub fn visit<F>(&self, visitor: &mut F)
    where
        F: FnMut(VirtualFile<'a>),
    {
        visitor(*self);
        for child in self.children() {
            child.visit(visitor);
        }
    }
}

impl fmt::Debug for VirtualFile<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("VirtualFile")
            .field("id", &self.id)
            .field("path", &self.path())
            .field("type", &self.node_type())
            .finish()
    }
}
