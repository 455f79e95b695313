//! The mount point: node arena, root folder and searcher wiring.
//!
//! # Concurrency
//!
//! A `MountPoint` is a single-writer structure. Mutations take `&mut self`
//! and there is no internal locking. Hosts that share a mount between threads
//! must serialize access themselves, e.g. through [`SharedMountPoint`].

use std::collections::BTreeMap;
use std::sync::Arc;

use parking_lot::Mutex;

use crate::config::VfsConfig;
use crate::error::{VfsError, VfsResult};
use crate::node::{Node, NodeId, NodeKind, VirtualFile};
use crate::path::Path;
use crate::search::{Searcher, SearcherError, SearcherProvider};

/// A mount point shared between threads behind one exclusive lock.
pub type SharedMountPoint = Arc<Mutex<MountPoint>>;

/// Wrap a mount point for shared use.
pub fn shared_mount_point(mount: MountPoint) -> SharedMountPoint {
    Arc::new(Mutex::new(mount))
}

/// Owns the whole in-memory tree.
pub struct MountPoint {
    nodes: Vec<Node>,
    generation: u32,
    root: NodeId,
    searcher_provider: Option<Arc<dyn SearcherProvider>>,
    config: VfsConfig,
}

impl std::fmt::Debug for MountPoint {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MountPoint")
            .field("nodes", &self.nodes.len())
            .field("generation", &self.generation)
            .field("searcher", &self.searcher_provider.is_some())
            .finish()
    }
}

impl Default for MountPoint {
    fn default() -> Self {
        Self::new()
    }
}

impl MountPoint {
    /// Create a mount with an empty root folder and no searcher.
    pub fn new() -> Self {
        let generation = 0;
        Self {
            nodes: vec![Node::folder("", None)],
            generation,
            root: NodeId::new(0, generation),
            searcher_provider: None,
            config: VfsConfig::default(),
        }
    }

    /// Attach a searcher provider; structural mutations notify it best-effort.
    pub fn with_searcher_provider(mut self, provider: Arc<dyn SearcherProvider>) -> Self {
        self.searcher_provider = Some(provider);
        self
    }

    pub fn with_config(mut self, config: VfsConfig) -> Self {
        self.config = config;
        self
    }

    pub fn root(&self) -> NodeId {
        self.root
    }

    pub fn config(&self) -> &VfsConfig {
        &self.config
    }

    pub fn searcher_provider(&self) -> Option<&Arc<dyn SearcherProvider>> {
        self.searcher_provider.as_ref()
    }

    /// Drop the whole tree and start over with an empty root.
    ///
    /// Every `NodeId` handed out before the reset becomes stale.
    pub fn reset(&mut self) {
        let dropped = self.len();
        self.generation = self.generation.wrapping_add(1);
        self.nodes.clear();
        self.nodes.push(Node::folder("", None));
        self.root = NodeId::new(0, self.generation);
        tracing::info!(dropped, generation = self.generation, "mount point reset");
    }

    /// Number of live nodes, root included.
    pub fn len(&self) -> usize {
        self.nodes.iter().filter(|node| node.exists).count()
    }

    pub fn is_empty(&self) -> bool {
        self.node(self.root)
            .ok()
            .and_then(Node::children)
            .is_none_or(BTreeMap::is_empty)
    }

    /// False for deleted nodes and for handles from before a reset.
    pub fn exists(&self, id: NodeId) -> bool {
        self.slot(id).is_some_and(|node| node.exists)
    }

    /// Read-only view of a live node.
    pub fn file(&self, id: NodeId) -> VfsResult<VirtualFile<'_>> {
        let node = self.node(id)?;
        Ok(VirtualFile::new(self, id, node))
    }

    /// Look up a node by absolute path.
    pub fn by_path(&self, path: &Path) -> Option<NodeId> {
        self.resolve_from(self.root, path)
    }

    /// Like [`by_path`](Self::by_path), but `NotFound` instead of `None`.
    pub fn get(&self, path: &Path) -> VfsResult<VirtualFile<'_>> {
        let id = self
            .by_path(path)
            .ok_or_else(|| VfsError::not_found(path.to_string()))?;
        self.file(id)
    }

    // ========================================================================
    // Arena access
    // ========================================================================

    fn slot(&self, id: NodeId) -> Option<&Node> {
        if id.generation() != self.generation {
            return None;
        }
        self.nodes.get(id.index())
    }

    /// A live node, or `Removed`.
    pub(crate) fn node(&self, id: NodeId) -> VfsResult<&Node> {
        match self.slot(id) {
            Some(node) if node.exists => Ok(node),
            _ => Err(VfsError::Removed(id)),
        }
    }

    pub(crate) fn node_mut(&mut self, id: NodeId) -> VfsResult<&mut Node> {
        if id.generation() != self.generation {
            return Err(VfsError::Removed(id));
        }
        match self.nodes.get_mut(id.index()) {
            Some(node) if node.exists => Ok(node),
            _ => Err(VfsError::Removed(id)),
        }
    }

    /// Slot access for ids taken from a live folder's child map.
    pub(crate) fn raw(&self, id: NodeId) -> &Node {
        &self.nodes[id.index()]
    }

    pub(crate) fn raw_mut(&mut self, id: NodeId) -> &mut Node {
        &mut self.nodes[id.index()]
    }

    pub(crate) fn alloc(&mut self, node: Node) -> NodeId {
        let id = NodeId::new(self.nodes.len(), self.generation);
        self.nodes.push(node);
        id
    }

    pub(crate) fn is_root(&self, id: NodeId) -> bool {
        id == self.root
    }

    /// Direct child of a folder by name.
    pub(crate) fn child_id(&self, folder: NodeId, name: &str) -> Option<NodeId> {
        self.slot(folder)?.children()?.get(name).copied()
    }

    /// Walk `relative` down from `start`.
    pub(crate) fn resolve_from(&self, start: NodeId, relative: &Path) -> Option<NodeId> {
        if !self.exists(start) {
            return None;
        }
        relative
            .elements()
            .iter()
            .try_fold(start, |current, element| self.child_id(current, element))
    }

    /// Absolute path of a node, cached until the node or an ancestor moves.
    pub(crate) fn path_of(&self, id: NodeId) -> Path {
        let node = self.raw(id);
        node.path_cache
            .get_or_init(|| match node.parent {
                None => Path::root(),
                Some(parent) => self.path_of(parent).child_unchecked(&node.name),
            })
            .clone()
    }

    /// Ids of `id` and all its descendants, depth-first pre-order.
    pub(crate) fn subtree(&self, id: NodeId) -> Vec<NodeId> {
        let mut result = Vec::new();
        let mut stack = vec![id];
        while let Some(current) = stack.pop() {
            result.push(current);
            if let Some(children) = self.raw(current).children() {
                stack.extend(children.values().rev().copied());
            }
        }
        result
    }

    /// Paths of locked files at or below `id`.
    pub(crate) fn locked_files(&self, id: NodeId) -> Vec<Path> {
        self.subtree(id)
            .into_iter()
            .filter(|&node| self.raw(node).live_lock().is_some())
            .map(|node| self.path_of(node))
            .collect()
    }

    pub(crate) fn invalidate_paths(&mut self, id: NodeId) {
        for node in self.subtree(id) {
            self.raw_mut(node).path_cache.take();
        }
    }

    /// Insert `child` into `parent`'s child map under the child's name.
    pub(crate) fn attach(&mut self, parent: NodeId, child: NodeId) {
        let name = self.raw(child).name.clone();
        if let NodeKind::Folder { children } = &mut self.raw_mut(parent).kind {
            children.insert(name, child);
        }
    }

    /// Remove `child` from its parent's child map.
    pub(crate) fn detach(&mut self, child: NodeId) {
        let node = self.raw(child);
        let Some(parent) = node.parent else {
            return;
        };
        let name = node.name.clone();
        if let NodeKind::Folder { children } = &mut self.raw_mut(parent).kind {
            children.remove(&name);
        }
    }

    // ========================================================================
    // Searcher notifications (best-effort)
    // ========================================================================

    fn with_searcher<F>(&self, action: &'static str, notify: F)
    where
        F: FnOnce(&dyn Searcher) -> Result<(), SearcherError>,
    {
        if !self.config.index.enabled {
            return;
        }
        let Some(provider) = &self.searcher_provider else {
            return;
        };
        let searcher = match provider.searcher(true) {
            Ok(Some(searcher)) => searcher,
            Ok(None) => return,
            Err(e) => {
                tracing::warn!(action, error = %e, "searcher unavailable, index not updated");
                return;
            }
        };
        if let Err(e) = notify(searcher.as_ref()) {
            tracing::warn!(action, error = %e, "searcher notification failed");
        }
    }

    pub(crate) fn index_add(&self, id: NodeId) {
        if let Ok(file) = self.file(id) {
            self.with_searcher("add", |searcher| searcher.add(file));
        }
    }

    pub(crate) fn index_update(&self, id: NodeId) {
        if let Ok(file) = self.file(id) {
            self.with_searcher("update", |searcher| searcher.update(file));
        }
    }

    pub(crate) fn index_delete(&self, path: &Path, is_file: bool) {
        let path = path.to_string();
        self.with_searcher("delete", |searcher| searcher.delete(&path, is_file));
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn p(s: &str) -> Path {
        Path::parse(s).unwrap()
    }

    #[test]
    fn test_new_mount_has_root() {
        let mount = MountPoint::new();
        let root = mount.file(mount.root()).unwrap();
        assert!(root.is_root());
        assert!(root.is_folder());
        assert_eq!(root.path(), Path::root());
        assert!(mount.is_empty());
        assert_eq!(mount.len(), 1);
    }

    #[test]
    fn test_by_path() {
        let mut mount = MountPoint::new();
        let root = mount.root();
        let a = mount.create_folder(root, "a").unwrap();
        let f = mount.create_file(a, "f.txt", "x").unwrap();

        assert_eq!(mount.by_path(&p("/a/f.txt")), Some(f));
        assert_eq!(mount.by_path(&Path::root()), Some(root));
        assert_eq!(mount.by_path(&p("/a/missing")), None);
        assert_eq!(mount.by_path(&p("/a/f.txt/deeper")), None);
        assert!(mount.get(&p("/nope")).unwrap_err().kind() == crate::ErrorKind::NotFound);
    }

    #[test]
    fn test_reset_invalidates_handles() {
        let mut mount = MountPoint::new();
        let root = mount.root();
        let a = mount.create_folder(root, "a").unwrap();

        mount.reset();

        assert!(!mount.exists(a));
        assert!(!mount.exists(root));
        assert!(matches!(mount.file(a), Err(VfsError::Removed(_))));
        assert!(mount.exists(mount.root()));
        assert!(mount.is_empty());
        assert!(mount.by_path(&p("/a")).is_none());
    }

    #[test]
    fn test_path_cache_follows_rename() {
        let mut mount = MountPoint::new();
        let root = mount.root();
        let a = mount.create_folder(root, "a").unwrap();
        let f = mount.create_file(a, "f.txt", "x").unwrap();
        assert_eq!(mount.path_of(f), p("/a/f.txt"));

        mount.rename(a, "b", None).unwrap();
        assert_eq!(mount.path_of(f), p("/b/f.txt"));
    }
}
