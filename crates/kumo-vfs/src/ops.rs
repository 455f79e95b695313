//! Mutating node operations.
//!
//! Every operation validates first and mutates second: lock scans, cycle
//! checks and name-collision checks all run before the tree is touched, so a
//! returned error never leaves a partial change behind. Searcher
//! notifications go out after the change is committed.

use std::io::Read;
use std::time::Duration;

use crate::error::{VfsError, VfsResult};
use crate::lock::LockHolder;
use crate::mount::MountPoint;
use crate::node::{Node, NodeId, NodeKind};
use crate::path::{Path, validate_name};
use crate::types::Property;

fn join_paths(paths: &[Path]) -> String {
    paths
        .iter()
        .map(Path::to_string)
        .collect::<Vec<_>>()
        .join(", ")
}

impl MountPoint {
    // ========================================================================
    // Pre-flight checks
    // ========================================================================

    /// Fail unless `id` is a folder.
    pub(crate) fn require_folder(&self, id: NodeId, action: &str) -> VfsResult<()> {
        if self.node(id)?.is_folder() {
            Ok(())
        } else {
            Err(VfsError::forbidden(format!(
                "unable {action}. item '{}' is not a folder",
                self.path_of(id)
            )))
        }
    }

    /// Fail unless `id` is a file.
    fn require_file(&self, id: NodeId, action: &str) -> VfsResult<()> {
        if self.node(id)?.is_file() {
            Ok(())
        } else {
            Err(VfsError::forbidden(format!(
                "unable {action}. item '{}' is not a file",
                self.path_of(id)
            )))
        }
    }

    /// Clear an expired lock on `id`, if any.
    fn drop_expired_lock(&mut self, id: NodeId) -> VfsResult<()> {
        if let NodeKind::File { lock, .. } = &mut self.node_mut(id)?.kind {
            if lock.as_ref().is_some_and(LockHolder::is_expired) {
                *lock = None;
            }
        }
        Ok(())
    }

    /// A locked file needs the matching token; folders always pass.
    fn check_lock(&mut self, id: NodeId, lock_token: Option<&str>, action: &str) -> VfsResult<()> {
        self.drop_expired_lock(id)?;
        match self.node(id)?.live_lock() {
            Some(lock) if !lock.matches(lock_token) => Err(VfsError::forbidden(format!(
                "unable {action} '{}'. item is locked",
                self.path_of(id)
            ))),
            _ => Ok(()),
        }
    }

    /// Lock rule shared by move, rename and delete: a file needs its token, a
    /// folder must not contain any locked file.
    fn check_unlocked_subtree(
        &mut self,
        id: NodeId,
        lock_token: Option<&str>,
        action: &str,
    ) -> VfsResult<()> {
        if self.node(id)?.is_file() {
            return self.check_lock(id, lock_token, action);
        }
        let locked = self.locked_files(id);
        if locked.is_empty() {
            Ok(())
        } else {
            Err(VfsError::forbidden(format!(
                "unable {action} '{}'. child items are locked: {}",
                self.path_of(id),
                join_paths(&locked)
            )))
        }
    }

    /// `existing` occupies the destination name of a copy or move of `source`.
    fn check_replaceable(&mut self, existing: NodeId, source: NodeId, overwrite: bool) -> VfsResult<()> {
        let existing_path = self.path_of(existing);
        if !overwrite {
            return Err(VfsError::conflict(format!(
                "item '{existing_path}' already exists"
            )));
        }
        if existing == source || self.path_of(source).is_child_of(&existing_path) {
            return Err(VfsError::forbidden(format!(
                "unable overwrite '{existing_path}'. it contains the source item"
            )));
        }
        self.check_unlocked_subtree(existing, None, "overwrite")
    }

    /// Folder `id` may not be placed into itself or one of its descendants.
    fn check_not_into_self(&self, id: NodeId, target: NodeId, action: &str) -> VfsResult<()> {
        if !self.node(id)?.is_folder() {
            return Ok(());
        }
        let source_path = self.path_of(id);
        let target_path = self.path_of(target);
        if target == id || target_path.is_child_of(&source_path) {
            return Err(VfsError::forbidden(format!(
                "unable {action} '{source_path}' to '{target_path}'. item may not have itself as parent"
            )));
        }
        Ok(())
    }

    /// `new_name` if given and non-blank, otherwise the node's current name.
    fn destination_name(&self, id: NodeId, new_name: Option<&str>) -> VfsResult<String> {
        match new_name {
            Some(name) if !name.trim().is_empty() => {
                validate_name(name)?;
                Ok(name.to_string())
            }
            _ => Ok(self.node(id)?.name.clone()),
        }
    }

    /// Tombstone a subtree depth-first, then detach its root.
    fn remove_subtree(&mut self, id: NodeId) {
        let path = self.path_of(id);
        let is_file = self.raw(id).is_file();
        for node in self.subtree(id) {
            self.raw_mut(node).exists = false;
        }
        self.detach(id);
        tracing::debug!(path = %path, "removed");
        self.index_delete(&path, is_file);
    }

    // ========================================================================
    // Content and properties
    // ========================================================================

    /// Replace a file's content.
    pub fn update_content(
        &mut self,
        id: NodeId,
        content: impl Into<Vec<u8>>,
        lock_token: Option<&str>,
    ) -> VfsResult<()> {
        self.require_file(id, "update content")?;
        self.check_lock(id, lock_token, "update content of")?;

        let node = self.node_mut(id)?;
        if let NodeKind::File { content: current, .. } = &mut node.kind {
            *current = content.into();
        }
        node.touch();

        self.index_update(id);
        Ok(())
    }

    /// Replace a file's content with everything read from `reader`.
    ///
    /// The stream is drained before the file is touched; a read error leaves
    /// the old content in place.
    pub fn update_content_from<R: Read>(
        &mut self,
        id: NodeId,
        mut reader: R,
        lock_token: Option<&str>,
    ) -> VfsResult<()> {
        self.require_file(id, "update content")?;
        let mut content = Vec::new();
        reader.read_to_end(&mut content)?;
        self.update_content(id, content, lock_token)
    }

    /// Apply a property patch: an empty value list removes the key, anything
    /// else replaces all values of that key.
    pub fn update_properties<I>(
        &mut self,
        id: NodeId,
        patch: I,
        lock_token: Option<&str>,
    ) -> VfsResult<()>
    where
        I: IntoIterator<Item = Property>,
    {
        self.check_lock(id, lock_token, "update properties of")?;

        let node = self.node_mut(id)?;
        for Property { name, values } in patch {
            if values.is_empty() {
                node.properties.remove(&name);
            } else {
                node.properties.insert(name, values);
            }
        }
        node.touch();

        self.index_update(id);
        Ok(())
    }

    /// Set a single-valued property; `None` removes it.
    pub fn set_property(
        &mut self,
        id: NodeId,
        name: &str,
        value: Option<&str>,
        lock_token: Option<&str>,
    ) -> VfsResult<()> {
        let values = value.map(|v| vec![v.to_string()]).unwrap_or_default();
        self.update_properties(id, [Property::new(name, values)], lock_token)
    }

    /// Store an explicit media type; `None` reverts to guessing from the name.
    pub fn set_media_type(
        &mut self,
        id: NodeId,
        media_type: Option<String>,
        lock_token: Option<&str>,
    ) -> VfsResult<()> {
        self.require_file(id, "set media type")?;
        self.check_lock(id, lock_token, "set media type of")?;

        let node = self.node_mut(id)?;
        if let NodeKind::File { media_type: current, .. } = &mut node.kind {
            *current = media_type;
        }
        node.touch();

        self.index_update(id);
        Ok(())
    }

    // ========================================================================
    // Creation
    // ========================================================================

    /// Create a file in folder `parent`.
    pub fn create_file(
        &mut self,
        parent: NodeId,
        name: &str,
        content: impl Into<Vec<u8>>,
    ) -> VfsResult<NodeId> {
        self.require_folder(parent, "create file")?;
        validate_name(name)?;
        if self.child_id(parent, name).is_some() {
            return Err(VfsError::conflict(format!(
                "item '{}' already exists",
                self.path_of(parent).child_unchecked(name)
            )));
        }

        let id = self.alloc(Node::file(name, parent, content.into()));
        self.attach(parent, id);

        tracing::debug!(path = %self.path_of(id), "created file");
        self.index_add(id);
        Ok(id)
    }

    /// Create a folder in `parent`.
    ///
    /// `name` may be a relative path such as `a/b/c`: existing intermediate
    /// folders are reused and missing ones created. If the whole route already
    /// exists the call fails with `Conflict`; a file anywhere on the route is
    /// a `Conflict` as well. Returns the deepest folder.
    pub fn create_folder(&mut self, parent: NodeId, name: &str) -> VfsResult<NodeId> {
        self.require_folder(parent, "create folder")?;
        let relative = Path::parse(name)?;
        if relative.is_root() {
            return Err(VfsError::invalid_path("folder name may not be empty"));
        }
        for element in relative.elements() {
            validate_name(element)?;
        }

        let mut current = parent;
        let mut first_missing = None;
        for (depth, element) in relative.elements().iter().enumerate() {
            match self.child_id(current, element) {
                Some(child) if self.raw(child).is_folder() => current = child,
                Some(child) => {
                    return Err(VfsError::conflict(format!(
                        "unable create folder '{}'. file '{}' already exists",
                        self.path_of(parent).join(&relative),
                        self.path_of(child)
                    )));
                }
                None => {
                    first_missing = Some(depth);
                    break;
                }
            }
        }
        let Some(first_missing) = first_missing else {
            return Err(VfsError::conflict(format!(
                "item '{}' already exists",
                self.path_of(current)
            )));
        };

        let mut top = None;
        for element in &relative.elements()[first_missing..] {
            let id = self.alloc(Node::folder(element, Some(current)));
            self.attach(current, id);
            if top.is_none() {
                top = Some(id);
            }
            current = id;
        }

        tracing::debug!(path = %self.path_of(current), "created folder");
        if let Some(top) = top {
            self.index_add(top);
        }
        Ok(current)
    }

    // ========================================================================
    // Structural changes
    // ========================================================================

    /// Deep-copy `id` into folder `target`, optionally under a new name.
    ///
    /// Content, properties and media type are copied; locks are not.
    pub fn copy_to(
        &mut self,
        id: NodeId,
        target: NodeId,
        new_name: Option<&str>,
        overwrite: bool,
    ) -> VfsResult<NodeId> {
        self.node(id)?;
        if self.is_root(id) {
            return Err(VfsError::forbidden("unable copy root folder"));
        }
        self.require_folder(target, "copy item. item specified as parent")?;
        self.check_not_into_self(id, target, "copy")?;
        let name = self.destination_name(id, new_name)?;
        let existing = self.child_id(target, &name);
        if let Some(existing) = existing {
            self.check_replaceable(existing, id, overwrite)?;
        }

        if let Some(existing) = existing {
            self.remove_subtree(existing);
        }
        let copy = self.deep_copy(id, target, &name);

        tracing::debug!(from = %self.path_of(id), to = %self.path_of(copy), "copied");
        self.index_add(copy);
        Ok(copy)
    }

    fn deep_copy(&mut self, source: NodeId, parent: NodeId, name: &str) -> NodeId {
        let node = self.raw(source);
        let (kind, children) = match &node.kind {
            NodeKind::File {
                content,
                media_type,
                ..
            } => (
                NodeKind::File {
                    content: content.clone(),
                    media_type: media_type.clone(),
                    lock: None,
                },
                Vec::new(),
            ),
            NodeKind::Folder { children } => (
                NodeKind::Folder {
                    children: Default::default(),
                },
                children
                    .iter()
                    .map(|(name, &child)| (name.clone(), child))
                    .collect::<Vec<_>>(),
            ),
        };
        let mut copy = Node::with_kind(name, Some(parent), kind);
        copy.properties = node.properties.clone();

        let id = self.alloc(copy);
        self.attach(parent, id);
        for (child_name, child) in children {
            self.deep_copy(child, id, &child_name);
        }
        id
    }

    /// Move `id` into folder `target`, optionally under a new name.
    ///
    /// Moving a node onto its current location is a no-op.
    pub fn move_to(
        &mut self,
        id: NodeId,
        target: NodeId,
        new_name: Option<&str>,
        overwrite: bool,
        lock_token: Option<&str>,
    ) -> VfsResult<()> {
        self.node(id)?;
        if self.is_root(id) {
            return Err(VfsError::forbidden("unable move root folder"));
        }
        self.require_folder(target, "move item. item specified as parent")?;
        self.check_not_into_self(id, target, "move")?;
        self.check_unlocked_subtree(id, lock_token, "move")?;
        let name = self.destination_name(id, new_name)?;
        let existing = self.child_id(target, &name);
        if existing == Some(id) {
            return Ok(());
        }
        if let Some(existing) = existing {
            self.check_replaceable(existing, id, overwrite)?;
        }

        let old_path = self.path_of(id);
        let is_file = self.raw(id).is_file();
        if let Some(existing) = existing {
            self.remove_subtree(existing);
        }
        self.relink(id, target, name);

        tracing::debug!(from = %old_path, to = %self.path_of(id), "moved");
        self.index_delete(&old_path, is_file);
        self.index_add(id);
        Ok(())
    }

    /// Rename `id` in place.
    pub fn rename(&mut self, id: NodeId, new_name: &str, lock_token: Option<&str>) -> VfsResult<()> {
        self.node(id)?;
        if self.is_root(id) {
            return Err(VfsError::forbidden("unable rename root folder"));
        }
        validate_name(new_name)?;
        self.check_unlocked_subtree(id, lock_token, "rename")?;
        let node = self.raw(id);
        if node.name == new_name {
            return Ok(());
        }
        let Some(parent) = node.parent else {
            return Err(VfsError::forbidden("unable rename root folder"));
        };
        if let Some(sibling) = self.child_id(parent, new_name) {
            return Err(VfsError::conflict(format!(
                "item '{}' already exists",
                self.path_of(sibling)
            )));
        }

        let old_path = self.path_of(id);
        let is_file = node.is_file();
        self.relink(id, parent, new_name.to_string());

        tracing::debug!(from = %old_path, to = %self.path_of(id), "renamed");
        self.index_delete(&old_path, is_file);
        self.index_add(id);
        Ok(())
    }

    /// Detach from the current parent and attach under `parent` as `name`.
    fn relink(&mut self, id: NodeId, parent: NodeId, name: String) {
        self.detach(id);
        let node = self.raw_mut(id);
        node.name = name;
        node.parent = Some(parent);
        self.attach(parent, id);
        self.invalidate_paths(id);
    }

    /// Delete `id` and everything below it.
    ///
    /// A locked file needs its token; a folder containing any locked file
    /// cannot be deleted at all. Deleted nodes stay in the arena as
    /// tombstones and reject every further operation.
    pub fn delete(&mut self, id: NodeId, lock_token: Option<&str>) -> VfsResult<()> {
        self.node(id)?;
        if self.is_root(id) {
            return Err(VfsError::forbidden("unable delete root folder"));
        }
        self.check_unlocked_subtree(id, lock_token, "delete")?;

        self.remove_subtree(id);
        Ok(())
    }

    // ========================================================================
    // Locking
    // ========================================================================

    /// Lock a file; returns the token. A zero `timeout` never expires.
    pub fn lock(&mut self, id: NodeId, timeout: Duration) -> VfsResult<String> {
        self.require_file(id, "lock")?;
        self.drop_expired_lock(id)?;
        let path = self.path_of(id);

        let node = self.node_mut(id)?;
        let NodeKind::File { lock, .. } = &mut node.kind else {
            return Err(VfsError::forbidden(format!(
                "unable lock '{path}'. locking allowed for files only"
            )));
        };
        if lock.is_some() {
            return Err(VfsError::conflict(format!(
                "unable lock '{path}'. file already locked"
            )));
        }
        let holder = LockHolder::acquire(timeout);
        let token = holder.token().to_string();
        *lock = Some(holder);

        tracing::debug!(path = %path, timeout_ms = timeout.as_millis() as u64, "locked");
        Ok(token)
    }

    /// Lock with the configured default timeout.
    pub fn lock_with_default(&mut self, id: NodeId) -> VfsResult<String> {
        let timeout = self.config().lock.default_timeout();
        self.lock(id, timeout)
    }

    /// Release a lock.
    ///
    /// `Conflict` if the file is not locked (an expired lock counts as not
    /// locked and is cleared), `Forbidden` if the token does not match.
    pub fn unlock(&mut self, id: NodeId, lock_token: &str) -> VfsResult<()> {
        self.node(id)?;
        let path = self.path_of(id);

        let node = self.node_mut(id)?;
        let NodeKind::File { lock, .. } = &mut node.kind else {
            return Err(VfsError::conflict(format!(
                "unable unlock '{path}'. item is not locked"
            )));
        };
        match lock.take() {
            None => Err(VfsError::conflict(format!(
                "unable unlock '{path}'. file is not locked"
            ))),
            Some(holder) if holder.is_expired() => Err(VfsError::conflict(format!(
                "unable unlock '{path}'. lock already expired"
            ))),
            Some(holder) if holder.matches(Some(lock_token)) => {
                tracing::debug!(path = %path, "unlocked");
                Ok(())
            }
            Some(holder) => {
                *lock = Some(holder);
                Err(VfsError::forbidden(format!(
                    "unable unlock '{path}'. lock token does not match"
                )))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn setup() -> (MountPoint, NodeId) {
        let mount = MountPoint::new();
        let root = mount.root();
        (mount, root)
    }

    fn p(s: &str) -> Path {
        Path::parse(s).unwrap()
    }

    #[test]
    fn test_create_and_read_file() {
        let (mut mount, root) = setup();
        let id = mount.create_file(root, "a.txt", "hello").unwrap();

        let file = mount.file(id).unwrap();
        assert!(file.is_file());
        assert_eq!(file.name(), "a.txt");
        assert_eq!(file.path(), p("/a.txt"));
        assert_eq!(file.content().unwrap(), b"hello");
        assert_eq!(file.length(), 5);
        assert_eq!(file.media_type(), Some("text/plain"));
        assert_eq!(file.parent().unwrap().id(), root);
    }

    #[test]
    fn test_create_file_conflict_and_forbidden() {
        let (mut mount, root) = setup();
        let id = mount.create_file(root, "a.txt", "").unwrap();

        assert!(mount.create_file(root, "a.txt", "").unwrap_err().is_conflict());
        assert!(mount.create_file(id, "b.txt", "").unwrap_err().is_forbidden());
        assert!(mount.create_file(root, "x/y", "").unwrap_err().is_forbidden());
        assert!(mount.create_file(root, "", "").unwrap_err().is_forbidden());
    }

    #[test]
    fn test_create_folder_nested() {
        let (mut mount, root) = setup();
        let c = mount.create_folder(root, "a/b/c").unwrap();
        assert_eq!(mount.path_of(c), p("/a/b/c"));
        assert!(mount.by_path(&p("/a/b")).is_some());

        let err = mount.create_folder(root, "a/b/c").unwrap_err();
        assert!(err.is_conflict());
    }

    #[test]
    fn test_create_folder_reuses_existing_intermediates() {
        // Only a fully pre-existing route is a conflict; a partially
        // existing one silently reuses what is there.
        let (mut mount, root) = setup();
        let a = mount.create_folder(root, "a").unwrap();
        let d = mount.create_folder(root, "a/d").unwrap();
        assert_eq!(mount.file(d).unwrap().parent().unwrap().id(), a);
        assert!(mount.create_folder(root, "a").unwrap_err().is_conflict());
    }

    #[test]
    fn test_create_folder_through_file_is_conflict() {
        let (mut mount, root) = setup();
        mount.create_file(root, "f", "").unwrap();
        assert!(mount.create_folder(root, "f/g").unwrap_err().is_conflict());
        assert!(mount.by_path(&p("/f/g")).is_none());
    }

    #[test]
    fn test_children_sorted_folders_first() {
        let (mut mount, root) = setup();
        mount.create_file(root, "b.txt", "").unwrap();
        mount.create_folder(root, "z").unwrap();
        mount.create_file(root, "a.txt", "").unwrap();
        mount.create_folder(root, "c").unwrap();

        let names: Vec<_> = mount
            .file(root)
            .unwrap()
            .children()
            .iter()
            .map(|c| c.name())
            .collect();
        assert_eq!(names, ["c", "z", "a.txt", "b.txt"]);

        let files: Vec<_> = mount
            .file(root)
            .unwrap()
            .children_filtered(|c| c.is_file())
            .iter()
            .map(|c| c.name())
            .collect();
        assert_eq!(files, ["a.txt", "b.txt"]);
    }

    #[test]
    fn test_update_properties_replaces_and_removes() {
        let (mut mount, root) = setup();
        let id = mount.create_file(root, "a.txt", "").unwrap();

        mount
            .update_properties(
                id,
                [
                    Property::new("tags", vec!["x".into(), "y".into()]),
                    Property::single("owner", "amy"),
                ],
                None,
            )
            .unwrap();
        mount
            .update_properties(id, [Property::single("tags", "z")], None)
            .unwrap();
        mount.set_property(id, "owner", None, None).unwrap();

        let file = mount.file(id).unwrap();
        assert_eq!(file.property_values("tags"), ["z"]);
        assert_eq!(file.property("tags"), Some("z"));
        assert_eq!(file.property("owner"), None);
        assert!(file.property_values("owner").is_empty());
    }

    #[test]
    fn test_update_content() {
        let (mut mount, root) = setup();
        let id = mount.create_file(root, "a.txt", "old").unwrap();
        let folder = mount.create_folder(root, "d").unwrap();

        mount.update_content(id, "new", None).unwrap();
        assert_eq!(mount.file(id).unwrap().content_as_string().unwrap(), "new");

        mount
            .update_content_from(id, &b"streamed"[..], None)
            .unwrap();
        assert_eq!(mount.file(id).unwrap().content().unwrap(), b"streamed");

        assert!(mount.update_content(folder, "x", None).unwrap_err().is_forbidden());
    }

    #[test]
    fn test_media_type_override() {
        let (mut mount, root) = setup();
        let id = mount.create_file(root, "data", "").unwrap();
        assert_eq!(mount.file(id).unwrap().media_type(), Some(crate::DEFAULT_MEDIA_TYPE));

        mount
            .set_media_type(id, Some("application/json".into()), None)
            .unwrap();
        assert_eq!(mount.file(id).unwrap().media_type(), Some("application/json"));
        assert_eq!(mount.file(root).unwrap().media_type(), None);
    }

    #[test]
    fn test_lock_unlock() {
        let (mut mount, root) = setup();
        let id = mount.create_file(root, "a.txt", "").unwrap();
        let folder = mount.create_folder(root, "d").unwrap();

        assert!(mount.lock(folder, Duration::ZERO).unwrap_err().is_forbidden());
        assert!(mount.lock(root, Duration::ZERO).unwrap_err().is_forbidden());

        let token = mount.lock(id, Duration::ZERO).unwrap();
        assert!(mount.file(id).unwrap().is_locked());
        assert!(mount.lock(id, Duration::ZERO).unwrap_err().is_conflict());

        assert!(mount.unlock(id, "wrong").unwrap_err().is_forbidden());
        assert!(mount.file(id).unwrap().is_locked());
        mount.unlock(id, &token).unwrap();
        assert!(!mount.file(id).unwrap().is_locked());
        assert!(mount.unlock(id, &token).unwrap_err().is_conflict());
    }

    #[test]
    fn test_expired_lock() {
        let (mut mount, root) = setup();
        let id = mount.create_file(root, "a.txt", "").unwrap();
        let token = mount.lock(id, Duration::from_millis(10)).unwrap();
        std::thread::sleep(Duration::from_millis(30));

        assert!(!mount.file(id).unwrap().is_locked());
        mount.update_content(id, "no token needed", None).unwrap();
        assert!(mount.unlock(id, &token).unwrap_err().is_conflict());
        // The expired lock is gone; the file can be locked again.
        mount.lock(id, Duration::ZERO).unwrap();
    }

    #[test]
    fn test_lock_with_default_timeout() {
        let mut config = crate::VfsConfig::default();
        config.lock.default_timeout_secs = 3600;
        let mut mount = MountPoint::new().with_config(config);
        let root = mount.root();
        let id = mount.create_file(root, "a.txt", "").unwrap();

        mount.lock_with_default(id).unwrap();
        let node = mount.node(id).unwrap();
        assert!(node.live_lock().unwrap().expires().is_some());
    }

    #[test]
    fn test_locked_file_gates_mutations() {
        let (mut mount, root) = setup();
        let id = mount.create_file(root, "a.txt", "").unwrap();
        let token = mount.lock(id, Duration::ZERO).unwrap();

        assert!(mount.update_content(id, "x", None).unwrap_err().is_forbidden());
        assert!(mount.update_content(id, "x", Some("bad")).unwrap_err().is_forbidden());
        assert!(mount
            .update_properties(id, [Property::single("k", "v")], None)
            .unwrap_err()
            .is_forbidden());
        assert!(mount.delete(id, None).unwrap_err().is_forbidden());

        mount.update_content(id, "x", Some(&token)).unwrap();
        mount
            .update_properties(id, [Property::single("k", "v")], Some(&token))
            .unwrap();
        mount.delete(id, Some(&token)).unwrap();
        assert!(!mount.exists(id));
    }

    #[test]
    fn test_root_is_protected() {
        let (mut mount, root) = setup();
        let dir = mount.create_folder(root, "d").unwrap();

        assert!(mount.delete(root, None).unwrap_err().is_forbidden());
        assert!(mount.rename(root, "x", None).unwrap_err().is_forbidden());
        assert!(mount.move_to(root, dir, None, false, None).unwrap_err().is_forbidden());
        assert!(mount.copy_to(root, dir, None, false).unwrap_err().is_forbidden());
    }

    #[test]
    fn test_rename() {
        let (mut mount, root) = setup();
        let a = mount.create_file(root, "a.txt", "").unwrap();
        mount.create_file(root, "b.txt", "").unwrap();

        assert!(mount.rename(a, "b.txt", None).unwrap_err().is_conflict());
        mount.rename(a, "a.txt", None).unwrap();
        mount.rename(a, "c.txt", None).unwrap();
        assert_eq!(mount.by_path(&p("/c.txt")), Some(a));
        assert!(mount.by_path(&p("/a.txt")).is_none());
        assert!(mount.rename(a, "x/y", None).unwrap_err().is_forbidden());
    }

    #[test]
    fn test_rename_folder_with_locked_child() {
        let (mut mount, root) = setup();
        let dir = mount.create_folder(root, "d").unwrap();
        let f = mount.create_file(dir, "f", "").unwrap();
        let token = mount.lock(f, Duration::ZERO).unwrap();

        let err = mount.rename(dir, "e", None).unwrap_err();
        assert!(err.is_forbidden());
        assert!(err.to_string().contains("/d/f"));

        mount.unlock(f, &token).unwrap();
        mount.rename(dir, "e", None).unwrap();
        assert_eq!(mount.path_of(f), p("/e/f"));
    }

    #[test]
    fn test_move_into_other_folder() {
        let (mut mount, root) = setup();
        let src = mount.create_folder(root, "src").unwrap();
        let dst = mount.create_folder(root, "dst").unwrap();
        let f = mount.create_file(src, "f.txt", "data").unwrap();

        mount.move_to(f, dst, None, false, None).unwrap();
        assert_eq!(mount.file(src).unwrap().count_children(), 0);
        assert_eq!(mount.by_path(&p("/dst/f.txt")), Some(f));

        mount.move_to(f, src, Some("g.txt"), false, None).unwrap();
        assert_eq!(mount.by_path(&p("/src/g.txt")), Some(f));
        assert_eq!(mount.file(f).unwrap().content().unwrap(), b"data");

        // Moving onto the current location changes nothing.
        mount.move_to(f, src, None, false, None).unwrap();
        assert_eq!(mount.by_path(&p("/src/g.txt")), Some(f));
    }

    #[test]
    fn test_move_conflict_and_overwrite() {
        let (mut mount, root) = setup();
        let dst = mount.create_folder(root, "dst").unwrap();
        let f = mount.create_file(root, "f", "new").unwrap();
        let old = mount.create_file(dst, "f", "old").unwrap();

        assert!(mount.move_to(f, dst, None, false, None).unwrap_err().is_conflict());
        assert!(mount.exists(f));

        let token = mount.lock(old, Duration::ZERO).unwrap();
        assert!(mount.move_to(f, dst, None, true, None).unwrap_err().is_forbidden());
        mount.unlock(old, &token).unwrap();

        mount.move_to(f, dst, None, true, None).unwrap();
        assert!(!mount.exists(old));
        assert_eq!(mount.get(&p("/dst/f")).unwrap().content().unwrap(), b"new");
    }

    #[test]
    fn test_move_cannot_overwrite_own_ancestor() {
        let (mut mount, root) = setup();
        let deep = mount.create_folder(root, "x/y").unwrap();
        let f = mount.create_file(deep, "x", "").unwrap();

        let err = mount.move_to(f, root, None, true, None).unwrap_err();
        assert!(err.is_forbidden());
        assert!(mount.exists(f));
        assert!(mount.by_path(&p("/x/y/x")).is_some());
    }

    #[test]
    fn test_move_into_self_rejected() {
        let (mut mount, root) = setup();
        let a = mount.create_folder(root, "a").unwrap();
        let b = mount.create_folder(a, "b").unwrap();

        assert!(mount.move_to(a, a, None, false, None).unwrap_err().is_forbidden());
        assert!(mount.move_to(a, b, None, false, None).unwrap_err().is_forbidden());
        assert_eq!(mount.path_of(b), p("/a/b"));
    }

    #[test]
    fn test_move_into_file_rejected() {
        let (mut mount, root) = setup();
        let f = mount.create_file(root, "f", "").unwrap();
        let g = mount.create_file(root, "g", "").unwrap();
        assert!(mount.move_to(g, f, None, false, None).unwrap_err().is_forbidden());
    }

    #[test]
    fn test_copy_is_deep_and_independent() {
        let (mut mount, root) = setup();
        let src = mount.create_folder(root, "src").unwrap();
        let f = mount.create_file(src, "f", "one").unwrap();
        mount.set_property(f, "k", Some("v"), None).unwrap();
        mount.lock(f, Duration::ZERO).unwrap();

        let copy = mount.copy_to(src, root, Some("dup"), false).unwrap();
        let copied_f = mount.by_path(&p("/dup/f")).unwrap();
        assert_ne!(copied_f, f);
        assert_eq!(mount.file(copy).unwrap().count_children(), 1);

        let copied = mount.file(copied_f).unwrap();
        assert_eq!(copied.content().unwrap(), b"one");
        assert_eq!(copied.property("k"), Some("v"));
        assert!(!copied.is_locked());

        mount.update_content(copied_f, "two", None).unwrap();
        assert_eq!(mount.file(f).unwrap().content().unwrap(), b"one");
    }

    #[test]
    fn test_copy_into_self_rejected() {
        let (mut mount, root) = setup();
        let a = mount.create_folder(root, "a").unwrap();
        let b = mount.create_folder(a, "b").unwrap();
        assert!(mount.copy_to(a, b, None, false).unwrap_err().is_forbidden());
        assert!(mount.copy_to(a, a, None, false).unwrap_err().is_forbidden());
    }

    #[test]
    fn test_copy_conflict_and_overwrite() {
        let (mut mount, root) = setup();
        let f = mount.create_file(root, "f", "src").unwrap();
        let dst = mount.create_folder(root, "dst").unwrap();
        let old = mount.create_file(dst, "f", "old").unwrap();

        assert!(mount.copy_to(f, dst, None, false).unwrap_err().is_conflict());
        assert!(mount.copy_to(f, root, None, true).unwrap_err().is_forbidden());

        let copy = mount.copy_to(f, dst, None, true).unwrap();
        assert!(!mount.exists(old));
        assert_eq!(mount.file(copy).unwrap().content().unwrap(), b"src");
        assert!(mount.exists(f));
    }

    #[test]
    fn test_delete_folder_tombstones_subtree() {
        let (mut mount, root) = setup();
        let a = mount.create_folder(root, "a").unwrap();
        let b = mount.create_folder(a, "b").unwrap();
        let f = mount.create_file(b, "f", "").unwrap();

        mount.delete(a, None).unwrap();
        for id in [a, b, f] {
            assert!(!mount.exists(id));
            assert!(matches!(mount.file(id), Err(VfsError::Removed(_))));
        }
        assert!(mount.by_path(&p("/a")).is_none());
        assert!(matches!(mount.delete(a, None), Err(VfsError::Removed(_))));
        assert!(matches!(mount.create_file(b, "g", ""), Err(VfsError::Removed(_))));
    }

    #[test]
    fn test_delete_folder_with_locked_file_is_untouched() {
        let (mut mount, root) = setup();
        let a = mount.create_folder(root, "a").unwrap();
        let f = mount.create_file(a, "f", "").unwrap();
        let g = mount.create_file(a, "g", "").unwrap();
        let token = mount.lock(g, Duration::ZERO).unwrap();

        let err = mount.delete(a, Some(&token)).unwrap_err();
        assert!(err.is_forbidden());
        assert!(err.to_string().contains("/a/g"));
        assert!(mount.exists(a) && mount.exists(f) && mount.exists(g));
    }
}
