//! Zip export and import.
//!
//! Entry names are relative to the parent of the zipped folder, so the
//! folder itself is the top-level entry of the archive (`proj/`,
//! `proj/a/f.txt`). Zipping the root produces entries without a common
//! prefix. `unzip` strips leading segments to undo that prefix.

use std::collections::{HashMap, VecDeque};
use std::io::{Cursor, Read, Seek, Write};
use std::time::SystemTime;

use chrono::{Datelike, Timelike};
use zip::write::SimpleFileOptions;
use zip::{CompressionMethod, ZipArchive, ZipWriter};

use crate::error::{VfsError, VfsResult};
use crate::mount::MountPoint;
use crate::node::{Node, NodeId, NodeKind};
use crate::path::{Path, validate_name};

/// Zip timestamp for a node's modification time, in local time.
///
/// Times outside the DOS range (1980..=2107) collapse to the zip epoch.
fn zip_time(time: SystemTime) -> zip::DateTime {
    let local: chrono::DateTime<chrono::Local> = time.into();
    let Ok(year) = u16::try_from(local.year()) else {
        return zip::DateTime::default();
    };
    zip::DateTime::from_date_and_time(
        year,
        local.month() as u8,
        local.day() as u8,
        local.hour() as u8,
        local.minute() as u8,
        local.second() as u8,
    )
    .unwrap_or_default()
}

fn entry_options(method: CompressionMethod, time: zip::DateTime) -> SimpleFileOptions {
    SimpleFileOptions::default()
        .compression_method(method)
        .last_modified_time(time)
}

/// One archive entry after segment stripping.
struct Entry {
    path: Path,
    /// `None` for directory entries.
    content: Option<Vec<u8>>,
}

#[derive(Clone, Copy, PartialEq, Eq)]
enum Planned {
    Folder,
    File,
}

fn read_entries<R: Read + Seek>(reader: R, strip_levels: usize) -> VfsResult<Vec<Entry>> {
    let mut archive = ZipArchive::new(reader)?;
    let mut entries = Vec::with_capacity(archive.len());
    for index in 0..archive.len() {
        let mut file = archive.by_index(index)?;
        let path = Path::parse(file.name())
            .map_err(|_| VfsError::invalid_path(format!("bad zip entry name '{}'", file.name())))?;
        if path.len() <= strip_levels {
            continue;
        }
        let path = path.sub_path(strip_levels);
        for element in path.elements() {
            validate_name(element).map_err(|_| {
                VfsError::invalid_path(format!("bad zip entry name '{}'", file.name()))
            })?;
        }
        let content = if file.is_dir() {
            None
        } else {
            let mut content = Vec::with_capacity(file.size().min(1 << 20) as usize);
            file.read_to_end(&mut content)?;
            Some(content)
        };
        entries.push(Entry { path, content });
    }
    Ok(entries)
}

impl MountPoint {
    /// Zip a folder into memory.
    pub fn zip(&self, folder: NodeId) -> VfsResult<Vec<u8>> {
        let mut buffer = Cursor::new(Vec::new());
        self.zip_to(folder, &mut buffer)?;
        Ok(buffer.into_inner())
    }

    /// Zip a folder into `writer`, breadth-first.
    ///
    /// Directory entries carry the zip epoch as timestamp, file entries the
    /// node's last modification time.
    pub fn zip_to<W: Write + Seek>(&self, folder: NodeId, writer: W) -> VfsResult<()> {
        let top = self.file(folder)?;
        if !top.is_folder() {
            return Err(VfsError::forbidden(format!(
                "unable zip '{}'. item is not a folder",
                top.path()
            )));
        }
        let base = top.path().parent().unwrap_or_else(Path::root);
        let method = self.config().archive.compression.method();

        let mut zip = ZipWriter::new(writer);
        let mut queue = VecDeque::from([top]);
        let (mut folders, mut files) = (0usize, 0usize);
        while let Some(item) = queue.pop_front() {
            let name = item
                .path()
                .relative_to(&base)
                .map(|relative| relative.to_relative_string())
                .unwrap_or_default();
            if item.is_folder() {
                if !name.is_empty() {
                    zip.add_directory(
                        format!("{name}/"),
                        entry_options(CompressionMethod::Stored, zip::DateTime::default()),
                    )?;
                    folders += 1;
                }
                queue.extend(item.children());
            } else {
                zip.start_file(name, entry_options(method, zip_time(item.last_modified())))?;
                zip.write_all(item.content()?)?;
                files += 1;
            }
        }
        zip.finish()?;

        tracing::info!(path = %top.path(), folders, files, "zipped folder");
        Ok(())
    }

    /// Import a zip archive into `folder`.
    ///
    /// The first `strip_levels` segments of every entry name are dropped and
    /// entries with no segments left are skipped. Folders are created as
    /// needed and existing ones reused. An existing file is replaced only
    /// when `overwrite` is set and the file is not locked.
    ///
    /// The archive is read and checked against the tree in full before the
    /// first node is touched; on error the tree is unchanged.
    pub fn unzip<R: Read>(
        &mut self,
        folder: NodeId,
        mut reader: R,
        overwrite: bool,
        strip_levels: usize,
    ) -> VfsResult<()> {
        self.require_folder(folder, "unzip. item specified as target")?;

        let mut bytes = Vec::new();
        reader.read_to_end(&mut bytes)?;
        let entries = read_entries(Cursor::new(bytes), strip_levels)?;

        self.plan_unzip(folder, &entries, overwrite)?;

        let (mut created, mut written) = (0usize, 0usize);
        for entry in &entries {
            let elements = entry.path.elements();
            let (parent_elements, last) = match &entry.content {
                Some(_) => elements.split_at(elements.len() - 1),
                None => (elements, &[][..]),
            };
            let mut parent = folder;
            for element in parent_elements {
                parent = match self.child_id(parent, element) {
                    Some(existing) => existing,
                    None => {
                        let id = self.alloc(Node::folder(element, Some(parent)));
                        self.attach(parent, id);
                        created += 1;
                        id
                    }
                };
            }
            if let (Some(content), [name]) = (&entry.content, last) {
                self.write_unzipped_file(parent, name, content.clone());
                written += 1;
            }
        }

        tracing::info!(
            path = %self.path_of(folder),
            entries = entries.len(),
            folders = created,
            files = written,
            "unzipped archive"
        );
        self.index_add(folder);
        Ok(())
    }

    /// Check every entry against the tree and the entries before it.
    fn plan_unzip(&self, folder: NodeId, entries: &[Entry], overwrite: bool) -> VfsResult<()> {
        let target = self.path_of(folder);
        let mut planned: HashMap<Path, Planned> = HashMap::new();

        for entry in entries {
            let depth = match entry.content {
                Some(_) => entry.path.len() - 1,
                None => entry.path.len(),
            };
            let mut prefix = Path::root();
            for element in &entry.path.elements()[..depth] {
                prefix = prefix.child_unchecked(element);
                match planned.get(&prefix) {
                    Some(Planned::Folder) => continue,
                    Some(Planned::File) => {
                        return Err(VfsError::conflict(format!(
                            "unable unzip. entry '{}' is both file and folder",
                            target.join(&prefix)
                        )));
                    }
                    None => {}
                }
                if let Some(existing) = self.resolve_from(folder, &prefix) {
                    if self.raw(existing).is_file() {
                        return Err(VfsError::conflict(format!(
                            "unable unzip. file '{}' is in the way of a folder",
                            self.path_of(existing)
                        )));
                    }
                }
                planned.insert(prefix.clone(), Planned::Folder);
            }

            if entry.content.is_none() {
                continue;
            }
            match planned.get(&entry.path) {
                Some(Planned::File) if overwrite => continue,
                Some(Planned::File) => {
                    return Err(VfsError::conflict(format!(
                        "unable unzip. archive contains '{}' more than once",
                        target.join(&entry.path)
                    )));
                }
                Some(Planned::Folder) => {
                    return Err(VfsError::conflict(format!(
                        "unable unzip. entry '{}' is both file and folder",
                        target.join(&entry.path)
                    )));
                }
                None => {}
            }
            if let Some(existing) = self.resolve_from(folder, &entry.path) {
                let node = self.raw(existing);
                let path = self.path_of(existing);
                if node.is_folder() {
                    return Err(VfsError::conflict(format!(
                        "unable unzip. folder '{path}' is in the way of a file"
                    )));
                }
                if node.live_lock().is_some() {
                    return Err(VfsError::forbidden(format!(
                        "unable unzip. file '{path}' is locked"
                    )));
                }
                if !overwrite {
                    return Err(VfsError::conflict(format!(
                        "unable unzip. file '{path}' already exists"
                    )));
                }
            }
            planned.insert(entry.path.clone(), Planned::File);
        }
        Ok(())
    }

    fn write_unzipped_file(&mut self, parent: NodeId, name: &str, content: Vec<u8>) {
        match self.child_id(parent, name) {
            Some(existing) => {
                let node = self.raw_mut(existing);
                if let NodeKind::File {
                    content: current,
                    lock,
                    ..
                } = &mut node.kind
                {
                    *current = content;
                    *lock = None;
                }
                node.touch();
            }
            None => {
                let id = self.alloc(Node::file(name, parent, content));
                self.attach(parent, id);
            }
        }
    }
}
