//! Plain-text tree listing.

use std::fmt::Write;

use kumo_vfs::VirtualFile;

/// Render `top` and everything below it, one node per line, two spaces of
/// indentation per level. Folders end in `/`, files show their size.
pub fn render_tree(top: VirtualFile<'_>) -> String {
    let base = top.path().len();
    let mut out = String::new();
    top.visit(&mut |file: VirtualFile<'_>| {
        let depth = file.path().len() - base;
        let indent = "  ".repeat(depth);
        let name = if file.is_root() { "" } else { file.name() };
        // Writing to a String cannot fail.
        let _ = if file.is_folder() {
            writeln!(out, "{indent}{name}/")
        } else {
            writeln!(out, "{indent}{name} ({} bytes)", file.length())
        };
    });
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use kumo_vfs::MountPoint;

    #[test]
    fn test_render_tree() {
        let mut mount = MountPoint::new();
        let root = mount.root();
        let docs = mount.create_folder(root, "docs").unwrap();
        mount.create_file(docs, "b.md", "bb").unwrap();
        mount.create_file(root, "a.txt", "aaa").unwrap();
        mount.create_folder(docs, "img").unwrap();

        let rendered = render_tree(mount.file(root).unwrap());
        assert_eq!(
            rendered,
            "/\n  docs/\n    img/\n    b.md (2 bytes)\n  a.txt (3 bytes)\n"
        );

        let rendered = render_tree(mount.file(docs).unwrap());
        assert_eq!(rendered, "docs/\n  img/\n  b.md (2 bytes)\n");
    }
}
