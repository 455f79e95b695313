//! Core VFS value types.
//!
//! These are plain data and serialize cleanly, so the service layer in front
//! of the engine can hand them out as-is.

use serde::{Deserialize, Serialize};

/// Media type reported for files with no stored type and no known extension.
pub const DEFAULT_MEDIA_TYPE: &str = "application/octet-stream";

/// Node type enumeration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NodeType {
    /// Regular file.
    File,
    /// Folder.
    Folder,
}

impl NodeType {
    /// Returns true if this is a regular file.
    pub fn is_file(&self) -> bool {
        matches!(self, NodeType::File)
    }

    /// Returns true if this is a folder.
    pub fn is_folder(&self) -> bool {
        matches!(self, NodeType::Folder)
    }
}

/// One multi-valued property, as carried by `update_properties`.
///
/// An empty `values` list removes the property.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Property {
    pub name: String,
    #[serde(default)]
    pub values: Vec<String>,
}

impl Property {
    pub fn new(name: impl Into<String>, values: Vec<String>) -> Self {
        Self {
            name: name.into(),
            values,
        }
    }

    /// A single-valued property.
    pub fn single(name: impl Into<String>, value: impl Into<String>) -> Self {
        Self::new(name, vec![value.into()])
    }

    /// A property that removes `name` when applied.
    pub fn removal(name: impl Into<String>) -> Self {
        Self::new(name, Vec::new())
    }
}

/// Guess a media type from a file name's extension.
pub fn guess_media_type(name: &str) -> &'static str {
    let Some((_, ext)) = name.rsplit_once('.') else {
        return DEFAULT_MEDIA_TYPE;
    };
    match ext.to_ascii_lowercase().as_str() {
        "txt" | "log" => "text/plain",
        "md" | "markdown" => "text/markdown",
        "html" | "htm" => "text/html",
        "css" => "text/css",
        "csv" => "text/csv",
        "js" | "mjs" => "application/javascript",
        "json" => "application/json",
        "xml" => "application/xml",
        "yaml" | "yml" => "application/yaml",
        "toml" => "application/toml",
        "java" => "text/x-java",
        "rs" => "text/x-rust",
        "py" => "text/x-python",
        "sh" => "application/x-sh",
        "zip" | "jar" => "application/zip",
        "png" => "image/png",
        "jpg" | "jpeg" => "image/jpeg",
        "gif" => "image/gif",
        "svg" => "image/svg+xml",
        _ => DEFAULT_MEDIA_TYPE,
    }
}
