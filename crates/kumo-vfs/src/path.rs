//! Normalized, slash-separated VFS paths.
//!
//! A [`Path`] is a sequence of non-empty elements; the root is the empty
//! sequence. Paths are always interpreted relative to whatever node they are
//! resolved against, so `/a/b` and `a/b` parse to the same value.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::{VfsError, VfsResult};

/// Path separator.
pub const SEPARATOR: char = '/';

/// Immutable VFS path.
#[derive(Clone, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Path {
    elements: Vec<String>,
}

impl Path {
    /// The root path (no elements).
    pub const ROOT: Path = Path {
        elements: Vec::new(),
    };

    pub fn root() -> Self {
        Self::ROOT
    }

    /// Parse a path string.
    ///
    /// A leading and a trailing `/` are ignored, `.` elements are dropped and
    /// `..` pops the previous element. Empty interior elements (`a//b`) and
    /// `..` climbing above the root are rejected.
    pub fn parse(s: &str) -> VfsResult<Self> {
        let trimmed = s.strip_prefix(SEPARATOR).unwrap_or(s);
        let trimmed = trimmed.strip_suffix(SEPARATOR).unwrap_or(trimmed);
        if trimmed.is_empty() {
            return Ok(Self::root());
        }

        let mut elements: Vec<String> = Vec::new();
        for element in trimmed.split(SEPARATOR) {
            match element {
                "" => {
                    return Err(VfsError::invalid_path(format!("empty element in '{s}'")));
                }
                "." => {}
                ".." => {
                    if elements.pop().is_none() {
                        return Err(VfsError::invalid_path(format!("'{s}' escapes root")));
                    }
                }
                name => elements.push(name.to_string()),
            }
        }
        Ok(Self { elements })
    }

    pub fn is_root(&self) -> bool {
        self.elements.is_empty()
    }

    /// Number of elements.
    pub fn len(&self) -> usize {
        self.elements.len()
    }

    pub fn is_empty(&self) -> bool {
        self.elements.is_empty()
    }

    pub fn elements(&self) -> &[String] {
        &self.elements
    }

    pub fn element(&self, index: usize) -> Option<&str> {
        self.elements.get(index).map(String::as_str)
    }

    /// Last element, or `""` for the root.
    pub fn name(&self) -> &str {
        self.elements.last().map(String::as_str).unwrap_or("")
    }

    /// Parent path; `None` for the root.
    pub fn parent(&self) -> Option<Path> {
        if self.is_root() {
            return None;
        }
        Some(Self {
            elements: self.elements[..self.elements.len() - 1].to_vec(),
        })
    }

    /// Append a single element.
    pub fn child(&self, name: &str) -> VfsResult<Path> {
        validate_name(name)?;
        Ok(self.child_unchecked(name))
    }

    pub(crate) fn child_unchecked(&self, name: &str) -> Path {
        let mut elements = Vec::with_capacity(self.elements.len() + 1);
        elements.extend_from_slice(&self.elements);
        elements.push(name.to_string());
        Self { elements }
    }

    /// Append a relative path.
    pub fn join(&self, relative: &Path) -> Path {
        let mut elements = self.elements.clone();
        elements.extend_from_slice(&relative.elements);
        Self { elements }
    }

    /// True iff `other` is a strict ancestor of `self`.
    pub fn is_child_of(&self, other: &Path) -> bool {
        other.len() < self.len() && self.elements.starts_with(&other.elements)
    }

    /// The path made of the elements from `from` onwards.
    pub fn sub_path(&self, from: usize) -> Path {
        let from = from.min(self.elements.len());
        Self {
            elements: self.elements[from..].to_vec(),
        }
    }

    /// Path of `self` relative to `ancestor`, or `None` if `ancestor` is not a
    /// prefix of `self`. `p.relative_to(&p)` is the root.
    pub fn relative_to(&self, ancestor: &Path) -> Option<Path> {
        if self.elements.starts_with(&ancestor.elements) {
            Some(self.sub_path(ancestor.len()))
        } else {
            None
        }
    }

    /// Elements joined with `/`, without a leading separator.
    pub fn to_relative_string(&self) -> String {
        self.elements.join("/")
    }
}

/// Check that `name` is usable as a single path element.
pub(crate) fn validate_name(name: &str) -> VfsResult<()> {
    if name.is_empty() || name.trim().is_empty() {
        return Err(VfsError::invalid_path("item name may not be empty"));
    }
    if name.contains(SEPARATOR) {
        return Err(VfsError::invalid_path(format!(
            "item name '{name}' may not contain '{SEPARATOR}'"
        )));
    }
    if name == "." || name == ".." {
        return Err(VfsError::invalid_path(format!("'{name}' is not a valid item name")));
    }
    Ok(())
}

impl fmt::Display for Path {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.elements.is_empty() {
            return f.write_str("/");
        }
        for element in &self.elements {
            write!(f, "/{element}")?;
        }
        Ok(())
    }
}

impl fmt::Debug for Path {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Path({self})")
    }
}

impl FromStr for Path {
    type Err = VfsError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl TryFrom<String> for Path {
    type Error = VfsError;

    fn try_from(s: String) -> Result<Self, Self::Error> {
        Self::parse(&s)
    }
}

impl From<Path> for String {
    fn from(path: Path) -> Self {
        path.to_string()
    }
}
