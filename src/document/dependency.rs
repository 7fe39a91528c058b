//! Asset references discovered in a document.

use std::fmt;
use std::path::PathBuf;

/// A reference as written in the markup plus where it resolves on disk.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Dependency {
    /// Original attribute value.
    pub key: String,
    /// Absolute path, resolved against the document's directory.
    pub val: PathBuf,
}

impl Dependency {
    pub fn new(key: impl Into<String>, val: impl Into<PathBuf>) -> Self {
        Self {
            key: key.into(),
            val: val.into(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DependencyKind {
    Style,
    Script,
    Image,
}

impl DependencyKind {
    pub const ALL: [Self; 3] = [Self::Style, Self::Script, Self::Image];

    pub const fn label(self) -> &'static str {
        match self {
            Self::Style => "css",
            Self::Script => "js",
            Self::Image => "img",
        }
    }
}

impl fmt::Display for DependencyKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}
