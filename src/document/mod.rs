//! In-memory HTML document with its asset dependencies.
//!
//! The markup string and the element tree are always derived together: the
//! only way to change the markup is [`Document::set_html_and_resync`] (or
//! [`Document::splice`], which goes through it), so a query never sees a
//! tree built from stale markup.

mod analyze;
mod dependency;
mod tree;

use std::fmt::Write as _;
use std::fs;
use std::ops::Range;
use std::path::{Path, PathBuf};

use crate::error::{BundleError, Result};
use crate::utils::path::normalize_path;

pub use analyze::{image_src, is_script_ref, is_stylesheet_link};
pub use dependency::{Dependency, DependencyKind};
pub use tree::{Element, Tree, find_ascii_ci, rfind_ascii_ci};

/// One HTML entry file being bundled.
#[derive(Debug)]
pub struct Document {
    path: PathBuf,
    dir: PathBuf,
    html: String,
    tree: Tree,
    styles: Vec<Dependency>,
    scripts: Vec<Dependency>,
    images: Vec<Dependency>,
}

/// A replacement of one byte range of the markup.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Edit {
    range: Range<usize>,
    text: String,
}

impl Edit {
    pub fn replace(range: Range<usize>, text: impl Into<String>) -> Self {
        Self {
            range,
            text: text.into(),
        }
    }

    pub fn remove(range: Range<usize>) -> Self {
        Self::replace(range, String::new())
    }

    pub fn insert(at: usize, text: impl Into<String>) -> Self {
        Self::replace(at..at, text)
    }
}

impl Document {
    /// Read, parse and analyze an entry file.
    pub fn load(path: &Path) -> Result<Self> {
        let path = normalize_path(path);
        let html =
            fs::read_to_string(&path).map_err(|e| BundleError::EntryRead(path.clone(), e))?;
        Ok(Self::from_html(path, html))
    }

    /// Build a document from markup already in memory.
    ///
    /// `path` only anchors relative references; it is not read.
    pub fn from_html(path: impl Into<PathBuf>, html: impl Into<String>) -> Self {
        let path = path.into();
        let dir = path.parent().map(Path::to_path_buf).unwrap_or_default();
        let html = html.into().replace("\r\n", "\n");
        let tree = Tree::parse(&html);

        let mut doc = Self {
            path,
            dir,
            html,
            tree,
            styles: Vec::new(),
            scripts: Vec::new(),
            images: Vec::new(),
        };
        doc.analyze();
        doc
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Directory that relative references resolve against.
    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub fn html(&self) -> &str {
        &self.html
    }

    pub fn tree(&self) -> &Tree {
        &self.tree
    }

    pub fn into_html(self) -> String {
        self.html
    }

    /// Replace the markup and rebuild the tree from it.
    pub fn set_html_and_resync(&mut self, html: String) {
        self.tree = Tree::parse(&html);
        self.html = html;
    }

    /// Apply non-overlapping edits to the markup, then resync.
    pub fn splice(&mut self, mut edits: Vec<Edit>) {
        if edits.is_empty() {
            return;
        }
        // Back to front so earlier offsets stay valid
        edits.sort_by(|a, b| b.range.start.cmp(&a.range.start).then(b.range.end.cmp(&a.range.end)));
        let mut html = self.html.clone();
        for edit in edits {
            html.replace_range(edit.range, &edit.text);
        }
        self.set_html_and_resync(html);
    }

    pub fn deps(&self, kind: DependencyKind) -> &[Dependency] {
        match kind {
            DependencyKind::Style => &self.styles,
            DependencyKind::Script => &self.scripts,
            DependencyKind::Image => &self.images,
        }
    }

    pub(crate) fn deps_mut(&mut self, kind: DependencyKind) -> &mut Vec<Dependency> {
        match kind {
            DependencyKind::Style => &mut self.styles,
            DependencyKind::Script => &mut self.scripts,
            DependencyKind::Image => &mut self.images,
        }
    }

    /// Dependency report, one section per kind.
    pub fn summary(&self) -> String {
        let mut out = String::new();
        for kind in DependencyKind::ALL {
            let deps = self.deps(kind);
            let _ = writeln!(out, "{} ({}):", kind, deps.len());
            for dep in deps {
                let _ = writeln!(out, "  {}", dep.key);
            }
        }
        out
    }
}
