//! String interning for source file paths.
//!
//! Trace positions repeat the same handful of file paths thousands of
//! times; interning keeps one copy and hands out `Spur` keys. The engine
//! is single-threaded, so the plain `Rodeo` suffices.

use lasso::{Rodeo, Spur};

/// Path interner that normalizes separators before interning.
///
/// Converts backslashes to forward slashes, collapses `//`, and removes
/// trailing slashes for consistent cross-platform handling.
#[derive(Debug)]
pub struct PathInterner {
    inner: Rodeo,
}

impl PathInterner {
    /// Create a new path interner.
    pub fn new() -> Self {
        Self {
            inner: Rodeo::default(),
        }
    }

    /// Intern a path, normalizing separators first.
    pub fn intern(&mut self, path: &str) -> Spur {
        let normalized = Self::normalize(path);
        self.inner.get_or_intern(&normalized)
    }

    /// Look up a previously interned path without inserting.
    pub fn get(&self, path: &str) -> Option<Spur> {
        let normalized = Self::normalize(path);
        self.inner.get(&normalized)
    }

    /// Resolve a `Spur` back to its string.
    pub fn resolve(&self, key: &Spur) -> &str {
        self.inner.resolve(key)
    }

    /// Number of distinct interned paths.
    pub fn len(&self) -> usize {
        self.inner.len()
    }

    /// Whether no path has been interned yet.
    pub fn is_empty(&self) -> bool {
        self.inner.is_empty()
    }

    fn normalize(path: &str) -> String {
        let mut result = path.replace('\\', "/");
        while result.contains("//") {
            result = result.replace("//", "/");
        }
        if result.len() > 1 && result.ends_with('/') {
            result.pop();
        }
        result
    }
}

impl Default for PathInterner {
    fn default() -> Self {
        Self::new()
    }
}
