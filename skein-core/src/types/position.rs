//! Source positions recorded by the instrumentation.

use lasso::Spur;

/// A `file:line` pair with the file path interned.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Position {
    pub file: Spur,
    pub line: u32,
}

impl Position {
    pub fn new(file: Spur, line: u32) -> Self {
        Self { file, line }
    }
}
