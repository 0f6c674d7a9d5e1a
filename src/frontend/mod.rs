use std::{path::PathBuf, rc::Rc};

use colored::Colorize;

pub mod ast;
pub mod imports;
pub mod intern;
pub mod lexer;
pub mod parser;
pub mod reader;

#[derive(Debug)]
pub struct SourceFile {
    pub contents: String,
    pub origin: SourceFileOrigin,
}

impl SourceFile {
    pub fn new(contents: impl Into<String>, origin: SourceFileOrigin) -> Self {
        Self {
            contents: contents.into(),
            origin,
        }
    }

    pub fn name(&self) -> Rc<str> {
        Rc::from(self.origin.to_string())
    }

    /// Prints the offending line with a caret under the reported column
    pub fn highlight_location(&self, location: &SourceLocation) {
        let Some(line) = self.contents.lines().nth(location.line.saturating_sub(1)) else {
            return;
        };

        let gutter = format!("{} | ", location.line);

        eprintln!("{}{}", gutter.blue(), line);
        eprintln!(
            "{}{}",
            " ".repeat(gutter.len() + location.column.saturating_sub(1)),
            "^".red()
        );
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SourceFileOrigin {
    Memory,
    File(PathBuf),
}

impl core::fmt::Display for SourceFileOrigin {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SourceFileOrigin::Memory => f.write_str("<memory>"),
            SourceFileOrigin::File(path) => f.write_fmt(format_args!("{}", path.display())),
        }
    }
}

/// A position inside a source file. Lines and columns start at one.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceLocation {
    pub offset: usize,
    pub line: usize,
    pub column: usize,
    pub file: Rc<str>,
}

impl SourceLocation {
    pub fn new(offset: usize, line: usize, column: usize, file: Rc<str>) -> Self {
        Self {
            offset,
            line,
            column,
            file,
        }
    }

    pub fn start_of(file: Rc<str>) -> Self {
        Self::new(0, 1, 1, file)
    }
}

impl core::fmt::Display for SourceLocation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}:{}:{}", self.file, self.line, self.column)
    }
}
