//! Symbols: the compile-time entities files can wait on.

use std::fmt;
use std::sync::Arc;

/// An opaque identifier for a compile-time entity (a module or a
/// struct-like shape) that one file's compilation may depend on another
/// file to define.
#[derive(Clone, Eq, PartialEq, Hash)]
pub struct Symbol(Arc<str>);

impl Symbol {
    pub fn new(name: impl Into<Arc<str>>) -> Self {
        Symbol(name.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Debug for Symbol {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Symbol({})", self.0)
    }
}

impl fmt::Display for Symbol {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<&str> for Symbol {
    fn from(value: &str) -> Self {
        Symbol::new(value)
    }
}

impl From<String> for Symbol {
    fn from(value: String) -> Self {
        Symbol::new(value)
    }
}

/// The strength of a definition: a `module` satisfies any wait on that
/// symbol, a `struct` only satisfies waits that explicitly ask for a
/// struct-strength definition.
#[derive(Clone, Copy, Eq, PartialEq, Hash, Debug)]
pub enum DefinitionKind {
    Module,
    Struct,
}

/// What strength of definition a suspended worker needs to unblock.
#[derive(Clone, Copy, Eq, PartialEq, Hash, Debug)]
pub enum WaitKind {
    Module,
    Struct,
}

impl WaitKind {
    /// Whether a definition of `kind` satisfies a wait of `self`.
    ///
    /// A `module` definition satisfies both `kind=module` and
    /// `kind=struct` waits; a `struct` definition satisfies only
    /// `kind=struct` waits.
    pub fn satisfied_by(self, kind: DefinitionKind) -> bool {
        match kind {
            DefinitionKind::Module => true,
            DefinitionKind::Struct => self == WaitKind::Struct,
        }
    }
}

#[cfg(test)]
mod tests;
