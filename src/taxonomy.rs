//! Static registry of engine error kinds.
//!
//! Engines publish their failure taxonomy as an ordered list of declarations,
//! each naming a kind and (unless it is a root) its parent. Fixture headers
//! refer to kinds by name; the registry resolves those names and answers
//! specialization queries ("is `UndefinedVariableError` a `RenderError`?")
//! without any runtime reflection.

use std::collections::HashMap;
use std::fmt;

use serde::Serialize;
use thiserror::Error;

// =============================================================================
// CORE TYPES
// =============================================================================

/// Identifier of one member of an engine's error taxonomy.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(transparent)]
pub struct ErrorKind(&'static str);

impl ErrorKind {
    pub const fn new(name: &'static str) -> Self {
        Self(name)
    }

    pub fn name(&self) -> &'static str {
        self.0
    }
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.0)
    }
}

/// A single entry of a published taxonomy.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct KindDecl {
    pub kind: ErrorKind,
    pub parent: Option<ErrorKind>,
}

impl KindDecl {
    /// Declares a kind with no parent.
    pub const fn root(kind: ErrorKind) -> Self {
        Self { kind, parent: None }
    }

    /// Declares `kind` as a specialization of `parent`.
    pub const fn child(kind: ErrorKind, parent: ErrorKind) -> Self {
        Self {
            kind,
            parent: Some(parent),
        }
    }
}

/// A header named an error kind the engine does not declare.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("unknown error kind '{name}' (known kinds: {known})")]
pub struct UnknownErrorKind {
    pub name: String,
    pub known: String,
}

/// A published taxonomy that cannot form a registry.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TaxonomyError {
    #[error("error kind '{0}' is declared more than once")]
    Duplicate(ErrorKind),
    #[error("error kind '{kind}' names parent '{parent}', which is not declared before it")]
    UndeclaredParent { kind: ErrorKind, parent: ErrorKind },
}

// =============================================================================
// REGISTRY
// =============================================================================

/// Name to error-kind registry with parent links.
///
/// Parents must be declared before their children, so the hierarchy is a
/// forest by construction and ancestor walks always terminate.
#[derive(Debug, Clone)]
pub struct ErrorTaxonomy {
    order: Vec<ErrorKind>,
    parents: HashMap<&'static str, Option<ErrorKind>>,
}

impl ErrorTaxonomy {
    pub fn new(decls: &[KindDecl]) -> Result<Self, TaxonomyError> {
        let mut order = Vec::with_capacity(decls.len());
        let mut parents = HashMap::with_capacity(decls.len());
        for decl in decls {
            if parents.contains_key(decl.kind.name()) {
                return Err(TaxonomyError::Duplicate(decl.kind));
            }
            if let Some(parent) = decl.parent {
                if !parents.contains_key(parent.name()) {
                    return Err(TaxonomyError::UndeclaredParent {
                        kind: decl.kind,
                        parent,
                    });
                }
            }
            parents.insert(decl.kind.name(), decl.parent);
            order.push(decl.kind);
        }
        Ok(Self { order, parents })
    }

    /// Resolves a kind by its declared name.
    pub fn resolve(&self, name: &str) -> Result<ErrorKind, UnknownErrorKind> {
        match self.parents.get_key_value(name) {
            Some((declared, _)) => Ok(ErrorKind(*declared)),
            None => Err(UnknownErrorKind {
                name: name.to_string(),
                known: self.names().collect::<Vec<_>>().join(", "),
            }),
        }
    }

    pub fn contains(&self, kind: ErrorKind) -> bool {
        self.parents.contains_key(kind.name())
    }

    pub fn parent(&self, kind: ErrorKind) -> Option<ErrorKind> {
        self.parents.get(kind.name()).copied().flatten()
    }

    /// True when `actual` is `expected` or one of its specializations.
    ///
    /// A kind the registry does not declare only matches itself.
    pub fn is_a(&self, actual: ErrorKind, expected: ErrorKind) -> bool {
        let mut current = Some(actual);
        while let Some(kind) = current {
            if kind == expected {
                return true;
            }
            current = self.parent(kind);
        }
        false
    }

    /// Declared names, in declaration order.
    pub fn names(&self) -> impl Iterator<Item = &'static str> + '_ {
        self.order.iter().map(ErrorKind::name)
    }

    pub fn len(&self) -> usize {
        self.order.len()
    }

    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }
}
