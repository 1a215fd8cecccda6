//! Lexical scopes used while checking
//!
//! Scopes live in an arena addressed by [`ScopeId`]. The checker keeps a
//! stack of open scopes: entering a method body opens a fresh root seeded
//! with the parameters, and each `if`/`while` body opens a child that is
//! popped when the block ends. A variable may not be redeclared while an
//! outer binding of the same name is visible.

use crate::error::{SemanticError, SemanticErrorKind, SemanticResult};
use crate::ids::{ClassId, MethodId, ScopeId};
use indexmap::IndexMap;
use source_map::SourceLocation;
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ScopeKind {
    /// Top-level program statements
    Main,
    /// A method body, seeded with its parameters
    Method,
    /// `if` and `while` bodies
    Block,
}

impl fmt::Display for ScopeKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ScopeKind::Main => "main",
            ScopeKind::Method => "method",
            ScopeKind::Block => "block",
        };
        f.write_str(name)
    }
}

#[derive(Debug, Clone)]
pub struct VariableInfo {
    pub name: String,
    pub ty: ClassId,
    pub location: SourceLocation,
}

#[derive(Debug, Clone)]
pub struct Scope {
    pub id: ScopeId,
    pub kind: ScopeKind,
    pub parent: Option<ScopeId>,
    /// Method the scope was opened for, inherited by nested blocks
    pub method: Option<MethodId>,
    variables: IndexMap<String, VariableInfo>,
}

impl Scope {
    pub fn get(&self, name: &str) -> Option<&VariableInfo> {
        self.variables.get(name)
    }

    pub fn variables(&self) -> impl Iterator<Item = &VariableInfo> {
        self.variables.values()
    }
}

#[derive(Debug, Default)]
pub struct ScopeTree {
    scopes: Vec<Scope>,
    open: Vec<ScopeId>,
}

impl ScopeTree {
    pub fn new() -> Self {
        Self::default()
    }

    fn alloc(&mut self, kind: ScopeKind, parent: Option<ScopeId>, method: Option<MethodId>) -> ScopeId {
        let id = ScopeId::from_index(self.scopes.len());
        self.scopes.push(Scope {
            id,
            kind,
            parent,
            method,
            variables: IndexMap::new(),
        });
        self.open.push(id);
        id
    }

    /// Open a scope with no parent: the main program or a method body
    pub fn push_root(&mut self, kind: ScopeKind, method: Option<MethodId>) -> ScopeId {
        self.alloc(kind, None, method)
    }

    /// Open a block nested in the current scope
    pub fn push_block(&mut self) -> ScopeId {
        let parent = self.current();
        let method = parent.and_then(|p| self.scopes[p.index()].method);
        self.alloc(ScopeKind::Block, parent, method)
    }

    pub fn pop(&mut self) -> Option<ScopeId> {
        self.open.pop()
    }

    pub fn current(&self) -> Option<ScopeId> {
        self.open.last().copied()
    }

    pub fn scope(&self, id: ScopeId) -> &Scope {
        &self.scopes[id.index()]
    }

    /// Method enclosing the current scope, `None` in the main program
    pub fn current_method(&self) -> Option<MethodId> {
        self.current().and_then(|id| self.scopes[id.index()].method)
    }

    /// Innermost binding of `name` visible from the current scope
    pub fn lookup(&self, name: &str) -> Option<&VariableInfo> {
        let mut next = self.current();
        while let Some(id) = next {
            let scope = &self.scopes[id.index()];
            if let Some(variable) = scope.variables.get(name) {
                return Some(variable);
            }
            next = scope.parent;
        }
        None
    }

    pub fn resolve(&self, name: &str, location: SourceLocation) -> SemanticResult<&VariableInfo> {
        self.lookup(name).ok_or_else(|| {
            SemanticError::new(
                SemanticErrorKind::UndefinedVariable,
                format!("undefined variable {}", name),
            )
            .at(location)
        })
    }

    pub fn declare(&mut self, variable: VariableInfo) -> SemanticResult<()> {
        if self.lookup(&variable.name).is_some() {
            return Err(SemanticError::new(
                SemanticErrorKind::DuplicateVariable,
                format!("variable {} is already declared", variable.name),
            )
            .at(variable.location));
        }
        let current = self.current().ok_or_else(|| {
            SemanticError::new(
                SemanticErrorKind::UndefinedVariable,
                format!("no open scope for variable {}", variable.name),
            )
            .at(variable.location)
        })?;
        self.scopes[current.index()]
            .variables
            .insert(variable.name.clone(), variable);
        Ok(())
    }

    pub fn len(&self) -> usize {
        self.scopes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.scopes.is_empty()
    }
}
