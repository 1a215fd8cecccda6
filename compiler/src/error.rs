//! Semantic failures
//!
//! Every static-phase problem (registry, member collection, subtype pass,
//! checker) is reported as one [`SemanticError`]. Checking stops at the first
//! one, so there is no collection type.

use diagnostics::mino::MinoDiagnostics;
use diagnostics::{Diagnostic, SourceLocation, SourceMap};

/// What went wrong, independent of wording
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SemanticErrorKind {
    DuplicateClass,
    UndefinedClass,
    MissingBuiltin,
    CyclicInheritance,
    ValueClassParent,
    DuplicateField,
    UndefinedField,
    DuplicateMethod,
    UndefinedMethod,
    DuplicateParameter,
    InvalidOperatorArity,
    UnknownPrimitive,
    DuplicateVariable,
    UndefinedVariable,
    TypeMismatch,
    ArgumentCount,
    InvalidCondition,
    InvalidComparison,
    InvalidOperands,
    IllegalReturn,
    InvalidNew,
    NullReceiver,
    FieldOutsideMethod,
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("{message}")]
pub struct SemanticError {
    pub kind: SemanticErrorKind,
    pub message: String,
    pub location: Option<SourceLocation>,
}

impl SemanticError {
    pub fn new(kind: SemanticErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
            location: None,
        }
    }

    /// Attach a location, keeping an existing one
    pub fn at(mut self, location: SourceLocation) -> Self {
        if self.location.is_none() {
            self.location = Some(location);
        }
        self
    }

    pub fn to_diagnostic(&self, source_map: &SourceMap) -> Diagnostic {
        MinoDiagnostics::semantic_error(&self.message, self.location, source_map)
    }
}

pub type SemanticResult<T> = Result<T, SemanticError>;

#[cfg(test)]
mod tests {
    use super::*;
    use diagnostics::FileId;

    #[test]
    fn test_first_location_wins() {
        let first = SourceLocation::new(FileId::new(0), 1, 2);
        let second = SourceLocation::new(FileId::new(0), 5, 6);
        let error = SemanticError::new(SemanticErrorKind::UndefinedVariable, "undefined variable x")
            .at(first)
            .at(second);
        assert_eq!(error.location, Some(first));
        assert_eq!(error.to_string(), "undefined variable x");
    }
}
