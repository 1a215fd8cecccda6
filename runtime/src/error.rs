//! Interpreter failures
//!
//! Every dynamic failure is fatal and carries the call stack as it was when
//! the failure was raised. User-requested `abort` shares the type but keeps
//! its own kind.

use diagnostics::mino::MinoDiagnostics;
use diagnostics::{Diagnostic, SourceLocation, SourceMap};
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RuntimeErrorKind {
    /// Null dereference, bad primitive argument, division by zero, ...
    Fault,
    /// `Object.abort` called by the program
    Abort,
}

/// One active frame at the time of the failure
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StackEntry {
    /// `Class.method`, or `None` for the main program
    pub frame: Option<String>,
    pub location: Option<SourceLocation>,
}

impl StackEntry {
    /// ` in Class.method() at line L position P`
    pub fn render(&self, source_map: &SourceMap) -> String {
        let mut line = match &self.frame {
            Some(name) => format!(" in {}()", name),
            None => " in main program".to_string(),
        };
        if let Some((row, column)) = self.location.and_then(|l| l.line_col(source_map)) {
            line.push_str(&format!(" at line {} position {}", row, column));
        }
        line
    }
}

#[derive(Debug, Clone)]
pub struct InterpreterError {
    pub kind: RuntimeErrorKind,
    pub message: String,
    pub location: Option<SourceLocation>,
    /// Innermost frame first
    pub stack_trace: Vec<StackEntry>,
}

impl fmt::Display for InterpreterError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.kind {
            RuntimeErrorKind::Fault => f.write_str(&self.message),
            RuntimeErrorKind::Abort => write!(f, "ABORT: {}", self.message),
        }
    }
}

impl std::error::Error for InterpreterError {}

impl InterpreterError {
    pub fn fault(message: impl Into<String>) -> Self {
        Self {
            kind: RuntimeErrorKind::Fault,
            message: message.into(),
            location: None,
            stack_trace: Vec::new(),
        }
    }

    pub fn abort(message: impl Into<String>) -> Self {
        Self {
            kind: RuntimeErrorKind::Abort,
            ..Self::fault(message)
        }
    }

    pub fn is_abort(&self) -> bool {
        self.kind == RuntimeErrorKind::Abort
    }

    pub fn render_trace(&self, source_map: &SourceMap) -> Vec<String> {
        self.stack_trace
            .iter()
            .map(|entry| entry.render(source_map))
            .collect()
    }

    pub fn to_diagnostic(&self, source_map: &SourceMap) -> Diagnostic {
        MinoDiagnostics::interpreter_error(
            &self.to_string(),
            self.location,
            &self.render_trace(source_map),
            source_map,
        )
    }
}

pub type RuntimeResult<T> = Result<T, InterpreterError>;

#[cfg(test)]
mod tests {
    use super::*;
    use diagnostics::FileId;

    #[test]
    fn test_abort_headline() {
        let error = InterpreterError::abort("stop");
        assert!(error.is_abort());
        assert_eq!(error.to_string(), "ABORT: stop");
        assert_eq!(InterpreterError::fault("division by zero").to_string(), "division by zero");
    }

    #[test]
    fn test_trace_lines() {
        let mut source_map = SourceMap::new();
        let file = source_map.add_file("t.mino", "var x: Integer;\nx = 1 / 0;\n");
        let mut error = InterpreterError::fault("division by zero");
        error.stack_trace = vec![
            StackEntry {
                frame: Some("Integer./".to_string()),
                location: None,
            },
            StackEntry {
                frame: None,
                location: Some(SourceLocation::new(file, 22, 23)),
            },
        ];
        assert_eq!(
            error.render_trace(&source_map),
            [" in Integer./()", " in main program at line 2 position 7"]
        );
    }
}
