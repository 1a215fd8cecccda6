//! Mino-specific diagnostic builders
//!
//! One constructor per failure category the driver reports. The error codes
//! are stable so tooling can tell the phases apart without parsing messages.

use crate::{Diagnostic, DiagnosticBuilder, SourceLocation, SourceMap};

pub const SYNTAX_ERROR: &str = "E0100";
pub const SEMANTIC_ERROR: &str = "E0200";
pub const INTERPRETER_ERROR: &str = "E0300";

/// Provides common Mino diagnostic builders
pub struct MinoDiagnostics;

impl MinoDiagnostics {
    /// Parser failure at a byte offset
    pub fn syntax_error(
        message: &str,
        location: Option<SourceLocation>,
        source_map: &SourceMap,
    ) -> Diagnostic {
        let span = location.and_then(|l| l.to_source_span(source_map));
        let mut builder = DiagnosticBuilder::error(message)
            .code(SYNTAX_ERROR)
            .span(span.clone());
        if let Some(span) = span {
            builder = builder.label(span, "unexpected input");
        }
        builder.build()
    }

    /// Static check failure
    pub fn semantic_error(
        message: &str,
        location: Option<SourceLocation>,
        source_map: &SourceMap,
    ) -> Diagnostic {
        let span = location.and_then(|l| l.to_source_span(source_map));
        let mut builder = DiagnosticBuilder::error(message)
            .code(SEMANTIC_ERROR)
            .span(span.clone());
        if let Some(span) = span {
            builder = builder.label(span, "rejected here");
        }
        builder.build()
    }

    /// Runtime failure; each trace line becomes a note
    pub fn interpreter_error(
        message: &str,
        location: Option<SourceLocation>,
        trace: &[String],
        source_map: &SourceMap,
    ) -> Diagnostic {
        let span = location.and_then(|l| l.to_source_span(source_map));
        let mut builder = DiagnosticBuilder::error(message)
            .code(INTERPRETER_ERROR)
            .span(span.clone());
        if let Some(span) = span {
            builder = builder.label(span, "while evaluating this");
        }
        for line in trace {
            builder = builder.note(line.trim_start());
        }
        builder.build()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_semantic_error_is_located() {
        let mut source_map = SourceMap::new();
        let file = source_map.add_file("main.mino", "new Integer;");
        let diagnostic = MinoDiagnostics::semantic_error(
            "invalid use of new operator",
            Some(SourceLocation::new(file, 0, 3)),
            &source_map,
        );
        assert_eq!(diagnostic.code.as_deref(), Some(SEMANTIC_ERROR));
        assert_eq!(diagnostic.span.as_ref().map(|s| s.start.column), Some(1));
        assert_eq!(diagnostic.labels.len(), 1);
    }

    #[test]
    fn test_interpreter_error_keeps_trace_order() {
        let source_map = SourceMap::new();
        let trace = vec![
            " in Integer./() at line 3 position 7".to_string(),
            " in main program at line 9 position 1".to_string(),
        ];
        let diagnostic =
            MinoDiagnostics::interpreter_error("division by zero", None, &trace, &source_map);
        assert!(diagnostic.span.is_none());
        assert_eq!(diagnostic.notes[0], "in Integer./() at line 3 position 7");
        assert_eq!(diagnostic.notes[1], "in main program at line 9 position 1");
    }
}
