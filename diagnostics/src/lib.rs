//! Diagnostics library for Mino error reporting
//!
//! Rust-style error reports with source snippets, caret underlines and
//! optional colored terminal output.

// Re-export source mapping types from the source_map crate
pub use source_map::{FileId, SourceFile, SourceLocation, SourceMap, SourcePosition, SourceSpan};

pub mod mino;

/// A label that points to a span of code
#[derive(Debug, Clone)]
pub struct Label {
    pub span: SourceSpan,
    pub message: String,
}

impl Label {
    pub fn new(span: SourceSpan, message: impl Into<String>) -> Self {
        Self {
            span,
            message: message.into(),
        }
    }
}

/// An error message with an optional primary span and notes
#[derive(Debug, Clone)]
pub struct Diagnostic {
    pub code: Option<String>,
    pub message: String,
    pub span: Option<SourceSpan>,
    pub labels: Vec<Label>,
    pub notes: Vec<String>,
}

/// Builder for creating diagnostics
pub struct DiagnosticBuilder {
    code: Option<String>,
    message: String,
    span: Option<SourceSpan>,
    labels: Vec<Label>,
    notes: Vec<String>,
}

impl DiagnosticBuilder {
    pub fn error(message: impl Into<String>) -> Self {
        Self {
            code: None,
            message: message.into(),
            span: None,
            labels: vec![],
            notes: vec![],
        }
    }

    pub fn code(mut self, code: impl Into<String>) -> Self {
        self.code = Some(code.into());
        self
    }

    /// Attach the primary span; `None` leaves the diagnostic unlocated
    pub fn span(mut self, span: Option<SourceSpan>) -> Self {
        self.span = span;
        self
    }

    pub fn label(mut self, span: SourceSpan, message: impl Into<String>) -> Self {
        self.labels.push(Label::new(span, message));
        self
    }

    pub fn note(mut self, note: impl Into<String>) -> Self {
        self.notes.push(note.into());
        self
    }

    pub fn build(self) -> Diagnostic {
        Diagnostic {
            code: self.code,
            message: self.message,
            span: self.span,
            labels: self.labels,
            notes: self.notes,
        }
    }
}

/// Formatter for displaying diagnostics
pub struct ErrorFormatter {
    use_colors: bool,
}

impl ErrorFormatter {
    pub fn new() -> Self {
        Self { use_colors: false }
    }

    pub fn with_colors() -> Self {
        Self { use_colors: true }
    }

    fn paint(&self, code: &str, text: &str) -> String {
        if self.use_colors {
            format!("\x1b[{}m{}\x1b[0m", code, text)
        } else {
            text.to_string()
        }
    }

    pub fn format_diagnostic(&self, diagnostic: &Diagnostic, source_map: &SourceMap) -> String {
        let mut output = String::new();

        let mut header = String::from("error");
        if let Some(code) = &diagnostic.code {
            header.push_str(&format!("[{}]", code));
        }
        output.push_str(&self.paint("31", &header));
        output.push_str(": ");
        output.push_str(&self.paint("1;97", &diagnostic.message));
        output.push('\n');

        if let Some(span) = &diagnostic.span {
            self.format_snippet(&mut output, diagnostic, span, source_map);
        }

        for note in &diagnostic.notes {
            output.push_str(&format!("{}: {}\n", self.paint("34", "note"), note));
        }

        output
    }

    fn format_snippet(
        &self,
        output: &mut String,
        diagnostic: &Diagnostic,
        span: &SourceSpan,
        source_map: &SourceMap,
    ) {
        let Some(file) = source_map.get_file(span.file_id) else {
            return;
        };

        output.push_str(&format!(
            "  {} {}:{}:{}\n",
            self.paint("96", "-->"),
            file.name,
            span.start.line,
            span.start.column
        ));

        let line_num = span.start.line;
        let width = line_num.to_string().len();
        let bar = self.paint("96", "|");
        output.push_str(&format!("{:width$} {}\n", "", bar, width = width));

        let Some(line) = source_map.get_line(span.file_id, line_num) else {
            return;
        };
        output.push_str(&format!("{} {} {}\n", self.paint("96", &line_num.to_string()), bar, line));

        let start_col = span.start.column.max(1);
        let mut underline_len = if span.start.line == span.end.line {
            span.end.column.saturating_sub(span.start.column)
        } else {
            line.len().saturating_sub(start_col - 1)
        };

        // Single-position spans: underline the word under the caret
        if underline_len <= 1 && start_col - 1 < line.len() {
            let detected = line[start_col - 1..]
                .chars()
                .take_while(|c| c.is_alphanumeric() || *c == '_')
                .count();
            if detected >= 1 {
                underline_len = detected;
            }
        }

        let padding = " ".repeat(start_col - 1);
        let carets = self.paint("31", &"^".repeat(underline_len.max(1)));
        output.push_str(&format!("{:width$} {} {}{}", "", bar, padding, carets, width = width));

        if let Some(label) = diagnostic.labels.first() {
            output.push(' ');
            output.push_str(&self.paint("1;31", &label.message));
        }
        output.push('\n');
    }
}

impl Default for ErrorFormatter {
    fn default() -> Self {
        Self::new()
    }
}
