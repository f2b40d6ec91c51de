use thiserror::Error;

/// Error codes prefixed by phase: L = lexer, P = parser, D = declarations,
/// S = semantic services, A = annotation pass.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorCode {
    // Lexer
    L001, // unexpected character
    L002, // unterminated string or char literal
    L003, // invalid escape sequence
    L004, // malformed number literal
    L005, // string templates nested too deeply

    // Parser
    P001, // unexpected token
    P002, // missing expected token
    P003, // nesting too deep to parse

    // Declarations
    D001, // redeclaration in same scope

    // Semantic services
    S001, // unresolved reference
    S002, // no applicable candidate (argument mismatch, missing or excess arguments)
    S003, // overload ambiguity
    S004, // operator not applicable to type
    S005, // type mismatch
    S006, // expression too deeply nested to type-check

    // Annotation pass
    A001, // annotation argument is not a compile-time constant
    A002, // expression nesting exceeds the configured depth
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Severity {
    Error,
    Warning,
}

impl ErrorCode {
    pub fn severity(&self) -> Severity {
        match self {
            Self::A001 | Self::A002 => Severity::Warning,
            _ => Severity::Error,
        }
    }

    pub fn is_error(&self) -> bool {
        self.severity() == Severity::Error
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::L001 => "L001",
            Self::L002 => "L002",
            Self::L003 => "L003",
            Self::L004 => "L004",
            Self::L005 => "L005",
            Self::P001 => "P001",
            Self::P002 => "P002",
            Self::P003 => "P003",
            Self::D001 => "D001",
            Self::S001 => "S001",
            Self::S002 => "S002",
            Self::S003 => "S003",
            Self::S004 => "S004",
            Self::S005 => "S005",
            Self::S006 => "S006",
            Self::A001 => "A001",
            Self::A002 => "A002",
        }
    }
}

impl std::fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Error)]
#[error("[{code}] {line}:{column} — {message}")]
pub struct Error {
    pub code: ErrorCode,
    pub line: usize,
    pub column: usize,
    pub message: String,
}

impl Error {
    pub fn new(code: ErrorCode, line: usize, column: usize, message: impl Into<String>) -> Self {
        Self { code, line, column, message: message.into() }
    }

    pub fn at(code: ErrorCode, span: &crate::syntax::ast::Span, message: impl Into<String>) -> Self {
        Self::new(code, span.line, span.column, message)
    }

    pub fn severity(&self) -> Severity {
        self.code.severity()
    }
}

// ─── Diagnostic sink ──────────────────────────────────────────────────────────

/// Anything semantic diagnostics can be reported into.
/// The binding context is the default sink; tests and tools may plug their own.
pub trait DiagnosticSink {
    fn report(&mut self, error: Error);
}

impl DiagnosticSink for Vec<Error> {
    fn report(&mut self, error: Error) {
        self.push(error);
    }
}
