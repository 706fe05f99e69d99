pub mod ansi;
pub mod json;
pub mod registry;

use crate::ast::Span;
use crate::vm::builtins::BuiltinError;
use crate::vm::{ArithmeticError, CompileError, VmError};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Severity {
    Error,
    #[allow(dead_code)] // no warnings are emitted yet; renderers already handle them
    Warning,
}

#[derive(Debug, Clone)]
pub struct Label {
    pub span: Span,
    pub message: String,
    pub is_primary: bool,
}

#[derive(Debug, Clone)]
pub struct Diagnostic {
    pub severity: Severity,
    pub code: Option<&'static str>,
    pub message: String,
    pub labels: Vec<Label>,
    pub notes: Vec<String>,
    pub suggestion: Option<String>,
    pub source: Option<String>,
}

impl Diagnostic {
    pub fn error(message: impl Into<String>) -> Self {
        Diagnostic {
            severity: Severity::Error,
            code: None,
            message: message.into(),
            labels: Vec::new(),
            notes: Vec::new(),
            suggestion: None,
            source: None,
        }
    }

    pub fn with_code(mut self, code: &'static str) -> Self {
        self.code = Some(code);
        self
    }

    pub fn with_span(mut self, span: Span, label: impl Into<String>) -> Self {
        self.labels.push(Label { span, message: label.into(), is_primary: true });
        self
    }

    pub fn with_secondary_span(mut self, span: Span, label: impl Into<String>) -> Self {
        self.labels.push(Label { span, message: label.into(), is_primary: false });
        self
    }

    pub fn with_note(mut self, note: impl Into<String>) -> Self {
        self.notes.push(note.into());
        self
    }

    pub fn with_suggestion(mut self, suggestion: impl Into<String>) -> Self {
        self.suggestion = Some(suggestion.into());
        self
    }

    pub fn with_source(mut self, source: impl Into<String>) -> Self {
        self.source = Some(source.into());
        self
    }
}

// ---- From impls for pipeline error types ----

impl From<&crate::lexer::LexError> for Diagnostic {
    fn from(e: &crate::lexer::LexError) -> Self {
        let span = Span {
            start: e.position,
            end: e.position + e.snippet.len().max(1),
        };
        let code = if e.snippet.starts_with('"') { "MS-L002" } else { "MS-L001" };
        let mut d = Diagnostic::error(format!("unexpected token '{}'", e.snippet))
            .with_code(code)
            .with_span(span, "here");
        if !e.suggestion.is_empty() {
            d = d.with_suggestion(e.suggestion.clone());
        }
        d
    }
}

impl From<&crate::parser::ParseError> for Diagnostic {
    fn from(e: &crate::parser::ParseError) -> Self {
        Diagnostic::error(&e.message).with_code(e.code).with_span(e.span, "here")
    }
}

impl From<&crate::verify::VerifyError> for Diagnostic {
    fn from(e: &crate::verify::VerifyError) -> Self {
        let mut d = Diagnostic::error(&e.message)
            .with_code(e.code)
            .with_note(format!("in function '{}'", e.function));
        if let Some(hint) = &e.hint {
            d = d.with_suggestion(hint.clone());
        }
        d
    }
}

impl From<&CompileError> for Diagnostic {
    fn from(e: &CompileError) -> Self {
        let code = match e {
            CompileError::UndefinedFunction { .. } => "MS-C001",
            CompileError::DuplicateFunction { .. } => "MS-C002",
            CompileError::BuiltinRedefined { .. } => "MS-C003",
            CompileError::NestedFunction { .. } => "MS-C004",
            CompileError::ArityMismatch { .. } => "MS-C005",
            CompileError::MainConflict { .. } => "MS-C006",
            CompileError::MainSignature { .. } => "MS-C007",
        };
        let d = Diagnostic::error(e.to_string()).with_code(code).with_span(e.span(), "here");
        match e {
            CompileError::MainConflict { main_span, .. } => d.with_secondary_span(*main_span, "'main' declared here"),
            _ => d,
        }
    }
}

fn runtime_code(e: &VmError) -> &'static str {
    match e {
        VmError::UndefinedChunk { .. } => "MS-R001",
        VmError::UndefinedVariable { .. } => "MS-R002",
        VmError::AlreadyDeclared { .. } => "MS-R003",
        VmError::ImmutableAssignment { .. } => "MS-R004",
        VmError::Type { .. } => "MS-R005",
        VmError::Arithmetic(ArithmeticError::IncompatibleOperands { .. })
        | VmError::Arithmetic(ArithmeticError::IncompatibleOperand { .. }) => "MS-R006",
        VmError::Arithmetic(ArithmeticError::DivisionByZero) => "MS-R007",
        VmError::Arithmetic(ArithmeticError::Overflow { .. }) => "MS-R008",
        VmError::Arithmetic(ArithmeticError::UnresolvedRef { .. }) => "MS-R009",
        VmError::Builtin(BuiltinError::IndexOutOfBounds { .. }) => "MS-R011",
        VmError::Builtin(BuiltinError::ElementType { .. }) => "MS-R012",
        VmError::Builtin(BuiltinError::Io(_)) | VmError::Io(_) => "MS-R018",
        VmError::Builtin(_) => "MS-R010",
        VmError::StackOverflow { .. } => "MS-R013",
        VmError::StackUnderflow { .. } => "MS-R014",
        VmError::CallDepthExceeded { .. } => "MS-R015",
        VmError::BadJump { .. } => "MS-R016",
        VmError::ScopeUnderflow { .. } => "MS-R017",
    }
}

impl From<&VmError> for Diagnostic {
    fn from(e: &VmError) -> Self {
        let d = Diagnostic::error(e.to_string()).with_code(runtime_code(e));
        match e {
            VmError::CallDepthExceeded { .. } => {
                d.with_suggestion("check for recursion without a base case, or raise --max-depth")
            }
            VmError::StackOverflow { .. } => d.with_suggestion("raise --stack-size"),
            VmError::Arithmetic(ArithmeticError::Overflow { .. }) => {
                d.with_note("integer arithmetic is checked; --permissive wraps instead")
            }
            _ => d,
        }
    }
}
