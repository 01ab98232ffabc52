use serde::{Deserialize, Serialize};
use std::fmt;
use std::time::Duration;

// ================================
// Compilation diagnostics
// ================================

/// Severity level of a compilation diagnostic.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum DiagnosticLevel {
    Error,
    Warning,
}

impl fmt::Display for DiagnosticLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DiagnosticLevel::Error => write!(f, "error"),
            DiagnosticLevel::Warning => write!(f, "warning"),
        }
    }
}

/// A single compilation finding.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Diagnostic {
    pub level: DiagnosticLevel,
    pub message: String,
}

impl Diagnostic {
    pub fn error(message: impl Into<String>) -> Self {
        Self {
            level: DiagnosticLevel::Error,
            message: message.into(),
        }
    }
}

/// Everything the compiler emitted for a failed compilation, in emission order.
///
/// Rendered one diagnostic per line; the rendered text is what callers see as
/// the `compile_error` message.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CompileReport {
    pub diagnostics: Vec<Diagnostic>,
}

impl CompileReport {
    pub fn new(diagnostics: Vec<Diagnostic>) -> Self {
        Self { diagnostics }
    }

    /// Return only the error-level diagnostics.
    pub fn errors(&self) -> Vec<&Diagnostic> {
        self.diagnostics
            .iter()
            .filter(|d| d.level == DiagnosticLevel::Error)
            .collect()
    }
}

impl fmt::Display for CompileReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut first = true;
        for diagnostic in &self.diagnostics {
            if !first {
                writeln!(f)?;
            }
            write!(f, "{}: {}", diagnostic.level, diagnostic.message)?;
            first = false;
        }
        Ok(())
    }
}

// ================================
// Compiled program
// ================================

/// The entry point's declared parameter shape, read from the AST at compile
/// time so an unsupported shape is rejected before any code runs.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EntrySignature {
    /// `function main()`
    NoParams,
    /// `function main(args)` — invoked with an empty arguments array
    ArgsArray,
    /// Anything else; carries the declared parameter count
    Unsupported(usize),
}

impl EntrySignature {
    pub fn from_arity(arity: usize) -> Self {
        match arity {
            0 => EntrySignature::NoParams,
            1 => EntrySignature::ArgsArray,
            n => EntrySignature::Unsupported(n),
        }
    }
}

/// A resolved reference directive: the directive name plus the script text
/// loaded from the reference directory.
#[derive(Debug, Clone)]
pub struct ReferenceSource {
    pub name: String,
    pub source: String,
}

/// An in-memory compiled program, ready for invocation.
///
/// Owned by the request that produced it and consumed by execution; never
/// persisted or shared across requests.
#[derive(Debug)]
pub struct CompiledUnit {
    source: String,
    references: Vec<ReferenceSource>,
    signature: EntrySignature,
}

impl CompiledUnit {
    pub(crate) fn new(
        source: String,
        references: Vec<ReferenceSource>,
        signature: EntrySignature,
    ) -> Self {
        Self {
            source,
            references,
            signature,
        }
    }

    pub fn source(&self) -> &str {
        &self.source
    }

    pub fn references(&self) -> &[ReferenceSource] {
        &self.references
    }

    pub fn signature(&self) -> EntrySignature {
        self.signature
    }
}

// ================================
// Execution
// ================================

/// What an invocation produced.
///
/// Both variants are success outcomes from the caller's point of view: a
/// fault escaping the entry point is rendered to text and returned in place
/// of normal output.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ExecutionOutcome {
    /// Normal return; carries everything the capture sink collected.
    Completed(String),
    /// An exception escaped the entry point (or the deadline was exceeded);
    /// carries the rendered description.
    Faulted(String),
}

impl ExecutionOutcome {
    pub fn into_text(self) -> String {
        match self {
            ExecutionOutcome::Completed(text) | ExecutionOutcome::Faulted(text) => text,
        }
    }

    pub fn is_faulted(&self) -> bool {
        matches!(self, ExecutionOutcome::Faulted(_))
    }
}

/// Resource bounds applied to every invocation.
#[derive(Debug, Clone)]
pub struct ExecutionLimits {
    /// Wall-clock deadline for the whole invocation
    pub timeout: Duration,

    /// Engine-level cap on loop iterations
    pub loop_iteration_limit: u64,

    /// Engine-level cap on call depth
    pub recursion_limit: usize,
}

impl Default for ExecutionLimits {
    fn default() -> Self {
        Self {
            timeout: Duration::from_secs(30),
            loop_iteration_limit: 10_000_000,
            recursion_limit: 1024,
        }
    }
}
