//! # jsbox — a compile-and-run sandbox for JavaScript submissions
//!
//! `jsbox` accepts a plain-text JavaScript submission, extracts the reference
//! directives from its leading comment block, compiles it into an in-memory
//! executable unit with the Boa engine, and optionally invokes its `main`
//! entry point while capturing everything written to the console. It exposes:
//!
//! - **Compile-only validation**: parse, resolve references, and check the
//!   entry point without running anything.
//! - **Compile-and-run**: invoke the entry point under explicit runtime
//!   limits and return the captured output — or, when an exception escapes
//!   the entry point, its rendered description in place of output.
//!
//! The HTTP layer is a collaborator: [`SandboxService`] returns
//! transport-ready [`ApiResponse`] values (status code, body, media type)
//! that a host router passes through verbatim.
//!
//! # Quick Start
//!
//! ```rust,no_run
//! use jsbox::{ApiRequest, SandboxService, ServiceConfig};
//!
//! #[tokio::main]
//! async fn main() {
//!     let service = SandboxService::new(ServiceConfig::default());
//!     let request = ApiRequest::plain_text(
//!         "function main() { console.log('hello'); }",
//!     );
//!     let response = service.run(&request).await;
//!     println!("{} {:?}", response.status, response.body);
//! }
//! ```
//!
//! # Reference directives
//!
//! A submission may open with `//!!Name` comment lines; each names a script
//! in the provisioned reference directory that is loaded into the context
//! before the submission. Extraction stops at the first non-comment line.
//!
//! # Feature Flags
//!
//! | Flag | Description |
//! |------|-------------|
//! | `security` | AST guard rejecting dynamic execution and prototype tampering |

pub mod api;
pub mod builtins;
pub mod compiler;
pub mod directives;
pub mod error;
pub mod executor;
pub mod references;
pub mod types;

#[cfg(feature = "security")]
pub mod analyzer;

pub use crate::api::{
    ApiRequest, ApiResponse, ErrorBody, ErrorCode, ResponseBody, SandboxService, ServiceConfig,
    ServiceStats,
};
pub use crate::compiler::{Compiler, CompilerConfig, ENTRY_POINT};
pub use crate::directives::{extract_references, COMMENT_MARKER, DIRECTIVE_MARKER};
pub use crate::error::SandboxError;
pub use crate::executor::{Executor, UnitExecutor};
pub use crate::references::{DirectoryResolver, ReferenceResolver};
pub use crate::types::{
    CompileReport, CompiledUnit, Diagnostic, DiagnosticLevel, EntrySignature, ExecutionLimits,
    ExecutionOutcome, ReferenceSource,
};
