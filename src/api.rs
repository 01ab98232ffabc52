//! Service API: content-type gate, pipeline wiring, and response mapping.
//!
//! [`SandboxService`] is the entry point a host router mounts: it exposes the
//! compile-only and compile-and-run operations and returns transport-ready
//! [`ApiResponse`] values (status code, body, media type). The HTTP layer
//! itself is a collaborator, not part of this crate.

use std::path::PathBuf;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tokio::sync::RwLock;

use crate::compiler::{Compiler, CompilerConfig};
use crate::error::SandboxError;
use crate::executor::{Executor, UnitExecutor};
use crate::references::{DirectoryResolver, ReferenceResolver};
use crate::types::ExecutionLimits;

/// The only accepted submission media type.
pub const TEXT_PLAIN: &str = "text/plain";

/// An incoming submission: the declared content type (if any) plus the raw
/// body. Immutable once received.
#[derive(Debug, Clone)]
pub struct ApiRequest {
    pub content_type: Option<String>,
    pub body: String,
}

impl ApiRequest {
    pub fn new(content_type: Option<String>, body: impl Into<String>) -> Self {
        Self {
            content_type,
            body: body.into(),
        }
    }

    /// A request already declared as `text/plain`.
    pub fn plain_text(body: impl Into<String>) -> Self {
        Self::new(Some(TEXT_PLAIN.to_string()), body)
    }
}

/// Caller-visible error categories.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorCode {
    InvalidContentType,
    CompileError,
    InvalidMainArgs,
    InternalError,
}

impl ErrorCode {
    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorCode::InvalidContentType => "invalid_content_type",
            ErrorCode::CompileError => "compile_error",
            ErrorCode::InvalidMainArgs => "invalid_main_args",
            ErrorCode::InternalError => "internal_error",
        }
    }
}

/// The structured error record returned on failed requests.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorBody {
    pub error_code: ErrorCode,
    pub error_message: String,
}

/// Response payload variants.
#[derive(Debug, Clone)]
pub enum ResponseBody {
    Empty,
    Text(String),
    Error(ErrorBody),
}

/// A transport-ready result: status code plus body. A host router passes
/// this through verbatim.
#[derive(Debug, Clone)]
pub struct ApiResponse {
    pub status: u16,
    pub body: ResponseBody,
}

impl ApiResponse {
    fn ok_empty() -> Self {
        Self {
            status: 200,
            body: ResponseBody::Empty,
        }
    }

    fn ok_text(text: String) -> Self {
        Self {
            status: 200,
            body: ResponseBody::Text(text),
        }
    }

    fn error(status: u16, error_code: ErrorCode, error_message: String) -> Self {
        Self {
            status,
            body: ResponseBody::Error(ErrorBody {
                error_code,
                error_message,
            }),
        }
    }

    /// Media type of the body, when it has one.
    pub fn content_type(&self) -> Option<&'static str> {
        match &self.body {
            ResponseBody::Empty => None,
            ResponseBody::Text(_) => Some(TEXT_PLAIN),
            ResponseBody::Error(_) => Some("application/json"),
        }
    }

    /// Error code of a failed response, if any.
    pub fn error_code(&self) -> Option<ErrorCode> {
        match &self.body {
            ResponseBody::Error(body) => Some(body.error_code),
            _ => None,
        }
    }
}

/// Service configuration
#[derive(Clone, Debug)]
pub struct ServiceConfig {
    /// Directory reference directives resolve against
    pub reference_dir: PathBuf,

    /// Compiler configuration
    pub compiler: CompilerConfig,

    /// Per-invocation execution limits
    pub limits: ExecutionLimits,
}

impl Default for ServiceConfig {
    fn default() -> Self {
        Self {
            reference_dir: PathBuf::from("references"),
            compiler: CompilerConfig::default(),
            limits: ExecutionLimits::default(),
        }
    }
}

/// Running request counters.
#[derive(Debug, Clone, Default)]
pub struct ServiceStats {
    pub total_requests: u64,
    pub succeeded: u64,
    pub failed: u64,
}

/// Wires the pipeline per operation and maps every outcome to a response.
pub struct SandboxService {
    compiler: Compiler,
    executor: Arc<dyn UnitExecutor>,
    stats: Arc<RwLock<ServiceStats>>,
}

impl SandboxService {
    pub fn new(config: ServiceConfig) -> Self {
        let resolver = Arc::new(DirectoryResolver::new(config.reference_dir));
        Self::with_parts(
            resolver,
            config.compiler,
            Arc::new(Executor::new(config.limits)),
        )
    }

    /// Assemble a service from custom parts (resolver and executor seams).
    pub fn with_parts(
        resolver: Arc<dyn ReferenceResolver>,
        compiler_config: CompilerConfig,
        executor: Arc<dyn UnitExecutor>,
    ) -> Self {
        Self {
            compiler: Compiler::new(resolver, compiler_config),
            executor,
            stats: Arc::new(RwLock::new(ServiceStats::default())),
        }
    }

    /// Compile-only validation: `200` empty on success.
    pub async fn compile(&self, request: &ApiRequest) -> ApiResponse {
        let response = self.compile_inner(request);
        self.record(&response).await;
        response
    }

    fn compile_inner(&self, request: &ApiRequest) -> ApiResponse {
        if let Err(response) = check_content_type(request) {
            return response;
        }
        match self.compiler.compile(&request.body) {
            Ok(_) => ApiResponse::ok_empty(),
            Err(err) => failure(err),
        }
    }

    /// Compile then run: `200` with the captured output (or the rendered
    /// fault — the two are indistinguishable to the caller).
    pub async fn run(&self, request: &ApiRequest) -> ApiResponse {
        let response = self.run_inner(request).await;
        self.record(&response).await;
        response
    }

    async fn run_inner(&self, request: &ApiRequest) -> ApiResponse {
        if let Err(response) = check_content_type(request) {
            return response;
        }
        let unit = match self.compiler.compile(&request.body) {
            Ok(unit) => unit,
            Err(err) => return failure(err),
        };
        match self.executor.execute(unit).await {
            Ok(outcome) => ApiResponse::ok_text(outcome.into_text()),
            Err(err) => failure(err),
        }
    }

    /// Snapshot of the running counters.
    pub async fn stats(&self) -> ServiceStats {
        self.stats.read().await.clone()
    }

    async fn record(&self, response: &ApiResponse) {
        let mut stats = self.stats.write().await;
        stats.total_requests += 1;
        if response.status == 200 {
            stats.succeeded += 1;
        } else {
            stats.failed += 1;
        }
    }
}

fn check_content_type(request: &ApiRequest) -> Result<(), ApiResponse> {
    match &request.content_type {
        Some(declared) if !media_type(declared).eq_ignore_ascii_case(TEXT_PLAIN) => {
            Err(ApiResponse::error(
                400,
                ErrorCode::InvalidContentType,
                format!("Unsupported content type: {declared}, only text/plain is supported"),
            ))
        }
        _ => Ok(()),
    }
}

/// Media type without parameters (`text/plain; charset=utf-8` → `text/plain`).
fn media_type(content_type: &str) -> &str {
    content_type
        .split(';')
        .next()
        .unwrap_or(content_type)
        .trim()
}

fn failure(err: SandboxError) -> ApiResponse {
    let (status, code) = classify(&err);
    if status >= 500 {
        tracing::error!(%err, "request failed internally");
    } else {
        tracing::debug!(%err, code = code.as_str(), "request rejected");
    }
    ApiResponse::error(status, code, err.to_string())
}

fn classify(err: &SandboxError) -> (u16, ErrorCode) {
    match err {
        SandboxError::CodeTooLarge { .. } | SandboxError::Compile(_) => {
            (400, ErrorCode::CompileError)
        }
        #[cfg(feature = "security")]
        SandboxError::DangerousCode(_) => (400, ErrorCode::CompileError),
        SandboxError::InvalidMainArgs { .. } => (400, ErrorCode::InvalidMainArgs),
        SandboxError::Reference { .. }
        | SandboxError::MissingEntryPoint
        | SandboxError::MultipleEntryPoints
        | SandboxError::EntryPointNotCallable
        | SandboxError::Internal(_) => (500, ErrorCode::InternalError),
    }
}
