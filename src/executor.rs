//! Entry-point invocation with output capture.
//!
//! Every invocation gets a fresh engine context: runtime limits applied, the
//! native runtime library registered, a request-scoped capture sink installed
//! over the console channels, references loaded in directive order, and only
//! then the submission evaluated and its entry point called. Nothing is
//! shared between invocations, so concurrent requests cannot interleave
//! captured output or observe each other's references.

use async_trait::async_trait;
use boa_engine::object::builtins::JsArray;
use boa_engine::{js_string, Context, JsError, JsObject, JsValue, Source};

use crate::builtins;
use crate::error::SandboxError;
use crate::types::{CompiledUnit, EntrySignature, ExecutionLimits, ExecutionOutcome};

/// Global the capture sink accumulates into.
const SINK_GLOBAL: &str = "__console_out";

/// Console shim evaluated before anything else. Each call appends one line
/// to the sink; objects are rendered as JSON where possible.
const CAPTURE_PRELUDE: &str = r#"
var __console_out = "";
var console = (function () {
    function write(args) {
        var parts = [];
        for (var i = 0; i < args.length; i++) {
            var value = args[i];
            if (typeof value === "object" && value !== null) {
                try { parts.push(JSON.stringify(value)); }
                catch (e) { parts.push(String(value)); }
            } else {
                parts.push(String(value));
            }
        }
        __console_out += parts.join(" ") + "\n";
    }
    return {
        log: function () { write(arguments); },
        info: function () { write(arguments); },
        warn: function () { write(arguments); },
        error: function () { write(arguments); }
    };
})();
"#;

/// Invokes compiled units. The service consumes this seam so embedders and
/// tests can substitute their own execution strategy.
#[async_trait]
pub trait UnitExecutor: Send + Sync {
    async fn execute(&self, unit: CompiledUnit) -> Result<ExecutionOutcome, SandboxError>;
}

/// In-process executor backed by a per-invocation engine context.
pub struct Executor {
    limits: ExecutionLimits,
}

impl Executor {
    pub fn new(limits: ExecutionLimits) -> Self {
        Self { limits }
    }
}

impl Default for Executor {
    fn default() -> Self {
        Self::new(ExecutionLimits::default())
    }
}

#[async_trait]
impl UnitExecutor for Executor {
    async fn execute(&self, unit: CompiledUnit) -> Result<ExecutionOutcome, SandboxError> {
        // Reject unsupported shapes before any engine work happens
        if let EntrySignature::Unsupported(found) = unit.signature() {
            return Err(SandboxError::InvalidMainArgs { found });
        }

        let timeout = self.limits.timeout;
        let limits = self.limits.clone();
        let handle = tokio::task::spawn_blocking(move || invoke(unit, &limits));

        match tokio::time::timeout(timeout, handle).await {
            Ok(Ok(result)) => result,
            Ok(Err(join)) => Err(SandboxError::Internal(format!(
                "executor task failed: {join}"
            ))),
            Err(_) => {
                tracing::warn!(timeout_secs = timeout.as_secs(), "invocation abandoned");
                Ok(ExecutionOutcome::Faulted(format!(
                    "Execution aborted: the submission exceeded the {}s time limit",
                    timeout.as_secs()
                )))
            }
        }
    }
}

fn invoke(unit: CompiledUnit, limits: &ExecutionLimits) -> Result<ExecutionOutcome, SandboxError> {
    let mut context = Context::default();
    context
        .runtime_limits_mut()
        .set_loop_iteration_limit(limits.loop_iteration_limit);
    context
        .runtime_limits_mut()
        .set_recursion_limit(limits.recursion_limit);

    builtins::register(&mut context)
        .map_err(|e| SandboxError::Internal(format!("failed to register runtime library: {e}")))?;
    context
        .eval(Source::from_bytes(CAPTURE_PRELUDE))
        .map_err(|e| SandboxError::Internal(format!("failed to install capture sink: {e}")))?;

    for reference in unit.references() {
        context
            .eval(Source::from_bytes(reference.source.as_bytes()))
            .map_err(|e| SandboxError::Reference {
                name: reference.name.clone(),
                detail: e.to_string(),
            })?;
    }

    // Top-level statements run here; a fault at this point is already the
    // submission's own doing
    if let Err(err) = context.eval(Source::from_bytes(unit.source().as_bytes())) {
        return Ok(ExecutionOutcome::Faulted(render_fault(&err, &mut context)));
    }

    let global = context.global_object();
    let entry = global
        .get(js_string!(crate::compiler::ENTRY_POINT), &mut context)
        .map_err(|e| SandboxError::Internal(format!("entry point lookup failed: {e}")))?;
    let Some(callable) = entry.as_callable() else {
        return Err(SandboxError::EntryPointNotCallable);
    };

    let args: Vec<JsValue> = match unit.signature() {
        EntrySignature::NoParams => Vec::new(),
        EntrySignature::ArgsArray => vec![JsArray::new(&mut context).into()],
        EntrySignature::Unsupported(found) => {
            return Err(SandboxError::InvalidMainArgs { found })
        }
    };

    match callable.call(&JsValue::undefined(), &args, &mut context) {
        Ok(_) => Ok(ExecutionOutcome::Completed(captured_output(&mut context))),
        Err(err) => Ok(ExecutionOutcome::Faulted(render_fault(&err, &mut context))),
    }
}

fn captured_output(context: &mut Context) -> String {
    let global = context.global_object();
    global
        .get(js_string!(SINK_GLOBAL), context)
        .ok()
        .and_then(|value| value.as_string().map(|s| s.to_std_string_escaped()))
        .unwrap_or_default()
}

/// Render the innermost error to text: type name and message, plus stack
/// detail when the thrown value carries one.
fn render_fault(error: &JsError, context: &mut Context) -> String {
    if let Some(value) = error.as_opaque() {
        if let Some(object) = value.as_object() {
            if let Some(name) = string_property(object, js_string!("name"), context) {
                let mut text = match string_property(object, js_string!("message"), context) {
                    Some(message) => format!("{name}: {message}"),
                    None => name,
                };
                if let Some(stack) = string_property(object, js_string!("stack"), context) {
                    text.push('\n');
                    text.push_str(&stack);
                }
                return text;
            }
        }
    }

    match error.try_native(context) {
        Ok(native) => native.to_string(),
        Err(_) => error.to_string(),
    }
}

fn string_property(
    object: &JsObject,
    key: boa_engine::JsString,
    context: &mut Context,
) -> Option<String> {
    let value = object.get(key, context).ok()?;
    if value.is_undefined() {
        return None;
    }
    value.as_string().map(|s| s.to_std_string_escaped())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::ReferenceSource;

    fn unit(source: &str, signature: EntrySignature) -> CompiledUnit {
        CompiledUnit::new(source.to_string(), Vec::new(), signature)
    }

    fn unit_with_refs(
        source: &str,
        references: Vec<ReferenceSource>,
        signature: EntrySignature,
    ) -> CompiledUnit {
        CompiledUnit::new(source.to_string(), references, signature)
    }

    #[tokio::test]
    async fn test_empty_entry_point_completes_with_empty_output() {
        let executor = Executor::default();
        let outcome = executor
            .execute(unit("function main() {}", EntrySignature::NoParams))
            .await
            .unwrap();
        assert_eq!(outcome, ExecutionOutcome::Completed(String::new()));
    }

    #[tokio::test]
    async fn test_console_output_is_captured_in_order() {
        let executor = Executor::default();
        let outcome = executor
            .execute(unit(
                r#"function main() {
                    console.log("first");
                    console.error("second");
                    console.log("value:", 42);
                }"#,
                EntrySignature::NoParams,
            ))
            .await
            .unwrap();
        assert_eq!(
            outcome,
            ExecutionOutcome::Completed("first\nsecond\nvalue: 42\n".into())
        );
    }

    #[tokio::test]
    async fn test_args_array_is_empty() {
        let executor = Executor::default();
        let outcome = executor
            .execute(unit(
                "function main(args) { console.log(args.length); }",
                EntrySignature::ArgsArray,
            ))
            .await
            .unwrap();
        assert_eq!(outcome, ExecutionOutcome::Completed("0\n".into()));
    }

    #[tokio::test]
    async fn test_unsupported_signature_rejected_before_running() {
        let executor = Executor::default();
        let err = executor
            .execute(unit(
                // Would print if it ever ran
                "console.log('side effect'); function main(a, b) {}",
                EntrySignature::Unsupported(2),
            ))
            .await
            .unwrap_err();
        assert!(matches!(err, SandboxError::InvalidMainArgs { found: 2 }));
    }

    #[tokio::test]
    async fn test_unhandled_error_becomes_faulted_outcome() {
        let executor = Executor::default();
        let outcome = executor
            .execute(unit(
                r#"function main() { throw new Error("boom"); }"#,
                EntrySignature::NoParams,
            ))
            .await
            .unwrap();
        match outcome {
            ExecutionOutcome::Faulted(text) => {
                assert!(text.contains("Error"));
                assert!(text.contains("boom"));
            }
            other => panic!("Expected Faulted, got: {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_top_level_fault_is_an_outcome_too() {
        let executor = Executor::default();
        let outcome = executor
            .execute(unit(
                r#"throw new TypeError("early"); function main() {}"#,
                EntrySignature::NoParams,
            ))
            .await
            .unwrap();
        match outcome {
            ExecutionOutcome::Faulted(text) => assert!(text.contains("early")),
            other => panic!("Expected Faulted, got: {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_references_load_before_submission() {
        let executor = Executor::default();
        let references = vec![ReferenceSource {
            name: "Alpha".into(),
            source: "function alpha() { return 'from alpha'; }".into(),
        }];
        let outcome = executor
            .execute(unit_with_refs(
                "function main() { console.log(alpha()); }",
                references,
                EntrySignature::NoParams,
            ))
            .await
            .unwrap();
        assert_eq!(outcome, ExecutionOutcome::Completed("from alpha\n".into()));
    }

    #[tokio::test]
    async fn test_faulting_reference_is_internal() {
        let executor = Executor::default();
        let references = vec![ReferenceSource {
            name: "Bad".into(),
            source: "throw new Error('broken reference');".into(),
        }];
        let err = executor
            .execute(unit_with_refs(
                "function main() {}",
                references,
                EntrySignature::NoParams,
            ))
            .await
            .unwrap_err();
        assert!(matches!(err, SandboxError::Reference { ref name, .. } if name == "Bad"));
    }

    #[tokio::test]
    async fn test_missing_entry_binding_is_internal() {
        let executor = Executor::default();
        // Compiled against a declaration the program then removes
        let err = executor
            .execute(unit(
                "function main() {}\nmain = 42;",
                EntrySignature::NoParams,
            ))
            .await
            .unwrap_err();
        assert!(matches!(err, SandboxError::EntryPointNotCallable));
    }

    #[tokio::test]
    async fn test_runaway_loop_hits_iteration_limit() {
        let executor = Executor::new(ExecutionLimits {
            loop_iteration_limit: 10_000,
            ..ExecutionLimits::default()
        });
        let outcome = executor
            .execute(unit(
                "function main() { while (true) {} }",
                EntrySignature::NoParams,
            ))
            .await
            .unwrap();
        match outcome {
            ExecutionOutcome::Faulted(text) => assert!(!text.is_empty()),
            other => panic!("Expected Faulted, got: {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_runtime_library_available_to_submissions() {
        let executor = Executor::default();
        let outcome = executor
            .execute(unit(
                "function main() { console.log(crypto.sha256('hello')); }",
                EntrySignature::NoParams,
            ))
            .await
            .unwrap();
        assert_eq!(
            outcome,
            ExecutionOutcome::Completed(
                "2cf24dba5fb0a30e26e83b2ac5b9e29e1b161e5c1fa7425e73043362938b9824\n".into()
            )
        );
    }
}
