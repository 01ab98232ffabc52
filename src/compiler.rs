//! Compilation of submissions into in-memory executable units.
//!
//! The compiler resolves the submission's reference directives, parses every
//! reference and the submission itself, and locates the single `main` entry
//! point, recording its declared parameter shape. Diagnostics are aggregated
//! into a [`CompileReport`] and surfaced as one failure; a single pass either
//! succeeds or fails, never retries.

use std::sync::Arc;

use boa_engine::ast::scope::Scope;
use boa_engine::ast::{Declaration, Script, StatementListItem};
use boa_engine::interner::Interner;
use boa_engine::parser::{Parser, Source};

use crate::directives::extract_references;
use crate::error::SandboxError;
use crate::types::{CompileReport, CompiledUnit, Diagnostic, EntrySignature};

/// Name of the function a submission must declare at top level.
pub const ENTRY_POINT: &str = "main";

/// Compiler configuration
#[derive(Clone, Debug)]
pub struct CompilerConfig {
    /// Max submission length (bytes)
    pub max_code_length: usize,
}

impl Default for CompilerConfig {
    fn default() -> Self {
        Self {
            max_code_length: 1_000_000, // 1MB
        }
    }
}

/// Turns submission text plus its reference directives into a [`CompiledUnit`].
pub struct Compiler {
    resolver: Arc<dyn crate::references::ReferenceResolver>,
    config: CompilerConfig,
}

impl Compiler {
    pub fn new(
        resolver: Arc<dyn crate::references::ReferenceResolver>,
        config: CompilerConfig,
    ) -> Self {
        Self { resolver, config }
    }

    /// Compile `source` into an in-memory unit.
    ///
    /// No artifact is written to durable storage; the returned unit holds the
    /// validated source, its resolved references, and the entry signature.
    pub fn compile(&self, source: &str) -> Result<CompiledUnit, SandboxError> {
        if source.len() > self.config.max_code_length {
            return Err(SandboxError::CodeTooLarge {
                max: self.config.max_code_length,
                actual: source.len(),
            });
        }

        let references = extract_references(source)
            .into_iter()
            .map(|name| self.resolver.resolve(&name))
            .collect::<Result<Vec<_>, _>>()?;

        // Provisioned material must itself be loadable
        for reference in &references {
            if let Err(message) = parse(&reference.source) {
                return Err(SandboxError::Reference {
                    name: reference.name.clone(),
                    detail: format!("reference does not parse: {message}"),
                });
            }
        }

        let (script, interner) = parse(source).map_err(|message| {
            SandboxError::Compile(CompileReport::new(vec![Diagnostic::error(message)]))
        })?;

        #[cfg(feature = "security")]
        crate::analyzer::check(&script, &interner)?;

        let signature = entry_signature(&script, &interner)?;
        tracing::debug!(
            references = references.len(),
            ?signature,
            "submission compiled"
        );

        Ok(CompiledUnit::new(source.to_string(), references, signature))
    }
}

fn parse(source: &str) -> Result<(Script, Interner), String> {
    let mut interner = Interner::default();
    let mut parser = Parser::new(Source::from_bytes(source));
    parser
        .parse_script(&Scope::new_global(), &mut interner)
        .map(|script| (script, interner))
        .map_err(|e| e.to_string())
}

/// Locate the single top-level `function main` declaration and classify its
/// declared parameter list. Zero or multiple entry points is a failure;
/// an unsupported parameter shape is recorded, not rejected, so compile-only
/// callers still get a successful compilation.
fn entry_signature(script: &Script, interner: &Interner) -> Result<EntrySignature, SandboxError> {
    let mut arities = Vec::new();

    for item in script.statements().statements() {
        let StatementListItem::Declaration(declaration) = item else {
            continue;
        };
        if let Declaration::FunctionDeclaration(function) = declaration {
            let is_entry = interner
                .resolve(function.name().sym())
                .and_then(|s| s.utf8().map(|name| name == ENTRY_POINT))
                .unwrap_or(false);
            if is_entry {
                arities.push(function.parameters().length() as usize);
            }
        }
    }

    match arities.as_slice() {
        [] => Err(SandboxError::MissingEntryPoint),
        [arity] => Ok(EntrySignature::from_arity(*arity)),
        _ => Err(SandboxError::MultipleEntryPoints),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::references::ReferenceResolver;
    use crate::types::ReferenceSource;
    use std::collections::HashMap;

    struct MapResolver(HashMap<String, String>);

    impl MapResolver {
        fn empty() -> Self {
            Self(HashMap::new())
        }

        fn with(name: &str, source: &str) -> Self {
            let mut map = HashMap::new();
            map.insert(name.to_string(), source.to_string());
            Self(map)
        }
    }

    impl ReferenceResolver for MapResolver {
        fn resolve(&self, name: &str) -> Result<ReferenceSource, SandboxError> {
            self.0
                .get(name)
                .map(|source| ReferenceSource {
                    name: name.to_string(),
                    source: source.clone(),
                })
                .ok_or_else(|| SandboxError::Reference {
                    name: name.to_string(),
                    detail: "unknown reference".to_string(),
                })
        }
    }

    fn compiler(resolver: MapResolver) -> Compiler {
        Compiler::new(Arc::new(resolver), CompilerConfig::default())
    }

    #[test]
    fn test_minimal_program_compiles() {
        let unit = compiler(MapResolver::empty())
            .compile("function main() {}")
            .unwrap();
        assert_eq!(unit.signature(), EntrySignature::NoParams);
        assert!(unit.references().is_empty());
    }

    #[test]
    fn test_args_array_signature() {
        let unit = compiler(MapResolver::empty())
            .compile("function main(args) { return args.length; }")
            .unwrap();
        assert_eq!(unit.signature(), EntrySignature::ArgsArray);
    }

    #[test]
    fn test_unsupported_signature_still_compiles() {
        let unit = compiler(MapResolver::empty())
            .compile("function main(a, b) {}")
            .unwrap();
        assert_eq!(unit.signature(), EntrySignature::Unsupported(2));
    }

    #[test]
    fn test_syntax_error_yields_compile_report() {
        let err = compiler(MapResolver::empty())
            .compile("function main( { return; }")
            .unwrap_err();
        match err {
            SandboxError::Compile(report) => {
                assert!(!report.diagnostics.is_empty());
                assert!(!report.to_string().is_empty());
            }
            other => panic!("Expected Compile, got: {other:?}"),
        }
    }

    #[test]
    fn test_missing_entry_point() {
        let err = compiler(MapResolver::empty())
            .compile("var x = 1;")
            .unwrap_err();
        assert!(matches!(err, SandboxError::MissingEntryPoint));
    }

    #[test]
    fn test_multiple_entry_points() {
        let err = compiler(MapResolver::empty())
            .compile("function main() {}\nfunction main(args) {}")
            .unwrap_err();
        assert!(matches!(err, SandboxError::MultipleEntryPoints));
    }

    #[test]
    fn test_nested_main_is_not_an_entry_point() {
        let err = compiler(MapResolver::empty())
            .compile("function outer() { function main() {} }")
            .unwrap_err();
        assert!(matches!(err, SandboxError::MissingEntryPoint));
    }

    #[test]
    fn test_directives_resolved_through_resolver() {
        let source = "//!!Alpha\nfunction main() { alpha(); }";
        let unit = compiler(MapResolver::with("Alpha", "function alpha() { return 1; }"))
            .compile(source)
            .unwrap();
        assert_eq!(unit.references().len(), 1);
        assert_eq!(unit.references()[0].name, "Alpha");
    }

    #[test]
    fn test_unknown_directive_fails_resolution() {
        let err = compiler(MapResolver::empty())
            .compile("//!!Nope\nfunction main() {}")
            .unwrap_err();
        assert!(matches!(err, SandboxError::Reference { ref name, .. } if name == "Nope"));
    }

    #[test]
    fn test_unparsable_reference_is_a_resolution_failure() {
        let err = compiler(MapResolver::with("Broken", "function ( {"))
            .compile("//!!Broken\nfunction main() {}")
            .unwrap_err();
        assert!(matches!(err, SandboxError::Reference { ref name, .. } if name == "Broken"));
    }

    #[test]
    fn test_oversized_submission_rejected() {
        let compiler = Compiler::new(
            Arc::new(MapResolver::empty()),
            CompilerConfig {
                max_code_length: 16,
            },
        );
        let err = compiler
            .compile("function main() { /* padding */ }")
            .unwrap_err();
        assert!(matches!(err, SandboxError::CodeTooLarge { max: 16, .. }));
    }
}
