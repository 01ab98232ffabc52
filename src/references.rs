//! Reference resolution.
//!
//! Directives name scripts that are loaded into the engine context before the
//! submission itself, in directive order. The production resolver reads them
//! from a fixed, externally provisioned directory; the trait exists so tests
//! and embedders can supply their own source of reference scripts.

use std::path::PathBuf;

use crate::error::SandboxError;
use crate::types::ReferenceSource;

/// File extension reference scripts are stored under.
const REFERENCE_EXTENSION: &str = "js";

/// Turns a directive name into reference source text.
pub trait ReferenceResolver: Send + Sync {
    fn resolve(&self, name: &str) -> Result<ReferenceSource, SandboxError>;
}

/// Resolves `name` to `<root>/<name>.js` under a fixed directory.
///
/// The directory's provisioning is the deployment's concern; a directive that
/// cannot be resolved is therefore an internal failure, not a caller mistake.
pub struct DirectoryResolver {
    root: PathBuf,
}

impl DirectoryResolver {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &std::path::Path {
        &self.root
    }
}

impl ReferenceResolver for DirectoryResolver {
    fn resolve(&self, name: &str) -> Result<ReferenceSource, SandboxError> {
        // Directive names are identifiers, never paths
        if name.is_empty() || name.contains(['/', '\\']) || name.contains("..") {
            return Err(SandboxError::Reference {
                name: name.to_string(),
                detail: "not a valid reference name".to_string(),
            });
        }

        let path = self.root.join(format!("{name}.{REFERENCE_EXTENSION}"));
        let source = std::fs::read_to_string(&path).map_err(|e| SandboxError::Reference {
            name: name.to_string(),
            detail: format!("{}: {e}", path.display()),
        })?;

        Ok(ReferenceSource {
            name: name.to_string(),
            source,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn resolver_with(name: &str, source: &str) -> (tempfile::TempDir, DirectoryResolver) {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join(format!("{name}.js")), source).unwrap();
        let resolver = DirectoryResolver::new(dir.path());
        (dir, resolver)
    }

    #[test]
    fn test_resolve_existing_reference() {
        let (_dir, resolver) = resolver_with("Alpha", "function alpha() { return 1; }");
        let reference = resolver.resolve("Alpha").unwrap();
        assert_eq!(reference.name, "Alpha");
        assert!(reference.source.contains("alpha"));
    }

    #[test]
    fn test_resolve_missing_reference() {
        let dir = tempfile::tempdir().unwrap();
        let resolver = DirectoryResolver::new(dir.path());
        let err = resolver.resolve("Missing").unwrap_err();
        assert!(matches!(err, SandboxError::Reference { ref name, .. } if name == "Missing"));
    }

    #[test]
    fn test_resolve_rejects_path_traversal() {
        let dir = tempfile::tempdir().unwrap();
        let resolver = DirectoryResolver::new(dir.path());
        assert!(resolver.resolve("../etc/passwd").is_err());
        assert!(resolver.resolve("a/b").is_err());
        assert!(resolver.resolve("a\\b").is_err());
        assert!(resolver.resolve("").is_err());
    }
}
