//! AST guard for submissions (enabled by the `security` cargo feature).
//!
//! Walks the already-parsed script and rejects constructs that break out of
//! the evaluation model: dynamic execution, prototype tampering, and access
//! to engine-global escape hatches. Loop bounds are not a concern here; the
//! executor applies engine-level iteration limits at run time.

use std::ops::ControlFlow;

use boa_engine::ast::expression::access::{PropertyAccess, PropertyAccessField};
use boa_engine::ast::expression::{Call, Expression, Identifier, ImportCall, New};
use boa_engine::ast::visitor::{VisitWith, Visitor};
use boa_engine::ast::Script;
use boa_engine::interner::Interner;

use crate::error::SandboxError;

const FORBIDDEN_GLOBALS: &[&str] = &["globalThis", "Reflect", "Proxy"];
const TAMPERED_FIELDS: &[&str] = &["__proto__", "constructor", "prototype"];

/// Reject dangerous constructs in `script`, or pass it through unchanged.
pub fn check(script: &Script, interner: &Interner) -> Result<(), SandboxError> {
    let mut guard = GuardVisitor {
        interner,
        violations: Vec::new(),
    };
    let _ = guard.visit_script(script);

    if guard.violations.is_empty() {
        Ok(())
    } else {
        Err(SandboxError::DangerousCode(guard.violations.join(", ")))
    }
}

struct GuardVisitor<'a> {
    interner: &'a Interner,
    violations: Vec<String>,
}

impl GuardVisitor<'_> {
    fn matches_identifier(&self, expr: &Expression, name: &str) -> bool {
        if let Expression::Identifier(id) = expr {
            return self
                .interner
                .resolve(id.sym())
                .and_then(|s| s.utf8().map(|value| value == name))
                .unwrap_or(false);
        }
        false
    }
}

impl<'ast> Visitor<'ast> for GuardVisitor<'_> {
    type BreakTy = ();

    fn visit_identifier(&mut self, node: &'ast Identifier) -> ControlFlow<Self::BreakTy> {
        if let Some(name) = self
            .interner
            .resolve(node.sym())
            .and_then(|s| s.utf8().map(str::to_owned))
        {
            if FORBIDDEN_GLOBALS.contains(&name.as_str()) {
                self.violations.push(format!("forbidden global '{name}'"));
            }
        }
        ControlFlow::Continue(())
    }

    fn visit_call(&mut self, node: &'ast Call) -> ControlFlow<Self::BreakTy> {
        if self.matches_identifier(node.function(), "eval") {
            self.violations.push("call to eval".to_string());
        }
        node.visit_with(self)
    }

    fn visit_new(&mut self, node: &'ast New) -> ControlFlow<Self::BreakTy> {
        if self.matches_identifier(node.constructor(), "Function") {
            self.violations.push("Function constructor".to_string());
        }
        node.visit_with(self)
    }

    fn visit_property_access(
        &mut self,
        node: &'ast PropertyAccess,
    ) -> ControlFlow<Self::BreakTy> {
        if let PropertyAccess::Simple(simple) = node {
            if let PropertyAccessField::Const(sym) = simple.field() {
                if let Some(field) = self.interner.resolve(*sym) {
                    if let Some(name) = field.utf8() {
                        if TAMPERED_FIELDS.contains(&name) {
                            self.violations
                                .push(format!("prototype tampering via '{name}'"));
                        }
                    }
                }
            }
        }
        node.visit_with(self)
    }

    fn visit_import_call(&mut self, _node: &'ast ImportCall) -> ControlFlow<Self::BreakTy> {
        self.violations.push("dynamic import".to_string());
        ControlFlow::Continue(())
    }
}
