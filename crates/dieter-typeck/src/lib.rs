//! Dieter type checker: structural types with user-defined qualifiers,
//! checked by directional unification.
//!
//! Qualifiers are module-scoped tags attached to types. A value may flow
//! from a provider into a receptor only if the provider carries every
//! qualifier the receptor demands; extra provider qualifiers are fine.
//! Type variables (`♥T`) are bound monotonically during unification and
//! their binding chains are kept intact so qualifier collection sees
//! every segment.
//!
//! # Architecture
//!
//! - [`ty`]: type representation and the unification algebra
//! - [`context`]: the scope chain / symbol table threaded through the walk
//! - [`check`]: the AST walk
//! - [`error`]: the typing error taxonomy

pub mod check;
pub mod context;
pub mod error;
pub mod ty;

use rustc_hash::FxHashMap;

use dieter_common::span::Span;
use dieter_parser::ast::Program;

use crate::check::Checker;
use crate::error::TypeError;
use crate::ty::Ty;

/// The result of typechecking a Dieter program.
pub struct TypeckResult {
    /// Map from node spans to their computed types. After a clean check,
    /// every expression, declaration, and type expression has an entry.
    pub types: FxHashMap<Span, Ty>,
    /// The error the walk stopped on, if any. The walk aborts at the
    /// first error that is not absorbed by a `fails` module, so this
    /// holds at most one entry.
    pub errors: Vec<TypeError>,
    /// The global symbol table, rendered as sorted `(name, type)` pairs.
    pub globals: Vec<(String, String)>,
}

impl TypeckResult {
    /// Whether the program typechecked cleanly.
    pub fn ok(&self) -> bool {
        self.errors.is_empty()
    }

    /// The computed type recorded for the given node span.
    pub fn type_at(&self, span: Span) -> Option<&Ty> {
        self.types.get(&span)
    }

    /// The printed form of a global symbol's type, if the symbol exists.
    pub fn global_type(&self, name: &str) -> Option<&str> {
        self.globals
            .iter()
            .find(|(n, _)| n == name)
            .map(|(_, ty)| ty.as_str())
    }
}

/// Typecheck a parsed program.
///
/// This is the main entry point. It walks the program with a fresh
/// [`TypingContext`](context::TypingContext) and collects computed types,
/// the terminating error (if any), and the final global symbol table.
pub fn check(program: &Program) -> TypeckResult {
    let mut checker = Checker::new();
    let errors = match checker.check_program(program) {
        Ok(()) => Vec::new(),
        Err(err) => vec![err],
    };
    let (types, globals) = checker.into_parts();
    TypeckResult {
        types,
        errors,
        globals,
    }
}
