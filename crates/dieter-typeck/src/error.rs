//! Typing error taxonomy.
//!
//! Two families matter to callers: typing errors proper, which describe a
//! fault in the input program, and [`TypeError::Internal`], which flags a
//! bug in the analyzer itself. A module marked `fails` is satisfied only
//! by the former.

use std::fmt;

use crate::ty::Ty;

/// An error raised while typechecking a program.
#[derive(Debug, Clone)]
pub enum TypeError {
    /// A name is introduced twice in the same scope.
    AlreadyBound { name: String, ty: Ty },
    /// A name is not bound in any enclosing scope.
    NotFound { name: String },
    /// Unification failed inside the named construct.
    NotCompatible {
        context_label: String,
        receptor: Ty,
        provider: Ty,
    },
    /// A non-procedure type was called.
    NotCallable { ty: Ty },
    /// A call's putative type could not unify with the declared type.
    CouldNotUnify { receptor: Ty, provider: Ty },
    /// `bestow q` used outside module `q`.
    QualifierOutsideModule { qual: String, module: String },
    /// A type expression used a qualifier no module has registered.
    UnknownQualifier { name: String },
    /// A qualifier name used where a value was expected.
    QualifierInValuePosition { name: String },
    /// A map-typed name used without an index.
    MissingIndex { name: String },
    /// An index applied to a name that is not map-typed.
    NotAMap { name: String },
    /// A module marked `fails` typechecked cleanly.
    ExpectedFailure { module: String },
    /// A bug in the analyzer, not a fault in the input.
    Internal { message: String },
}

impl TypeError {
    /// Shorthand for an internal error.
    pub fn internal(message: impl Into<String>) -> Self {
        TypeError::Internal {
            message: message.into(),
        }
    }

    /// Internal errors do not satisfy a `fails` module's expectation.
    pub fn is_internal(&self) -> bool {
        matches!(self, TypeError::Internal { .. })
    }
}

impl fmt::Display for TypeError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TypeError::AlreadyBound { name, ty } => {
                write!(f, "name {} already bound to {}", name, ty)
            }
            TypeError::NotFound { name } => {
                write!(f, "name {} not found", name)
            }
            TypeError::NotCompatible {
                context_label,
                receptor,
                provider,
            } => {
                write!(
                    f,
                    "in {}: {} not compatible with {}",
                    context_label, receptor, provider
                )
            }
            TypeError::NotCallable { ty } => {
                write!(f, "{} is not a procedure type", ty)
            }
            TypeError::CouldNotUnify { receptor, provider } => {
                write!(f, "{} could not unify with {}", receptor, provider)
            }
            TypeError::QualifierOutsideModule { qual, module } => {
                write!(
                    f,
                    "type operation on {} used outside of its module (in module {})",
                    qual, module
                )
            }
            TypeError::UnknownQualifier { name } => {
                write!(f, "{} is not a registered qualifier", name)
            }
            TypeError::QualifierInValuePosition { name } => {
                write!(f, "{} names a qualifier, not a value", name)
            }
            TypeError::MissingIndex { name } => {
                write!(f, "{} has a map type and must be indexed", name)
            }
            TypeError::NotAMap { name } => {
                write!(f, "{} is not a map type and cannot be indexed", name)
            }
            TypeError::ExpectedFailure { module } => {
                write!(
                    f,
                    "module {} claimed to fail typechecking but didn't",
                    module
                )
            }
            TypeError::Internal { message } => {
                write!(f, "internal error: {}", message)
            }
        }
    }
}

impl std::error::Error for TypeError {}
