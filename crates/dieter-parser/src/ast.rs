//! Abstract syntax tree for the Dieter programming language.
//!
//! The AST is a plain owned tree. Every node carries the [`Span`] of the
//! source text it was parsed from; the checker uses these spans as node
//! identities when it records computed types. All nodes derive `Serialize`
//! so the driver can dump the tree as JSON.

use serde::Serialize;

use dieter_common::span::Span;

/// A whole source file: forward declarations, qualifier orderings, and
/// modules, each in source order.
#[derive(Debug, Clone, Serialize)]
pub struct Program {
    pub forwards: Vec<ForwardDecl>,
    pub orderings: Vec<Ordering>,
    pub modules: Vec<Module>,
}

/// `order A < B` -- a declared precedence between two qualifiers.
///
/// Parsed and kept in the tree, but not consulted by the checker.
#[derive(Debug, Clone, Serialize)]
pub struct Ordering {
    pub before: String,
    pub after: String,
    pub span: Span,
}

/// `forward name(T, ...) : T` -- an advance declaration of a procedure's
/// type, bound in the global scope before any module is checked.
#[derive(Debug, Clone, Serialize)]
pub struct ForwardDecl {
    pub name: String,
    pub type_expr: TypeExpr,
    pub span: Span,
}

/// `module name [fails] ... end`.
///
/// `fails` marks a module that is expected to be rejected by the checker;
/// the program as a whole typechecks only if such a module actually fails.
#[derive(Debug, Clone, Serialize)]
pub struct Module {
    pub name: String,
    pub fails: bool,
    pub locals: Vec<VarDecl>,
    pub procs: Vec<ProcDecl>,
    pub span: Span,
}

/// `name : T` -- a variable declaration (module local, procedure argument,
/// or procedure local).
#[derive(Debug, Clone, Serialize)]
pub struct VarDecl {
    pub name: String,
    pub type_expr: TypeExpr,
    pub span: Span,
}

/// `procedure name(args) : T  var ...  body`.
#[derive(Debug, Clone, Serialize)]
pub struct ProcDecl {
    pub name: String,
    pub args: Vec<VarDecl>,
    pub locals: Vec<VarDecl>,
    pub return_type_expr: TypeExpr,
    pub body: Stmt,
    pub span: Span,
}

/// A statement.
#[derive(Debug, Clone, Serialize)]
pub enum Stmt {
    /// `begin ... end`
    Compound { steps: Vec<Stmt>, span: Span },
    /// `if test then stmt [else stmt]`
    If {
        test: Expr,
        then_branch: Box<Stmt>,
        else_branch: Option<Box<Stmt>>,
        span: Span,
    },
    /// `while test do stmt`
    While {
        test: Expr,
        body: Box<Stmt>,
        span: Span,
    },
    /// `return [final] expr` -- `final` is accepted but has no effect.
    Return { expr: Expr, span: Span },
    /// `name(args)`
    Call {
        name: String,
        args: Vec<Expr>,
        span: Span,
    },
    /// `name [index] := expr`
    Assign {
        name: String,
        index: Option<Expr>,
        expr: Expr,
        span: Span,
    },
}

impl Stmt {
    pub fn span(&self) -> Span {
        match self {
            Stmt::Compound { span, .. }
            | Stmt::If { span, .. }
            | Stmt::While { span, .. }
            | Stmt::Return { span, .. }
            | Stmt::Call { span, .. }
            | Stmt::Assign { span, .. } => *span,
        }
    }
}

/// An expression.
#[derive(Debug, Clone, Serialize)]
pub struct Expr {
    pub kind: ExprKind,
    pub span: Span,
}

#[derive(Debug, Clone, Serialize)]
pub enum ExprKind {
    /// An integer constant, e.g. `42`.
    IntConst(i64),
    /// A string constant, e.g. `"hello"`.
    StringConst(String),
    /// A variable reference, optionally indexed: `x` or `m[i]`.
    VarRef {
        name: String,
        index: Option<Box<Expr>>,
    },
    /// `super` -- the enclosing procedure's declared return type.
    Super,
    /// `bestow q expr` -- attach the current module's qualifier.
    Bestow { qual: String, expr: Box<Expr> },
    /// A call used as an expression: `name(args)`.
    Call { name: String, args: Vec<Expr> },
}

/// A type expression, evaluated by the checker into a `Ty`.
#[derive(Debug, Clone, Serialize)]
pub struct TypeExpr {
    pub kind: TypeExprKind,
    pub span: Span,
}

#[derive(Debug, Clone, Serialize)]
pub enum TypeExprKind {
    /// One of the primitive type keywords.
    Primitive(PrimitiveKind),
    /// `map [from T] to T` -- the domain may be absent (open-domain map).
    Map {
        to: Box<TypeExpr>,
        from: Option<Box<TypeExpr>>,
    },
    /// A procedure signature, as written in a `forward` declaration.
    Proc {
        args: Vec<TypeExpr>,
        ret: Box<TypeExpr>,
    },
    /// `q T` -- a qualifier applied to an inner type expression.
    Qualified { qual: String, inner: Box<TypeExpr> },
    /// `♥name` -- a type variable.
    Var(String),
}

/// The primitive type keywords.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum PrimitiveKind {
    Void,
    Bool,
    Int,
    Rat,
    String,
    Ref,
}
