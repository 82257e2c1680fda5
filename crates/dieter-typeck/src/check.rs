//! The typechecking walk over the AST.
//!
//! The checker threads a [`TypingContext`] through a depth-first walk of
//! the program, computing a type for every expression, declaration, and
//! type expression. Computed types are recorded in a table keyed by node
//! span. The walk stops at the first error, except inside a module marked
//! `fails`, where a typing error is the expected outcome.

use log::debug;
use rustc_hash::FxHashMap;

use dieter_common::span::Span;
use dieter_parser::ast::{
    Expr, ExprKind, ForwardDecl, Module, PrimitiveKind, ProcDecl, Program, Stmt, TypeExpr,
    TypeExprKind, VarDecl,
};

use crate::context::TypingContext;
use crate::error::TypeError;
use crate::ty::{Ty, TyKind};

/// Walks a program and records the computed type of every node.
pub struct Checker {
    context: TypingContext,
    types: FxHashMap<Span, Ty>,
}

impl Checker {
    pub fn new() -> Self {
        Checker {
            context: TypingContext::new(),
            types: FxHashMap::default(),
        }
    }

    /// Surrender the computed-type table and the rendered global symbol
    /// table once the walk is over.
    pub fn into_parts(self) -> (FxHashMap<Span, Ty>, Vec<(String, String)>) {
        let globals = self.context.global_symbols();
        (self.types, globals)
    }

    /// Typecheck a whole program: forward declarations first, then
    /// modules in source order. `order` declarations are parsed but not
    /// consulted.
    ///
    /// A module marked `fails` must raise a typing error; if it checks
    /// cleanly that is itself a typing error. Internal errors are never
    /// swallowed.
    pub fn check_program(&mut self, program: &Program) -> Result<(), TypeError> {
        for forward in &program.forwards {
            self.check_forward(forward)?;
        }
        for module in &program.modules {
            if module.fails {
                debug!("typechecking module {} (intends to fail)", module.name);
                match self.check_module(module) {
                    Ok(()) => {
                        return Err(TypeError::ExpectedFailure {
                            module: module.name.clone(),
                        })
                    }
                    Err(err) if err.is_internal() => return Err(err),
                    Err(err) => {
                        debug!("module {} failed as declared: {}", module.name, err);
                    }
                }
            } else {
                debug!("typechecking module {} (intends to succeed)", module.name);
                self.check_module(module)?;
            }
        }
        Ok(())
    }

    /// `forward name(args): ret` binds the name in the current (global)
    /// scope ahead of any module that calls it.
    fn check_forward(&mut self, forward: &ForwardDecl) -> Result<(), TypeError> {
        let ty = self.check_type_expr(&forward.type_expr)?;
        self.types.insert(forward.span, ty.clone());
        self.context.associate(&forward.name, ty)
    }

    /// A module registers its name as a qualifier in the enclosing scope,
    /// then checks its locals and procedures inside a fresh module scope.
    fn check_module(&mut self, module: &Module) -> Result<(), TypeError> {
        self.context.associate_qualifier(&module.name);
        self.context.push_module(&module.name);
        let result = self.check_module_body(module);
        self.context.pop_scope();
        result
    }

    fn check_module_body(&mut self, module: &Module) -> Result<(), TypeError> {
        for local in &module.locals {
            self.check_var_decl(local)?;
        }
        for proc in &module.procs {
            self.check_proc_decl(proc)?;
        }
        Ok(())
    }

    fn check_var_decl(&mut self, decl: &VarDecl) -> Result<Ty, TypeError> {
        let ty = self.check_type_expr(&decl.type_expr)?;
        self.types.insert(decl.span, ty.clone());
        self.context.associate(&decl.name, ty.clone())?;
        Ok(ty)
    }

    /// The procedure's arguments and locals live in a fresh procedure
    /// scope, but its name is bound in the global scope (before the body
    /// is checked, so recursion works).
    fn check_proc_decl(&mut self, proc: &ProcDecl) -> Result<(), TypeError> {
        let return_ty = self.check_type_expr(&proc.return_type_expr)?;
        self.context.push_procedure(return_ty.clone());
        let result = self.check_proc_body(proc, return_ty);
        self.context.pop_scope();
        result
    }

    fn check_proc_body(&mut self, proc: &ProcDecl, return_ty: Ty) -> Result<(), TypeError> {
        let mut arg_types = Vec::new();
        for arg in &proc.args {
            arg_types.push(self.check_var_decl(arg)?);
        }
        for local in &proc.locals {
            self.check_var_decl(local)?;
        }
        let proc_ty = Ty::proc(arg_types, return_ty);
        self.types.insert(proc.span, proc_ty.clone());
        self.context.associate_global(&proc.name, proc_ty)?;
        self.check_stmt(&proc.body)
    }

    fn check_stmt(&mut self, stmt: &Stmt) -> Result<(), TypeError> {
        match stmt {
            Stmt::Compound { steps, .. } => {
                for step in steps {
                    self.check_stmt(step)?;
                }
                Ok(())
            }
            Stmt::If {
                test,
                then_branch,
                else_branch,
                ..
            } => {
                let test_ty = self.check_expr(test)?;
                self.context.assert_equiv("if", &Ty::bool(), &test_ty)?;
                self.check_stmt(then_branch)?;
                if let Some(else_branch) = else_branch {
                    self.check_stmt(else_branch)?;
                }
                Ok(())
            }
            Stmt::While { test, body, .. } => {
                let test_ty = self.check_expr(test)?;
                self.context.assert_equiv("while", &test_ty, &Ty::bool())?;
                self.check_stmt(body)
            }
            Stmt::Return { expr, .. } => {
                let expr_ty = self.check_expr(expr)?;
                let return_ty = self
                    .context
                    .procedure_return()
                    .ok_or_else(|| TypeError::internal("return outside of a procedure"))?;
                self.context.assert_equiv("return", &return_ty, &expr_ty)
            }
            Stmt::Call { name, args, span } => {
                debug!("typechecking procedure call to {}", name);
                let mut arg_types = Vec::new();
                for arg in args {
                    arg_types.push(self.check_expr(arg)?);
                }
                let return_ty = self.context.check_call(name, arg_types)?;
                self.types.insert(*span, return_ty);
                Ok(())
            }
            Stmt::Assign {
                name, index, expr, ..
            } => {
                let lhs_ty = self.context.get_type(name)?;
                let lhs_ty = self.project_indexed(name, lhs_ty, index.as_ref())?;
                let rhs_ty = self.check_expr(expr)?;
                self.context.assert_equiv("assignment", &lhs_ty, &rhs_ty)
            }
        }
    }

    fn check_expr(&mut self, expr: &Expr) -> Result<Ty, TypeError> {
        let ty = match &expr.kind {
            ExprKind::IntConst(_) => Ty::int(),
            ExprKind::StringConst(_) => Ty::string(),
            ExprKind::VarRef { name, index } => {
                let ty = self.context.get_type(name)?;
                self.project_indexed(name, ty, index.as_deref())?
            }
            ExprKind::Super => self
                .context
                .procedure_return()
                .ok_or_else(|| TypeError::internal("super outside of a procedure"))?,
            ExprKind::Bestow { qual, expr: inner } => {
                let module = self
                    .context
                    .module_name()
                    .ok_or_else(|| TypeError::internal("bestow outside of a module"))?
                    .to_string();
                if *qual != module {
                    return Err(TypeError::QualifierOutsideModule {
                        qual: qual.clone(),
                        module,
                    });
                }
                let inner_ty = self.check_expr(inner)?;
                inner_ty.qualify(qual)
            }
            ExprKind::Call { name, args } => {
                debug!("typechecking function call to {}", name);
                let mut arg_types = Vec::new();
                for arg in args {
                    arg_types.push(self.check_expr(arg)?);
                }
                self.context.check_call(name, arg_types)?
            }
        };
        self.types.insert(expr.span, ty.clone());
        Ok(ty)
    }

    /// Resolve indexed access through a name. A map must be indexed --
    /// the index is checked against the domain when one is declared --
    /// and projects to its range type. Indexing any other type is an
    /// error.
    fn project_indexed(
        &mut self,
        name: &str,
        ty: Ty,
        index: Option<&Expr>,
    ) -> Result<Ty, TypeError> {
        if let TyKind::Map { to, from } = ty.kind() {
            let Some(index) = index else {
                return Err(TypeError::MissingIndex {
                    name: name.to_string(),
                });
            };
            let index_ty = self.check_expr(index)?;
            if let Some(from) = from {
                self.context.assert_equiv("index", from, &index_ty)?;
            }
            Ok((**to).clone())
        } else if index.is_some() {
            Err(TypeError::NotAMap {
                name: name.to_string(),
            })
        } else {
            Ok(ty)
        }
    }

    /// Evaluate a type expression into a type.
    fn check_type_expr(&mut self, type_expr: &TypeExpr) -> Result<Ty, TypeError> {
        let ty = match &type_expr.kind {
            TypeExprKind::Primitive(kind) => match kind {
                PrimitiveKind::Void => Ty::void(),
                PrimitiveKind::Bool => Ty::bool(),
                PrimitiveKind::Int => Ty::int(),
                PrimitiveKind::Rat => Ty::rat(),
                PrimitiveKind::String => Ty::string(),
                PrimitiveKind::Ref => Ty::ref_(),
            },
            TypeExprKind::Map { to, from } => {
                let to_ty = self.check_type_expr(to)?;
                let from_ty = match from {
                    Some(from) => Some(self.check_type_expr(from)?),
                    None => None,
                };
                Ty::map(to_ty, from_ty)
            }
            TypeExprKind::Proc { args, ret } => {
                let mut arg_types = Vec::new();
                for arg in args {
                    arg_types.push(self.check_type_expr(arg)?);
                }
                let ret_ty = self.check_type_expr(ret)?;
                Ty::proc(arg_types, ret_ty)
            }
            TypeExprKind::Qualified { qual, inner } => {
                if !self.context.is_qualifier(qual) {
                    return Err(TypeError::UnknownQualifier { name: qual.clone() });
                }
                let inner_ty = self.check_type_expr(inner)?;
                inner_ty.qualify(qual)
            }
            TypeExprKind::Var(name) => Ty::var(name.clone()),
        };
        self.types.insert(type_expr.span, ty.clone());
        Ok(ty)
    }
}

impl Default for Checker {
    fn default() -> Self {
        Self::new()
    }
}
