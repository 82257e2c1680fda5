//! The typing context: a lexical scope chain doubling as the symbol table.
//!
//! A scope maps names to either a type or the qualifier marker. Scopes
//! form a stack: the bottom frame is the global scope, and entering a
//! module or procedure pushes a frame tagged with what it belongs to.
//! Lookups search from the innermost frame outward.

use log::debug;
use rustc_hash::FxHashMap;

use crate::error::TypeError;
use crate::ty::{Ty, TyKind};

/// What a name stands for in a scope.
#[derive(Debug, Clone)]
pub enum Binding {
    /// An ordinary typed name (variable, procedure, forward declaration).
    Ty(Ty),
    /// A type qualifier, registered by the module of the same name.
    Qualifier,
}

/// What a scope frame belongs to.
#[derive(Debug, Clone)]
enum ScopeKind {
    Global,
    Module {
        name: String,
    },
    /// A procedure frame carries the declared return type so `return`
    /// and `super` can read it directly.
    Procedure {
        return_ty: Ty,
    },
}

#[derive(Debug)]
struct Scope {
    kind: ScopeKind,
    names: FxHashMap<String, Binding>,
}

impl Scope {
    fn new(kind: ScopeKind) -> Self {
        Scope {
            kind,
            names: FxHashMap::default(),
        }
    }
}

/// The scope stack threaded through typechecking.
#[derive(Debug)]
pub struct TypingContext {
    /// Frame 0 is the global scope.
    scopes: Vec<Scope>,
}

impl TypingContext {
    /// Create a context holding only the global scope.
    pub fn new() -> Self {
        TypingContext {
            scopes: vec![Scope::new(ScopeKind::Global)],
        }
    }

    fn top(&mut self) -> &mut Scope {
        self.scopes
            .last_mut()
            .expect("scope stack must never be empty")
    }

    // ── Bindings ───────────────────────────────────────────────────────

    /// Associate a name with a type in the current scope. The name must
    /// not already be bound in this scope.
    pub fn associate(&mut self, name: &str, ty: Ty) -> Result<(), TypeError> {
        let scope = self.top();
        if scope.names.contains_key(name) {
            return Err(TypeError::AlreadyBound {
                name: name.to_string(),
                ty,
            });
        }
        debug!("associating {} with {}", name, ty);
        scope.names.insert(name.to_string(), Binding::Ty(ty));
        Ok(())
    }

    /// Associate a name with a type in the global scope, regardless of
    /// the current nesting. Procedure names live here.
    pub fn associate_global(&mut self, name: &str, ty: Ty) -> Result<(), TypeError> {
        let scope = &mut self.scopes[0];
        if scope.names.contains_key(name) {
            return Err(TypeError::AlreadyBound {
                name: name.to_string(),
                ty,
            });
        }
        debug!("associating {} with {} (global)", name, ty);
        scope.names.insert(name.to_string(), Binding::Ty(ty));
        Ok(())
    }

    /// Register a name as a type qualifier in the current scope.
    pub fn associate_qualifier(&mut self, name: &str) {
        debug!("registering {} as a type qualifier", name);
        self.top().names.insert(name.to_string(), Binding::Qualifier);
    }

    /// Look up the type bound to a name, searching innermost-out.
    pub fn get_type(&self, name: &str) -> Result<Ty, TypeError> {
        for scope in self.scopes.iter().rev() {
            match scope.names.get(name) {
                Some(Binding::Ty(ty)) => return Ok(ty.clone()),
                Some(Binding::Qualifier) => {
                    return Err(TypeError::QualifierInValuePosition {
                        name: name.to_string(),
                    })
                }
                None => {}
            }
        }
        Err(TypeError::NotFound {
            name: name.to_string(),
        })
    }

    /// Whether a name is registered as a qualifier, searching innermost-out.
    pub fn is_qualifier(&self, name: &str) -> bool {
        for scope in self.scopes.iter().rev() {
            if let Some(binding) = scope.names.get(name) {
                return matches!(binding, Binding::Qualifier);
            }
        }
        false
    }

    // ── Scope navigation ───────────────────────────────────────────────

    /// Enter a module scope.
    pub fn push_module(&mut self, name: &str) {
        self.scopes.push(Scope::new(ScopeKind::Module {
            name: name.to_string(),
        }));
    }

    /// Enter a procedure scope carrying the declared return type.
    pub fn push_procedure(&mut self, return_ty: Ty) {
        self.scopes
            .push(Scope::new(ScopeKind::Procedure { return_ty }));
    }

    /// Leave the current module or procedure scope.
    ///
    /// # Panics
    ///
    /// Panics if called when only the global scope remains.
    pub fn pop_scope(&mut self) {
        assert!(self.scopes.len() > 1, "cannot pop the global scope");
        self.scopes.pop();
    }

    /// Name of the nearest enclosing module, if any.
    pub fn module_name(&self) -> Option<&str> {
        self.scopes.iter().rev().find_map(|scope| match &scope.kind {
            ScopeKind::Module { name } => Some(name.as_str()),
            _ => None,
        })
    }

    /// Declared return type of the nearest enclosing procedure, if any.
    /// The returned type shares its binding cells with the procedure's
    /// type; it is deliberately not instantiated.
    pub fn procedure_return(&self) -> Option<Ty> {
        self.scopes.iter().rev().find_map(|scope| match &scope.kind {
            ScopeKind::Procedure { return_ty } => Some(return_ty.clone()),
            _ => None,
        })
    }

    // ── Checking helpers ───────────────────────────────────────────────

    /// Unify receptor with provider, or raise a typing error naming the
    /// construct the unification happened in.
    pub fn assert_equiv(
        &self,
        context_label: &str,
        receptor: &Ty,
        provider: &Ty,
    ) -> Result<(), TypeError> {
        if receptor.unify(provider) {
            Ok(())
        } else {
            Err(TypeError::NotCompatible {
                context_label: context_label.to_string(),
                receptor: receptor.clone(),
                provider: provider.clone(),
            })
        }
    }

    /// Check a call to the named procedure with the given argument types.
    ///
    /// The declared type is instantiated first, so every call site gets
    /// its own type variables to bind. A putative procedure type is built
    /// from the argument types around the instantiated return type, and
    /// the declared type (receptor) is unified against it (provider). On
    /// success the declared return type -- now possibly bound -- is
    /// returned.
    pub fn check_call(&self, name: &str, arg_types: Vec<Ty>) -> Result<Ty, TypeError> {
        let declared = self.get_type(name)?;
        if !declared.is_callable() {
            return Err(TypeError::NotCallable { ty: declared });
        }
        let declared = declared.instantiate();
        let TyKind::Proc { ret, .. } = declared.kind() else {
            return Err(TypeError::internal("callable type is not a procedure"));
        };
        let return_ty = (**ret).clone();

        let putative = Ty::proc(arg_types, return_ty.clone());
        debug!("checking call to {} of type {}", name, declared);
        debug!("putative type is {}", putative);

        if declared.unify(&putative) {
            Ok(return_ty)
        } else {
            Err(TypeError::CouldNotUnify {
                receptor: declared,
                provider: putative,
            })
        }
    }

    /// The global symbol table, rendered for the `-s` dump: sorted
    /// `(name, printed type)` pairs.
    pub fn global_symbols(&self) -> Vec<(String, String)> {
        let mut symbols: Vec<(String, String)> = self.scopes[0]
            .names
            .iter()
            .map(|(name, binding)| {
                let rendered = match binding {
                    Binding::Ty(ty) => ty.to_string(),
                    Binding::Qualifier => "qualifier".to_string(),
                };
                (name.clone(), rendered)
            })
            .collect();
        symbols.sort();
        symbols
    }
}

impl Default for TypingContext {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn associate_and_lookup() {
        let mut context = TypingContext::new();
        context.associate("x", Ty::int()).unwrap();
        assert_eq!(context.get_type("x").unwrap().to_string(), "int");
        assert!(matches!(
            context.get_type("y"),
            Err(TypeError::NotFound { .. })
        ));
    }

    #[test]
    fn duplicate_binding_in_same_scope_fails() {
        let mut context = TypingContext::new();
        context.associate("x", Ty::int()).unwrap();
        assert!(matches!(
            context.associate("x", Ty::string()),
            Err(TypeError::AlreadyBound { .. })
        ));
    }

    #[test]
    fn inner_scope_sees_outer_bindings() {
        let mut context = TypingContext::new();
        context.associate("x", Ty::int()).unwrap();
        context.push_module("m");
        assert!(context.get_type("x").is_ok());
        // shadowing in the inner scope is allowed
        context.associate("x", Ty::string()).unwrap();
        assert_eq!(context.get_type("x").unwrap().to_string(), "string");
        context.pop_scope();
        assert_eq!(context.get_type("x").unwrap().to_string(), "int");
    }

    #[test]
    fn qualifier_marker_is_not_a_value() {
        let mut context = TypingContext::new();
        context.associate_qualifier("secret");
        assert!(context.is_qualifier("secret"));
        assert!(matches!(
            context.get_type("secret"),
            Err(TypeError::QualifierInValuePosition { .. })
        ));
    }

    #[test]
    fn module_and_procedure_tags() {
        let mut context = TypingContext::new();
        assert!(context.module_name().is_none());
        context.push_module("m");
        context.push_procedure(Ty::int());
        assert_eq!(context.module_name(), Some("m"));
        assert_eq!(context.procedure_return().unwrap().to_string(), "int");
        context.pop_scope();
        assert!(context.procedure_return().is_none());
    }

    #[test]
    fn associate_global_reaches_past_inner_scopes() {
        let mut context = TypingContext::new();
        context.push_module("m");
        context.push_procedure(Ty::void());
        context.associate_global("f", Ty::proc(vec![], Ty::void())).unwrap();
        context.pop_scope();
        context.pop_scope();
        assert!(context.get_type("f").is_ok());
    }

    #[test]
    fn check_call_happy_path() {
        let mut context = TypingContext::new();
        context
            .associate("f", Ty::proc(vec![Ty::int()], Ty::string()))
            .unwrap();
        let ret = context.check_call("f", vec![Ty::int()]).unwrap();
        assert_eq!(ret.to_string(), "string");
    }

    #[test]
    fn check_call_rejects_non_procedure() {
        let mut context = TypingContext::new();
        context.associate("x", Ty::int()).unwrap();
        assert!(matches!(
            context.check_call("x", vec![]),
            Err(TypeError::NotCallable { .. })
        ));
    }

    #[test]
    fn check_call_rejects_wrong_arity() {
        let mut context = TypingContext::new();
        context
            .associate("f", Ty::proc(vec![Ty::int()], Ty::void()))
            .unwrap();
        assert!(matches!(
            context.check_call("f", vec![Ty::int(), Ty::int()]),
            Err(TypeError::CouldNotUnify { .. })
        ));
    }

    #[test]
    fn check_call_instantiates_per_call_site() {
        let mut context = TypingContext::new();
        let id_var = Ty::var("T");
        context
            .associate("id", Ty::proc(vec![id_var.clone()], id_var))
            .unwrap();
        // two calls at different types both succeed because each call
        // works on a fresh copy of the declared type
        assert!(context.check_call("id", vec![Ty::int()]).is_ok());
        assert!(context.check_call("id", vec![Ty::string()]).is_ok());
    }

    #[test]
    fn assert_equiv_reports_construct() {
        let context = TypingContext::new();
        let err = context
            .assert_equiv("if", &Ty::bool(), &Ty::int())
            .unwrap_err();
        assert_eq!(err.to_string(), "in if: bool not compatible with int");
    }
}
