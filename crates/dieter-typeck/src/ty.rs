//! Type representation for the Dieter type system.
//!
//! A [`Ty`] couples a structural kind with a qualifier set. Qualifiers are
//! module-introduced tags; they flow from providers to receptors during
//! unification under a subset rule, which makes unification directional.
//!
//! Type variables are single-write cells. Once a variable is bound its
//! binding never changes, and bindings always point at the top of the
//! chain they were unified against -- the chain is never compressed,
//! because qualifier collection must visit the qualifiers contributed by
//! every segment.

use std::cell::RefCell;
use std::fmt;
use std::rc::Rc;

use log::trace;

/// A type variable: a named, one-shot binding cell.
///
/// Rust's `Clone` on a `TyVar` (and on any `Ty` containing one) is the
/// aliasing copy: the binding cell is shared, so a binding established
/// through one copy is visible through all of them. A genuinely fresh
/// variable only comes from [`Ty::instantiate`].
#[derive(Debug, Clone)]
pub struct TyVar {
    name: String,
    binding: Rc<RefCell<Option<Ty>>>,
}

impl TyVar {
    fn new(name: impl Into<String>) -> Self {
        TyVar {
            name: name.into(),
            binding: Rc::new(RefCell::new(None)),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    fn is_bound(&self) -> bool {
        self.binding.borrow().is_some()
    }

    fn get(&self) -> Option<Ty> {
        self.binding.borrow().clone()
    }

    /// Bind this variable. Each variable is bound at most once.
    fn bind(&self, target: Ty) {
        trace!("binding ♥{} to {}", self.name, target);
        let mut slot = self.binding.borrow_mut();
        debug_assert!(slot.is_none(), "type variable ♥{} bound twice", self.name);
        *slot = Some(target);
    }
}

/// The structural kind of a type.
#[derive(Debug, Clone)]
pub enum TyKind {
    Void,
    Bool,
    Int,
    Rat,
    String,
    Ref,
    /// A map from an optional domain type to a range type. A map without
    /// a domain is open: any index type is accepted.
    Map {
        to: Box<Ty>,
        from: Option<Box<Ty>>,
    },
    /// A procedure type: argument types and a return type.
    Proc { args: Vec<Ty>, ret: Box<Ty> },
    /// A type variable.
    Var(TyVar),
}

/// A Dieter type: a structural kind plus a qualifier set.
///
/// The qualifier set is insertion-ordered and duplicate-free. Types are
/// immutable except for the binding cell inside a variable, which is
/// written at most once during unification.
#[derive(Debug, Clone)]
pub struct Ty {
    quals: Vec<String>,
    kind: TyKind,
}

impl Ty {
    fn new(kind: TyKind) -> Ty {
        Ty {
            quals: Vec::new(),
            kind,
        }
    }

    /// Create a `void` type.
    pub fn void() -> Ty {
        Ty::new(TyKind::Void)
    }

    /// Create a `bool` type.
    pub fn bool() -> Ty {
        Ty::new(TyKind::Bool)
    }

    /// Create an `int` type.
    pub fn int() -> Ty {
        Ty::new(TyKind::Int)
    }

    /// Create a `rat` type.
    pub fn rat() -> Ty {
        Ty::new(TyKind::Rat)
    }

    /// Create a `string` type.
    pub fn string() -> Ty {
        Ty::new(TyKind::String)
    }

    /// Create a `ref` type.
    pub fn ref_() -> Ty {
        Ty::new(TyKind::Ref)
    }

    /// Create a map type. `from` is the optional domain.
    pub fn map(to: Ty, from: Option<Ty>) -> Ty {
        Ty::new(TyKind::Map {
            to: Box::new(to),
            from: from.map(Box::new),
        })
    }

    /// Create a procedure type.
    pub fn proc(args: Vec<Ty>, ret: Ty) -> Ty {
        Ty::new(TyKind::Proc {
            args,
            ret: Box::new(ret),
        })
    }

    /// Create a fresh, unbound type variable.
    pub fn var(name: impl Into<String>) -> Ty {
        Ty::new(TyKind::Var(TyVar::new(name)))
    }

    pub fn kind(&self) -> &TyKind {
        &self.kind
    }

    /// The qualifiers written directly on this type, not chain-followed.
    pub fn local_qualifiers(&self) -> &[String] {
        &self.quals
    }

    /// Whether this type can be called.
    pub fn is_callable(&self) -> bool {
        matches!(self.kind, TyKind::Proc { .. })
    }

    /// Whether this type stands for a concrete type. Everything but an
    /// unbound variable does.
    pub fn is_bound(&self) -> bool {
        match &self.kind {
            TyKind::Var(v) => v.is_bound(),
            _ => true,
        }
    }

    /// Follow a variable's binding chain to its head: the first
    /// non-variable type, or the last (unbound) variable in the chain.
    /// Non-variable types are their own head.
    pub fn head(&self) -> Ty {
        match &self.kind {
            TyKind::Var(v) => match v.get() {
                Some(target) => target.head(),
                None => self.clone(),
            },
            _ => self.clone(),
        }
    }

    /// All qualifiers on this type. For a variable this collects the
    /// qualifiers contributed by every segment of the binding chain; for
    /// any other type it is just the local set.
    pub fn all_qualifiers(&self) -> Vec<String> {
        let mut quals = self.quals.clone();
        if let TyKind::Var(v) = &self.kind {
            let mut next = v.get();
            while let Some(target) = next {
                for q in &target.quals {
                    if !quals.contains(q) {
                        quals.push(q.clone());
                    }
                }
                next = match &target.kind {
                    TyKind::Var(v) => v.get(),
                    _ => None,
                };
            }
        }
        quals
    }

    /// Whether this type carries the given qualifier (chain-followed).
    pub fn has_qualifier(&self, qual: &str) -> bool {
        self.all_qualifiers().iter().any(|q| q == qual)
    }

    /// The qualifier rule for unification: a receptor can receive a
    /// provider iff the provider is at least as qualified as the receptor.
    pub fn can_receive(&self, provider: &Ty) -> bool {
        self.all_qualifiers()
            .iter()
            .all(|q| provider.has_qualifier(q))
    }

    /// Deep, fresh copy: every variable in the copy is a new unbound
    /// variable with the same name, carrying only the qualifiers written
    /// directly on it. Qualifiers reachable only through a binding do not
    /// travel, because the fresh variable has no binding yet.
    pub fn instantiate(&self) -> Ty {
        let kind = match &self.kind {
            TyKind::Map { to, from } => TyKind::Map {
                to: Box::new(to.instantiate()),
                from: from.as_ref().map(|f| Box::new(f.instantiate())),
            },
            TyKind::Proc { args, ret } => TyKind::Proc {
                args: args.iter().map(Ty::instantiate).collect(),
                ret: Box::new(ret.instantiate()),
            },
            TyKind::Var(v) => TyKind::Var(TyVar::new(v.name.clone())),
            primitive => primitive.clone(),
        };
        Ty {
            quals: self.quals.clone(),
            kind,
        }
    }

    /// A fresh copy of this type with the given qualifier added.
    /// Adding a qualifier the type already carries is a no-op.
    pub fn qualify(&self, qual: &str) -> Ty {
        let mut t = self.instantiate();
        if !t.quals.iter().any(|q| q == qual) {
            t.quals.push(qual.to_string());
        }
        t
    }

    /// A fresh copy of this type with the given qualifier removed.
    pub fn unqualify(&self, qual: &str) -> Ty {
        let mut t = self.instantiate();
        t.quals.retain(|q| q != qual);
        t
    }

    /// Whether this type is, or transitively binds to, the given variable.
    fn chains_to(&self, var: &TyVar) -> bool {
        match &self.kind {
            TyKind::Var(v) => {
                if Rc::ptr_eq(&v.binding, &var.binding) {
                    return true;
                }
                match v.get() {
                    Some(target) => target.chains_to(var),
                    None => false,
                }
            }
            _ => false,
        }
    }

    /// Directional unification: `self` is the receptor, the argument the
    /// provider. Returns whether the two types were made equivalent,
    /// binding type variables as a side effect on success.
    ///
    /// The qualifier dimension makes this non-commutative: the provider's
    /// qualifiers must be a superset of the receptor's. Bindings point at
    /// the top of the chain being unified against, so a later qualifier
    /// walk sees every segment.
    pub fn unify(&self, provider: &Ty) -> bool {
        trace!("unifying {} (receptor) with {} (provider)", self, provider);
        if !self.can_receive(provider) {
            trace!("receptor cannot receive provider: unification failed");
            return false;
        }

        // An unbound provider variable simply adopts the receptor. If the
        // receptor already chains to this variable the two are linked and
        // binding again would create a cycle.
        if let TyKind::Var(pv) = &provider.kind {
            if !pv.is_bound() {
                if !self.chains_to(pv) {
                    pv.bind(self.clone());
                }
                return true;
            }
        }

        let head = provider.head();
        match &self.kind {
            TyKind::Void => matches!(head.kind, TyKind::Void),
            TyKind::Bool => matches!(head.kind, TyKind::Bool),
            TyKind::Int => matches!(head.kind, TyKind::Int),
            TyKind::Rat => matches!(head.kind, TyKind::Rat),
            TyKind::String => matches!(head.kind, TyKind::String),
            TyKind::Ref => matches!(head.kind, TyKind::Ref),
            TyKind::Map { to, from } => {
                let TyKind::Map {
                    to: provider_to,
                    from: provider_from,
                } = &head.kind
                else {
                    return false;
                };
                if let Some(from) = from {
                    // a receptor domain demands a provider domain
                    match provider_from {
                        Some(provider_from) => {
                            if !from.unify(provider_from) {
                                return false;
                            }
                        }
                        None => return false,
                    }
                }
                to.unify(provider_to)
            }
            TyKind::Proc { args, ret } => {
                let TyKind::Proc {
                    args: provider_args,
                    ret: provider_ret,
                } = &head.kind
                else {
                    return false;
                };
                if args.len() != provider_args.len() {
                    return false;
                }
                for (arg, provider_arg) in args.iter().zip(provider_args) {
                    if !arg.unify(provider_arg) {
                        return false;
                    }
                }
                ret.unify(provider_ret)
            }
            TyKind::Var(rv) => {
                if !rv.is_bound() {
                    if !provider.chains_to(rv) {
                        rv.bind(provider.clone());
                    }
                    return true;
                }
                self.head().unify(&provider.head())
            }
        }
    }
}

impl fmt::Display for Ty {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for qual in &self.quals {
            write!(f, "{} ", qual)?;
        }
        match &self.kind {
            TyKind::Void => write!(f, "void"),
            TyKind::Bool => write!(f, "bool"),
            TyKind::Int => write!(f, "int"),
            TyKind::Rat => write!(f, "rat"),
            TyKind::String => write!(f, "string"),
            TyKind::Ref => write!(f, "ref"),
            TyKind::Map { to, from } => {
                write!(f, "map ")?;
                if let Some(from) = from {
                    write!(f, "from {} ", from)?;
                }
                write!(f, "to {}", to)
            }
            TyKind::Proc { args, ret } => {
                write!(f, "proc(")?;
                for (i, arg) in args.iter().enumerate() {
                    if i > 0 {
                        write!(f, ",")?;
                    }
                    write!(f, "{}", arg)?;
                }
                write!(f, "): {}", ret)
            }
            TyKind::Var(v) => write!(f, "♥{}", v.name),
        }
    }
}

// ── Tests ──────────────────────────────────────────────────────────────
