//! Parser integration tests: grammar coverage and error recovery.

use dieter_parser::ast::{ExprKind, PrimitiveKind, Stmt, TypeExprKind};

fn parse_ok(source: &str) -> dieter_parser::Parse {
    let parse = dieter_parser::parse(source);
    assert!(
        parse.ok(),
        "expected clean parse of {source:?}, got errors: {:?}",
        parse.errors()
    );
    parse
}

// ── Top-level items ────────────────────────────────────────────────────

#[test]
fn parse_empty_program() {
    let parse = parse_ok("");
    assert!(parse.program().modules.is_empty());
    assert!(parse.program().forwards.is_empty());
    assert!(parse.program().orderings.is_empty());
}

#[test]
fn parse_empty_module() {
    let parse = parse_ok("module m end");
    let program = parse.program();
    assert_eq!(program.modules.len(), 1);
    assert_eq!(program.modules[0].name, "m");
    assert!(!program.modules[0].fails);
}

#[test]
fn parse_module_fails_flag() {
    let parse = parse_ok("module m fails end");
    assert!(parse.program().modules[0].fails);
}

#[test]
fn parse_ordering() {
    let parse = parse_ok("order a < b");
    let ordering = &parse.program().orderings[0];
    assert_eq!(ordering.before, "a");
    assert_eq!(ordering.after, "b");
}

#[test]
fn parse_forward_signature() {
    let parse = parse_ok("forward f(int, string) : bool");
    let fwd = &parse.program().forwards[0];
    assert_eq!(fwd.name, "f");
    match &fwd.type_expr.kind {
        TypeExprKind::Proc { args, ret } => {
            assert_eq!(args.len(), 2);
            assert!(matches!(
                args[0].kind,
                TypeExprKind::Primitive(PrimitiveKind::Int)
            ));
            assert!(matches!(
                ret.kind,
                TypeExprKind::Primitive(PrimitiveKind::Bool)
            ));
        }
        other => panic!("expected proc type expression, got {other:?}"),
    }
}

#[test]
fn parse_forward_no_args() {
    let parse = parse_ok("forward f() : void");
    match &parse.program().forwards[0].type_expr.kind {
        TypeExprKind::Proc { args, .. } => assert!(args.is_empty()),
        other => panic!("expected proc type expression, got {other:?}"),
    }
}

#[test]
fn parse_module_locals_and_procs() {
    let parse = parse_ok(
        "module m
           var x : int
           var s : string
           procedure f(a : int) : int return a
         end",
    );
    let module = &parse.program().modules[0];
    assert_eq!(module.locals.len(), 2);
    assert_eq!(module.locals[0].name, "x");
    assert_eq!(module.procs.len(), 1);
    let proc = &module.procs[0];
    assert_eq!(proc.name, "f");
    assert_eq!(proc.args.len(), 1);
    assert!(matches!(proc.body, Stmt::Return { .. }));
}

// ── Statements ─────────────────────────────────────────────────────────

#[test]
fn parse_compound_statement() {
    let parse = parse_ok(
        "module m procedure f() : void
           begin
             g()
             x := 1
           end
         end",
    );
    let body = &parse.program().modules[0].procs[0].body;
    match body {
        Stmt::Compound { steps, .. } => {
            assert_eq!(steps.len(), 2);
            assert!(matches!(steps[0], Stmt::Call { .. }));
            assert!(matches!(steps[1], Stmt::Assign { .. }));
        }
        other => panic!("expected compound statement, got {other:?}"),
    }
}

#[test]
fn parse_if_with_else() {
    let parse = parse_ok(
        "module m procedure f(c : bool) : void
           if c then g() else h()
         end",
    );
    match &parse.program().modules[0].procs[0].body {
        Stmt::If { else_branch, .. } => assert!(else_branch.is_some()),
        other => panic!("expected if statement, got {other:?}"),
    }
}

#[test]
fn parse_if_without_else() {
    let parse = parse_ok("module m procedure f(c : bool) : void if c then g() end");
    match &parse.program().modules[0].procs[0].body {
        Stmt::If { else_branch, .. } => assert!(else_branch.is_none()),
        other => panic!("expected if statement, got {other:?}"),
    }
}

#[test]
fn parse_while() {
    let parse = parse_ok("module m procedure f(c : bool) : void while c do g() end");
    assert!(matches!(
        parse.program().modules[0].procs[0].body,
        Stmt::While { .. }
    ));
}

#[test]
fn parse_return_final_is_inert() {
    let with_final = parse_ok("module m procedure f() : int return final 3 end");
    let without = parse_ok("module m procedure f() : int return 3 end");
    for parse in [&with_final, &without] {
        match &parse.program().modules[0].procs[0].body {
            Stmt::Return { expr, .. } => {
                assert!(matches!(expr.kind, ExprKind::IntConst(3)))
            }
            other => panic!("expected return statement, got {other:?}"),
        }
    }
}

#[test]
fn parse_indexed_assignment() {
    let parse = parse_ok(
        "module m var t : map from int to string
           procedure f() : void t[1] := \"x\"
         end",
    );
    match &parse.program().modules[0].procs[0].body {
        Stmt::Assign { name, index, .. } => {
            assert_eq!(name, "t");
            assert!(index.is_some());
        }
        other => panic!("expected assignment, got {other:?}"),
    }
}

// ── Expressions ────────────────────────────────────────────────────────

#[test]
fn parse_call_vs_var_ref() {
    let parse = parse_ok("module m procedure f(x : int) : int return g(x, 1)  end");
    match &parse.program().modules[0].procs[0].body {
        Stmt::Return { expr, .. } => match &expr.kind {
            ExprKind::Call { name, args } => {
                assert_eq!(name, "g");
                assert_eq!(args.len(), 2);
                assert!(matches!(args[0].kind, ExprKind::VarRef { .. }));
            }
            other => panic!("expected call expression, got {other:?}"),
        },
        other => panic!("expected return statement, got {other:?}"),
    }
}

#[test]
fn parse_indexed_var_ref() {
    let parse = parse_ok("module m procedure f() : string return t[1] end");
    match &parse.program().modules[0].procs[0].body {
        Stmt::Return { expr, .. } => match &expr.kind {
            ExprKind::VarRef { name, index } => {
                assert_eq!(name, "t");
                assert!(index.is_some());
            }
            other => panic!("expected indexed var ref, got {other:?}"),
        },
        other => panic!("expected return statement, got {other:?}"),
    }
}

#[test]
fn parse_parenthesized_expr() {
    let parse = parse_ok("module m procedure f() : int return (3) end");
    match &parse.program().modules[0].procs[0].body {
        Stmt::Return { expr, .. } => assert!(matches!(expr.kind, ExprKind::IntConst(3))),
        other => panic!("expected return statement, got {other:?}"),
    }
}

#[test]
fn parse_bestow_and_super() {
    let parse = parse_ok("module m procedure f() : int return bestow m super end");
    match &parse.program().modules[0].procs[0].body {
        Stmt::Return { expr, .. } => match &expr.kind {
            ExprKind::Bestow { qual, expr } => {
                assert_eq!(qual, "m");
                assert!(matches!(expr.kind, ExprKind::Super));
            }
            other => panic!("expected bestow expression, got {other:?}"),
        },
        other => panic!("expected return statement, got {other:?}"),
    }
}

#[test]
fn parse_string_constant_value() {
    let parse = parse_ok("module m procedure f() : string return \"hi there\" end");
    match &parse.program().modules[0].procs[0].body {
        Stmt::Return { expr, .. } => match &expr.kind {
            ExprKind::StringConst(s) => assert_eq!(s, "hi there"),
            other => panic!("expected string constant, got {other:?}"),
        },
        other => panic!("expected return statement, got {other:?}"),
    }
}

// ── Type expressions ───────────────────────────────────────────────────

#[test]
fn parse_qualifier_nesting_rightmost_outermost() {
    let parse = parse_ok("module m var x : a b int end");
    let te = &parse.program().modules[0].locals[0].type_expr;
    match &te.kind {
        TypeExprKind::Qualified { qual, inner } => {
            assert_eq!(qual, "b");
            match &inner.kind {
                TypeExprKind::Qualified { qual, inner } => {
                    assert_eq!(qual, "a");
                    assert!(matches!(
                        inner.kind,
                        TypeExprKind::Primitive(PrimitiveKind::Int)
                    ));
                }
                other => panic!("expected inner qualified type, got {other:?}"),
            }
        }
        other => panic!("expected qualified type, got {other:?}"),
    }
}

#[test]
fn parse_open_domain_map() {
    let parse = parse_ok("module m var t : map to string end");
    match &parse.program().modules[0].locals[0].type_expr.kind {
        TypeExprKind::Map { from, to } => {
            assert!(from.is_none());
            assert!(matches!(
                to.kind,
                TypeExprKind::Primitive(PrimitiveKind::String)
            ));
        }
        other => panic!("expected map type, got {other:?}"),
    }
}

#[test]
fn parse_map_with_domain() {
    let parse = parse_ok("module m var t : map from int to string end");
    match &parse.program().modules[0].locals[0].type_expr.kind {
        TypeExprKind::Map { from, .. } => assert!(from.is_some()),
        other => panic!("expected map type, got {other:?}"),
    }
}

#[test]
fn parse_type_variable() {
    let parse = parse_ok("forward id(♥T) : ♥T");
    match &parse.program().forwards[0].type_expr.kind {
        TypeExprKind::Proc { args, ret } => {
            match &args[0].kind {
                TypeExprKind::Var(name) => assert_eq!(name, "T"),
                other => panic!("expected type variable, got {other:?}"),
            }
            assert!(matches!(&ret.kind, TypeExprKind::Var(name) if name == "T"));
        }
        other => panic!("expected proc type expression, got {other:?}"),
    }
}

#[test]
fn parse_comments_are_skipped() {
    let parse = parse_ok("module m /* a module */ var x : int /* the var */ end");
    assert_eq!(parse.program().modules[0].locals.len(), 1);
}

// ── Error recovery ─────────────────────────────────────────────────────

#[test]
fn missing_end_reports_error() {
    let parse = dieter_parser::parse("module m");
    assert!(!parse.ok());
    assert!(parse.errors()[0].message.contains("expected `end`"));
    // the module itself is still in the tree
    assert_eq!(parse.program().modules.len(), 1);
}

#[test]
fn bad_type_expression_reports_error() {
    let parse = dieter_parser::parse("module m var x : := end");
    assert!(!parse.ok());
    assert!(parse
        .errors()
        .iter()
        .any(|e| e.message.contains("expected type expression")));
}

#[test]
fn trailing_garbage_reports_error() {
    let parse = dieter_parser::parse("module m end 42");
    assert!(!parse.ok());
    assert_eq!(parse.program().modules.len(), 1);
}

#[test]
fn recovery_continues_to_later_items() {
    let parse = dieter_parser::parse("module m var x : 99 end module n end");
    assert!(!parse.ok());
    // parsing recovered well enough to see both modules
    assert_eq!(parse.program().modules.len(), 2);
}
