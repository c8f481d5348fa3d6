use cnx_parser::ast::*;
use cnx_parser::parse;
use rustc_hash::FxHashSet;

fn parse_ok(source: &str) -> SourceUnit {
    let result = parse(source, "test.cnx", &FxHashSet::default());
    assert!(
        result.diagnostics.is_empty(),
        "diagnostics: {:?}",
        result.diagnostics
    );
    result.unit.expect("expected a parsed unit")
}

fn parse_err(source: &str) -> Vec<cnx_common::Diagnostic> {
    let result = parse(source, "test.cnx", &FxHashSet::default());
    assert!(result.unit.is_none(), "expected a parse failure");
    result.diagnostics
}

#[test]
fn parses_variable_with_initializer() {
    let unit = parse_ok("u8 speed <- 100;");
    assert_eq!(unit.items.len(), 1);
    match &unit.items[0] {
        Item::Variable(v) => {
            assert_eq!(v.name.name, "speed");
            assert_eq!(v.ty, TypeExpr::Primitive(Primitive::U8));
            assert!(matches!(v.init, Some(Expr::Int { value: 100, .. })));
        }
        other => panic!("expected variable, got {other:?}"),
    }
}

#[test]
fn parses_qualifiers() {
    let unit = parse_ok("export const u32 LIMIT <- 1000;");
    match &unit.items[0] {
        Item::Variable(v) => {
            assert!(v.quals.is_const);
            assert!(v.quals.is_exported);
        }
        other => panic!("expected variable, got {other:?}"),
    }
}

#[test]
fn clamp_and_wrap_modes() {
    let unit = parse_ok("clamp u8 a <- 0;\nwrap u8 b <- 0;\nu8 c <- 0;");
    let modes: Vec<Option<OverflowMode>> = unit
        .items
        .iter()
        .map(|item| match item {
            Item::Variable(v) => v.quals.overflow,
            _ => panic!("expected variables"),
        })
        .collect();
    assert_eq!(
        modes,
        vec![Some(OverflowMode::Clamp), Some(OverflowMode::Wrap), None]
    );
}

#[test]
fn parses_function_with_params() {
    let unit = parse_ok("void setSpeed(u8 speed, const u8 data[]) { }");
    match &unit.items[0] {
        Item::Function(f) => {
            assert_eq!(f.name.name, "setSpeed");
            assert!(f.return_type.is_void());
            assert_eq!(f.params.len(), 2);
            assert!(!f.params[0].is_array);
            assert!(f.params[1].is_array);
            assert!(f.params[1].is_const);
        }
        other => panic!("expected function, got {other:?}"),
    }
}

#[test]
fn parses_scope_nesting() {
    let unit = parse_ok("scope Motor { scope Inner { u8 x; } void run() { } }");
    match &unit.items[0] {
        Item::Scope(s) => {
            assert_eq!(s.name.name, "Motor");
            assert_eq!(s.items.len(), 2);
            assert!(matches!(&s.items[0], Item::Scope(inner) if inner.name.name == "Inner"));
        }
        other => panic!("expected scope, got {other:?}"),
    }
}

#[test]
fn parses_struct_enum_bitmap_register() {
    let unit = parse_ok(
        "struct SPoint { u8 x; u8 y; }\n\
         enum EColor { RED, GREEN <- 5, BLUE }\n\
         bitmap8 BFlags { ready: 1; mode: 3; rest: 4; }\n\
         register GPIO7 @ 0x42004000 { DR: u32 rw @ 0x0; DR_SET: u32 wo @ 0x84; }",
    );
    assert_eq!(unit.items.len(), 4);
    match &unit.items[1] {
        Item::Enum(e) => {
            assert_eq!(e.members[1].value, Some(5));
            assert_eq!(e.members[2].value, None);
        }
        other => panic!("expected enum, got {other:?}"),
    }
    match &unit.items[3] {
        Item::Register(r) => {
            assert_eq!(r.base_address, 0x4200_4000);
            assert_eq!(r.members[1].access, cnx_common::Access::WriteOnly);
            assert_eq!(r.members[1].offset, 0x84);
        }
        other => panic!("expected register, got {other:?}"),
    }
}

#[test]
fn string_type_with_capacity() {
    let unit = parse_ok("string<31> name;");
    match &unit.items[0] {
        Item::Variable(v) => assert_eq!(v.ty, TypeExpr::String { capacity: 31 }),
        other => panic!("expected variable, got {other:?}"),
    }
}

#[test]
fn equality_is_equals_sign() {
    let unit = parse_ok("void f(u8 a, u8 b) { if (a = b) { } }");
    match &unit.items[0] {
        Item::Function(f) => match &f.body.stmts[0] {
            Stmt::If(s) => {
                assert!(matches!(
                    &s.cond,
                    Expr::Binary {
                        op: BinaryOp::Eq,
                        ..
                    }
                ));
            }
            other => panic!("expected if, got {other:?}"),
        },
        other => panic!("expected function, got {other:?}"),
    }
}

#[test]
fn compound_assignment_operators() {
    let unit = parse_ok("void f() { u8 x <- 0; x +<- 1; x <<<- 2; }");
    match &unit.items[0] {
        Item::Function(f) => {
            assert!(matches!(
                &f.body.stmts[1],
                Stmt::Assign(AssignStmt {
                    op: AssignOp::Add,
                    ..
                })
            ));
            assert!(matches!(
                &f.body.stmts[2],
                Stmt::Assign(AssignStmt {
                    op: AssignOp::Shl,
                    ..
                })
            ));
        }
        other => panic!("expected function, got {other:?}"),
    }
}

#[test]
fn switch_with_multi_value_case_and_counted_default() {
    let unit = parse_ok(
        "void f(u8 s) { switch (s) { case 1 || 2 { } case 3 { } default(1) { } } }",
    );
    match &unit.items[0] {
        Item::Function(f) => match &f.body.stmts[0] {
            Stmt::Switch(s) => {
                assert_eq!(s.arms.len(), 2);
                assert_eq!(s.arms[0].values.len(), 2);
                assert_eq!(s.default.as_ref().unwrap().allowed_missing, Some(1));
            }
            other => panic!("expected switch, got {other:?}"),
        },
        other => panic!("expected function, got {other:?}"),
    }
}

#[test]
fn case_without_block_is_rejected() {
    let diags = parse_err("void f(u8 s) { switch (s) { case 1: } }");
    assert_eq!(
        diags[0].code,
        cnx_common::diagnostics::diagnostic_codes::SWITCH_CASE_NEEDS_BLOCK
    );
}

#[test]
fn slice_and_index_expressions() {
    let unit = parse_ok("void f(u8 buf[]) { u8 a <- buf[0]; u32 big <- 0; u8 b <- big[0, 8]; }");
    match &unit.items[0] {
        Item::Function(f) => {
            match &f.body.stmts[0] {
                Stmt::Var(v) => assert!(matches!(v.init, Some(Expr::Index { .. }))),
                other => panic!("expected var, got {other:?}"),
            }
            match &f.body.stmts[2] {
                Stmt::Var(v) => assert!(matches!(v.init, Some(Expr::Slice { .. }))),
                other => panic!("expected var, got {other:?}"),
            }
        }
        other => panic!("expected function, got {other:?}"),
    }
}

#[test]
fn scoped_call_parses_as_field_call() {
    let unit = parse_ok("void f() { LED.on(); }");
    match &unit.items[0] {
        Item::Function(func) => match &func.body.stmts[0] {
            Stmt::Expr(e) => match &e.expr {
                Expr::Call { callee, .. } => {
                    assert_eq!(
                        callee.as_path(),
                        Some(vec!["LED", "on"])
                    );
                }
                other => panic!("expected call, got {other:?}"),
            },
            other => panic!("expected expr stmt, got {other:?}"),
        },
        other => panic!("expected function, got {other:?}"),
    }
}

#[test]
fn includes_keep_literal_text() {
    let unit = parse_ok("#include \"motor.cnx\"\n#include <Arduino.h>\nu8 x;");
    assert_eq!(unit.includes.len(), 2);
    assert_eq!(unit.includes[0].literal, "#include \"motor.cnx\"");
    assert_eq!(unit.includes[0].path, "motor.cnx");
    assert!(!unit.includes[0].system);
    assert!(unit.includes[1].system);
}

#[test]
fn pragma_target_is_recorded() {
    let unit = parse_ok("#pragma target cortex-m7\nu8 x;");
    assert_eq!(unit.pragma_target.as_deref(), Some("cortex-m7"));
}

#[test]
fn ifdef_skips_dead_branch() {
    let unit = parse_ok("#ifdef FEATURE\nu8 dead;\n#endif\nu8 live;");
    assert_eq!(unit.items.len(), 1);
    match &unit.items[0] {
        Item::Variable(v) => assert_eq!(v.name.name, "live"),
        other => panic!("expected variable, got {other:?}"),
    }
}

#[test]
fn ifdef_with_seed_define_keeps_branch() {
    let mut defines = FxHashSet::default();
    defines.insert("FEATURE".to_string());
    let result = parse("#ifdef FEATURE\nu8 kept;\n#endif\n", "t.cnx", &defines);
    let unit = result.unit.expect("parse");
    assert_eq!(unit.items.len(), 1);
}

#[test]
fn else_branch_of_dead_ifdef_is_live() {
    let unit = parse_ok("#ifdef MISSING\nu8 dead;\n#else\nu8 live;\n#endif\n");
    assert_eq!(unit.items.len(), 1);
    match &unit.items[0] {
        Item::Variable(v) => assert_eq!(v.name.name, "live"),
        other => panic!("expected variable, got {other:?}"),
    }
}

#[test]
fn goto_parses_for_later_rejection() {
    let unit = parse_ok("void f() { goto done; }");
    match &unit.items[0] {
        Item::Function(func) => {
            assert!(matches!(&func.body.stmts[0], Stmt::Goto(_)));
        }
        other => panic!("expected function, got {other:?}"),
    }
}

#[test]
fn for_loop_shape() {
    let unit = parse_ok("void f() { for (u8 i <- 0; i < 10; i +<- 1) { } }");
    match &unit.items[0] {
        Item::Function(func) => match &func.body.stmts[0] {
            Stmt::For(s) => {
                assert!(matches!(&*s.init, Stmt::Var(_)));
                assert_eq!(s.step.op, AssignOp::Add);
            }
            other => panic!("expected for, got {other:?}"),
        },
        other => panic!("expected function, got {other:?}"),
    }
}

#[test]
fn parse_error_aborts_file() {
    let diags = parse_err("u8 <- 5;");
    assert!(!diags.is_empty());
    assert_eq!(diags[0].line, 1);
}

#[test]
fn arrow_in_condition_has_its_own_diagnostic() {
    let diags = parse_err("void f(u8 a, u8 b) { if (a <- b) { } }");
    assert_eq!(
        diags[0].code,
        cnx_common::diagnostics::diagnostic_codes::ASSIGNMENT_IN_CONDITION
    );
}

#[test]
fn critical_block_statement() {
    let unit = parse_ok("void f() { critical { u8 x <- 0; } }");
    match &unit.items[0] {
        Item::Function(func) => {
            assert!(matches!(&func.body.stmts[0], Stmt::Critical(_)));
        }
        other => panic!("expected function, got {other:?}"),
    }
}
