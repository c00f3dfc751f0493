#![allow(clippy::unwrap_used, reason = "Tests use unwrap for brevity")]

use super::*;
use pretty_assertions::assert_eq;
use rill_ir::{BinaryOp, CompoundOp, Expr, ExprKind, LogicalOp, Name, Stmt, StmtKind, UnaryOp};

fn parse(source: &str) -> Module {
    let interner = StringInterner::new();
    parse_string(source, &interner).unwrap()
}

fn parse_err(source: &str) -> ParseError {
    let interner = StringInterner::new();
    parse_string(source, &interner).unwrap_err()
}

fn stmts(source: &str) -> Vec<Stmt> {
    parse(source).body.stmts
}

/// The expression of a single expression statement.
fn expr(source: &str) -> Expr {
    let mut body = stmts(source);
    assert_eq!(body.len(), 1);
    match body.remove(0).kind {
        StmtKind::Expr(e) => e,
        other => panic!("expected expression statement, got {other:?}"),
    }
}

fn ident_name(e: &Expr) -> &str {
    match &e.kind {
        ExprKind::Ident(name) => name.as_str(),
        other => panic!("expected identifier, got {other:?}"),
    }
}

// === Module structure ===

#[test]
fn empty_source() {
    let module = parse("\n\n;\n");
    assert!(module.body.stmts.is_empty());
    assert_eq!(module.options.debug, None);
}

#[test]
fn debug_option() {
    assert_eq!(parse("option debug\nprint 1").options.debug, Some(true));
    assert_eq!(parse("option debug = false").options.debug, Some(false));
}

#[test]
fn invalid_option() {
    let err = parse_err("option verbose");
    assert!(err.to_string().contains("invalid option"));
}

#[test]
fn statements_need_separators() {
    assert_eq!(stmts("x = 1; y = 2\nz = 3").len(), 3);
    let err = parse_err("x = 1 y = 2");
    assert!(matches!(err.kind, ParseErrorKind::Expected { .. }));
}

#[test]
fn statement_lines() {
    let body = stmts("x = 1\n\n# comment\ny = 2");
    assert_eq!(body[0].line, 1);
    assert_eq!(body[1].line, 4);
}

// === Precedence ===

#[test]
fn multiplication_binds_tighter() {
    let e = expr("f(1 + 2 * 3)");
    let ExprKind::Call { args, .. } = e.kind else {
        panic!("expected call");
    };
    let ExprKind::Binary { op, right, .. } = &args[0].kind else {
        panic!("expected binary");
    };
    assert_eq!(*op, BinaryOp::Add);
    assert!(matches!(right.kind, ExprKind::Binary { op: BinaryOp::Mul, .. }));
}

#[test]
fn power_is_left_associative() {
    let Expr { kind, .. } = expr("(2 ^ 3 ^ 2)");
    let ExprKind::Binary { op, left, right } = kind else {
        panic!("expected binary");
    };
    assert_eq!(op, BinaryOp::Pow);
    assert!(matches!(left.kind, ExprKind::Binary { op: BinaryOp::Pow, .. }));
    assert_eq!(right.kind, ExprKind::Int(2));
}

#[test]
fn negative_literals_are_folded() {
    assert_eq!(expr("(-5)").kind, ExprKind::Int(-5));
    assert_eq!(expr("(-2.5)").kind, ExprKind::Float(-2.5));
    assert_eq!(expr("(-9223372036854775808)").kind, ExprKind::Int(i64::MIN));
    assert!(matches!(
        expr("(-x)").kind,
        ExprKind::Unary { op: UnaryOp::Neg, .. }
    ));
}

#[test]
fn minus_applies_after_power() {
    let e = expr("(-2 ^ 2)");
    let ExprKind::Unary { op, operand } = e.kind else {
        panic!("expected unary");
    };
    assert_eq!(op, UnaryOp::Neg);
    assert!(matches!(operand.kind, ExprKind::Binary { op: BinaryOp::Pow, .. }));
}

#[test]
fn integer_too_large() {
    let err = parse_err("x = 9223372036854775808");
    assert!(err.to_string().contains("too large"));
}

#[test]
fn logical_operators_nest_right() {
    let e = expr("(a or b and not c)");
    let ExprKind::Logical { op, left, right } = e.kind else {
        panic!("expected logical");
    };
    assert_eq!(op, LogicalOp::Or);
    assert_eq!(ident_name(&left), "a");
    let ExprKind::Logical { op, right, .. } = &right.kind else {
        panic!("expected logical");
    };
    assert_eq!(*op, LogicalOp::And);
    assert!(matches!(right.kind, ExprKind::Unary { op: UnaryOp::Not, .. }));
}

#[test]
fn comparisons_do_not_chain() {
    let err = parse_err("x = a < b < c");
    assert!(err.to_string().contains("chained"));
}

#[test]
fn concat_is_flattened() {
    let e = expr("(a & b & \"c\")");
    let ExprKind::Concat(parts) = e.kind else {
        panic!("expected concat");
    };
    assert_eq!(parts.len(), 3);
}

#[test]
fn conditional_expression() {
    let e = expr("(1 if ok else 2)");
    let ExprKind::Conditional { cond, then_expr, else_expr } = e.kind else {
        panic!("expected conditional");
    };
    assert_eq!(ident_name(&cond), "ok");
    assert_eq!(then_expr.kind, ExprKind::Int(1));
    assert_eq!(else_expr.kind, ExprKind::Int(2));
}

#[test]
fn postfix_chain() {
    let e = expr("a.b[1, 2](x)");
    let ExprKind::Call { callee, args } = e.kind else {
        panic!("expected call");
    };
    assert_eq!(args.len(), 1);
    let ExprKind::Index { object, indices } = callee.kind else {
        panic!("expected index");
    };
    assert_eq!(indices.len(), 2);
    assert!(matches!(object.kind, ExprKind::Field { .. }));
}

// === Literals ===

#[test]
fn list_literal_spans_lines() {
    let e = expr("f([1,\n 2,\n 3,\n])");
    let ExprKind::Call { args, .. } = e.kind else {
        panic!("expected call");
    };
    let ExprKind::List(items) = &args[0].kind else {
        panic!("expected list");
    };
    assert_eq!(items.len(), 3);
}

#[test]
fn array_literal_shape() {
    let e = expr("(@[1, 2, 3; 4, 5, 6])");
    let ExprKind::Array { items, rows, cols } = e.kind else {
        panic!("expected array");
    };
    assert_eq!((items.len(), rows, cols), (6, 2, 3));
}

#[test]
fn array_rows_must_match() {
    let err = parse_err("x = @[1, 2; 3]");
    assert!(err.to_string().contains("inconsistent"));
}

#[test]
fn braces_make_tables_and_sets() {
    assert!(matches!(expr("({})").kind, ExprKind::Table(ref e) if e.is_empty()));
    assert!(matches!(expr("({\"a\": 1, \"b\": 2})").kind, ExprKind::Table(ref e) if e.len() == 2));
    assert!(matches!(expr("({1, 2, 3})").kind, ExprKind::Set(ref e) if e.len() == 3));
    assert!(matches!(expr("({1})").kind, ExprKind::Set(ref e) if e.len() == 1));
}

#[test]
fn function_literal() {
    let e = expr("(function(x, ref y) return x end)");
    let ExprKind::Function(def) = e.kind else {
        panic!("expected function");
    };
    assert_eq!(def.name, None);
    assert_eq!(def.params.len(), 2);
    assert!(!def.params[0].by_ref);
    assert!(def.params[1].by_ref);
}

// === Statements ===

#[test]
fn local_declarations() {
    let body = stmts("local a, b = 1, 2\nlocal c");
    let StmtKind::Local { names, values } = &body[0].kind else {
        panic!("expected local");
    };
    assert_eq!(names.len(), 2);
    assert_eq!(values.len(), 2);
    let StmtKind::Local { values, .. } = &body[1].kind else {
        panic!("expected local");
    };
    assert!(values.is_empty());
}

#[test]
fn local_declaration_count_mismatch() {
    let err = parse_err("local a, b = 1");
    assert!(err.to_string().contains("invalid declaration"));
}

#[test]
fn compound_assignment() {
    let body = stmts("x &= \"s\"\nt[1] += 2");
    assert!(matches!(
        body[0].kind,
        StmtKind::Assign { op: Some(CompoundOp::Concat), .. }
    ));
    assert!(matches!(
        body[1].kind,
        StmtKind::Assign {
            op: Some(CompoundOp::Arith(BinaryOp::Add)),
            ..
        }
    ));
}

#[test]
fn assignment_target_must_be_a_place() {
    let err = parse_err("f() = 1");
    assert!(err.to_string().contains("cannot assign"));
}

#[test]
fn print_trailing_comma() {
    let body = stmts("print 1, 2,\nprint\nprint 3");
    assert!(matches!(&body[0].kind, StmtKind::Print { args, newline: false } if args.len() == 2));
    assert!(matches!(&body[1].kind, StmtKind::Print { args, newline: true } if args.is_empty()));
    assert!(matches!(&body[2].kind, StmtKind::Print { newline: true, .. }));
}

#[test]
fn if_elsif_else() {
    let body = stmts("if a then\n x = 1\nelsif b then x = 2\nelse\n x = 3\nend");
    let StmtKind::If { branches, else_block } = &body[0].kind else {
        panic!("expected if");
    };
    assert_eq!(branches.len(), 2);
    assert_eq!(else_block.as_ref().map(|b| b.stmts.len()), Some(1));
}

#[test]
fn missing_end() {
    let err = parse_err("while x do\n x = x - 1\n");
    assert!(err.to_string().contains("\"end\""));
    assert!(err.hint().is_some());
}

#[test]
fn loops() {
    let body = stmts(
        "for i = 10 downto 1 step 2 do pass end\n\
         repeat x += 1 until x > 3\n\
         foreach k, ref v in t do v = k end\n\
         foreach x in ref items do end",
    );
    assert!(matches!(
        &body[0].kind,
        StmtKind::For { descending: true, step: Some(_), .. }
    ));
    assert!(matches!(&body[1].kind, StmtKind::Repeat { .. }));
    assert!(matches!(
        &body[2].kind,
        StmtKind::Foreach { key: Some(_), by_ref: true, .. }
    ));
    let StmtKind::Foreach { key, collection, .. } = &body[3].kind else {
        panic!("expected foreach");
    };
    assert!(key.is_none());
    assert_eq!(ident_name(collection), "items");
}

#[test]
fn foreach_key_cannot_be_ref() {
    let err = parse_err("foreach ref k, v in t do end");
    assert!(err.to_string().contains("key"));
}

#[test]
fn function_declarations() {
    let body = stmts("function f(a as Integer, b)\n return a\nend\nlocal function g() end");
    let StmtKind::Function { def, local: false } = &body[0].kind else {
        panic!("expected global function");
    };
    assert_eq!(def.name.as_ref().map(Name::as_str), Some("f"));
    assert!(def.params[0].ty.is_some());
    assert!(matches!(&body[1].kind, StmtKind::Function { local: true, .. }));
}

#[test]
fn duplicate_parameter() {
    let err = parse_err("function f(a, a) end");
    assert!(err.to_string().contains("duplicate parameter"));
}

#[test]
fn debug_statement_forms() {
    let body = stmts("debug print 1\ndebug\n print 2\n print 3\nend");
    let StmtKind::Debug(single) = &body[0].kind else {
        panic!("expected debug");
    };
    assert_eq!(single.stmts.len(), 1);
    let StmtKind::Debug(block) = &body[1].kind else {
        panic!("expected debug");
    };
    assert_eq!(block.stmts.len(), 2);
}

#[test]
fn return_forms() {
    let body = stmts("function f() return end\nfunction g() return 1 end");
    let StmtKind::Function { def, .. } = &body[0].kind else {
        panic!("expected function");
    };
    assert!(matches!(def.body.stmts[0].kind, StmtKind::Return(None)));
    let StmtKind::Function { def, .. } = &body[1].kind else {
        panic!("expected function");
    };
    assert!(matches!(def.body.stmts[0].kind, StmtKind::Return(Some(_))));
}

#[test]
fn stray_end_at_top_level() {
    let err = parse_err("x = 1\nend");
    assert!(matches!(err.kind, ParseErrorKind::Expected { .. }));
}

#[test]
fn lex_errors_propagate() {
    let err = parse_err("x = 'open");
    assert_eq!(
        err.kind,
        ParseErrorKind::Lex(rill_lexer::LexErrorKind::UnterminatedString)
    );
}

#[test]
fn missing_file() {
    let interner = StringInterner::new();
    let err = parse_file(Path::new("/nonexistent/script.rill"), &interner).unwrap_err();
    assert!(matches!(err.kind, ParseErrorKind::Io { .. }));
}

#[test]
fn deep_nesting_does_not_overflow() {
    let depth = 2000;
    let source = format!("x = {}1{}", "(".repeat(depth), ")".repeat(depth));
    assert_eq!(stmts(&source).len(), 1);
}
