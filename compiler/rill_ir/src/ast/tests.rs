use super::*;
use crate::{Name, Span};

fn ident(text: &str) -> Expr {
    Expr::new(ExprKind::Ident(Name::new(text)), 1, Span::DUMMY)
}

#[test]
fn places_are_identifiers_fields_and_indices() {
    let var = ident("x");
    let field = Expr::new(
        ExprKind::Field {
            object: Box::new(ident("t")),
            name: Name::new("length"),
        },
        1,
        Span::DUMMY,
    );
    let index = Expr::new(
        ExprKind::Index {
            object: Box::new(ident("l")),
            indices: vec![Expr::new(ExprKind::Int(1), 1, Span::DUMMY)],
        },
        1,
        Span::DUMMY,
    );
    let literal = Expr::new(ExprKind::Int(3), 1, Span::DUMMY);

    assert!(var.is_place());
    assert!(field.is_place());
    assert!(index.is_place());
    assert!(!literal.is_place());
}

#[test]
fn operator_symbols() {
    assert_eq!(BinaryOp::Compare.as_symbol(), "<=>");
    assert_eq!(BinaryOp::Pow.as_symbol(), "^");
    assert_eq!(BinaryOp::NotEq.as_symbol(), "!=");
}
