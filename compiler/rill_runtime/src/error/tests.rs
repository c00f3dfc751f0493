use super::*;
use pretty_assertions::assert_eq;
use rill_ir::StringInterner;

#[test]
fn display_headline() {
    let err = Error::type_error("bad operand");
    assert_eq!(err.to_string(), "[Type error] bad operand");
}

#[test]
fn user_errors_have_short_label() {
    assert_eq!(Error::user("boom").to_string(), "[Error] boom");
}

#[test]
fn display_with_line_but_no_trace() {
    let err = Error::syntax("oops").with_line(3).with_file("a.rill");
    assert_eq!(err.to_string(), "[Syntax error] oops\n\tat a.rill:3");
}

#[test]
fn display_with_trace() {
    let mut err = Error::math_error("division by zero").with_line(2);
    err.backtrace = Some(Backtrace::new(vec![
        TraceFrame {
            name: "f".into(),
            file: "t.rill".into(),
            line: 2,
        },
        TraceFrame {
            name: "<main>".into(),
            file: "t.rill".into(),
            line: 5,
        },
    ]));
    assert_eq!(
        err.to_string(),
        "[Math error] division by zero\n\tat f (t.rill:2)\n\tat <main> (t.rill:5)"
    );
}

#[test]
fn fatal_errors() {
    assert!(Error::stack_underflow().is_fatal());
    assert!(Error::stack_overflow().is_fatal());
    assert!(!Error::user("x").is_fatal());
    assert!(!Error::exit(1).is_fatal());
}

#[test]
fn exit_carries_status() {
    let err = Error::exit(3);
    assert!(err.is_exit());
    assert_eq!(err.status, 3);
}

#[test]
fn parse_errors_become_syntax_errors() {
    let interner = StringInterner::new();
    let parse_err = rill_parse::parse_string("if x then", &interner).unwrap_err();
    let err = Error::from(parse_err);
    assert_eq!(err.category, Category::Syntax);
    assert_eq!(err.line, Some(1));
    assert!(!err.notes.is_empty());
}
