#![allow(clippy::unwrap_used, reason = "Tests use unwrap for brevity")]

use crate::bytecode::Opcode;
use crate::error::Category;
use crate::function::{Routine, UpvalueInfo};
use crate::{Runtime, RuntimeConfig};
use pretty_assertions::assert_eq;
use std::rc::Rc;

fn compile(source: &str) -> Rc<Routine> {
    Runtime::new().compile(source, "test.rill").unwrap()
}

fn compile_err(source: &str) -> crate::Error {
    Runtime::new().compile(source, "test.rill").unwrap_err()
}

fn has_op(routine: &Routine, pred: impl Fn(&Opcode) -> bool) -> bool {
    routine.code.ops().iter().any(pred)
}

#[test]
fn main_routine_is_named() {
    let routine = compile("return 1");
    assert_eq!(&*routine.name, "<main>");
    assert_eq!(&*routine.file, "test.rill");
    assert_eq!(routine.code.ops().first(), Some(&Opcode::NewFrame(0)));
    assert_eq!(routine.code.ops().last(), Some(&Opcode::Return));
}

#[test]
fn small_integers_are_inline() {
    let routine = compile("return 7 + 100000 + 100000");
    assert!(has_op(&routine, |op| *op == Opcode::PushSmallInt(7)));
    assert_eq!(routine.integers, vec![100_000]);
}

#[test]
fn string_constants_are_shared() {
    let routine = compile("local a = \"x\"\nlocal b = \"x\"\nlocal c = \"y\"");
    assert_eq!(routine.strings.len(), 2);
}

#[test]
fn locals_get_slots() {
    let routine = compile("local a, b = 1, 2\ndo local c = 3 end");
    let names: Vec<&str> = routine.locals.iter().map(|l| &*l.name).collect();
    assert_eq!(names, ["a", "b", "c"]);
    assert!(routine.locals[2].depth > routine.locals[0].depth);
}

#[test]
fn unknown_names_are_globals() {
    let routine = compile("x = y");
    assert!(has_op(&routine, |op| matches!(op, Opcode::GetGlobal(_))));
    assert!(has_op(&routine, |op| matches!(op, Opcode::SetGlobal(_))));
}

#[test]
fn functions_capture_upvalues() {
    let routine = compile(
        "local n = 0\nlocal function outer()\n return function() return n end\nend",
    );
    let outer = &routine.routines[0];
    assert_eq!(&*outer.name, "outer");
    assert_eq!(outer.upvalues, vec![UpvalueInfo { index: 0, is_local: true }]);

    let inner = &outer.routines[0];
    assert_eq!(inner.upvalues, vec![UpvalueInfo { index: 0, is_local: false }]);
    assert!(has_op(inner, |op| *op == Opcode::GetUpvalue(0)));
}

#[test]
fn parameters_record_reference_flags() {
    let routine = compile("function f(a, ref b, c) end");
    let f = &routine.routines[0];
    assert_eq!(f.param_count, 3);
    assert_eq!(f.ref_flags, 0b10);
    assert!(has_op(&routine, |op| matches!(op, Opcode::NewClosure { params: 3, .. })));
    assert!(has_op(&routine, |op| matches!(op, Opcode::DefineGlobalFunction(_))));
}

#[test]
fn debug_blocks_are_dropped_outside_debug_mode() {
    let is_print = |op: &Opcode| matches!(op, Opcode::Print(_) | Opcode::PrintLine(_));
    assert!(!has_op(&compile("debug print 1"), is_print));

    let debug = Runtime::with_config(RuntimeConfig::default().with_debug(true));
    assert!(has_op(&debug.compile("debug print 1", "t").unwrap(), is_print));
    assert!(!has_op(&debug.compile("option debug = false\ndebug print 1", "t").unwrap(), is_print));
}

#[test]
fn lines_are_recorded() {
    let routine = compile("local a = 1\n\nlocal b = a + 1");
    let add = routine.code.ops().iter().position(|op| *op == Opcode::Add).unwrap();
    assert_eq!(routine.code.line_at(add), 3);
}

#[test]
fn loop_control_outside_loops() {
    assert_eq!(compile_err("break").category, Category::Syntax);
    assert_eq!(compile_err("continue").category, Category::Syntax);
}

#[test]
fn duplicate_locals_in_one_scope() {
    let err = compile_err("local a = 1\nlocal a = 2");
    assert_eq!(err.category, Category::Name);
    assert_eq!(err.line, Some(2));
    // Shadowing in an inner scope is allowed.
    compile("local a = 1\ndo local a = 2 end");
}

#[test]
fn mismatched_declaration() {
    let err = compile_err("local a, b = 1, 2, 3");
    assert_eq!(err.category, Category::Syntax);
}

#[test]
fn reference_to_a_literal_is_rejected() {
    let err = compile_err("function f(ref x) end\nlocal r = ref 1");
    assert_eq!(err.category, Category::Syntax);
}
