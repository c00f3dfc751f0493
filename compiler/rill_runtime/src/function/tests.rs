#![allow(clippy::unwrap_used, reason = "Tests use unwrap for brevity")]

use super::*;
use crate::error::Category;
use pretty_assertions::assert_eq;

fn native(tag: i64, signature: &[&Rc<Class>], ref_flags: RefFlags) -> Rc<Closure> {
    let callback: NativeCallback = Rc::new(move |_, _| Ok(Variant::Integer(tag)));
    let routine = NativeRoutine {
        name: Rc::from("f"),
        callback,
        signature: signature.iter().map(|c| Rc::clone(c)).collect(),
        ref_flags,
    };
    let signature = routine.signature.clone();
    Rc::new(Closure::new(
        Callable::Native(Rc::new(routine)),
        signature,
        Vec::new(),
    ))
}

fn tag_of(closure: &Closure) -> i64 {
    match &closure.callable {
        Callable::Native(n) => {
            let mut rt = Runtime::new();
            match (n.callback)(&mut rt, &mut []).unwrap() {
                Variant::Integer(i) => i,
                _ => unreachable!(),
            }
        }
        Callable::Routine(_) => unreachable!(),
    }
}

#[test]
fn closest_overload_wins() {
    let reg = ClassRegistry::new();
    let mut f = Function::new(Rc::from("f"));
    f.add_closure(native(1, &[&reg.object], 0)).unwrap();
    f.add_closure(native(2, &[&reg.number], 0)).unwrap();
    f.add_closure(native(3, &[&reg.integer], 0)).unwrap();

    let pick = |arg: Variant| tag_of(&f.find_closure(&reg, &[arg]).unwrap());
    assert_eq!(pick(Variant::Integer(1)), 3);
    assert_eq!(pick(Variant::Float(1.0)), 2);
    assert_eq!(pick(Variant::from("s")), 1);
}

#[test]
fn unrelated_argument_is_a_type_error() {
    let reg = ClassRegistry::new();
    let mut f = Function::new(Rc::from("f"));
    f.add_closure(native(1, &[&reg.list], 0)).unwrap();
    f.add_closure(native(2, &[&reg.table], 0)).unwrap();
    let err = f.find_closure(&reg, &[Variant::Integer(0)]).unwrap_err();
    assert_eq!(err.category, Category::Type);
    assert!(err.message.contains("(Integer)"));
    assert!(err.message.contains("f(List)"));
    assert!(err.message.contains("f(Table)"));
}

#[test]
fn arity_must_match() {
    let reg = ClassRegistry::new();
    let mut f = Function::new(Rc::from("f"));
    f.add_closure(native(1, &[&reg.object], 0)).unwrap();
    f.add_closure(native(2, &[&reg.object, &reg.object], 0)).unwrap();
    let two = f
        .find_closure(&reg, &[Variant::Integer(1), Variant::Integer(2)])
        .unwrap();
    assert_eq!(tag_of(&two), 2);
    assert!(f.find_closure(&reg, &[]).is_err());
}

#[test]
fn overloads_stay_sorted_by_arity() {
    let reg = ClassRegistry::new();
    let mut f = Function::new(Rc::from("f"));
    f.add_closure(native(3, &[&reg.object, &reg.object, &reg.object], 0)).unwrap();
    f.add_closure(native(1, &[&reg.object], 0)).unwrap();
    f.add_closure(native(2, &[&reg.object, &reg.object], 0)).unwrap();
    let arities: Vec<usize> = f.closures().iter().map(|c| c.arity()).collect();
    assert_eq!(arities, vec![1, 2, 3]);
    assert_eq!(f.max_argc(), 3);
}

#[test]
fn null_fits_any_class() {
    let reg = ClassRegistry::new();
    let mut f = Function::new(Rc::from("f"));
    f.add_closure(native(1, &[&reg.list], 0)).unwrap();
    let closure = f.find_closure(&reg, &[Variant::Null]).unwrap();
    assert_eq!(tag_of(&closure), 1);
}

#[test]
fn tie_is_reported_as_ambiguity() {
    let reg = ClassRegistry::new();
    let mut f = Function::new(Rc::from("f"));
    f.add_closure(native(1, &[&reg.integer, &reg.number], 0)).unwrap();
    f.add_closure(native(2, &[&reg.number, &reg.integer], 0)).unwrap();
    let err = f
        .find_closure(&reg, &[Variant::Integer(1), Variant::Integer(2)])
        .unwrap_err();
    assert!(err.message.starts_with("Cannot resolve ambiguity in call to function 'f'"));
    assert!(err.message.contains("f(Integer, Number)"));
    assert!(err.message.contains("f(Number, Integer)"));
}

#[test]
fn identical_signature_replaces() {
    let reg = ClassRegistry::new();
    let mut f = Function::new(Rc::from("f"));
    f.add_closure(native(1, &[&reg.number], 0)).unwrap();
    f.add_closure(native(2, &[&reg.number], 0)).unwrap();
    assert_eq!(f.closures().len(), 1);
    let closure = f.find_closure(&reg, &[Variant::Integer(1)]).unwrap();
    assert_eq!(tag_of(&closure), 2);
}

#[test]
fn reference_flags_must_agree() {
    let reg = ClassRegistry::new();
    let mut f = Function::new(Rc::from("f"));
    f.add_closure(native(1, &[&reg.integer], 0b1)).unwrap();
    let err = f.add_closure(native(2, &[&reg.float], 0)).unwrap_err();
    assert_eq!(err.category, Category::Reference);
    assert_eq!(
        err.message,
        "This overload of function \"f\" is not consistent with previous definitions: parameter 1 must be passed by reference"
    );
    // Positions beyond the known arity are free.
    f.add_closure(native(3, &[&reg.float, &reg.float], 0b01)).unwrap();
    assert_eq!(f.ref_flags(), 0b01);
}

#[test]
fn definition_marks_references() {
    let reg = ClassRegistry::new();
    let closure = native(0, &[&reg.list, &reg.object], 0b01);
    assert_eq!(closure.definition("append"), "append(ref List, Object)");
}

#[test]
fn by_value_natives_are_sorted_by_arity() {
    let reg = ClassRegistry::new();
    let two: NativeCallback = Rc::new(|_, _| Ok(Variant::Integer(2)));
    let zero: NativeCallback = Rc::new(|_, _| Ok(Variant::Integer(0)));
    let f = Function::native_by_value(
        "g",
        vec![
            (two, [Rc::clone(&reg.object), Rc::clone(&reg.object)].into_iter().collect()),
            (zero, Signature::new()),
        ],
    );
    assert_eq!(f.max_argc(), 2);
    assert_eq!(f.ref_flags(), 0);
    let arities: Vec<usize> = f.closures().iter().map(|c| c.arity()).collect();
    assert_eq!(arities, vec![0, 2]);
    assert_eq!(f.find_closure(&reg, &[]).unwrap().arity(), 0);
}
