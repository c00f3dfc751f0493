//! Behaviour an embedding host can rely on, exercised through the public
//! API only.

#![allow(clippy::unwrap_used, reason = "Tests use unwrap for brevity")]

use pretty_assertions::assert_eq;
use proptest::prelude::*;
use rill_runtime::{Capability, Category, Class, ObjectData, Runtime, RuntimeConfig, Table, Variant};
use std::rc::Rc;

/// A host class whose instances are empty tables, constructible with `Name()`.
fn plain_class(rt: &mut Runtime, name: &str) -> Rc<Class> {
    let object = Rc::clone(&rt.classes().object);
    let class = rt.create_class(name, &object, Capability::ATOMIC);
    let instance_class = Rc::clone(&class);
    rt.add_initializer(
        &class,
        move |rt, _| {
            let handle = rt.new_object(&instance_class, ObjectData::Table(Table::default()));
            Ok(Variant::Object(handle))
        },
        &[],
        0,
    )
    .unwrap();
    class
}

#[test]
fn dispatch_selects_the_matching_class() {
    let mut rt = Runtime::new();
    let a = plain_class(&mut rt, "A");
    let b = plain_class(&mut rt, "B");
    plain_class(&mut rt, "C");
    rt.add_global_function("f", |_, _| Ok(Variant::from("A")), &[a], 0).unwrap();
    rt.add_global_function("f", |_, _| Ok(Variant::from("B")), &[b], 0).unwrap();

    assert_eq!(&*rt.do_string("return f(A()) & f(B())").unwrap().to_text().unwrap(), "AB");
    let err = rt.do_string("return f(C())").unwrap_err();
    assert_eq!(err.category, Category::Type);
}

#[test]
fn subclasses_prefer_the_closest_overload() {
    let mut rt = Runtime::new();
    let base = plain_class(&mut rt, "Base");
    let derived = rt.create_class("Derived", &base, Capability::ATOMIC);
    let instance_class = Rc::clone(&derived);
    rt.add_initializer(
        &derived,
        move |rt, _| Ok(Variant::Object(rt.new_object(&instance_class, ObjectData::Table(Table::default())))),
        &[],
        0,
    )
    .unwrap();
    rt.do_string("function g(x as Base) return \"base\" end\nfunction g(x as Object) return \"object\" end")
        .unwrap();
    assert_eq!(
        &*rt.do_string("return g(Derived()) & \" \" & g(1)").unwrap().to_text().unwrap(),
        "base object"
    );
}

#[test]
fn registering_the_same_signature_replaces() {
    let mut rt = Runtime::new();
    let base = plain_class(&mut rt, "Base");
    rt.add_global_function("h", |_, _| Ok(Variant::Integer(1)), &[Rc::clone(&base)], 0)
        .unwrap();
    rt.add_global_function("h", |_, _| Ok(Variant::Integer(2)), &[base], 0)
        .unwrap();
    assert!(matches!(rt.do_string("return h(Base())").unwrap(), Variant::Integer(2)));
}

#[test]
fn reference_flags_are_checked_at_registration() {
    let mut rt = Runtime::new();
    let integer = Rc::clone(&rt.classes().integer);
    rt.add_global_function("k", |_, _| Ok(Variant::Null), &[Rc::clone(&integer)], 0b1)
        .unwrap();
    let err = rt
        .add_global_function("k", |_, _| Ok(Variant::Null), &[integer], 0)
        .unwrap_err();
    assert_eq!(err.category, Category::Reference);
}

#[test]
fn counters_are_independent() {
    let mut rt = Runtime::new();
    rt.do_string(
        "function counter()\n local n = 0\n return function() n += 1; return n end\nend\nc1 = counter()\nc2 = counter()",
    )
    .unwrap();
    let c1 = rt.get_global("c1").unwrap();
    let c2 = rt.get_global("c2").unwrap();
    for expected in 1..=3 {
        assert!(matches!(rt.call_value(&c1, &[]).unwrap(), Variant::Integer(n) if n == expected));
    }
    assert!(matches!(rt.call_value(&c2, &[]).unwrap(), Variant::Integer(1)));
}

#[test]
fn protected_calls_restore_the_stack() {
    let mut rt = Runtime::new();
    rt.do_string("function dive(n)\n if n == 0 then return 1 / 0 end\n return dive(n - 1) + 1\nend")
        .unwrap();
    for value in [1, 2, 3] {
        rt.push(Variant::Integer(value)).unwrap();
    }
    let before = rt.stack_len();
    rt.push(rt.get_global("dive").unwrap()).unwrap();
    rt.push(Variant::Integer(50)).unwrap();
    let err = rt.pcall(1).unwrap_err();

    assert_eq!(err.category, Category::Math);
    assert_eq!(rt.stack_len(), before + 1);
    assert_eq!(rt.call_depth(), 0);
    assert_eq!(
        &*rt.pop().unwrap().to_text().unwrap(),
        "[Math error] division by zero"
    );
    // The frames below the call are intact and usable.
    rt.push(rt.get_global("dive").unwrap()).unwrap();
    rt.push(Variant::Integer(3)).unwrap();
    rt.call(1).unwrap_err();
    assert_eq!(rt.stack_len(), before);
}

#[test]
fn mutually_capturing_closures_are_collected() {
    let mut rt = Runtime::with_config(RuntimeConfig::default().with_gc_threshold(0));
    rt.do_string(
        "\
function pair()
    local f, g
    f = function() return g end
    g = function() return f end
    return null
end",
    )
    .unwrap();
    rt.collect();
    let baseline = rt.tracked_count();

    rt.do_string("pair()").unwrap();
    assert!(rt.tracked_count() > baseline);
    let stats = rt.collect();
    assert!(stats.freed >= 4);
    assert_eq!(rt.tracked_count(), baseline);
}

#[test]
fn round_trip() {
    let mut rt = Runtime::new();
    assert!(matches!(rt.do_string("return 2 + 3 * 4").unwrap(), Variant::Integer(14)));

    let first = rt.compile("return 2 + 3 * 4", "a.rill").unwrap();
    let second = rt.compile("return 2 + 3 * 4", "a.rill").unwrap();
    assert!(!Rc::ptr_eq(&first, &second));
    assert_eq!(first.code.ops(), second.code.ops());
}

#[test]
fn marshaling_reports_kind_mismatches() {
    let mut rt = Runtime::new();
    let list = rt.do_string("return [1, \"two\", 3.0]").unwrap();
    let items = list.to_list().unwrap();
    assert_eq!(items.len(), 3);
    assert_eq!(items[1].to_text().unwrap().as_ref(), "two");

    let table = rt.do_string("return {\"a\": 1}").unwrap();
    assert_eq!(table.to_table().unwrap().len(), 1);
    assert_eq!(table.to_list().unwrap_err().category, Category::Type);

    let array = rt.do_string("return @[1, 2; 3, 4]").unwrap().to_array().unwrap();
    assert_eq!((array.rows(), array.cols()), (2, 2));
}

proptest! {
    #[test]
    fn integer_arithmetic_matches_checked_ops(a in any::<i32>(), b in any::<i32>()) {
        let mut rt = Runtime::new();
        let (a, b) = (i64::from(a), i64::from(b));
        let source = format!("return ({a}) * ({b}) - ({b})");
        let expected = a.checked_mul(b).and_then(|p| p.checked_sub(b));
        match (rt.do_string(&source), expected) {
            (Ok(Variant::Integer(got)), Some(want)) => prop_assert_eq!(got, want),
            (Err(err), None) => prop_assert_eq!(err.category, Category::Math),
            (got, want) => prop_assert!(false, "got {:?}, expected {:?}", got.map(|v| v.to_string()), want),
        }
    }

    #[test]
    fn comparison_is_antisymmetric(a in -1000i64..1000, b in -1000i64..1000) {
        let mut rt = Runtime::new();
        let forward = rt.do_string(&format!("return ({a}) <=> ({b})")).unwrap();
        let backward = rt.do_string(&format!("return ({b}) <=> ({a})")).unwrap();
        match (forward, backward) {
            (Variant::Integer(x), Variant::Integer(y)) => prop_assert_eq!(x, -y),
            other => prop_assert!(false, "unexpected {:?}", other),
        }
    }
}
