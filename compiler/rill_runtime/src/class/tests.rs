#![allow(clippy::unwrap_used, reason = "Tests use unwrap for brevity")]

use super::*;
use pretty_assertions::assert_eq;

#[test]
fn builtin_depths() {
    let reg = ClassRegistry::new();
    assert_eq!(reg.object.depth(), 0);
    assert_eq!(reg.number.depth(), 1);
    assert_eq!(reg.integer.depth(), 2);
    assert_eq!(reg.list.depth(), 1);
}

#[test]
fn distance_to_ancestors() {
    let reg = ClassRegistry::new();
    assert_eq!(reg.integer.get_distance(&reg.integer), Some(0));
    assert_eq!(reg.integer.get_distance(&reg.number), Some(1));
    assert_eq!(reg.integer.get_distance(&reg.object), Some(2));
    assert_eq!(reg.integer.get_distance(&reg.float), None);
    assert_eq!(reg.number.get_distance(&reg.integer), None);
    assert_eq!(reg.string.get_distance(&reg.number), None);
}

#[test]
fn host_classes_extend_the_tree() {
    let mut reg = ClassRegistry::new();
    let object = Rc::clone(&reg.object);
    let (shape, _) = reg.create("Shape", &object, Capability::ATOMIC);
    let (circle, circle_obj) = reg.create("Circle", &shape, Capability::ATOMIC);
    assert_eq!(circle.depth(), 2);
    assert_eq!(circle.get_distance(&shape), Some(1));
    assert_eq!(circle.parent().map(|p| p.name().to_string()), Some("Shape".to_string()));
    assert!(Rc::ptr_eq(&reg.object_of(&circle).unwrap(), &circle_obj));
}

#[test]
fn members_are_inherited() {
    let mut reg = ClassRegistry::new();
    let object = Rc::clone(&reg.object);
    let (base, _) = reg.create("Base", &object, Capability::ATOMIC);
    let (derived, _) = reg.create("Derived", &base, Capability::ATOMIC);
    base.set_member(Rc::from("answer"), Variant::Integer(42));
    assert!(matches!(derived.member("answer"), Some(Variant::Integer(42))));
    assert!(derived.own_member("answer").is_none());
    derived.set_member(Rc::from("answer"), Variant::Integer(7));
    assert!(matches!(derived.member("answer"), Some(Variant::Integer(7))));
}

#[test]
fn class_of_values() {
    let reg = ClassRegistry::new();
    assert_eq!(reg.class_of(&Variant::Null).name(), "Null");
    assert_eq!(reg.class_of(&Variant::Integer(1)).name(), "Integer");
    assert_eq!(reg.class_of(&Variant::from("x")).name(), "String");
    let alias = Variant::Alias(Rc::new(crate::value::Alias::new(Variant::Float(1.0))));
    assert_eq!(reg.class_of(&alias).name(), "Float");
}

#[test]
fn capabilities() {
    let reg = ClassRegistry::new();
    assert!(reg.list.is_collectable());
    assert!(reg.function.is_collectable());
    assert!(!reg.array.is_collectable());
    assert_eq!(reg.integer.capability(), Capability::ATOMIC);
}
