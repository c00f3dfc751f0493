use super::{Name, StringInterner};
use pretty_assertions::assert_eq;

#[test]
fn interning_twice_shares_the_allocation() {
    let interner = StringInterner::new();
    let a = interner.intern("counter");
    let b = interner.intern("counter");

    assert!(std::rc::Rc::ptr_eq(a.as_rc(), b.as_rc()));
    assert_eq!(interner.len(), 1);
}

#[test]
fn distinct_text_gives_distinct_names() {
    let interner = StringInterner::new();
    let a = interner.intern("x");
    let b = interner.intern("y");

    assert_ne!(a, b);
    assert_eq!(interner.len(), 2);
}

#[test]
fn names_from_other_interners_compare_by_content() {
    let left = StringInterner::new().intern("shared");
    let right = Name::new("shared");

    assert_eq!(left, right);
}

#[test]
fn get_does_not_intern() {
    let interner = StringInterner::new();
    assert!(interner.get("missing").is_none());
    assert!(interner.is_empty());

    interner.intern("present");
    assert_eq!(interner.get("present").as_deref(), Some("present"));
}
