//! List functions. Editing functions take the list by reference; the list
//! is copied first if another variable shares it.

use crate::helpers::{count_arg, Kinds};
use rill_runtime::value::{resolve_index, usize_to_int};
use rill_runtime::{Error, Result, Runtime, Variant};
use std::cmp::Ordering;
use std::rc::Rc;

const BY_REF: u64 = 0b1;

pub fn register(rt: &mut Runtime) -> Result<()> {
    let k = Kinds::of(rt);
    let list = &k.list;
    let one = [Rc::clone(list)];
    let with_value = [Rc::clone(list), Rc::clone(&k.object)];
    let with_int = [Rc::clone(list), Rc::clone(&k.integer)];
    let two_lists = [Rc::clone(list), Rc::clone(list)];

    rt.add_initializer(list, |rt, _| Ok(rt.new_list(Vec::new())), &[], 0)?;

    // Queries.
    rt.add_global_function(
        "contains",
        |_, a| Ok(Variant::Boolean(a[0].to_list()?.iter().any(|x| x.equals(&a[1])))),
        &with_value,
        0,
    )?;
    rt.add_global_function("first", |_, a| end_item(&a[0], true), &one, 0)?;
    rt.add_global_function("last", |_, a| end_item(&a[0], false), &one, 0)?;
    rt.add_global_function("find", |_, a| find(&a[0].to_list()?, &a[1], 1), &with_value, 0)?;
    rt.add_global_function(
        "find",
        |_, a| find(&a[0].to_list()?, &a[1], a[2].to_integer()?),
        &[Rc::clone(list), Rc::clone(&k.object), Rc::clone(&k.integer)],
        0,
    )?;
    rt.add_global_function("find_back", |_, a| find_back(&a[0].to_list()?, &a[1], -1), &with_value, 0)?;
    rt.add_global_function(
        "find_back",
        |_, a| find_back(&a[0].to_list()?, &a[1], a[2].to_integer()?),
        &[Rc::clone(list), Rc::clone(&k.object), Rc::clone(&k.integer)],
        0,
    )?;
    rt.add_global_function(
        "left",
        |rt, a| {
            let mut items = a[0].to_list()?;
            items.truncate(count_arg(&a[1])?);
            Ok(rt.new_list(items))
        },
        &with_int,
        0,
    )?;
    rt.add_global_function(
        "right",
        |rt, a| {
            let mut items = a[0].to_list()?;
            let skip = items.len().saturating_sub(count_arg(&a[1])?);
            Ok(rt.new_list(items.split_off(skip)))
        },
        &with_int,
        0,
    )?;
    rt.add_global_function(
        "join",
        |_, a| {
            let sep = a[1].to_text()?;
            let parts: Vec<String> = a[0].to_list()?.iter().map(ToString::to_string).collect();
            Ok(Variant::from(parts.join(&sep)))
        },
        &[Rc::clone(list), Rc::clone(&k.string)],
        0,
    )?;
    rt.add_global_function("is_empty", |_, a| Ok(Variant::Boolean(a[0].to_list()?.is_empty())), &one, 0)?;
    rt.add_global_function("is_sorted", |_, a| is_sorted(&a[0].to_list()?), &one, 0)?;
    rt.add_global_function(
        "sample",
        |rt, a| {
            let items = a[0].to_list()?;
            let n = count_arg(&a[1])?;
            if n > items.len() {
                return Err(Error::range_error(format!(
                    "cannot sample {n} items from a list of {}",
                    items.len()
                )));
            }
            let mut order: Vec<usize> = (0..items.len()).collect();
            fastrand::shuffle(&mut order);
            let picked = order[..n].iter().map(|&i| items[i].clone()).collect();
            Ok(rt.new_list(picked))
        },
        &with_int,
        0,
    )?;
    rt.add_global_function(
        "intersect",
        |rt, a| {
            let (x, y) = (a[0].to_list()?, a[1].to_list()?);
            let items = x.into_iter().filter(|v| y.iter().any(|w| w.equals(v))).collect();
            Ok(rt.new_list(items))
        },
        &two_lists,
        0,
    )?;
    rt.add_global_function(
        "unite",
        |rt, a| {
            let mut items = a[0].to_list()?;
            for v in a[1].to_list()? {
                if !items.iter().any(|w| w.equals(&v)) {
                    items.push(v);
                }
            }
            Ok(rt.new_list(items))
        },
        &two_lists,
        0,
    )?;
    rt.add_global_function(
        "subtract",
        |rt, a| {
            let (x, y) = (a[0].to_list()?, a[1].to_list()?);
            let items = x.into_iter().filter(|v| !y.iter().any(|w| w.equals(v))).collect();
            Ok(rt.new_list(items))
        },
        &two_lists,
        0,
    )?;

    // In-place edits.
    rt.add_global_function("clear", |rt, a| edit(rt, &a[0], |items| { items.clear(); Ok(()) }), &one, BY_REF)?;
    rt.add_global_function(
        "append",
        |rt, a| {
            let value = a[1].resolve();
            edit(rt, &a[0], |items| {
                items.push(value);
                Ok(())
            })
        },
        &with_value,
        BY_REF,
    )?;
    rt.add_global_function(
        "prepend",
        |rt, a| {
            let value = a[1].resolve();
            edit(rt, &a[0], |items| {
                items.insert(0, value);
                Ok(())
            })
        },
        &with_value,
        BY_REF,
    )?;
    rt.add_global_function(
        "insert",
        |rt, a| {
            let pos = a[1].to_integer()?;
            let value = a[2].resolve();
            edit(rt, &a[0], |items| {
                let at = resolve_index(pos, items.len() + 1)?;
                items.insert(at, value);
                Ok(())
            })
        },
        &[Rc::clone(list), Rc::clone(&k.integer), Rc::clone(&k.object)],
        BY_REF,
    )?;
    rt.add_global_function(
        "pop",
        |rt, a| rt.with_list_mut(&a[0], |items| items.pop().ok_or_else(empty_list)),
        &one,
        BY_REF,
    )?;
    rt.add_global_function(
        "shift",
        |rt, a| {
            rt.with_list_mut(&a[0], |items| {
                if items.is_empty() {
                    Err(empty_list())
                } else {
                    Ok(items.remove(0))
                }
            })
        },
        &one,
        BY_REF,
    )?;
    rt.add_global_function("sort", |rt, a| edit(rt, &a[0], sort), &one, BY_REF)?;
    rt.add_global_function("reverse", |rt, a| edit(rt, &a[0], |items| { items.reverse(); Ok(()) }), &one, BY_REF)?;
    rt.add_global_function("shuffle", |rt, a| edit(rt, &a[0], |items| { fastrand::shuffle(items); Ok(()) }), &one, BY_REF)?;
    rt.add_global_function(
        "remove",
        |rt, a| {
            let value = a[1].resolve();
            edit(rt, &a[0], |items| {
                items.retain(|x| !x.equals(&value));
                Ok(())
            })
        },
        &with_value,
        BY_REF,
    )?;
    rt.add_global_function(
        "remove_first",
        |rt, a| {
            let value = a[1].resolve();
            edit(rt, &a[0], |items| {
                if let Some(at) = items.iter().position(|x| x.equals(&value)) {
                    items.remove(at);
                }
                Ok(())
            })
        },
        &with_value,
        BY_REF,
    )?;
    rt.add_global_function(
        "remove_last",
        |rt, a| {
            let value = a[1].resolve();
            edit(rt, &a[0], |items| {
                if let Some(at) = items.iter().rposition(|x| x.equals(&value)) {
                    items.remove(at);
                }
                Ok(())
            })
        },
        &with_value,
        BY_REF,
    )?;
    rt.add_global_function(
        "remove_at",
        |rt, a| {
            let pos = a[1].to_integer()?;
            rt.with_list_mut(&a[0], |items| {
                let at = resolve_index(pos, items.len())?;
                Ok(items.remove(at))
            })
        },
        &with_int,
        BY_REF,
    )?;
    Ok(())
}

fn edit(rt: &mut Runtime, list: &Variant, f: impl FnOnce(&mut Vec<Variant>) -> Result<()>) -> Result<Variant> {
    rt.with_list_mut(list, f)?;
    Ok(Variant::Null)
}

fn empty_list() -> Error {
    Error::index_error("the list is empty")
}

fn end_item(list: &Variant, first: bool) -> Result<Variant> {
    let items = list.to_list()?;
    let item = if first { items.first() } else { items.last() };
    item.cloned().ok_or_else(empty_list)
}

fn find(items: &[Variant], value: &Variant, start: i64) -> Result<Variant> {
    if items.is_empty() {
        return Ok(Variant::Integer(0));
    }
    let from = resolve_index(start, items.len())?;
    Ok(Variant::Integer(
        items[from..]
            .iter()
            .position(|x| x.equals(value))
            .map_or(0, |at| usize_to_int(from + at + 1)),
    ))
}

fn find_back(items: &[Variant], value: &Variant, start: i64) -> Result<Variant> {
    if items.is_empty() {
        return Ok(Variant::Integer(0));
    }
    let to = resolve_index(start, items.len())?;
    Ok(Variant::Integer(
        items[..=to]
            .iter()
            .rposition(|x| x.equals(value))
            .map_or(0, |at| usize_to_int(at + 1)),
    ))
}

/// Sort in ascending order. Items that cannot be compared make the sort
/// fail with the comparison's error.
pub fn sort(items: &mut Vec<Variant>) -> Result<()> {
    let mut failure = None;
    items.sort_by(|a, b| match a.compare(b) {
        Ok(order) => order.unwrap_or(Ordering::Equal),
        Err(err) => {
            failure.get_or_insert(err);
            Ordering::Equal
        }
    });
    failure.map_or(Ok(()), Err)
}

fn is_sorted(items: &[Variant]) -> Result<Variant> {
    for pair in items.windows(2) {
        if pair[0].compare(&pair[1])? == Some(Ordering::Greater) {
            return Ok(Variant::Boolean(false));
        }
    }
    Ok(Variant::Boolean(true))
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used, reason = "Tests use unwrap for brevity")]

    use super::*;
    use rill_runtime::Category;

    fn ints(values: &[i64]) -> Vec<Variant> {
        values.iter().copied().map(Variant::Integer).collect()
    }

    #[test]
    fn sorting_mixed_numbers() {
        let mut items = vec![Variant::Float(2.5), Variant::Integer(1), Variant::Integer(3)];
        sort(&mut items).unwrap();
        assert_eq!(items.iter().map(ToString::to_string).collect::<Vec<_>>(), ["1", "2.5", "3"]);
    }

    #[test]
    fn sorting_incomparable_items_fails() {
        let mut items = vec![Variant::Integer(1), Variant::Null];
        assert_eq!(sort(&mut items).unwrap_err().category, Category::Type);
    }

    #[test]
    fn positions_are_one_based() {
        let items = ints(&[5, 6, 5]);
        assert!(matches!(find(&items, &Variant::Integer(5), 1).unwrap(), Variant::Integer(1)));
        assert!(matches!(find(&items, &Variant::Integer(5), 2).unwrap(), Variant::Integer(3)));
        assert!(matches!(find_back(&items, &Variant::Integer(5), -1).unwrap(), Variant::Integer(3)));
        assert!(matches!(find(&items, &Variant::Integer(9), 1).unwrap(), Variant::Integer(0)));
        assert!(matches!(is_sorted(&items).unwrap(), Variant::Boolean(false)));
    }
}
