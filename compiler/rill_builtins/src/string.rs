//! String functions.
//!
//! Positions are 1-based and count characters, not bytes; a negative
//! position counts from the end. Searches return 0 when nothing is found.
//! Functions that edit a string take it by reference and return `null`.

use crate::helpers::{char_offset, char_position, count_arg, store, Kinds};
use rill_runtime::{Error, Result, Runtime, Variant};
use std::rc::Rc;

const BY_REF: u64 = 0b1;

pub fn register(rt: &mut Runtime) -> Result<()> {
    let k = Kinds::of(rt);
    let s = &k.string;
    let i = &k.integer;
    let one = [Rc::clone(s)];
    let two = [Rc::clone(s), Rc::clone(s)];
    let three = [Rc::clone(s), Rc::clone(s), Rc::clone(s)];
    let with_int = [Rc::clone(s), Rc::clone(i)];

    rt.add_global_function("contains", |_, a| Ok(Variant::Boolean(text(a, 0)?.contains(&*text(a, 1)?))), &two, 0)?;
    rt.add_global_function("starts_with", |_, a| Ok(Variant::Boolean(text(a, 0)?.starts_with(&*text(a, 1)?))), &two, 0)?;
    rt.add_global_function("ends_with", |_, a| Ok(Variant::Boolean(text(a, 0)?.ends_with(&*text(a, 1)?))), &two, 0)?;
    rt.add_global_function("find", |_, a| find(&text(a, 0)?, &text(a, 1)?, 1), &two, 0)?;
    rt.add_global_function(
        "find",
        |_, a| find(&text(a, 0)?, &text(a, 1)?, a[2].to_integer()?),
        &[Rc::clone(s), Rc::clone(s), Rc::clone(i)],
        0,
    )?;
    rt.add_global_function("find_back", |_, a| find_back(&text(a, 0)?, &text(a, 1)?, -1), &two, 0)?;
    rt.add_global_function(
        "find_back",
        |_, a| find_back(&text(a, 0)?, &text(a, 1)?, a[2].to_integer()?),
        &[Rc::clone(s), Rc::clone(s), Rc::clone(i)],
        0,
    )?;
    rt.add_global_function("left", |_, a| Ok(Variant::from(left(&text(a, 0)?, count_arg(&a[1])?))), &with_int, 0)?;
    rt.add_global_function("right", |_, a| Ok(Variant::from(right(&text(a, 0)?, count_arg(&a[1])?))), &with_int, 0)?;
    rt.add_global_function(
        "slice",
        |_, a| {
            let t = text(a, 0)?;
            let start = char_offset(&t, a[1].to_integer()?, true)?;
            Ok(Variant::from(&t[start..]))
        },
        &with_int,
        0,
    )?;
    rt.add_global_function(
        "slice",
        |_, a| {
            let t = text(a, 0)?;
            let start = char_offset(&t, a[1].to_integer()?, true)?;
            Ok(Variant::from(left(&t[start..], count_arg(&a[2])?)))
        },
        &[Rc::clone(s), Rc::clone(i), Rc::clone(i)],
        0,
    )?;
    rt.add_global_function("count", |_, a| count(&text(a, 0)?, &text(a, 1)?), &two, 0)?;
    rt.add_global_function("to_upper", |_, a| Ok(Variant::from(text(a, 0)?.to_uppercase())), &one, 0)?;
    rt.add_global_function("to_lower", |_, a| Ok(Variant::from(text(a, 0)?.to_lowercase())), &one, 0)?;
    rt.add_global_function("is_empty", |_, a| Ok(Variant::Boolean(text(a, 0)?.is_empty())), &one, 0)?;
    rt.add_global_function(
        "char",
        |_, a| {
            let t = text(a, 0)?;
            let start = char_offset(&t, a[1].to_integer()?, false)?;
            Ok(Variant::from(t[start..].chars().next().map(String::from).unwrap_or_default()))
        },
        &with_int,
        0,
    )?;
    rt.add_global_function(
        "split",
        |rt, a| {
            let (t, delim) = (text(a, 0)?, text(a, 1)?);
            if delim.is_empty() {
                return Err(Error::range_error("cannot split on an empty delimiter"));
            }
            let parts = t.split(&*delim).map(Variant::from).collect();
            Ok(rt.new_list(parts))
        },
        &two,
        0,
    )?;

    // In-place edits.
    rt.add_global_function("reverse", |_, a| edit(a, |t| Ok(t.chars().rev().collect())), &one, BY_REF)?;
    rt.add_global_function("trim", |_, a| edit(a, |t| Ok(t.trim().to_string())), &one, BY_REF)?;
    rt.add_global_function("ltrim", |_, a| edit(a, |t| Ok(t.trim_start().to_string())), &one, BY_REF)?;
    rt.add_global_function("rtrim", |_, a| edit(a, |t| Ok(t.trim_end().to_string())), &one, BY_REF)?;
    rt.add_global_function(
        "append",
        |_, a| {
            let suffix = text(a, 1)?;
            edit(a, |t| Ok(format!("{t}{suffix}")))
        },
        &two,
        BY_REF,
    )?;
    rt.add_global_function(
        "prepend",
        |_, a| {
            let prefix = text(a, 1)?;
            edit(a, |t| Ok(format!("{prefix}{t}")))
        },
        &two,
        BY_REF,
    )?;
    rt.add_global_function(
        "insert",
        |_, a| {
            let (pos, piece) = (a[1].to_integer()?, text(a, 2)?);
            edit(a, |t| {
                let at = char_offset(t, pos, true)?;
                Ok(format!("{}{piece}{}", &t[..at], &t[at..]))
            })
        },
        &[Rc::clone(s), Rc::clone(i), Rc::clone(s)],
        BY_REF,
    )?;
    rt.add_global_function(
        "remove",
        |_, a| {
            let piece = text(a, 1)?;
            edit(a, |t| Ok(t.replace(&*piece, "")))
        },
        &two,
        BY_REF,
    )?;
    rt.add_global_function(
        "remove_first",
        |_, a| {
            let piece = text(a, 1)?;
            edit(a, |t| Ok(replace_first(t, &piece, "")))
        },
        &two,
        BY_REF,
    )?;
    rt.add_global_function(
        "remove_last",
        |_, a| {
            let piece = text(a, 1)?;
            edit(a, |t| Ok(replace_last(t, &piece, "")))
        },
        &two,
        BY_REF,
    )?;
    rt.add_global_function(
        "remove_at",
        |_, a| {
            let (pos, n) = (a[1].to_integer()?, count_arg(&a[2])?);
            edit(a, |t| splice(t, pos, n, ""))
        },
        &[Rc::clone(s), Rc::clone(i), Rc::clone(i)],
        BY_REF,
    )?;
    rt.add_global_function(
        "replace",
        |_, a| {
            let (old, new) = (text(a, 1)?, text(a, 2)?);
            if old.is_empty() {
                return Err(Error::range_error("cannot replace an empty string"));
            }
            edit(a, |t| Ok(t.replace(&*old, &new)))
        },
        &three,
        BY_REF,
    )?;
    rt.add_global_function(
        "replace_first",
        |_, a| {
            let (old, new) = (text(a, 1)?, text(a, 2)?);
            edit(a, |t| Ok(replace_first(t, &old, &new)))
        },
        &three,
        BY_REF,
    )?;
    rt.add_global_function(
        "replace_last",
        |_, a| {
            let (old, new) = (text(a, 1)?, text(a, 2)?);
            edit(a, |t| Ok(replace_last(t, &old, &new)))
        },
        &three,
        BY_REF,
    )?;
    rt.add_global_function(
        "replace_at",
        |_, a| {
            let (pos, n, new) = (a[1].to_integer()?, count_arg(&a[2])?, text(a, 3)?);
            edit(a, |t| splice(t, pos, n, &new))
        },
        &[Rc::clone(s), Rc::clone(i), Rc::clone(i), Rc::clone(s)],
        BY_REF,
    )?;
    Ok(())
}

fn text(args: &[Variant], index: usize) -> Result<Rc<str>> {
    args[index].to_text()
}

/// Replace the string behind the first (by-reference) argument.
fn edit(args: &[Variant], f: impl FnOnce(&str) -> Result<String>) -> Result<Variant> {
    let edited = f(&text(args, 0)?)?;
    store(&args[0], Variant::from(edited));
    Ok(Variant::Null)
}

pub fn find(haystack: &str, needle: &str, start: i64) -> Result<Variant> {
    let from = char_offset(haystack, start, true)?;
    Ok(Variant::Integer(
        haystack[from..]
            .find(needle)
            .map_or(0, |at| char_position(haystack, from + at)),
    ))
}

pub fn find_back(haystack: &str, needle: &str, start: i64) -> Result<Variant> {
    let limit = if haystack.is_empty() {
        0
    } else {
        let at = char_offset(haystack, start, false)?;
        (at + needle.len()).min(haystack.len())
    };
    // `limit` may fall inside a multi-byte character.
    let mut end = limit;
    while !haystack.is_char_boundary(end) {
        end += 1;
    }
    Ok(Variant::Integer(
        haystack[..end]
            .rfind(needle)
            .map_or(0, |at| char_position(haystack, at)),
    ))
}

pub fn count(haystack: &str, needle: &str) -> Result<Variant> {
    if needle.is_empty() {
        return Err(Error::range_error("cannot count an empty string"));
    }
    Ok(Variant::Integer(rill_runtime::value::usize_to_int(haystack.matches(needle).count())))
}

fn left(t: &str, n: usize) -> &str {
    let end = t.char_indices().nth(n).map_or(t.len(), |(at, _)| at);
    &t[..end]
}

fn right(t: &str, n: usize) -> &str {
    let len = t.chars().count();
    let skip = len.saturating_sub(n);
    let start = t.char_indices().nth(skip).map_or(t.len(), |(at, _)| at);
    &t[start..]
}

fn replace_first(t: &str, old: &str, new: &str) -> String {
    if old.is_empty() {
        return t.to_string();
    }
    t.replacen(old, new, 1)
}

fn replace_last(t: &str, old: &str, new: &str) -> String {
    match t.rfind(old) {
        Some(at) if !old.is_empty() => format!("{}{new}{}", &t[..at], &t[at + old.len()..]),
        _ => t.to_string(),
    }
}

/// Replace `n` characters starting at position `pos` with `piece`.
fn splice(t: &str, pos: i64, n: usize, piece: &str) -> Result<String> {
    let start = char_offset(t, pos, false)?;
    let end = start + left(&t[start..], n).len();
    Ok(format!("{}{piece}{}", &t[..start], &t[end..]))
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used, reason = "Tests use unwrap for brevity")]

    use super::*;
    use pretty_assertions::assert_eq;

    fn int(v: Result<Variant>) -> i64 {
        v.unwrap().to_integer().unwrap()
    }

    #[test]
    fn searching_counts_characters() {
        assert_eq!(int(find("héllo", "l", 1)), 3);
        assert_eq!(int(find("héllo", "l", 4)), 4);
        assert_eq!(int(find("héllo", "z", 1)), 0);
        assert_eq!(int(find_back("héllo", "l", -1)), 4);
        assert_eq!(int(find_back("héllo", "l", 3)), 3);
        assert_eq!(int(find_back("", "l", -1)), 0);
    }

    #[test]
    fn counting_and_slicing() {
        assert_eq!(int(count("banana", "an")), 2);
        assert!(count("banana", "").is_err());
        assert_eq!(left("héllo", 2), "hé");
        assert_eq!(right("héllo", 10), "héllo");
        assert_eq!(splice("héllo", 2, 3, "EY").unwrap(), "hEYo");
        assert_eq!(replace_last("a-b-c", "-", "+"), "a-b+c");
    }
}
