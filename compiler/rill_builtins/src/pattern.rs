//! Regular expressions backed by the `regex` crate.
//!
//! A `Regex` object remembers its last match: `has_match`, `count`,
//! `group`, `get_start` and `get_end` report on it. Positions are 1-based
//! character positions and `get_end` is one past the last character.

use crate::helpers::{char_offset, char_position, with_native, Kinds};
use regex::{Regex, RegexBuilder};
use rill_runtime::value::usize_to_int;
use rill_runtime::{Error, NativeData, Result, Runtime, Variant};
use std::any::Any;
use std::ops::Range;
use std::rc::Rc;

#[derive(Debug)]
struct LastMatch {
    subject: Rc<str>,
    groups: Vec<Option<Range<usize>>>,
}

/// A compiled pattern, the host value of `Regex` objects.
#[derive(Debug)]
pub struct Pattern {
    source: String,
    regex: Regex,
    last: Option<LastMatch>,
}

impl Pattern {
    /// Compile `source`. `flags` is a `|`-separated list of `caseless`,
    /// `multiline`, `dotall`, `extended` and `ungreedy`.
    pub fn new(source: &str, flags: &str) -> Result<Self> {
        let mut builder = RegexBuilder::new(source);
        for flag in flags.split('|').map(str::trim).filter(|f| !f.is_empty()) {
            match flag {
                "caseless" => builder.case_insensitive(true),
                "multiline" => builder.multi_line(true),
                "dotall" => builder.dot_matches_new_line(true),
                "extended" => builder.ignore_whitespace(true),
                "ungreedy" => builder.swap_greed(true),
                other => return Err(Error::runtime(format!("unknown regular expression flag \"{other}\""))),
            };
        }
        let regex = builder
            .build()
            .map_err(|err| Error::runtime(format!("invalid regular expression: {err}")))?;
        Ok(Pattern {
            source: source.to_string(),
            regex,
            last: None,
        })
    }

    /// Search `subject` from byte offset `start`, remembering the result.
    pub fn find(&mut self, subject: Rc<str>, start: usize) -> bool {
        self.last = self.regex.captures_at(&subject, start).map(|caps| LastMatch {
            groups: caps.iter().map(|group| group.map(|m| m.range())).collect(),
            subject: Rc::clone(&subject),
        });
        self.last.is_some()
    }

    pub fn has_match(&self) -> bool {
        self.last.is_some()
    }

    /// Number of capture groups in the last match, not counting the whole
    /// match.
    pub fn count(&self) -> usize {
        self.last.as_ref().map_or(0, |m| m.groups.len() - 1)
    }

    fn group(&self, index: i64) -> Result<(&str, Option<Range<usize>>)> {
        let invalid = || Error::index_error(format!("invalid group index in regular expression: {index}"));
        let last = self.last.as_ref().ok_or_else(invalid)?;
        let slot = usize::try_from(index).ok().and_then(|i| last.groups.get(i)).ok_or_else(invalid)?;
        Ok((&*last.subject, slot.clone()))
    }

    pub fn capture(&self, index: i64) -> Result<Option<&str>> {
        let (subject, range) = self.group(index)?;
        Ok(range.map(|r| &subject[r]))
    }

    pub fn start(&self, index: i64) -> Result<Option<i64>> {
        let (subject, range) = self.group(index)?;
        Ok(range.map(|r| char_position(subject, r.start)))
    }

    pub fn end(&self, index: i64) -> Result<Option<i64>> {
        let (subject, range) = self.group(index)?;
        Ok(range.map(|r| char_position(subject, r.end)))
    }
}

impl NativeData for Pattern {
    fn as_any(&self) -> &dyn Any {
        self
    }

    fn as_any_mut(&mut self) -> &mut dyn Any {
        self
    }

    fn describe(&self) -> String {
        format!("<Regex \"{}\">", self.source)
    }
}

fn pattern<R>(value: &Variant, f: impl FnOnce(&mut Pattern) -> Result<R>) -> Result<R> {
    with_native(value, "Regex", f)
}

fn compile(rt: &mut Runtime, source: &Variant, flags: &str) -> Result<Variant> {
    let compiled = Pattern::new(&source.to_text()?, flags)?;
    let class = Rc::clone(&rt.classes().regex);
    Ok(rt.new_native(&class, Box::new(compiled)))
}

fn search(args: &[Variant], start: Option<i64>) -> Result<Variant> {
    let subject = args[1].to_text()?;
    let offset = match start {
        Some(pos) if !subject.is_empty() => char_offset(&subject, pos, true)?,
        _ => 0,
    };
    let found = pattern(&args[0], |p| Ok(p.find(subject, offset)))?;
    Ok(Variant::Boolean(found))
}

fn optional<T: Into<Variant>>(value: Option<T>) -> Variant {
    value.map_or(Variant::Null, Into::into)
}

pub fn register(rt: &mut Runtime) -> Result<()> {
    let k = Kinds::of(rt);
    let re = [Rc::clone(&k.regex)];
    let re_int = [Rc::clone(&k.regex), Rc::clone(&k.integer)];
    let re_str = [Rc::clone(&k.regex), Rc::clone(&k.string)];

    rt.add_initializer(&k.regex, |rt, a| compile(rt, &a[0], ""), &[Rc::clone(&k.string)], 0)?;
    rt.add_initializer(
        &k.regex,
        |rt, a| compile(rt, &a[0], &a[1].to_text()?),
        &[Rc::clone(&k.string), Rc::clone(&k.string)],
        0,
    )?;

    rt.add_global_function("match", |_, a| search(a, None), &re_str, 0)?;
    rt.add_global_function(
        "match",
        |_, a| search(a, Some(a[2].to_integer()?)),
        &[Rc::clone(&k.regex), Rc::clone(&k.string), Rc::clone(&k.integer)],
        0,
    )?;
    rt.add_global_function("has_match", |_, a| Ok(Variant::Boolean(pattern(&a[0], |p| Ok(p.has_match()))?)), &re, 0)?;
    rt.add_global_function(
        "count",
        |_, a| Ok(Variant::Integer(usize_to_int(pattern(&a[0], |p| Ok(p.count()))?))),
        &re,
        0,
    )?;
    rt.add_global_function(
        "group",
        |_, a| {
            let index = a[1].to_integer()?;
            pattern(&a[0], |p| Ok(optional(p.capture(index)?)))
        },
        &re_int,
        0,
    )?;
    rt.add_global_function(
        "get_start",
        |_, a| {
            let index = a[1].to_integer()?;
            pattern(&a[0], |p| Ok(optional(p.start(index)?)))
        },
        &re_int,
        0,
    )?;
    rt.add_global_function(
        "get_end",
        |_, a| {
            let index = a[1].to_integer()?;
            pattern(&a[0], |p| Ok(optional(p.end(index)?)))
        },
        &re_int,
        0,
    )?;

    rt.add_accessor(&k.regex, "pattern", |_, a| pattern(&a[0], |p| Ok(Variant::from(p.source.as_str()))), None);
    rt.add_accessor(
        &k.regex,
        "length",
        |_, a| Ok(Variant::Integer(usize_to_int(pattern(&a[0], |p| Ok(p.count()))?))),
        None,
    );
    Ok(())
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used, reason = "Tests use unwrap for brevity")]

    use super::*;
    use rill_runtime::Category;

    #[test]
    fn groups_report_character_positions() {
        let mut p = Pattern::new(r"(\w+)@(\w+)", "").unwrap();
        assert!(p.find(Rc::from("né: bob@host"), 0));
        assert_eq!(p.count(), 2);
        assert_eq!(p.capture(1).unwrap(), Some("bob"));
        assert_eq!(p.start(0).unwrap(), Some(5));
        assert_eq!(p.end(0).unwrap(), Some(13));
        assert_eq!(p.start(2).unwrap(), Some(9));
    }

    #[test]
    fn optional_groups_may_be_unset() {
        let mut p = Pattern::new("a(x)?b", "").unwrap();
        assert!(p.find(Rc::from("ab"), 0));
        assert_eq!(p.count(), 1);
        assert_eq!(p.capture(1).unwrap(), None);
    }

    #[test]
    fn invalid_groups_are_index_errors() {
        let mut p = Pattern::new("a", "").unwrap();
        assert_eq!(p.capture(0).unwrap_err().category, Category::Index);
        assert!(!p.find(Rc::from("bbb"), 0));
        assert!(!p.has_match());
        assert!(p.find(Rc::from("bab"), 0));
        assert_eq!(p.capture(1).unwrap_err().category, Category::Index);
        assert_eq!(p.capture(-1).unwrap_err().category, Category::Index);
    }

    #[test]
    fn flags_change_matching() {
        let mut p = Pattern::new("^abc$", "caseless | multiline").unwrap();
        assert!(p.find(Rc::from("x\nABC\ny"), 0));
        assert!(Pattern::new("a", "bogus").is_err());
        assert!(Pattern::new("(", "").is_err());
    }
}
