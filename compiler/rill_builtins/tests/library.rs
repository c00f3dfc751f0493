//! Scripts exercising the library through a runtime.

#![allow(clippy::unwrap_used, reason = "Tests use unwrap for brevity")]

use pretty_assertions::assert_eq;
use rill_runtime::{buffer_handler, Category, Error, Runtime, Variant};
use std::fs;
use std::path::Path;
use std::sync::Arc;

fn runtime() -> Runtime {
    let mut rt = Runtime::new();
    rill_builtins::register_all(&mut rt).unwrap();
    rt
}

fn text(source: &str) -> String {
    runtime().do_string(source).unwrap().to_text().unwrap().to_string()
}

fn fails(source: &str) -> Error {
    runtime().do_string(source).unwrap_err()
}

/// `path` as a script string literal.
fn quoted(path: &Path) -> String {
    format!("{:?}", path.display().to_string())
}

#[test]
fn strings_are_edited_in_place() {
    let source = r#"
        local s = "hello world"
        local parts = split(s, " ")
        replace(s, "o", "0")
        return to_upper(s) & "|" & join(parts, "-") & "|" & str(find(s, "w0"))
    "#;
    assert_eq!(text(source), "HELL0 W0RLD|hello-world|7");
}

#[test]
fn list_edits_copy_shared_values() {
    let source = r#"
        local xs = [5, 3, 8]
        append(xs, 1)
        sort(xs)
        local ys = xs
        pop(ys)
        return join(xs, ",") & ";" & join(ys, ",")
    "#;
    assert_eq!(text(source), "1,3,5,8;1,3,5");
}

#[test]
fn tables_keep_insertion_order() {
    let source = r#"
        local t = {"b": 2, "a": 1}
        t["c"] = 3
        remove(t, "b")
        return join(t.keys, ",") & " " & str(get(t, "z", 0)) & " " & str(contains(t, "a"))
    "#;
    assert_eq!(text(source), "a,c 0 true");
}

#[test]
fn math_overloads_pick_by_type() {
    let mut rt = runtime();
    let out = buffer_handler();
    rt.set_print_handler(Arc::clone(&out));
    rt.do_string("print round(2.567, 2), abs(-3), max(2, 7), sqrt(16.0), type(max(2, 7.5))")
        .unwrap();
    assert_eq!(out.take_output(), "2.57 3 7 4.0 Float\n");
}

#[test]
fn integer_conversion_checks_its_input() {
    assert_eq!(fails("return int(\"abc\")").category, Category::Type);
    assert_eq!(fails("return int(2.0 ^ 70)").category, Category::Range);
    assert!(matches!(runtime().do_string("return int(\"42\")").unwrap(), Variant::Integer(42)));
}

#[test]
fn json_round_trips_through_tables() {
    let source = r#"
        local data = load_json('{"name": "rill", "tags": ["a", "b"], "n": 2}')
        local tags = data["tags"]
        append(tags, "c")
        data["tags"] = tags
        return dump_json(data)
    "#;
    assert_eq!(text(source), r#"{"name":"rill","tags":["a","b","c"],"n":2}"#);
    assert_eq!(fails("return load_json(\"[1,\")").category, Category::Syntax);
}

#[test]
fn files_are_written_and_read_back() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("notes.txt");
    let source = format!(
        r#"
        local f = open({p}, "w")
        write_line(f, "first")
        write_lines(f, ["second", "third"])
        close(f)
        f = File({p})
        local first = read_line(f)
        local rest = read_lines(f)
        local done = eof(f)
        close(f)
        return first & "|" & join(rest, ",") & "|" & str(done) & "|" & str(len(read_file({p})))
        "#,
        p = quoted(&path)
    );
    assert_eq!(text(&source), "first|second,third|true|19");
    assert_eq!(fs::read_to_string(&path).unwrap(), "first\nsecond\nthird\n");
}

#[test]
fn file_misuse_is_reported() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("out.txt");
    let source = format!("local f = open({})\nreturn 1", quoted(&path));
    assert_eq!(fails(&source).category, Category::Runtime);

    let source = format!("local f = open({}, \"w\")\nreturn read_line(f)", quoted(&path));
    let err = fails(&source);
    assert_eq!(err.category, Category::Runtime);
    assert!(err.message.contains("opened for writing"), "{}", err.message);

    let source = format!("local f = open({}, \"w\")\nreturn f.path", quoted(&path));
    assert_eq!(text(&source), path.display().to_string());
}

#[test]
fn directories_and_paths() {
    let dir = tempfile::tempdir().unwrap();
    let source = format!(
        r#"
        local root = join_path({d}, "work")
        create_directory(join_path(root, "sub"))
        local f = open(join_path(root, "b.TXT"), "w")
        close(f)
        f = open(join_path(root, "a.rill"), "w")
        close(f)
        local names = list_directory(root)
        local ext = get_extension(names[2], true)
        local ok = is_directory(join_path(root, "sub")) and exists(join_path(root, "a.rill"))
        remove_directory(root, true)
        return join(names, ",") & " " & ext & " " & str(ok) & " " & str(exists(root))
        "#,
        d = quoted(dir.path())
    );
    assert_eq!(text(&source), "a.rill,b.TXT,sub .txt true false");
    assert_eq!(text("return get_base_name(\"a/b/c.tar.gz\") & \" \" & strip_extension(\"c.tar.gz\")"), "c.tar.gz c.tar");
}

#[test]
fn regex_reports_the_last_match() {
    let source = r#"
        local r = Regex("(\\d+)-(\\d+)")
        local found = match(r, "tél 12-345")
        return str(found) & " " & group(r, 2) & " " & str(get_start(r, 1)) & " " & str(get_end(r, 0)) & " " & str(count(r)) & " " & r.pattern
    "#;
    assert_eq!(text(source), r"true 345 5 11 2 (\d+)-(\d+)");

    let err = fails("local r = Regex(\"a\")\nmatch(r, \"b\")\nreturn group(r, 0)");
    assert_eq!(err.category, Category::Index);
    assert_eq!(err.line, Some(3));
}

#[test]
fn regex_matching_can_start_later() {
    let source = r#"
        local r = Regex("a.", "caseless")
        match(r, "xA1 a2", 3)
        return group(r, 0)
    "#;
    assert_eq!(text(source), "a2");
}

#[test]
fn modules_hold_named_members() {
    let source = r#"
        local m = Module("shapes")
        m.area = function(w, h) return w * h end
        m["unit"] = 1
        m.sides = [3]
        append(m.sides, 4)
        return contains(m, "area") & " " & contains(m, "volume") & " " & (m.area(3, 4) + m.unit) & " " & len(m.sides) & " " & m
    "#;
    assert_eq!(text(source), "true false 13 2 <Module shapes>");
    assert_eq!(fails("return Module(3)").category, Category::Type);
    assert_eq!(fails("local m = Module(\"m\")\nreturn m.nothing").category, Category::Index);
}
