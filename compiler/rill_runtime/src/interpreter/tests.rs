#![allow(clippy::unwrap_used, reason = "Tests use unwrap for brevity")]

use super::*;
use crate::error::Category;
use crate::print_handler::buffer_handler;
use pretty_assertions::assert_eq;
use std::sync::Arc;

fn run(source: &str) -> Variant {
    Runtime::new().do_string(source).unwrap()
}

fn run_text(source: &str) -> String {
    run(source).to_text().unwrap().to_string()
}

fn run_err(source: &str) -> Error {
    Runtime::new().do_string(source).unwrap_err()
}

fn output(rt: &mut Runtime, source: &str) -> String {
    let out = buffer_handler();
    rt.set_print_handler(Arc::clone(&out));
    rt.do_string(source).unwrap();
    out.take_output()
}

// -----------------------------------------------------------------------------
// Expressions
// -----------------------------------------------------------------------------

#[test]
fn precedence() {
    assert!(matches!(run("return 2 + 3 * 4"), Variant::Integer(14)));
    assert!(matches!(run("return -(2 ^ 3)"), Variant::Integer(-8)));
}

#[test]
fn logical_operators_yield_operands() {
    assert_eq!(run_text("return (null or \"x\") & (1 and 2)"), "x2");
    assert_eq!(run_text("return \"a\" if 1 > 2 else \"b\""), "b");
}

#[test]
fn three_way_comparison() {
    assert_eq!(run_text("return (1 <=> 2) & (2 <=> 2) & (\"b\" <=> \"a\")"), "-101");
}

#[test]
fn concatenation_uses_display_forms() {
    assert_eq!(run_text("return 1.0 & \" \" & [1, \"a\"] & \" \" & null"), "1.0 [1, \"a\"] null");
}

#[test]
fn string_indexing_counts_characters() {
    assert_eq!(run_text("return \"héllo\"[2] & \"abc\"[-1]"), "éc");
}

#[test]
fn arithmetic_errors() {
    assert_eq!(run_err("return 9223372036854775807 + 1").category, Category::Math);
    assert_eq!(run_err("return 1 / 0").category, Category::Math);
    assert_eq!(run_err("return 1 + \"a\"").category, Category::Type);
}

// -----------------------------------------------------------------------------
// Statements
// -----------------------------------------------------------------------------

#[test]
fn print_separates_with_spaces() {
    let mut rt = Runtime::new();
    assert_eq!(output(&mut rt, "print 1, \"a\", 2.5"), "1 a 2.5\n");
    assert_eq!(output(&mut rt, "print \"a\",\nprint \"b\""), "ab\n");
}

#[test]
fn numeric_for_loops() {
    assert!(matches!(
        run("local s = 0\nfor i = 1 to 10 do s += i end\nreturn s"),
        Variant::Integer(55)
    ));
    assert_eq!(
        run_text("local s = \"\"\nfor i = 10 downto 1 step 3 do s = s & i & \" \" end\nreturn s"),
        "10 7 4 1 "
    );
}

#[test]
fn loop_counter_overflow_is_a_math_error() {
    let mut rt = Runtime::new();
    let out = buffer_handler();
    rt.set_print_handler(Arc::clone(&out));
    let err = rt
        .do_string("for i = 9223372036854775806 to 9223372036854775807 do print i end")
        .unwrap_err();
    assert_eq!(err.category, Category::Math);
    assert_eq!(out.take_output(), "9223372036854775806\n9223372036854775807\n");
    assert_eq!(run_err("for i = \"a\" to 3 do pass end").category, Category::Type);
}

#[test]
fn core_functions_are_always_installed() {
    let rt = Runtime::new();
    for (name, overloads) in [("gc", 2), ("load", 1), ("compile", 2), ("read_line", 1), ("quit", 2), ("error", 1)] {
        let global = rt.get_global(name).unwrap();
        let count = global.with_data(|data| match data {
            ObjectData::Function(f) => Some(f.closures().len()),
            _ => None,
        });
        assert_eq!(count, Some(overloads), "{name}");
    }
}

#[test]
fn module_members_are_fields() {
    let mut rt = Runtime::new();
    let geo = rt.new_module("geo");
    rt.add_global("geo", geo);
    let source = "\
geo.origin = [0, 0]
geo.origin[2] = 5
geo[\"scale\"] = 2
return geo.origin[2] * geo.scale";
    assert!(matches!(rt.do_string(source).unwrap(), Variant::Integer(10)));
    assert_eq!(rt.do_string("return geo").unwrap().to_string(), "<Module geo>");

    let err = rt.do_string("return geo.radius").unwrap_err();
    assert_eq!(err.category, Category::Index);
    assert!(err.message.contains("missing key in module \"geo\": \"radius\""));
}

#[test]
fn module_cycles_are_collected() {
    let mut rt = Runtime::new();
    rt.collect();
    let baseline = rt.tracked_count();
    let m = rt.new_module("m");
    rt.add_global("m", m);
    rt.do_string("m.me = m\nm.items = [m]\nm = null").unwrap();
    assert!(rt.tracked_count() > baseline);
    rt.collect();
    assert_eq!(rt.tracked_count(), baseline);
}

#[test]
fn break_and_continue() {
    let source = "\
local i = 0
local odd = 0
while true do
    i += 1
    if i > 10 then break end
    if i % 2 == 0 then continue end
    odd += 1
end
return odd";
    assert!(matches!(run(source), Variant::Integer(5)));
}

#[test]
fn repeat_runs_at_least_once() {
    assert!(matches!(
        run("local n = 5\nrepeat\n n += 1\nuntil n >= 3\nreturn n"),
        Variant::Integer(6)
    ));
}

#[test]
fn foreach_over_containers() {
    assert_eq!(
        run_text("local s = \"\"\nforeach k, v in {\"a\": 1, \"b\": 2} do s = s & k & v end\nreturn s"),
        "a1b2"
    );
    assert!(matches!(
        run("local n = 0\nforeach c in \"héllo\" do n += 1 end\nreturn n"),
        Variant::Integer(5)
    ));
    assert!(matches!(
        run("local t = 0.0\nforeach x in @[1, 2; 3, 4] do t += x end\nreturn t"),
        Variant::Float(f) if (f - 10.0).abs() < f64::EPSILON
    ));
}

#[test]
fn foreach_by_reference_writes_elements() {
    let source = "\
local xs = [1, 2, 3]
foreach ref x in xs do x *= 10 end
local total = 0
foreach i, x in xs do total += i * x end
return total";
    assert!(matches!(run(source), Variant::Integer(140)));
}

#[test]
fn assert_and_throw() {
    let err = run_err("assert 1 == 2, \"nope\"");
    assert_eq!(err.category, Category::Assertion);
    assert_eq!(err.message, "nope");

    let err = run_err("throw \"bad\"");
    assert_eq!(err.category, Category::User);
    assert_eq!(err.message, "bad");
}

#[test]
fn debug_blocks_follow_the_mode() {
    let mut rt = Runtime::new();
    assert_eq!(output(&mut rt, "debug print 1\nprint 2"), "2\n");
    assert_eq!(output(&mut rt, "option debug\ndebug print 1\nprint 2"), "1\n2\n");
    rt.set_debug(true);
    assert_eq!(output(&mut rt, "debug print 1"), "1\n");
}

// -----------------------------------------------------------------------------
// Values
// -----------------------------------------------------------------------------

#[test]
fn containers_are_copied_on_write() {
    assert_eq!(
        run_text("local a = [1, 2, 3]\nlocal b = a\nb[1] = 10\nreturn a[1] & \",\" & b[1]"),
        "1,10"
    );
    assert_eq!(
        run_text("local m = [[1, 2], [3, 4]]\nlocal copy = m\nm[2][1] = 30\nreturn copy[2][1] & \",\" & m[2][1]"),
        "3,30"
    );
}

#[test]
fn table_fields() {
    assert_eq!(
        run_text("local t = {\"name\": \"x\"}\nt.count = 2\nreturn t.name & t.count"),
        "x2"
    );
    assert_eq!(run_err("local t = {}\nreturn t.nothing").category, Category::Index);
}

#[test]
fn sets_and_arrays() {
    assert!(matches!(run("local s = {1, 2}\nreturn s[2] and not s[5]"), Variant::Boolean(true)));
    assert!(matches!(
        run("local a = @[1, 2; 3, 4]\na[2, 1] = 10\nreturn a[2, 1] + a[4]"),
        Variant::Float(f) if (f - 14.0).abs() < f64::EPSILON
    ));
    assert_eq!(run_err("return [1, 2][3]").category, Category::Index);
}

// -----------------------------------------------------------------------------
// Functions
// -----------------------------------------------------------------------------

#[test]
fn closures_share_upvalues() {
    let source = "\
function counter()
    local n = 0
    return function()
        n += 1
        return n
    end
end
local a = counter()
local b = counter()
a()
a()
return a() & \",\" & b()";
    assert_eq!(run_text(source), "3,1");
}

#[test]
fn local_functions_can_recurse() {
    let source = "\
do
    local function fact(n)
        if n <= 1 then return 1 end
        return n * fact(n - 1)
    end
    return fact(10)
end";
    assert!(matches!(run(source), Variant::Integer(3_628_800)));
}

#[test]
fn reference_parameters() {
    let source = "\
function inc(ref x)
    x += 1
end
local n = 1
inc(n)
inc(n)
return n";
    assert!(matches!(run(source), Variant::Integer(3)));

    let source = "\
function set_first(ref v) v = 99 end
local xs = [1, 2]
set_first(xs[1])
return xs[1]";
    assert!(matches!(run(source), Variant::Integer(99)));
}

#[test]
fn dispatch_on_argument_classes() {
    let source = "\
function describe(x as Integer) return \"int\" end
function describe(x as Number) return \"number\" end
function describe(x) return \"object\" end
return describe(1) & \" \" & describe(1.5) & \" \" & describe(\"s\")";
    assert_eq!(run_text(source), "int number object");
}

#[test]
fn identical_signature_replaces() {
    let source = "\
function f(x as Integer) return 1 end
function f(x as Integer) return 2 end
return f(0)";
    assert!(matches!(run(source), Variant::Integer(2)));
}

#[test]
fn dispatch_failures() {
    let err = run_err("function f(x as List) return 1 end\nf(1)");
    assert_eq!(err.category, Category::Type);
    assert!(err.message.starts_with("Cannot find a version of function 'f'"));
    assert_eq!(err.line, Some(2));

    let err = run_err(
        "function g(a as Integer, b as Number) end\nfunction g(a as Number, b as Integer) end\ng(1, 1)",
    );
    assert_eq!(err.category, Category::Runtime);
    assert!(err.message.contains("ambiguity"));
}

#[test]
fn reference_flags_must_agree() {
    let err = run_err("function f(ref x as Integer) end\nfunction f(x as Integer) end");
    assert_eq!(err.category, Category::Reference);
}

#[test]
fn calling_a_non_function() {
    assert_eq!(run_err("local x = 1\nx()").category, Category::Type);
    assert_eq!(run_err("Integer()").category, Category::Type);
}

#[test]
fn compile_builtin_returns_a_function() {
    assert!(matches!(
        run("local f = compile(\"return 40 + 2\")\nreturn f()"),
        Variant::Integer(42)
    ));
}

#[test]
fn quit_carries_status() {
    let err = run_err("quit(3)");
    assert!(err.is_exit());
    assert_eq!(err.status, 3);
}

// -----------------------------------------------------------------------------
// Host interface
// -----------------------------------------------------------------------------

#[test]
fn errors_carry_the_line() {
    let err = run_err("x = 1\ny = undefined_name");
    assert_eq!(err.category, Category::Name);
    assert_eq!(err.line, Some(2));
    assert_eq!(err.file.as_deref(), Some("[string]"));
}

#[test]
fn runtime_is_reusable_after_an_error() {
    let mut rt = Runtime::new();
    assert!(rt.do_string("error(\"x\")").is_err());
    assert_eq!(rt.stack_len(), 0);
    assert_eq!(rt.call_depth(), 0);
    assert!(matches!(rt.do_string("return 1").unwrap(), Variant::Integer(1)));
}

#[test]
fn pcall_restores_the_stack() {
    let mut rt = Runtime::new();
    rt.do_string("function deep(n)\n if n == 0 then error(\"boom\") end\n return deep(n - 1)\nend")
        .unwrap();
    rt.push(Variant::Integer(7)).unwrap();
    let depth = rt.stack_len();

    rt.push(rt.get_global("deep").unwrap()).unwrap();
    rt.push(Variant::Integer(10)).unwrap();
    let err = rt.pcall(1).unwrap_err();
    assert_eq!(err.category, Category::User);
    assert_eq!(err.backtrace.as_ref().map(|t| t.frames().len()), Some(11));
    assert_eq!(rt.stack_len(), depth + 1);
    assert_eq!(rt.call_depth(), 0);
    assert!(rt.pop().unwrap().to_text().unwrap().contains("boom"));
    assert!(matches!(rt.pop().unwrap(), Variant::Integer(7)));
}

#[test]
fn call_leaves_the_result() {
    let mut rt = Runtime::new();
    rt.do_string("function add(a, b) return a + b end").unwrap();
    rt.push(rt.get_global("add").unwrap()).unwrap();
    rt.push(Variant::Integer(2)).unwrap();
    rt.push(Variant::Integer(3)).unwrap();
    rt.call(2).unwrap();
    assert_eq!(rt.stack_len(), 1);
    assert!(matches!(rt.peek(0).unwrap(), Variant::Integer(5)));
}

#[test]
fn deep_recursion_is_a_fatal_error() {
    let mut rt = Runtime::with_config(RuntimeConfig::default().with_call_depth(100));
    let err = rt.do_string("function r(n) return r(n + 1) end\nr(0)").unwrap_err();
    assert!(err.is_fatal());
    assert_eq!(err.message, "stack overflow");
    assert_eq!(rt.call_depth(), 0);
}

#[test]
fn popping_an_empty_stack_is_fatal() {
    let mut rt = Runtime::new();
    let err = rt.pop().unwrap_err();
    assert!(err.is_fatal());
    assert_eq!(err.message, "stack underflow");
}

#[test]
fn stack_trace_from_a_native() {
    let mut rt = Runtime::new();
    rt.add_global_function("trace", |rt, _| Ok(Variant::from(rt.get_stack_trace())), &[], 0)
        .unwrap();
    let source = "function inner() return trace() end\nfunction outer() return inner() end\nreturn outer()";
    let trace = rt.do_string_named("t.rill", source).unwrap();
    assert_eq!(
        &*trace.to_text().unwrap(),
        "\n\tat inner (t.rill:1)\n\tat outer (t.rill:2)\n\tat <main> (t.rill:3)"
    );
}

#[test]
fn compiling_twice_gives_distinct_routines() {
    let rt = Runtime::new();
    let a = rt.compile("return 1", "a").unwrap();
    let b = rt.compile("return 1", "a").unwrap();
    assert!(!Rc::ptr_eq(&a, &b));
}

#[test]
fn syntax_errors_abort_loading() {
    let mut rt = Runtime::new();
    let err = rt.do_string("function f()\n return 1\n").unwrap_err();
    assert_eq!(err.category, Category::Syntax);
    assert!(rt.get_global("f").is_none());
}

fn point_class(rt: &mut Runtime) -> Rc<Class> {
    let object = Rc::clone(&rt.classes().object);
    let integer = Rc::clone(&rt.classes().integer);
    let point = rt.create_class("Point", &object, Capability::ATOMIC);
    let class = Rc::clone(&point);
    rt.add_initializer(
        &point,
        move |rt, args| {
            let mut table = Table::default();
            table.insert(HashKeyFor::string("x"), args[0].resolve());
            table.insert(HashKeyFor::string("y"), args[1].resolve());
            Ok(Variant::Object(rt.new_object(&class, ObjectData::Table(table))))
        },
        &[Rc::clone(&integer), integer],
        0,
    )
    .unwrap();
    rt.add_accessor(&point, "sum", |_, args| {
        let x = args[0].with_data(|data| match data {
            ObjectData::Table(t) => t.values().map(|v| v.to_integer().ok()).sum::<Option<i64>>(),
            _ => None,
        });
        Ok(x.map_or(Variant::Null, Variant::Integer))
    }, None);
    point
}

struct HashKeyFor;

impl HashKeyFor {
    fn string(text: &str) -> crate::value::HashKey {
        crate::value::HashKey::String(Rc::from(text))
    }
}

#[test]
fn host_classes_are_constructible() {
    let mut rt = Runtime::new();
    let point = point_class(&mut rt);
    assert!(matches!(
        rt.do_string("local p = Point(3, 4)\nreturn p.x + p.y").unwrap(),
        Variant::Integer(7)
    ));
    assert!(matches!(rt.do_string("return Point(3, 4).sum").unwrap(), Variant::Integer(7)));

    let err = rt.do_string("local p = Point(1, 2)\np.sum = 3").unwrap_err();
    assert_eq!(err.category, Category::Reference);

    rt.push(Variant::Object(rt.classes().object_of(&point).unwrap())).unwrap();
    rt.push(Variant::Integer(1)).unwrap();
    rt.push(Variant::Integer(2)).unwrap();
    rt.construct(2).unwrap();
    let value = rt.pop().unwrap();
    assert_eq!(value.type_name(), "Point");
}

#[test]
fn constructing_a_non_class_is_an_error() {
    let mut rt = Runtime::new();
    rt.do_string("function f() return 1 end").unwrap();
    rt.push(rt.get_global("f").unwrap()).unwrap();
    let err = rt.pconstruct(0).unwrap_err();
    assert_eq!(err.category, Category::Type);
    assert_eq!(rt.stack_len(), 1);
}

#[test]
fn global_functions_accumulate_overloads() {
    let mut rt = Runtime::new();
    let integer = Rc::clone(&rt.classes().integer);
    let string = Rc::clone(&rt.classes().string);
    rt.add_global_function("kind", |_, _| Ok(Variant::from("int")), &[integer], 0)
        .unwrap();
    rt.add_global_function("kind", |_, _| Ok(Variant::from("str")), &[string], 0)
        .unwrap();
    assert_eq!(
        &*rt.do_string("return kind(1) & kind(\"a\")").unwrap().to_text().unwrap(),
        "intstr"
    );
}

#[test]
fn natives_mutate_reference_arguments() {
    let mut rt = Runtime::new();
    let list = Rc::clone(&rt.classes().list);
    let object = Rc::clone(&rt.classes().object);
    rt.add_global_function(
        "push",
        |rt, args| {
            let value = args[1].clone();
            rt.with_list_mut(&args[0], |items| {
                items.push(value);
                Ok(())
            })?;
            Ok(Variant::Null)
        },
        &[list, object],
        0b1,
    )
    .unwrap();
    let source = "local a = [1]\nlocal b = a\npush(b, 2)\nreturn a & b";
    assert_eq!(&*rt.do_string(source).unwrap().to_text().unwrap(), "[1][1, 2]");
}

#[test]
fn gc_report_goes_to_the_print_handler() {
    let mut rt = Runtime::new();
    let out = output(&mut rt, "gc(true)");
    assert!(out.starts_with("garbage collected: "));
}
