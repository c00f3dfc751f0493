#![allow(clippy::unwrap_used, reason = "Tests use unwrap for brevity")]

use crate::value::Variant;
use crate::{Runtime, RuntimeConfig};
use pretty_assertions::assert_eq;

fn runtime() -> Runtime {
    // Automatic collections would make the counts below unpredictable.
    Runtime::with_config(RuntimeConfig::default().with_gc_threshold(0))
}

const MAKE_CYCLE: &str = "\
function make()
    local function f() return f end
    return 0
end";

#[test]
fn cycles_are_reclaimed() {
    let mut rt = runtime();
    rt.do_string(MAKE_CYCLE).unwrap();
    rt.collect();
    let baseline = rt.tracked_count();

    rt.do_string("for i = 1 to 10 do make() end").unwrap();
    assert!(rt.tracked_count() > baseline);

    let stats = rt.collect();
    assert!(stats.freed >= 10);
    assert_eq!(rt.tracked_count(), baseline);
}

#[test]
fn reachable_cycles_survive() {
    let mut rt = runtime();
    rt.do_string("function keep()\n local function f() return f end\n return f\nend\nkept = keep()")
        .unwrap();
    rt.collect();
    rt.collect();
    let result = rt.do_string("return kept() == kept").unwrap();
    assert!(matches!(result, Variant::Boolean(true)));
}

#[test]
fn values_held_by_the_host_survive() {
    let mut rt = runtime();
    rt.do_string("function keep()\n local function f() return 5 end\n return f\nend\nkept = keep()")
        .unwrap();
    let held = rt.get_global("kept").unwrap();
    rt.do_string("kept = null").unwrap();
    rt.collect();
    assert!(matches!(rt.call_value(&held, &[]).unwrap(), Variant::Integer(5)));
}

#[test]
fn stack_values_are_roots() {
    let mut rt = runtime();
    let list = rt.new_list(vec![Variant::Integer(1)]);
    rt.push(list).unwrap();
    let stats = rt.collect();
    assert_eq!(stats.freed, 0);
    assert_eq!(rt.pop().unwrap().to_string(), "[1]");
}

#[test]
fn threshold_triggers_collection() {
    let mut rt = Runtime::with_config(RuntimeConfig::default().with_gc_threshold(5));
    rt.do_string(MAKE_CYCLE).unwrap();
    rt.do_string("for i = 1 to 100 do make() end").unwrap();
    // Entries pile up between runs only until the next threshold.
    rt.do_string("return 0").unwrap();
    assert!(rt.tracked_count() < 100);
}

#[test]
fn gc_report_counts() {
    let mut rt = runtime();
    let out = crate::print_handler::buffer_handler();
    rt.set_print_handler(std::sync::Arc::clone(&out));
    rt.do_string(MAKE_CYCLE).unwrap();
    rt.do_string("make()\nmake()").unwrap();
    let stats = rt.collect_and_report();
    assert_eq!(
        out.take_output(),
        format!("garbage collected: {}/{} objects\n", stats.freed, stats.tracked)
    );
}
