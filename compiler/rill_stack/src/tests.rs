use super::ensure_sufficient_stack;

fn nest(depth: u32) -> u32 {
    ensure_sufficient_stack(|| if depth == 0 { 0 } else { nest(depth - 1) + 1 })
}

#[test]
fn passes_value_through() {
    assert_eq!(ensure_sufficient_stack(|| "done"), "done");
}

#[test]
fn survives_recursion_deeper_than_main_stack() {
    assert_eq!(nest(200_000), 200_000);
}

#[test]
fn propagates_errors() {
    let result: Result<(), String> = ensure_sufficient_stack(|| Err("boom".to_string()));
    assert_eq!(result, Err("boom".to_string()));
}
