#![allow(clippy::unwrap_used, reason = "Tests use unwrap for brevity")]

use super::*;
use pretty_assertions::assert_eq;

#[test]
fn buffer_println_appends_newline() {
    let handler = buffer_handler();
    handler.println("hello");
    assert_eq!(handler.output(), "hello\n");
}

#[test]
fn buffer_print_keeps_line_open() {
    let handler = buffer_handler();
    handler.print("a");
    handler.print(" ");
    handler.println("b");
    assert_eq!(handler.output(), "a b\n");
}

#[test]
fn take_output_drains_buffer() {
    let handler = buffer_handler();
    handler.println("one");
    assert_eq!(handler.take_output(), "one\n");
    assert_eq!(handler.output(), "");
}

#[test]
fn clear_empties_buffer() {
    let handler = buffer_handler();
    handler.println("x");
    handler.clear();
    assert!(handler.output().is_empty());
}

#[test]
fn stdout_does_not_capture() {
    let handler = stdout_handler();
    assert_eq!(handler.output(), "");
    handler.clear();
}

#[test]
fn silent_discards_everything() {
    let handler = silent_handler();
    handler.println("hello");
    handler.print("world");
    assert_eq!(handler.take_output(), "");
}

#[test]
fn buffer_is_shared_across_threads() {
    let handler = buffer_handler();
    let other = Arc::clone(&handler);
    let worker = std::thread::spawn(move || {
        for _ in 0..50 {
            other.println("a");
        }
    });
    for _ in 0..50 {
        handler.println("b");
    }
    worker.join().unwrap();
    assert_eq!(handler.output().lines().count(), 100);
}
