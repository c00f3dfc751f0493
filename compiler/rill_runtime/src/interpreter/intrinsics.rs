//! Functions every runtime has: collection, loading and process control.
//! The library of `rill_builtins` is registered on top of these.

use super::Runtime;
use crate::class::Class;
use crate::error::{Error, Result};
use crate::function::{Function, NativeCallback, Signature};
use crate::value::Variant;
use std::io::BufRead;
use std::path::Path;
use std::rc::Rc;

/// Install the core functions on a fresh runtime.
pub(super) fn register(rt: &mut Runtime) {
    let boolean = Rc::clone(&rt.classes.boolean);
    let integer = Rc::clone(&rt.classes.integer);
    let string = Rc::clone(&rt.classes.string);
    let object = Rc::clone(&rt.classes.object);

    install(
        rt,
        "gc",
        vec![
            overload(&[], |rt, _| {
                rt.collect();
                Ok(Variant::Null)
            }),
            overload(&[Rc::clone(&boolean)], |rt, args| {
                if args[0].to_boolean()? {
                    rt.collect_and_report();
                } else {
                    rt.collect();
                }
                Ok(Variant::Null)
            }),
        ],
    );

    // Run a script file and return its result.
    install(
        rt,
        "load",
        vec![overload(&[Rc::clone(&string)], |rt, args| {
            let path = args[0].to_text()?;
            rt.do_file(Path::new(&*path))
        })],
    );

    // Compile source text into a function without running it.
    install(
        rt,
        "compile",
        vec![
            overload(&[Rc::clone(&string)], |rt, args| {
                let source = args[0].to_text()?;
                rt.load_string("[string]", &source)
            }),
            overload(&[Rc::clone(&string), Rc::clone(&string)], |rt, args| {
                let source = args[0].to_text()?;
                let name = args[1].to_text()?;
                rt.load_string(&name, &source)
            }),
        ],
    );

    install(rt, "read_line", vec![overload(&[], |_, _| read_line())]);

    install(
        rt,
        "quit",
        vec![
            overload(&[], |_, _| Err(Error::exit(0))),
            overload(&[integer], |_, args| {
                let code = args[0].to_integer()?;
                Err(Error::exit(i32::try_from(code).unwrap_or(1)))
            }),
        ],
    );

    install(
        rt,
        "error",
        vec![overload(&[object], |_, args| Err(Error::user(args[0].to_string())))],
    );
}

fn overload(
    signature: &[Rc<Class>],
    callback: impl Fn(&mut Runtime, &mut [Variant]) -> Result<Variant> + 'static,
) -> (NativeCallback, Signature) {
    (Rc::new(callback), signature.iter().cloned().collect())
}

fn install(rt: &mut Runtime, name: &str, overloads: Vec<(NativeCallback, Signature)>) {
    let function = rt.new_function(Function::native_by_value(name, overloads));
    rt.globals.insert(Rc::from(name), Variant::Object(function));
}

/// A line from standard input without its terminator, or null at the end
/// of input.
fn read_line() -> Result<Variant> {
    let mut line = String::new();
    let read = std::io::stdin()
        .lock()
        .read_line(&mut line)
        .map_err(|err| Error::runtime(format!("cannot read from standard input: {err}")))?;
    if read == 0 {
        return Ok(Variant::Null);
    }
    let trimmed = line.trim_end_matches(['\n', '\r']).len();
    line.truncate(trimmed);
    Ok(Variant::from(line))
}
