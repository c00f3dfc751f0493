//! Paths, directories and the host environment.
//!
//! Path strings are handled as text. Extensions are looked up in the last
//! path component only and include their leading dot.

use crate::helpers::Kinds;
use rill_runtime::{Error, Result, Runtime, Variant};
use std::fs;
use std::path::{Path, PathBuf, MAIN_SEPARATOR_STR};
use std::rc::Rc;

fn io_failure(action: &str, path: &Path, err: &std::io::Error) -> Error {
    Error::runtime(format!("cannot {action} \"{}\": {err}", path.display()))
}

fn text(path: &Path) -> Variant {
    Variant::from(path.to_string_lossy().into_owned())
}

fn path_arg(value: &Variant) -> Result<PathBuf> {
    Ok(PathBuf::from(&*value.to_text()?))
}

/// Byte offset of the extension dot in the last component of `path`.
fn extension_dot(path: &str) -> Option<usize> {
    let name_start = path.rfind(['/', std::path::MAIN_SEPARATOR]).map_or(0, |i| i + 1);
    path[name_start..].rfind('.').map(|i| name_start + i)
}

/// `path` split into stem and extension, such as `("notes", ".txt")`.
pub fn split_extension(path: &str) -> (&str, &str) {
    match extension_dot(path) {
        Some(dot) => path.split_at(dot),
        None => (path, ""),
    }
}

/// Last component of `path`, or the whole path if it has no separator.
pub fn base_name(path: &str) -> &str {
    path.rfind(['/', std::path::MAIN_SEPARATOR]).map_or(path, |i| &path[i + 1..])
}

/// Everything before the last separator, or an empty string.
pub fn directory_name(path: &str) -> &str {
    path.rfind(['/', std::path::MAIN_SEPARATOR]).map_or("", |i| &path[..i])
}

/// Entry names in `dir`, sorted. Names starting with a dot are skipped
/// unless `hidden` is set.
pub fn list_directory(dir: &Path, hidden: bool) -> Result<Vec<String>> {
    let entries = fs::read_dir(dir).map_err(|e| io_failure("list directory", dir, &e))?;
    let mut names = Vec::new();
    for entry in entries {
        let entry = entry.map_err(|e| io_failure("list directory", dir, &e))?;
        let name = entry.file_name().to_string_lossy().into_owned();
        if hidden || !name.starts_with('.') {
            names.push(name);
        }
    }
    names.sort();
    Ok(names)
}

/// Remove everything inside `dir`, keeping the directory itself.
pub fn clear_directory(dir: &Path) -> Result<()> {
    for name in list_directory(dir, true)? {
        let path = dir.join(name);
        remove_path(&path)?;
    }
    Ok(())
}

fn remove_path(path: &Path) -> Result<()> {
    let result = if path.is_dir() { fs::remove_dir_all(path) } else { fs::remove_file(path) };
    result.map_err(|e| io_failure("remove", path, &e))
}

fn user_directory() -> Result<PathBuf> {
    ["HOME", "USERPROFILE"]
        .iter()
        .find_map(|var| std::env::var_os(var))
        .map(PathBuf::from)
        .ok_or_else(|| Error::runtime("cannot locate the user directory"))
}

fn os_name() -> &'static str {
    match std::env::consts::OS {
        "windows" => "windows",
        "macos" => "macos",
        "linux" => "linux",
        _ => "generic",
    }
}

/// An unused file name in the temporary directory.
fn temp_name() -> PathBuf {
    let dir = std::env::temp_dir();
    loop {
        let candidate = dir.join(format!("rill-{:08x}", fastrand::u32(..)));
        if !candidate.exists() {
            return candidate;
        }
    }
}

pub fn register(rt: &mut Runtime) -> Result<()> {
    let k = Kinds::of(rt);
    let s = [Rc::clone(&k.string)];
    let s_s = [Rc::clone(&k.string), Rc::clone(&k.string)];
    let s_b = [Rc::clone(&k.string), Rc::clone(&k.boolean)];

    rt.add_global_function(
        "get_current_directory",
        |_, _| {
            let dir = std::env::current_dir().map_err(|e| Error::runtime(format!("cannot get current directory: {e}")))?;
            Ok(text(&dir))
        },
        &[],
        0,
    )?;
    rt.add_global_function(
        "set_current_directory",
        |_, a| {
            let dir = path_arg(&a[0])?;
            std::env::set_current_dir(&dir).map_err(|e| io_failure("change directory to", &dir, &e))?;
            Ok(Variant::Null)
        },
        &s,
        0,
    )?;
    rt.add_global_function("get_temp_directory", |_, _| Ok(text(&std::env::temp_dir())), &[], 0)?;
    rt.add_global_function("get_temp_name", |_, _| Ok(text(&temp_name())), &[], 0)?;
    rt.add_global_function("get_user_directory", |_, _| Ok(text(&user_directory()?)), &[], 0)?;
    rt.add_global_function("get_path_separator", |_, _| Ok(Variant::from(MAIN_SEPARATOR_STR)), &[], 0)?;
    rt.add_global_function("get_os_name", |_, _| Ok(Variant::from(os_name())), &[], 0)?;

    rt.add_global_function(
        "get_full_path",
        |_, a| {
            let path = path_arg(&a[0])?;
            let full = std::path::absolute(&path).map_err(|e| io_failure("resolve", &path, &e))?;
            Ok(text(&full))
        },
        &s,
        0,
    )?;
    rt.add_global_function(
        "join_path",
        |_, a| Ok(text(&path_arg(&a[0])?.join(&*a[1].to_text()?))),
        &s_s,
        0,
    )?;
    rt.add_global_function("get_base_name", |_, a| Ok(Variant::from(base_name(&a[0].to_text()?))), &s, 0)?;
    rt.add_global_function("get_directory", |_, a| Ok(Variant::from(directory_name(&a[0].to_text()?))), &s, 0)?;
    rt.add_global_function(
        "split_extension",
        |rt, a| {
            let path = a[0].to_text()?;
            let (stem, ext) = split_extension(&path);
            Ok(rt.new_list(vec![Variant::from(stem), Variant::from(ext)]))
        },
        &s,
        0,
    )?;
    rt.add_global_function("get_extension", |_, a| Ok(Variant::from(split_extension(&a[0].to_text()?).1)), &s, 0)?;
    rt.add_global_function(
        "get_extension",
        |_, a| {
            let path = a[0].to_text()?;
            let ext = split_extension(&path).1;
            Ok(if a[1].to_boolean()? {
                Variant::from(ext.to_lowercase())
            } else {
                Variant::from(ext)
            })
        },
        &s_b,
        0,
    )?;
    rt.add_global_function("strip_extension", |_, a| Ok(Variant::from(split_extension(&a[0].to_text()?).0)), &s, 0)?;

    rt.add_global_function(
        "create_directory",
        |_, a| {
            let dir = path_arg(&a[0])?;
            fs::create_dir_all(&dir).map_err(|e| io_failure("create directory", &dir, &e))?;
            Ok(Variant::Null)
        },
        &s,
        0,
    )?;
    rt.add_global_function(
        "remove_directory",
        |_, a| {
            let dir = path_arg(&a[0])?;
            fs::remove_dir(&dir).map_err(|e| io_failure("remove directory", &dir, &e))?;
            Ok(Variant::Null)
        },
        &s,
        0,
    )?;
    rt.add_global_function(
        "remove_directory",
        |_, a| {
            let dir = path_arg(&a[0])?;
            let result = if a[1].to_boolean()? { fs::remove_dir_all(&dir) } else { fs::remove_dir(&dir) };
            result.map_err(|e| io_failure("remove directory", &dir, &e))?;
            Ok(Variant::Null)
        },
        &s_b,
        0,
    )?;
    rt.add_global_function(
        "clear_directory",
        |_, a| {
            clear_directory(&path_arg(&a[0])?)?;
            Ok(Variant::Null)
        },
        &s,
        0,
    )?;
    rt.add_global_function(
        "list_directory",
        |rt, a| {
            let names = list_directory(&path_arg(&a[0])?, false)?;
            Ok(rt.new_list(names.into_iter().map(Variant::from).collect()))
        },
        &s,
        0,
    )?;
    rt.add_global_function(
        "list_directory",
        |rt, a| {
            let names = list_directory(&path_arg(&a[0])?, a[1].to_boolean()?)?;
            Ok(rt.new_list(names.into_iter().map(Variant::from).collect()))
        },
        &s_b,
        0,
    )?;

    rt.add_global_function(
        "remove_file",
        |_, a| {
            let path = path_arg(&a[0])?;
            fs::remove_file(&path).map_err(|e| io_failure("remove file", &path, &e))?;
            Ok(Variant::Null)
        },
        &s,
        0,
    )?;
    rt.add_global_function(
        "remove_path",
        |_, a| {
            remove_path(&path_arg(&a[0])?)?;
            Ok(Variant::Null)
        },
        &s,
        0,
    )?;
    rt.add_global_function("exists", |_, a| Ok(Variant::Boolean(path_arg(&a[0])?.exists())), &s, 0)?;
    rt.add_global_function("is_file", |_, a| Ok(Variant::Boolean(path_arg(&a[0])?.is_file())), &s, 0)?;
    rt.add_global_function("is_directory", |_, a| Ok(Variant::Boolean(path_arg(&a[0])?.is_dir())), &s, 0)?;
    rt.add_global_function(
        "rename",
        |_, a| {
            let from = path_arg(&a[0])?;
            let to = path_arg(&a[1])?;
            fs::rename(&from, &to).map_err(|e| io_failure("rename", &from, &e))?;
            Ok(Variant::Null)
        },
        &s_s,
        0,
    )?;
    Ok(())
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used, reason = "Tests use unwrap for brevity")]

    use super::*;

    #[test]
    fn extensions_come_from_the_last_component() {
        assert_eq!(split_extension("notes.txt"), ("notes", ".txt"));
        assert_eq!(split_extension("dir.d/notes"), ("dir.d/notes", ""));
        assert_eq!(split_extension("a/b.tar.gz"), ("a/b.tar", ".gz"));
    }

    #[test]
    fn base_and_directory_names() {
        assert_eq!(base_name("a/b/c.rill"), "c.rill");
        assert_eq!(base_name("c.rill"), "c.rill");
        assert_eq!(directory_name("a/b/c.rill"), "a/b");
        assert_eq!(directory_name("c.rill"), "");
    }

    #[test]
    fn hidden_entries_are_skipped() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("b.txt"), "").unwrap();
        fs::write(dir.path().join("a.txt"), "").unwrap();
        fs::write(dir.path().join(".hidden"), "").unwrap();
        assert_eq!(list_directory(dir.path(), false).unwrap(), ["a.txt", "b.txt"]);
        assert_eq!(list_directory(dir.path(), true).unwrap().len(), 3);

        clear_directory(dir.path()).unwrap();
        assert!(list_directory(dir.path(), true).unwrap().is_empty());
    }
}
