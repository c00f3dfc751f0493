//! Text files: `open`, reading and writing lines, and the `path`
//! accessor.
//!
//! Modes are `"r"` (read, the default), `"w"` (truncate and write) and
//! `"a"` (append).

use crate::helpers::{with_native, Kinds};
use rill_runtime::{Error, NativeData, Result, Runtime, Variant};
use std::any::Any;
use std::fs;
use std::io::{BufRead, BufReader, BufWriter, Read, Write};
use std::path::{Path, PathBuf};
use std::rc::Rc;

#[derive(Debug)]
enum Stream {
    Read(BufReader<fs::File>),
    Write(BufWriter<fs::File>),
    Closed,
}

/// An open file, the host value of `File` objects.
#[derive(Debug)]
pub struct FileHandle {
    path: PathBuf,
    stream: Stream,
}

impl FileHandle {
    pub fn open(path: &Path, mode: &str) -> Result<Self> {
        let failed = |err: std::io::Error| Error::runtime(format!("cannot open file \"{}\": {err}", path.display()));
        let stream = match mode {
            "r" => Stream::Read(BufReader::new(fs::File::open(path).map_err(failed)?)),
            "w" => Stream::Write(BufWriter::new(fs::File::create(path).map_err(failed)?)),
            "a" => Stream::Write(BufWriter::new(
                fs::OpenOptions::new().append(true).create(true).open(path).map_err(failed)?,
            )),
            other => return Err(Error::runtime(format!("invalid file mode \"{other}\""))),
        };
        tracing::debug!(path = %path.display(), mode, "file opened");
        Ok(FileHandle {
            path: path.to_path_buf(),
            stream,
        })
    }

    fn reader(&mut self) -> Result<&mut BufReader<fs::File>> {
        let FileHandle { path, stream } = self;
        match stream {
            Stream::Read(reader) => Ok(reader),
            Stream::Write(_) => Err(misuse(path, "read from a file opened for writing")),
            Stream::Closed => Err(misuse(path, "read from a closed file")),
        }
    }

    fn writer(&mut self) -> Result<&mut BufWriter<fs::File>> {
        let FileHandle { path, stream } = self;
        match stream {
            Stream::Write(writer) => Ok(writer),
            Stream::Read(_) => Err(misuse(path, "write to a file opened for reading")),
            Stream::Closed => Err(misuse(path, "write to a closed file")),
        }
    }

    /// Next line without its terminator, or `None` at the end of the file.
    pub fn read_line(&mut self) -> Result<Option<String>> {
        let mut line = String::new();
        let n = self.reader()?.read_line(&mut line).map_err(|e| io_error(&self.path, &e))?;
        if n == 0 {
            return Ok(None);
        }
        if line.ends_with('\n') {
            line.pop();
            if line.ends_with('\r') {
                line.pop();
            }
        }
        Ok(Some(line))
    }

    pub fn read_to_end(&mut self) -> Result<String> {
        let mut text = String::new();
        self.reader()?.read_to_string(&mut text).map_err(|e| io_error(&self.path, &e))?;
        Ok(text)
    }

    pub fn at_end(&mut self) -> Result<bool> {
        let path = self.path.clone();
        let buffered = self.reader()?.fill_buf().map_err(|e| io_error(&path, &e))?;
        Ok(buffered.is_empty())
    }

    pub fn write(&mut self, text: &str) -> Result<()> {
        self.writer()?.write_all(text.as_bytes()).map_err(|e| io_error(&self.path, &e))
    }

    pub fn close(&mut self) -> Result<()> {
        if let Stream::Write(writer) = &mut self.stream {
            writer.flush().map_err(|e| Error::runtime(format!("cannot flush file: {e}")))?;
        }
        self.stream = Stream::Closed;
        Ok(())
    }
}

fn misuse(path: &Path, what: &str) -> Error {
    Error::runtime(format!("cannot {what}: \"{}\"", path.display()))
}

fn io_error(path: &Path, err: &std::io::Error) -> Error {
    Error::runtime(format!("I/O error on \"{}\": {err}", path.display()))
}

impl NativeData for FileHandle {
    fn as_any(&self) -> &dyn Any {
        self
    }

    fn as_any_mut(&mut self) -> &mut dyn Any {
        self
    }

    fn describe(&self) -> String {
        format!("<File \"{}\">", self.path.display())
    }
}

fn file<R>(value: &Variant, f: impl FnOnce(&mut FileHandle) -> Result<R>) -> Result<R> {
    with_native(value, "File", f)
}

fn open(rt: &mut Runtime, path: &Variant, mode: &str) -> Result<Variant> {
    let handle = FileHandle::open(Path::new(&*path.to_text()?), mode)?;
    let class = Rc::clone(&rt.classes().file);
    Ok(rt.new_native(&class, Box::new(handle)))
}

pub fn register(rt: &mut Runtime) -> Result<()> {
    let k = Kinds::of(rt);
    let f = [Rc::clone(&k.file)];
    let path = [Rc::clone(&k.string)];
    let path_mode = [Rc::clone(&k.string), Rc::clone(&k.string)];
    let with_text = [Rc::clone(&k.file), Rc::clone(&k.string)];

    rt.add_global_function("open", |rt, a| open(rt, &a[0], "r"), &path, 0)?;
    rt.add_global_function("open", |rt, a| open(rt, &a[0], &a[1].to_text()?), &path_mode, 0)?;
    rt.add_initializer(&k.file, |rt, a| open(rt, &a[0], "r"), &path, 0)?;
    rt.add_initializer(&k.file, |rt, a| open(rt, &a[0], &a[1].to_text()?), &path_mode, 0)?;

    rt.add_global_function(
        "read_line",
        |_, a| Ok(file(&a[0], FileHandle::read_line)?.map_or(Variant::Null, Variant::from)),
        &f,
        0,
    )?;
    rt.add_global_function(
        "read_lines",
        |rt, a| {
            let mut lines = Vec::new();
            file(&a[0], |h| {
                while let Some(line) = h.read_line()? {
                    lines.push(Variant::from(line));
                }
                Ok(())
            })?;
            Ok(rt.new_list(lines))
        },
        &f,
        0,
    )?;
    rt.add_global_function("read", |_, a| Ok(Variant::from(file(&a[0], FileHandle::read_to_end)?)), &f, 0)?;
    rt.add_global_function("eof", |_, a| Ok(Variant::Boolean(file(&a[0], FileHandle::at_end)?)), &f, 0)?;
    rt.add_global_function(
        "write",
        |_, a| {
            let text = a[1].to_text()?;
            file(&a[0], |h| h.write(&text))?;
            Ok(Variant::Null)
        },
        &with_text,
        0,
    )?;
    rt.add_global_function(
        "write_line",
        |_, a| {
            let text = a[1].to_text()?;
            file(&a[0], |h| h.write(&format!("{text}\n")))?;
            Ok(Variant::Null)
        },
        &with_text,
        0,
    )?;
    rt.add_global_function(
        "write_lines",
        |_, a| {
            let lines = a[1].to_list()?;
            file(&a[0], |h| {
                for line in &lines {
                    h.write(&format!("{line}\n"))?;
                }
                Ok(())
            })?;
            Ok(Variant::Null)
        },
        &[Rc::clone(&k.file), Rc::clone(&k.list)],
        0,
    )?;
    rt.add_global_function(
        "close",
        |_, a| {
            file(&a[0], FileHandle::close)?;
            Ok(Variant::Null)
        },
        &f,
        0,
    )?;
    rt.add_global_function(
        "read_file",
        |_, a| {
            let path = a[0].to_text()?;
            fs::read_to_string(&*path)
                .map(Variant::from)
                .map_err(|err| Error::runtime(format!("cannot read file \"{path}\": {err}")))
        },
        &path,
        0,
    )?;

    rt.add_accessor(
        &k.file,
        "path",
        |_, a| file(&a[0], |h| Ok(Variant::from(h.path.display().to_string()))),
        None,
    );
    Ok(())
}
