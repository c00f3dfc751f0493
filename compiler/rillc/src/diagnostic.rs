//! Error reporting for the command line.
//!
//! Syntax errors with a source position are rendered as an annotated
//! snippet; everything else prints as the runtime formats it, with the
//! script backtrace.

use ariadne::{Config, Label, Report, ReportKind, Source};
use rill_runtime::{Category, Error};
use std::io::{self, Write};

/// Write `err` to `out`. `source` is the text the error came from, if
/// known.
pub fn write_error(out: &mut impl Write, err: &Error, source: Option<&str>, color: bool) -> io::Result<()> {
    let snippet = match (err.category, err.span, source) {
        (Category::Syntax, Some(span), Some(source)) if !source.is_empty() => Some((span, source)),
        _ => None,
    };
    if let Some((span, source)) = snippet {
        let file = err.file.as_deref().unwrap_or("[string]");
        // Report positions are character offsets within the text.
        let total = source.chars().count();
        let chars = |byte: u32| {
            let byte = usize::try_from(byte).unwrap_or(usize::MAX).min(source.len());
            source.get(..byte).map_or(0, |prefix| prefix.chars().count())
        };
        let start = chars(span.start).min(total - 1);
        let end = chars(span.end).clamp(start + 1, total);

        let mut report = Report::build(ReportKind::Error, file, start)
            .with_config(Config::default().with_color(color))
            .with_message(err.headline())
            .with_label(Label::new((file, start..end)).with_message(&err.message));
        for note in &err.notes {
            report = report.with_note(note);
        }
        return report.finish().write((file, Source::from(source)), out);
    }

    writeln!(out, "{err}")?;
    for note in &err.notes {
        writeln!(out, "note: {note}")?;
    }
    Ok(())
}

/// Print `err` to standard error.
pub fn report(err: &Error, source: Option<&str>) {
    let stderr = io::stderr();
    let color = io::IsTerminal::is_terminal(&stderr);
    let mut out = stderr.lock();
    if let Err(io_err) = write_error(&mut out, err, source, color) {
        tracing::warn!(%io_err, "cannot write diagnostic");
    }
}

/// Process exit status for the outcome of a script.
pub fn exit_status(result: &rill_runtime::Result<rill_runtime::Variant>) -> i32 {
    match result {
        Ok(_) => 0,
        Err(err) if err.is_exit() => err.status,
        Err(_) => 1,
    }
}
