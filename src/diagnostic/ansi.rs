use std::fmt::Write;

use crate::ast::SourceMap;
use super::{Diagnostic, Label, Severity};

pub struct AnsiRenderer {
    pub use_color: bool,
}

impl AnsiRenderer {
    fn bold(&self, s: &str) -> String {
        if self.use_color { format!("\x1b[1m{s}\x1b[0m") } else { s.to_string() }
    }

    fn bold_red(&self, s: &str) -> String {
        if self.use_color { format!("\x1b[1;31m{s}\x1b[0m") } else { s.to_string() }
    }

    fn cyan(&self, s: &str) -> String {
        if self.use_color { format!("\x1b[36m{s}\x1b[0m") } else { s.to_string() }
    }

    fn dim(&self, s: &str) -> String {
        if self.use_color { format!("\x1b[2m{s}\x1b[0m") } else { s.to_string() }
    }

    fn header(&self, d: &Diagnostic) -> String {
        let severity = match d.severity {
            Severity::Error => "error",
            Severity::Warning => "warning",
        };
        let severity = match d.code {
            Some(code) => format!("{severity}[{code}]"),
            None => severity.to_string(),
        };
        let severity = match d.severity {
            Severity::Error => self.bold_red(&severity),
            Severity::Warning => self.bold(&self.cyan(&severity)),
        };
        format!("{severity}: {}", self.bold(&d.message))
    }

    /// Source line under the primary label with carets. Spans that run past
    /// the end of the line (multi-line statements) are cut at the line end.
    fn snippet(&self, out: &mut String, map: &SourceMap, source: &str, label: &Label) {
        let (line, col) = map.lookup(label.span.start);
        let line_text = map.line_text(source, line);

        let gutter = line.to_string().len();
        let pipe = self.cyan("|");
        let pad = " ".repeat(gutter);

        let _ = writeln!(out, "  {} {line}:{col}", self.cyan("-->"));
        let _ = writeln!(out, "{pad} {pipe}");
        let _ = writeln!(out, "{} {pipe} {line_text}", self.cyan(&format!("{line:>gutter$}")));

        let start = col - 1;
        let room = line_text.len().saturating_sub(start).max(1);
        let width = label.span.end.saturating_sub(label.span.start).clamp(1, room);
        let carets = self.bold_red(&"^".repeat(width));
        let indent = " ".repeat(start);
        if label.message.is_empty() {
            let _ = writeln!(out, "{pad} {pipe} {indent}{carets}");
        } else {
            let _ = writeln!(out, "{pad} {pipe} {indent}{carets} {}", self.bold_red(&label.message));
        }
        let _ = writeln!(out, "{pad} {pipe}");
    }

    pub fn render(&self, d: &Diagnostic) -> String {
        let mut out = self.header(d);
        out.push('\n');

        let map = d.source.as_deref().map(SourceMap::new);
        if let (Some(label), Some(map), Some(source)) =
            (d.labels.iter().find(|l| l.is_primary), &map, d.source.as_deref())
        {
            self.snippet(&mut out, map, source, label);
        }

        let eq = self.dim("=");
        for label in d.labels.iter().filter(|l| !l.is_primary && !l.message.is_empty()) {
            match &map {
                Some(map) => {
                    let (line, col) = map.lookup(label.span.start);
                    let _ = writeln!(out, "  {eq} {} ({line}:{col})", label.message);
                }
                None => {
                    let _ = writeln!(out, "  {eq} {}", label.message);
                }
            }
        }
        for note in &d.notes {
            let _ = writeln!(out, "  {eq} note: {note}");
        }
        if let Some(suggestion) = &d.suggestion {
            let _ = writeln!(out, "  {eq} suggestion: {suggestion}");
        }
        if let Some(code) = d.code {
            let _ = writeln!(out, "  {eq} help: run `miniscala --explain {code}` for details");
        }
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ast::Span;

    const SRC: &str = "val x = 1\nx = 2";

    fn make_diag(start: usize, end: usize) -> Diagnostic {
        Diagnostic::error("cannot assign to 'x': it is a val")
            .with_code("MS-T007")
            .with_span(Span { start, end }, "here")
            .with_source(SRC.to_string())
            .with_note("in function '<main>'")
            .with_suggestion("declare it with 'var x' to make it mutable")
    }

    fn plain(d: &Diagnostic) -> String {
        AnsiRenderer { use_color: false }.render(d)
    }

    #[test]
    fn header_includes_code() {
        let out = plain(&make_diag(10, 11));
        assert!(out.starts_with("error[MS-T007]: cannot assign to 'x'"), "{out}");
    }

    #[test]
    fn header_without_code() {
        let out = plain(&Diagnostic::error("something bad"));
        assert!(out.starts_with("error: something bad"), "{out}");
        assert!(!out.contains("-->"));
    }

    #[test]
    fn snippet_points_at_second_line() {
        let out = plain(&make_diag(10, 11));
        assert!(out.contains("--> 2:1"), "{out}");
        assert!(out.contains("2 | x = 2"), "{out}");
        assert!(out.contains("  | ^ here"), "{out}");
    }

    #[test]
    fn caret_length_matches_span() {
        let d = Diagnostic::error("bad").with_span(Span { start: 4, end: 9 }, "").with_source(SRC.to_string());
        let out = plain(&d);
        assert!(out.contains("1 | val x = 1"), "{out}");
        assert!(out.contains("|     ^^^^^\n"), "{out}");
    }

    #[test]
    fn notes_and_suggestion() {
        let out = plain(&make_diag(10, 11));
        assert!(out.contains("= note: in function '<main>'"), "{out}");
        assert!(out.contains("= suggestion: declare it with 'var x'"), "{out}");
    }

    #[test]
    fn secondary_label_listed() {
        let d = Diagnostic::error("bad")
            .with_secondary_span(Span { start: 0, end: 3 }, "declared here");
        assert!(plain(&d).contains("= declared here\n"));
        let located = make_diag(10, 11).with_secondary_span(Span { start: 4, end: 5 }, "declared here");
        assert!(plain(&located).contains("= declared here (1:5)"));
    }

    #[test]
    fn carets_stop_at_line_end() {
        // A statement span covering both lines.
        let d = Diagnostic::error("bad").with_span(Span { start: 0, end: SRC.len() }, "").with_source(SRC.to_string());
        let out = plain(&d);
        assert!(out.contains("| ^^^^^^^^^\n"), "{out}");
        assert!(!out.contains("^^^^^^^^^^"), "{out}");
    }

    #[test]
    fn explain_hint_only_with_code() {
        assert!(plain(&make_diag(10, 11)).contains("= help: run `miniscala --explain MS-T007` for details"));
        assert!(!plain(&Diagnostic::error("bad")).contains("--explain"));
    }

    #[test]
    fn color_toggle() {
        let d = make_diag(10, 11);
        assert!(AnsiRenderer { use_color: true }.render(&d).contains("\x1b["));
        assert!(!plain(&d).contains("\x1b["));
    }
}
