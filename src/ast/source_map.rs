/// Maps byte offsets to line/column positions within source text.
pub struct SourceMap {
    line_starts: Vec<usize>,
}

impl SourceMap {
    pub fn new(source: &str) -> Self {
        let mut line_starts = vec![0];
        for (i, b) in source.bytes().enumerate() {
            if b == b'\n' {
                line_starts.push(i + 1);
            }
        }
        SourceMap { line_starts }
    }

    /// Returns (line, col), both 1-based.
    pub fn lookup(&self, offset: usize) -> (usize, usize) {
        let line = match self.line_starts.binary_search(&offset) {
            Ok(i) => i,
            Err(i) => i.saturating_sub(1),
        };
        let col = offset.saturating_sub(self.line_starts[line]);
        (line + 1, col + 1)
    }

    /// Returns the full text of the given 1-based line number.
    pub fn line_text<'a>(&self, source: &'a str, line: usize) -> &'a str {
        if line == 0 || line > self.line_starts.len() {
            return "";
        }
        let start = self.line_starts[line - 1];
        let end = if line < self.line_starts.len() {
            self.line_starts[line]
        } else {
            source.len()
        };
        // Trim trailing newline
        let text = &source[start..end];
        text.trim_end_matches('\n').trim_end_matches('\r')
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn single_line() {
        let src = "val x = 1 + 2";
        let sm = SourceMap::new(src);
        assert_eq!(sm.lookup(0), (1, 1));
        assert_eq!(sm.lookup(4), (1, 5));
        assert_eq!(sm.lookup(13), (1, 14));
    }

    #[test]
    fn multi_line() {
        let src = "var i = 0\nwhile (i < 3) {\n  i = i + 1\n}";
        let sm = SourceMap::new(src);
        assert_eq!(sm.lookup(0), (1, 1));
        assert_eq!(sm.lookup(9), (1, 10));  // '\n' after "var i = 0"
        assert_eq!(sm.lookup(10), (2, 1));  // 'w' of "while"
        assert_eq!(sm.lookup(28), (3, 3));  // 'i' of "i = i + 1"
    }

    #[test]
    fn line_text_multi() {
        let src = "def f(): Unit {\n  print(\"a\")\n}";
        let sm = SourceMap::new(src);
        assert_eq!(sm.line_text(src, 1), "def f(): Unit {");
        assert_eq!(sm.line_text(src, 2), "  print(\"a\")");
        assert_eq!(sm.line_text(src, 3), "}");
    }

    #[test]
    fn line_text_out_of_bounds() {
        let src = "print(\"x\")";
        let sm = SourceMap::new(src);
        assert_eq!(sm.line_text(src, 0), "");
        assert_eq!(sm.line_text(src, 99), "");
    }

    #[test]
    fn crlf_and_trailing_newline() {
        let src = "val a = 1\r\n";
        let sm = SourceMap::new(src);
        assert_eq!(sm.line_text(src, 1), "val a = 1");
        assert_eq!(sm.line_text(src, 2), "");
    }

    #[test]
    fn empty_source() {
        let src = "";
        let sm = SourceMap::new(src);
        assert_eq!(sm.lookup(0), (1, 1));
        assert_eq!(sm.line_text(src, 1), "");
    }
}
