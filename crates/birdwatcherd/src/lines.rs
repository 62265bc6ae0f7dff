//! Line tokenizer for BIRD console output

/// Iterator over console lines, optionally dropping blank ones
#[derive(Debug, Clone)]
pub struct Lines<'a> {
    inner: std::str::Lines<'a>,
    skip_empty: bool,
}

impl<'a> Iterator for Lines<'a> {
    type Item = &'a str;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            let line = self.inner.next()?;
            if self.skip_empty && is_blank(line) {
                continue;
            }
            return Some(line);
        }
    }
}

/// Split console output into lines
pub fn lines(text: &str, skip_empty: bool) -> Lines<'_> {
    Lines {
        inner: text.lines(),
        skip_empty,
    }
}

/// Empty or whitespace-only line
pub fn is_blank(line: &str) -> bool {
    line.trim().is_empty()
}

/// Banner (`BIRD 2.0.7 ready.`) and access notices carry no data
pub fn is_special_line(line: &str) -> bool {
    line.starts_with("BIRD") || line.starts_with("Access restricted")
}

/// Indented lines continue the record started by the last unindented one
pub fn is_indented(line: &str) -> bool {
    line.starts_with(' ') || line.starts_with('\t')
}
