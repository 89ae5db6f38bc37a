//! Minimal CSV codec (RFC 4180 quoting, LF/CRLF tolerant).

use std::io::{self, BufRead, Write};
use std::mem::take;

pub const SEP: char = ',';

/* ---------------- Writing ---------------- */

fn needs_quotes(field: &str) -> bool {
    field.contains(SEP) || field.contains('"') || field.contains('\n') || field.contains('\r')
}

/// Encode one row, including the trailing `\n`.
pub fn format_row<S: AsRef<str>>(row: &[S]) -> String {
    let mut out = String::new();
    for (i, cell) in row.iter().enumerate() {
        if i > 0 {
            out.push(SEP);
        }
        let cell = cell.as_ref();
        if needs_quotes(cell) {
            out.push('"');
            out.push_str(&cell.replace('"', "\"\""));
            out.push('"');
        } else {
            out.push_str(cell);
        }
    }
    out.push('\n');
    out
}

/// Write one row with a single `write_all`, so a row is never split across writes.
pub fn write_row<W: Write, S: AsRef<str>>(mut w: W, row: &[S]) -> io::Result<()> {
    w.write_all(format_row(row).as_bytes())
}

/* ---------------- Reading ---------------- */

/// Record-at-a-time reader. Quoted fields may span lines.
pub struct CsvReader<R> {
    rdr: R,
    line: String,
    line_no: usize,
}

impl<R: BufRead> CsvReader<R> {
    pub fn new(rdr: R) -> Self {
        Self { rdr, line: String::new(), line_no: 0 }
    }

    /// 1-based number of the last physical line consumed.
    pub fn line_no(&self) -> usize {
        self.line_no
    }

    /// Next record, `None` at end of input. Blank lines between records are skipped.
    /// Input ending inside a quoted field is `InvalidData`.
    pub fn read_record(&mut self) -> io::Result<Option<Vec<String>>> {
        let mut row: Vec<String> = Vec::new();
        let mut field = String::new();
        let mut in_quotes = false;
        let mut pending = false;

        loop {
            self.line.clear();
            let n = self.rdr.read_line(&mut self.line)?;
            if n == 0 {
                if in_quotes {
                    return Err(io::Error::new(
                        io::ErrorKind::InvalidData,
                        format!("unterminated quoted field at line {}", self.line_no),
                    ));
                }
                if pending {
                    row.push(field);
                    return Ok(Some(row));
                }
                return Ok(None);
            }
            self.line_no += 1;

            if !pending && self.line.trim_end_matches(['\r', '\n']).is_empty() {
                continue;
            }
            pending = true;

            let mut chars = self.line.chars().peekable();
            while let Some(ch) = chars.next() {
                match ch {
                    '"' => {
                        if in_quotes {
                            if matches!(chars.peek(), Some('"')) {
                                chars.next(); // doubled quote
                                field.push('"');
                            } else {
                                in_quotes = false;
                            }
                        } else {
                            in_quotes = true;
                        }
                    }
                    c if c == SEP && !in_quotes => row.push(take(&mut field)),
                    '\r' if !in_quotes && matches!(chars.peek(), Some('\n')) => {}
                    '\n' if !in_quotes => {
                        row.push(field);
                        return Ok(Some(row));
                    }
                    c => field.push(c),
                }
            }
        }
    }
}
