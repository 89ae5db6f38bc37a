//! Append-only CSV record store: identifier loading for dedup, header/schema
//! checks, and row appends.

use crate::csv::{write_row, CsvReader};
use crate::error::CollectError;
use crate::record::{OutputRow, COLUMNS, ID_COLUMN};
use crate::util::{open_append_with_backoff, open_with_backoff};
use ahash::AHashSet;
use std::fs::File;
use std::io::{self, BufReader, Read, Seek, SeekFrom, Write};
use std::path::{Path, PathBuf};

const BOM: char = '\u{feff}';

/// Destination for accepted rows.
pub trait RowSink {
    fn append(&mut self, row: &OutputRow) -> Result<(), CollectError>;
}

impl RowSink for Vec<OutputRow> {
    fn append(&mut self, row: &OutputRow) -> Result<(), CollectError> {
        self.push(row.clone());
        Ok(())
    }
}

#[derive(Clone, Debug)]
pub struct RecordStore {
    path: PathBuf,
    read_buffer_bytes: usize,
}

impl RecordStore {
    pub fn new(path: impl AsRef<Path>) -> Self {
        Self { path: path.as_ref().to_path_buf(), read_buffer_bytes: 256 * 1024 }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Every `post_id` already in the table. Missing or empty file → empty set.
    pub fn load_known_identifiers(&self) -> Result<AHashSet<String>, CollectError> {
        let mut ids = AHashSet::with_capacity(4_096);
        self.scan(|fields| {
            let id = fields[ID_COLUMN].trim();
            if !id.is_empty() {
                ids.insert(id.to_string());
            }
            Ok(())
        })?;
        tracing::debug!(path = %self.path.display(), known = ids.len(), "loaded known identifiers");
        Ok(ids)
    }

    /// Decode every data row.
    pub fn read_rows(&self) -> Result<Vec<OutputRow>, CollectError> {
        let mut rows = Vec::new();
        self.scan(|fields| {
            let row = OutputRow::from_fields(&fields).map_err(|m| CollectError::schema(&self.path, m))?;
            rows.push(row);
            Ok(())
        })?;
        Ok(rows)
    }

    /// Open the table for appending for the rest of the run.
    pub fn open_appender(&self) -> Result<CsvAppender, CollectError> {
        CsvAppender::open(&self.path)
    }

    /// Append one row, creating the file (with header) if needed.
    pub fn append(&self, row: &OutputRow) -> Result<(), CollectError> {
        self.open_appender()?.append(row)
    }

    /// Walk the data rows after validating the header. Returns false if the file is absent.
    fn scan(&self, mut on_row: impl FnMut(Vec<String>) -> Result<(), CollectError>) -> Result<bool, CollectError> {
        let file = match open_with_backoff(&self.path, 8, 50) {
            Ok(f) => f,
            Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(false),
            Err(e) => return Err(CollectError::io(&self.path, e)),
        };
        let mut rdr = CsvReader::new(BufReader::with_capacity(self.read_buffer_bytes, file));

        let mut header = match self.next_record(&mut rdr)? {
            Some(h) => h,
            None => return Ok(true),
        };
        if let Some(first) = header.first_mut() {
            if let Some(rest) = first.strip_prefix(BOM) {
                *first = rest.to_string();
            }
        }
        if header.iter().map(String::as_str).ne(COLUMNS.iter().copied()) {
            return Err(CollectError::schema(
                &self.path,
                format!("header is [{}], expected [{}]", header.join(","), COLUMNS.join(",")),
            ));
        }

        while let Some(fields) = self.next_record(&mut rdr)? {
            if fields.len() != COLUMNS.len() {
                return Err(CollectError::schema(
                    &self.path,
                    format!(
                        "record ending at line {} has {} fields, expected {}",
                        rdr.line_no(),
                        fields.len(),
                        COLUMNS.len()
                    ),
                ));
            }
            on_row(fields)?;
        }
        Ok(true)
    }

    fn next_record(&self, rdr: &mut CsvReader<BufReader<File>>) -> Result<Option<Vec<String>>, CollectError> {
        rdr.read_record().map_err(|e| match e.kind() {
            io::ErrorKind::InvalidData => CollectError::schema(&self.path, e.to_string()),
            _ => CollectError::io(&self.path, e),
        })
    }
}

/// The output table held open in append mode. Each row is one write, flushed
/// immediately, so an interrupted run never leaves a partial record behind.
pub struct CsvAppender {
    path: PathBuf,
    file: File,
    needs_header: bool,
    needs_newline: bool,
}

impl CsvAppender {
    pub fn open(path: &Path) -> Result<Self, CollectError> {
        if let Some(dir) = path.parent().filter(|d| !d.as_os_str().is_empty()) {
            std::fs::create_dir_all(dir).map_err(|e| CollectError::io(dir, e))?;
        }
        let file = open_append_with_backoff(path, 16, 50).map_err(|e| CollectError::io(path, e))?;
        let len = file.metadata().map_err(|e| CollectError::io(path, e))?.len();
        let needs_newline = len > 0 && !ends_with_newline(path).map_err(|e| CollectError::io(path, e))?;
        Ok(Self { path: path.to_path_buf(), file, needs_header: len == 0, needs_newline })
    }

    fn write_record<S: AsRef<str>>(&mut self, fields: &[S]) -> Result<(), CollectError> {
        write_row(&mut self.file, fields).map_err(|e| CollectError::io(&self.path, e))?;
        self.file.flush().map_err(|e| CollectError::io(&self.path, e))
    }
}

impl RowSink for CsvAppender {
    fn append(&mut self, row: &OutputRow) -> Result<(), CollectError> {
        if self.needs_header {
            self.write_record(&COLUMNS)?;
            self.needs_header = false;
        }
        if self.needs_newline {
            // Terminate the last record left behind by another writer.
            self.file.write_all(b"\n").map_err(|e| CollectError::io(&self.path, e))?;
            self.needs_newline = false;
        }
        self.write_record(&row.to_fields())
    }
}

fn ends_with_newline(path: &Path) -> io::Result<bool> {
    let mut file = open_with_backoff(path, 8, 50)?;
    file.seek(SeekFrom::End(-1))?;
    let mut last = [0u8; 1];
    file.read_exact(&mut last)?;
    Ok(last[0] == b'\n')
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    #[test]
    fn missing_and_empty_files_have_no_identifiers() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("out.csv");
        assert!(RecordStore::new(&path).load_known_identifiers().unwrap().is_empty());
        fs::write(&path, "").unwrap();
        assert!(RecordStore::new(&path).load_known_identifiers().unwrap().is_empty());
    }

    #[test]
    fn wrong_header_is_a_schema_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("out.csv");
        fs::write(&path, "id,title\n1,x\n").unwrap();
        let err = RecordStore::new(&path).load_known_identifiers().unwrap_err();
        assert!(matches!(err, CollectError::Schema { .. }), "got {err:?}");
    }

    #[test]
    fn short_row_is_a_schema_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("out.csv");
        fs::write(&path, format!("{}\nabc,only two\n", COLUMNS.join(","))).unwrap();
        let err = RecordStore::new(&path).load_known_identifiers().unwrap_err();
        assert!(matches!(err, CollectError::Schema { .. }), "got {err:?}");
    }

    #[test]
    fn tolerates_byte_order_mark() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("out.csv");
        let row = "k1,t,a,c,5,1731024000.0,2024-11-08 00:00:00,csgo,https://x,,0,";
        fs::write(&path, format!("\u{feff}{}\r\n{}\r\n", COLUMNS.join(","), row)).unwrap();
        let ids = RecordStore::new(&path).load_known_identifiers().unwrap();
        assert!(ids.contains("k1"));
        assert_eq!(ids.len(), 1);
    }
}
