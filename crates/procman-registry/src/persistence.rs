//! Registry persistence.
//!
//! Records are stored one per line as `<id>;<name>;<priority>`. Saving
//! writes the registry oldest-first (back-to-front). Loading inserts records
//! in file order at the front, so the last line ends up first and a
//! save/load cycle reproduces the order the registry had when it was saved.
//!
//! Malformed lines never abort a load. They are skipped, logged and
//! reported back through [`LoadReport`].

use crate::process::Process;
use crate::registry::ProcessRegistry;
use std::ffi::OsString;
use std::fs::{self, File};
use std::io::{self, BufRead, BufReader, BufWriter, Write};
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::{debug, info, warn};

/// File name used when no data file is configured
pub const DEFAULT_DATA_FILE: &str = "procesos.txt";

/// Field separator within a record line
const RECORD_SEPARATOR: char = ';';

/// Errors that can occur while loading or saving the registry
#[derive(Debug, Error)]
pub enum PersistenceError {
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    #[error("Process {id} has a name that cannot be stored: {name:?}")]
    UnencodableName { id: i64, name: String },
}

/// Reasons a single record line is rejected
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RecordError {
    #[error("expected two ';' separators")]
    MissingSeparator,

    #[error("invalid process id: {0:?}")]
    InvalidId(String),

    #[error("invalid priority: {0:?}")]
    InvalidPriority(String),

    #[error("line is not valid UTF-8")]
    InvalidUtf8,
}

/// Outcome of a load
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LoadReport {
    /// Whether the source file existed
    pub file_found: bool,
    /// Number of records inserted
    pub loaded: usize,
    /// 1-based line numbers of malformed records
    pub skipped_lines: Vec<usize>,
}

impl LoadReport {
    fn missing() -> Self {
        Self::default()
    }

    /// Number of malformed lines that were skipped.
    pub fn skipped(&self) -> usize {
        self.skipped_lines.len()
    }
}

/// Encode a process as a single record line (without the newline).
pub fn encode_record(process: &Process) -> Result<String, PersistenceError> {
    if process
        .name()
        .contains([RECORD_SEPARATOR, '\n', '\r'])
    {
        return Err(PersistenceError::UnencodableName {
            id: process.id(),
            name: process.name().to_string(),
        });
    }

    Ok(format!(
        "{}{sep}{}{sep}{}",
        process.id(),
        process.name(),
        process.priority(),
        sep = RECORD_SEPARATOR
    ))
}

/// Parse the leading integer of a field.
///
/// Leading whitespace and an optional sign are accepted; anything after the
/// digits is ignored, so `" 7;x"` reads as 7. Fields without digits, or
/// whose digits overflow, yield `None`.
fn leading_integer(field: &str) -> Option<i64> {
    let text = field.trim_start();
    let sign_len = usize::from(text.starts_with(['+', '-']));
    let digits = text[sign_len..]
        .bytes()
        .take_while(u8::is_ascii_digit)
        .count();
    if digits == 0 {
        return None;
    }
    text[..sign_len + digits].parse().ok()
}

/// Decode a single record line.
///
/// The line is split on its first two separators. The name is kept
/// verbatim; id and priority are read from the leading integer of their
/// fields.
pub fn decode_record(line: &str) -> Result<Process, RecordError> {
    let (id, rest) = line
        .split_once(RECORD_SEPARATOR)
        .ok_or(RecordError::MissingSeparator)?;
    let (name, priority) = rest
        .split_once(RECORD_SEPARATOR)
        .ok_or(RecordError::MissingSeparator)?;

    let id = leading_integer(id).ok_or_else(|| RecordError::InvalidId(id.to_string()))?;
    let priority = leading_integer(priority)
        .ok_or_else(|| RecordError::InvalidPriority(priority.to_string()))?;

    Ok(Process::new(id, name, priority))
}

impl ProcessRegistry {
    /// Replace the registry contents with the records in `path`.
    ///
    /// A missing file leaves the registry untouched and is not an error.
    pub fn load(&mut self, path: impl AsRef<Path>) -> Result<LoadReport, PersistenceError> {
        let path = path.as_ref();
        let file = match File::open(path) {
            Ok(file) => file,
            Err(e) if e.kind() == io::ErrorKind::NotFound => {
                info!("No process file at {}, starting empty", path.display());
                return Ok(LoadReport::missing());
            }
            Err(e) => return Err(e.into()),
        };

        let report = self.load_from(BufReader::new(file))?;
        info!(
            "Loaded {} processes from {} ({} malformed lines skipped)",
            report.loaded,
            path.display(),
            report.skipped()
        );
        Ok(report)
    }

    /// Replace the registry contents with the records read from `reader`.
    ///
    /// The registry is only cleared once the whole source has been read.
    pub fn load_from<R: BufRead>(&mut self, reader: R) -> Result<LoadReport, PersistenceError> {
        let mut records = Vec::new();
        let mut skipped_lines = Vec::new();

        for (index, line) in reader.split(b'\n').enumerate() {
            let line = line?;
            let line_number = index + 1;

            let decoded = std::str::from_utf8(&line)
                .map_err(|_| RecordError::InvalidUtf8)
                .and_then(|text| {
                    if text.trim().is_empty() {
                        Ok(None)
                    } else {
                        decode_record(text).map(Some)
                    }
                });

            match decoded {
                Ok(Some(process)) => records.push(process),
                Ok(None) => {}
                Err(err) => {
                    warn!(line = line_number, error = %err, "Skipping malformed process record");
                    skipped_lines.push(line_number);
                }
            }
        }

        self.clear();
        let loaded = records.len();
        for process in records {
            self.insert_process(process);
        }

        Ok(LoadReport {
            file_found: true,
            loaded,
            skipped_lines,
        })
    }

    /// Write the registry to `path`, oldest record first.
    ///
    /// The records go to a sibling temporary file that is renamed into
    /// place, so an interrupted save leaves the previous file intact.
    /// Returns the number of records written.
    pub fn save(&self, path: impl AsRef<Path>) -> Result<usize, PersistenceError> {
        let path = path.as_ref();
        let temp_path = temp_path_for(path);

        let written = match self.write_file(&temp_path) {
            Ok(written) => written,
            Err(e) => {
                let _ = fs::remove_file(&temp_path);
                return Err(e);
            }
        };
        fs::rename(&temp_path, path)?;

        info!("Saved {} processes to {}", written, path.display());
        Ok(written)
    }

    /// Write the registry to `writer`, oldest record first.
    ///
    /// Every name is validated before anything is written.
    pub fn save_to<W: Write>(&self, mut writer: W) -> Result<usize, PersistenceError> {
        let lines = self
            .enumerate_oldest_first()
            .map(encode_record)
            .collect::<Result<Vec<_>, _>>()?;

        for line in &lines {
            writeln!(writer, "{line}")?;
        }
        writer.flush()?;

        debug!(records = lines.len(), "Wrote process records");
        Ok(lines.len())
    }

    fn write_file(&self, path: &Path) -> Result<usize, PersistenceError> {
        let mut writer = BufWriter::new(File::create(path)?);
        let written = self.save_to(&mut writer)?;
        let file = writer.into_inner().map_err(|e| e.into_error())?;
        file.sync_all()?;
        Ok(written)
    }
}

fn temp_path_for(path: &Path) -> PathBuf {
    let mut name = path
        .file_name()
        .map(OsString::from)
        .unwrap_or_else(|| OsString::from(DEFAULT_DATA_FILE));
    name.push(".tmp");
    path.with_file_name(name)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    fn ids(registry: &ProcessRegistry) -> Vec<i64> {
        registry.enumerate().map(Process::id).collect()
    }

    #[test]
    fn test_encode_record() {
        let process = Process::new(3, "editor", -2);
        assert_eq!(encode_record(&process).unwrap(), "3;editor;-2");
    }

    #[test]
    fn test_encode_rejects_separator_in_name() {
        let process = Process::new(3, "a;b", 1);
        assert!(matches!(
            encode_record(&process),
            Err(PersistenceError::UnencodableName { id: 3, .. })
        ));
    }

    #[test]
    fn test_decode_record() {
        let process = decode_record("12;web server;4").unwrap();
        assert_eq!(process, Process::new(12, "web server", 4));
    }

    #[test]
    fn test_decode_reads_leading_integers() {
        assert_eq!(decode_record("1;a;5 urgent").unwrap(), Process::new(1, "a", 5));
        assert_eq!(decode_record("2;b;7;x").unwrap(), Process::new(2, "b", 7));
        assert_eq!(decode_record("+3x;c;-4").unwrap(), Process::new(3, "c", -4));
        assert_eq!(
            decode_record("1;a;-"),
            Err(RecordError::InvalidPriority("-".to_string()))
        );
        assert_eq!(
            decode_record("99999999999999999999;a;1"),
            Err(RecordError::InvalidId("99999999999999999999".to_string()))
        );
    }

    #[test]
    fn test_decode_trims_integers_and_carriage_return() {
        let process = decode_record(" 12 ; spaced ; 4\r").unwrap();
        assert_eq!(process.id(), 12);
        assert_eq!(process.name(), " spaced ");
        assert_eq!(process.priority(), 4);
    }

    #[test]
    fn test_decode_errors() {
        assert_eq!(decode_record("no separators"), Err(RecordError::MissingSeparator));
        assert_eq!(decode_record("1;only one"), Err(RecordError::MissingSeparator));
        assert_eq!(
            decode_record("x;name;1"),
            Err(RecordError::InvalidId("x".to_string()))
        );
        assert_eq!(
            decode_record("1;name;high"),
            Err(RecordError::InvalidPriority("high".to_string()))
        );
        // Extra separators end up in the priority field, after its digits
        assert_eq!(decode_record("1;name;2;3"), Ok(Process::new(1, "name", 2)));
    }

    #[test]
    fn test_save_to_oldest_first() {
        let mut registry = ProcessRegistry::new();
        registry.insert(1, "p1", 5);
        registry.insert(2, "p2", 9);

        let mut out = Vec::new();
        assert_eq!(registry.save_to(&mut out).unwrap(), 2);
        assert_eq!(String::from_utf8(out).unwrap(), "1;p1;5\n2;p2;9\n");
    }

    #[test]
    fn test_round_trip_preserves_order() {
        let mut registry = ProcessRegistry::new();
        registry.insert(1, "p1", 5);
        registry.insert(2, "p2", 9);
        assert_eq!(ids(&registry), vec![2, 1]);

        let mut out = Vec::new();
        registry.save_to(&mut out).unwrap();
        registry.clear();

        let report = registry.load_from(Cursor::new(out)).unwrap();
        assert_eq!(report.loaded, 2);
        assert_eq!(ids(&registry), vec![2, 1]);
        assert_eq!(registry.find(2), Some(&Process::new(2, "p2", 9)));
        assert_eq!(registry.find(1), Some(&Process::new(1, "p1", 5)));
    }

    #[test]
    fn test_load_reverses_file_order() {
        let mut registry = ProcessRegistry::new();
        registry
            .load_from(Cursor::new("1;a;0\n2;b;0\n3;c;0\n"))
            .unwrap();
        assert_eq!(ids(&registry), vec![3, 2, 1]);
    }

    #[test]
    fn test_load_keeps_records_with_trailing_text() {
        let mut registry = ProcessRegistry::new();
        let report = registry
            .load_from(Cursor::new("1;a;5 urgent\n2;b;7;x\n3;c;4\n"))
            .unwrap();

        assert_eq!(report.loaded, 3);
        assert!(report.skipped_lines.is_empty());
        assert_eq!(ids(&registry), vec![3, 2, 1]);
        assert_eq!(registry.find(2).map(Process::priority), Some(7));
    }

    #[test]
    fn test_two_cycles_keep_order() {
        let mut registry = ProcessRegistry::new();
        for id in 1..=3 {
            registry.insert(id, "p", id);
        }

        for _ in 0..2 {
            let mut out = Vec::new();
            registry.save_to(&mut out).unwrap();
            registry.load_from(Cursor::new(out)).unwrap();
            assert_eq!(ids(&registry), vec![3, 2, 1]);
        }
    }

    #[test]
    fn test_load_skips_malformed_lines() {
        let mut registry = ProcessRegistry::new();
        let report = registry
            .load_from(Cursor::new("4;good;2\nnothing here\n"))
            .unwrap();

        assert_eq!(report.loaded, 1);
        assert_eq!(report.skipped_lines, vec![2]);
        assert_eq!(ids(&registry), vec![4]);
    }

    #[test]
    fn test_load_ignores_blank_lines_and_bad_utf8() {
        let mut registry = ProcessRegistry::new();
        let source: &[u8] = b"1;a;1\n\n\xff\xfe;x;1\n2;b;2";
        let report = registry.load_from(source).unwrap();

        assert_eq!(report.loaded, 2);
        assert_eq!(report.skipped_lines, vec![3]);
        assert_eq!(ids(&registry), vec![2, 1]);
    }

    #[test]
    fn test_load_replaces_existing_contents() {
        let mut registry = ProcessRegistry::new();
        let stale = registry.insert(9, "stale", 0);

        registry.load_from(Cursor::new("1;fresh;1\n")).unwrap();
        assert_eq!(ids(&registry), vec![1]);
        assert!(!registry.contains(stale));
    }

    #[test]
    fn test_save_to_rejects_before_writing() {
        let mut registry = ProcessRegistry::new();
        registry.insert(1, "fine", 1);
        registry.insert(2, "bad\nname", 1);

        let mut out = Vec::new();
        assert!(registry.save_to(&mut out).is_err());
        assert!(out.is_empty());
    }

    #[test]
    fn test_temp_path_is_sibling() {
        let temp = temp_path_for(Path::new("data/procesos.txt"));
        assert_eq!(temp, PathBuf::from("data/procesos.txt.tmp"));
    }
}
