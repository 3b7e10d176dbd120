//! JSONL storage: one line per record.
//!
//! The portable interchange format for jobs and repositories. Blank lines
//! and `#` comments are skipped on read; writes replace the file atomically.

use serde::Serialize;
use serde::de::DeserializeOwned;
use std::ffi::OsString;
use std::fs::{self, File};
use std::io::{BufRead, BufReader, BufWriter, Write};
use std::path::{Path, PathBuf};
use std::time::{SystemTime, UNIX_EPOCH};

/// Read records from a JSONL reader.
pub fn read_records<T: DeserializeOwned>(reader: impl BufRead) -> Result<Vec<T>, JsonlError> {
    let mut records = Vec::new();
    for (line_no, line) in reader.lines().enumerate() {
        let line = line.map_err(|e| JsonlError::Io(line_no + 1, e.to_string()))?;
        let trimmed = line.trim();
        if trimmed.is_empty() || trimmed.starts_with('#') {
            continue;
        }
        let record: T = serde_json::from_str(trimmed)
            .map_err(|e| JsonlError::Parse(line_no + 1, e.to_string()))?;
        records.push(record);
    }
    Ok(records)
}

/// Write records to a JSONL writer.
pub fn write_records<T: Serialize>(
    writer: &mut impl Write,
    records: &[T],
) -> Result<(), JsonlError> {
    for record in records {
        let line =
            serde_json::to_string(record).map_err(|e| JsonlError::Serialize(e.to_string()))?;
        writeln!(writer, "{line}").map_err(|e| JsonlError::Io(0, e.to_string()))?;
    }
    Ok(())
}

/// Read records from a JSONL file path.
pub fn read_records_from_path<T: DeserializeOwned>(
    path: impl AsRef<Path>,
) -> Result<Vec<T>, JsonlError> {
    let path = path.as_ref();
    let bytes =
        fs::read(path).map_err(|e| JsonlError::Io(0, format!("{}: {e}", path.display())))?;
    reject_corrupt_bytes(path, &bytes)?;
    read_records(BufReader::new(bytes.as_slice()))
}

/// Write records to a JSONL file path via temp file + rename.
pub fn write_records_to_path<T: Serialize>(
    path: impl AsRef<Path>,
    records: &[T],
) -> Result<(), JsonlError> {
    let path = path.as_ref();
    if let Some(parent) = path.parent()
        && !parent.as_os_str().is_empty()
    {
        fs::create_dir_all(parent)
            .map_err(|e| JsonlError::Io(0, format!("{}: {e}", parent.display())))?;
    }

    let tmp_path = tmp_write_path(path);
    let io_err = |e: std::io::Error| JsonlError::Io(0, format!("{}: {e}", tmp_path.display()));
    let write_result = (|| -> Result<(), JsonlError> {
        let file = File::create(&tmp_path).map_err(io_err)?;
        let mut writer = BufWriter::new(file);
        write_records(&mut writer, records)?;
        writer.flush().map_err(io_err)?;
        let file = writer.into_inner().map_err(|e| io_err(e.into_error()))?;
        file.sync_all().map_err(io_err)?;
        Ok(())
    })();

    if let Err(error) = write_result {
        let _ = fs::remove_file(&tmp_path);
        return Err(error);
    }

    fs::rename(&tmp_path, path).map_err(|e| {
        let _ = fs::remove_file(&tmp_path);
        JsonlError::Io(
            0,
            format!("{} -> {}: {e}", tmp_path.display(), path.display()),
        )
    })?;

    if let Some(parent) = path.parent()
        && !parent.as_os_str().is_empty()
    {
        let dir = File::open(parent)
            .map_err(|e| JsonlError::Io(0, format!("{}: {e}", parent.display())))?;
        dir.sync_all()
            .map_err(|e| JsonlError::Io(0, format!("{}: {e}", parent.display())))?;
    }

    Ok(())
}

fn tmp_write_path(path: &Path) -> PathBuf {
    let unique = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_nanos();
    let mut tmp: OsString = path.as_os_str().to_os_string();
    tmp.push(format!(".tmp.{}.{}", std::process::id(), unique));
    PathBuf::from(tmp)
}

fn reject_corrupt_bytes(path: &Path, bytes: &[u8]) -> Result<(), JsonlError> {
    if bytes.contains(&0) {
        return Err(JsonlError::Corrupt(format!(
            "{}: contains NUL byte(s)",
            path.display()
        )));
    }
    if std::str::from_utf8(bytes).is_err() {
        return Err(JsonlError::Corrupt(format!(
            "{}: contains non-UTF-8 byte sequence(s)",
            path.display()
        )));
    }
    Ok(())
}

/// Errors from JSONL operations.
#[derive(Debug, thiserror::Error)]
pub enum JsonlError {
    #[error("line {0}: I/O error: {1}")]
    Io(usize, String),

    #[error("line {0}: parse error: {1}")]
    Parse(usize, String),

    #[error("serialization error: {0}")]
    Serialize(String),

    #[error("corrupted store file: {0}")]
    Corrupt(String),
}
