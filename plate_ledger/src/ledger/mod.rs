//! Append-only plate ledger stored as CSV.
//!
//! The first row is always the `Date,Time,Vehicle_Number` header. Rows are
//! only ever appended; every write replaces the file atomically so a failed
//! append never leaves a partial row behind.

pub mod dedup;
pub mod workbook;

use std::fs::{self, File};
use std::io::{self, Read, Seek, SeekFrom, Write};
use std::path::{Path, PathBuf};

use chrono::{Datelike, NaiveDate, NaiveDateTime};
use tempfile::NamedTempFile;
use tracing::debug;

use crate::error::Result;

pub const HEADER: [&str; 3] = ["Date", "Time", "Vehicle_Number"];

pub const DATE_FORMAT: &str = "%d/%m/%Y";
pub const TIME_FORMAT: &str = "%H:%M:%S";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LedgerRow {
    pub date: String,
    pub time: String,
    pub plate_number: String,
}

impl LedgerRow {
    pub fn new(date: impl Into<String>, time: impl Into<String>, plate: impl Into<String>) -> Self {
        Self {
            date: date.into(),
            time: time.into(),
            plate_number: plate.into(),
        }
    }

    /// Builds a row for `plate` seen at `at`.
    pub fn stamped(plate: &str, at: NaiveDateTime) -> Self {
        Self::new(
            at.format(DATE_FORMAT).to_string(),
            at.format(TIME_FORMAT).to_string(),
            plate,
        )
    }

    /// Parses the date and time columns back into a timestamp.
    pub fn timestamp(&self) -> Option<NaiveDateTime> {
        let date = NaiveDate::parse_from_str(&self.date, DATE_FORMAT).ok()?;
        let time = chrono::NaiveTime::parse_from_str(&self.time, TIME_FORMAT).ok()?;
        Some(date.and_time(time))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LedgerInit {
    Created,
    Existing,
}

/// Ledger file name for a calendar day: `D.M.YYYY.<ext>`, no zero padding.
pub fn ledger_file_name(day: NaiveDate, extension: &str) -> String {
    format!("{}.{}.{}.{}", day.day(), day.month(), day.year(), extension)
}

/// Handle on one ledger file. The path is fixed at construction; a process
/// that runs past midnight keeps writing to the file of its start date.
#[derive(Debug, Clone)]
pub struct LedgerStore {
    path: PathBuf,
}

impl LedgerStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// Ledger for `day` inside `dir`.
    pub fn for_day(dir: &Path, day: NaiveDate) -> Self {
        Self::new(dir.join(ledger_file_name(day, "csv")))
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Creates the ledger with its header when absent or zero length.
    /// Existing content is never touched.
    pub fn ensure_initialized(&self) -> Result<LedgerInit> {
        let empty = match fs::metadata(&self.path) {
            Ok(meta) if meta.len() > 0 => return Ok(LedgerInit::Existing),
            Ok(_) => true,
            Err(err) if err.kind() == io::ErrorKind::NotFound => false,
            Err(err) => return Err(err.into()),
        };

        let mut tmp = NamedTempFile::new_in(self.parent_dir())?;
        {
            let mut writer = csv::Writer::from_writer(tmp.as_file_mut());
            writer.write_record(HEADER)?;
            writer.flush()?;
        }
        tmp.as_file().sync_all()?;

        if empty {
            // No rows to lose, the header simply replaces the empty file.
            tmp.persist(&self.path)?;
            return Ok(LedgerInit::Created);
        }

        match tmp.persist_noclobber(&self.path) {
            Ok(_) => Ok(LedgerInit::Created),
            Err(err) if err.error.kind() == io::ErrorKind::AlreadyExists => {
                Ok(LedgerInit::Existing)
            }
            Err(err) => Err(err.into()),
        }
    }

    /// Appends one row. The current ledger is copied to a temp file next to
    /// it, the row is added, the copy is synced and then renamed over the
    /// ledger.
    pub fn append(&self, row: &LedgerRow) -> Result<()> {
        let mut tmp = NamedTempFile::new_in(self.parent_dir())?;
        {
            let mut current = File::open(&self.path)?;
            io::copy(&mut current, tmp.as_file_mut())?;
        }
        ensure_trailing_newline(tmp.as_file_mut())?;

        {
            let mut writer = csv::Writer::from_writer(tmp.as_file_mut());
            writer.write_record([&row.date, &row.time, &row.plate_number])?;
            writer.flush()?;
        }
        tmp.as_file().sync_all()?;
        tmp.persist(&self.path)?;

        debug!(path = %self.path.display(), plate = %row.plate_number, "ledger row appended");
        Ok(())
    }

    /// Reads every data row in insertion order. Each call re-reads the file.
    pub fn scan(&self) -> Result<Vec<LedgerRow>> {
        let mut reader = csv::ReaderBuilder::new()
            .has_headers(true)
            .flexible(true)
            .from_path(&self.path)?;

        let mut rows = Vec::new();
        for record in reader.records() {
            let record = record?;
            let field = |i: usize| record.get(i).unwrap_or_default().to_string();
            rows.push(LedgerRow::new(field(0), field(1), field(2)));
        }
        Ok(rows)
    }

    fn parent_dir(&self) -> &Path {
        match self.path.parent() {
            Some(dir) if !dir.as_os_str().is_empty() => dir,
            _ => Path::new("."),
        }
    }
}

fn ensure_trailing_newline(file: &mut File) -> io::Result<()> {
    let len = file.seek(SeekFrom::End(0))?;
    if len == 0 {
        return Ok(());
    }
    file.seek(SeekFrom::End(-1))?;
    let mut last = [0u8; 1];
    file.read_exact(&mut last)?;
    file.seek(SeekFrom::End(0))?;
    if last[0] != b'\n' {
        file.write_all(b"\n")?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    fn at(h: u32, m: u32, s: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2024, 3, 7)
            .unwrap()
            .and_hms_opt(h, m, s)
            .unwrap()
    }

    #[test]
    fn test_file_name_has_no_padding() {
        let day = NaiveDate::from_ymd_opt(2024, 3, 7).unwrap();
        assert_eq!(ledger_file_name(day, "csv"), "7.3.2024.csv");
        let day = NaiveDate::from_ymd_opt(2024, 11, 25).unwrap();
        assert_eq!(ledger_file_name(day, "xlsx"), "25.11.2024.xlsx");
    }

    #[test]
    fn test_row_formats_are_zero_padded() {
        let row = LedgerRow::stamped("TN01AB1234", at(9, 5, 3));
        assert_eq!(row.date, "07/03/2024");
        assert_eq!(row.time, "09:05:03");
        assert_eq!(row.timestamp(), Some(at(9, 5, 3)));
    }

    #[test]
    fn test_initialize_writes_header() {
        let dir = tempdir().unwrap();
        let store = LedgerStore::new(dir.path().join("ledger.csv"));

        assert_eq!(store.ensure_initialized().unwrap(), LedgerInit::Created);
        let content = fs::read_to_string(store.path()).unwrap();
        assert_eq!(content, "Date,Time,Vehicle_Number\n");
        assert!(store.scan().unwrap().is_empty());
    }

    #[test]
    fn test_initialize_is_idempotent() {
        let dir = tempdir().unwrap();
        let store = LedgerStore::new(dir.path().join("ledger.csv"));

        store.ensure_initialized().unwrap();
        store.append(&LedgerRow::stamped("TN01AB1234", at(10, 0, 0))).unwrap();
        assert_eq!(store.ensure_initialized().unwrap(), LedgerInit::Existing);
        assert_eq!(store.ensure_initialized().unwrap(), LedgerInit::Existing);

        let rows = store.scan().unwrap();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].plate_number, "TN01AB1234");
    }

    #[test]
    fn test_initialize_fills_empty_file_with_header() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("ledger.csv");
        fs::write(&path, "").unwrap();
        let store = LedgerStore::new(&path);

        assert_eq!(store.ensure_initialized().unwrap(), LedgerInit::Created);
        store.append(&LedgerRow::stamped("TN01AB1234", at(10, 0, 0))).unwrap();

        let rows = store.scan().unwrap();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].plate_number, "TN01AB1234");
        assert_eq!(store.ensure_initialized().unwrap(), LedgerInit::Existing);
    }

    #[cfg(unix)]
    #[test]
    fn test_failed_append_leaves_previous_rows() {
        use std::os::unix::fs::PermissionsExt;

        let dir = tempdir().unwrap();
        let store = LedgerStore::new(dir.path().join("ledger.csv"));
        store.ensure_initialized().unwrap();
        store.append(&LedgerRow::stamped("TN01AB1234", at(10, 0, 0))).unwrap();
        let before = fs::read(store.path()).unwrap();

        fs::set_permissions(dir.path(), fs::Permissions::from_mode(0o555)).unwrap();
        if fs::write(dir.path().join("writable"), b"").is_ok() {
            // Directory permissions are not enforced for this user.
            fs::set_permissions(dir.path(), fs::Permissions::from_mode(0o755)).unwrap();
            return;
        }

        let result = store.append(&LedgerRow::stamped("KA05MX4321", at(10, 0, 1)));
        let rows = store.scan();
        let after = fs::read(store.path());
        fs::set_permissions(dir.path(), fs::Permissions::from_mode(0o755)).unwrap();

        assert!(result.is_err());
        assert_eq!(after.unwrap(), before);
        let rows = rows.unwrap();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].plate_number, "TN01AB1234");
    }

    #[test]
    fn test_append_keeps_insertion_order() {
        let dir = tempdir().unwrap();
        let store = LedgerStore::new(dir.path().join("ledger.csv"));
        store.ensure_initialized().unwrap();

        store.append(&LedgerRow::stamped("TN01AB1234", at(10, 0, 0))).unwrap();
        store.append(&LedgerRow::stamped("KA05MX4321", at(10, 0, 1))).unwrap();
        store.append(&LedgerRow::stamped("MH12A0001", at(10, 0, 2))).unwrap();

        let plates: Vec<_> = store
            .scan()
            .unwrap()
            .into_iter()
            .map(|r| r.plate_number)
            .collect();
        assert_eq!(plates, ["TN01AB1234", "KA05MX4321", "MH12A0001"]);
    }

    #[test]
    fn test_append_without_ledger_fails_and_creates_nothing() {
        let dir = tempdir().unwrap();
        let store = LedgerStore::new(dir.path().join("missing.csv"));

        assert!(store.append(&LedgerRow::stamped("TN01AB1234", at(10, 0, 0))).is_err());
        assert!(!store.path().exists());
        assert_eq!(fs::read_dir(dir.path()).unwrap().count(), 0);
    }

    #[test]
    fn test_append_after_hand_edit_without_newline() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("ledger.csv");
        fs::write(&path, "Date,Time,Vehicle_Number\n01/01/2024,08:00:00,TN01AB1234").unwrap();
        let store = LedgerStore::new(&path);

        store.append(&LedgerRow::stamped("KA05MX4321", at(10, 0, 0))).unwrap();
        let rows = store.scan().unwrap();
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[1].plate_number, "KA05MX4321");
    }

    #[test]
    fn test_scan_tolerates_short_rows() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("ledger.csv");
        fs::write(&path, "Date,Time,Vehicle_Number\n01/01/2024,08:00:00\n").unwrap();

        let rows = LedgerStore::new(&path).scan().unwrap();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].plate_number, "");
    }
}
