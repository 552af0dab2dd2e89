//! Two-tier duplicate suppression: plates accepted during this run, then
//! every plate already in the ledger.

use std::collections::HashSet;

use super::LedgerStore;
use crate::error::Result;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Duplicate {
    InSession,
    InLedger,
}

/// Plates accepted since the process started. Only grows.
#[derive(Debug, Default, Clone)]
pub struct SeenPlates {
    plates: HashSet<String>,
}

impl SeenPlates {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn contains(&self, plate: &str) -> bool {
        self.plates.contains(plate)
    }

    /// Call only after the ledger append for `plate` succeeded.
    pub fn record_accepted(&mut self, plate: &str) {
        self.plates.insert(plate.to_string());
    }

    pub fn len(&self) -> usize {
        self.plates.len()
    }

    pub fn is_empty(&self) -> bool {
        self.plates.is_empty()
    }
}

impl<S: Into<String>> FromIterator<S> for SeenPlates {
    fn from_iter<I: IntoIterator<Item = S>>(iter: I) -> Self {
        Self {
            plates: iter.into_iter().map(Into::into).collect(),
        }
    }
}

pub struct DuplicateTracker;

impl DuplicateTracker {
    /// Session membership first, then a fresh scan of the ledger.
    ///
    /// The ledger check is containment, not equality: a plate counts as
    /// stored when it appears anywhere inside a stored plate field.
    pub fn check(plate: &str, seen: &SeenPlates, ledger: &LedgerStore) -> Result<Option<Duplicate>> {
        if seen.contains(plate) {
            return Ok(Some(Duplicate::InSession));
        }

        let stored = ledger.scan()?.into_iter().any(|row| {
            !row.plate_number.is_empty() && row.plate_number.contains(plate)
        });
        Ok(stored.then_some(Duplicate::InLedger))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ledger::LedgerRow;
    use tempfile::tempdir;

    fn ledger_with(plates: &[&str]) -> (tempfile::TempDir, LedgerStore) {
        let dir = tempdir().unwrap();
        let store = LedgerStore::new(dir.path().join("ledger.csv"));
        store.ensure_initialized().unwrap();
        for plate in plates {
            store.append(&LedgerRow::new("01/01/2024", "08:00:00", *plate)).unwrap();
        }
        (dir, store)
    }

    #[test]
    fn test_session_hit_short_circuits() {
        let (_dir, store) = ledger_with(&[]);
        let seen: SeenPlates = ["TN01AB1234"].into_iter().collect();
        // Ledger file gone: a scan would fail, so only the session check ran.
        std::fs::remove_file(store.path()).unwrap();

        assert_eq!(
            DuplicateTracker::check("TN01AB1234", &seen, &store).unwrap(),
            Some(Duplicate::InSession)
        );
    }

    #[test]
    fn test_ledger_match_is_substring() {
        let (_dir, store) = ledger_with(&["TN01AB1234EXTRA"]);
        let seen = SeenPlates::new();

        assert_eq!(
            DuplicateTracker::check("TN01AB1234", &seen, &store).unwrap(),
            Some(Duplicate::InLedger)
        );
        // Containment only works one way.
        let (_dir2, store2) = ledger_with(&["TN01AB12"]);
        assert_eq!(DuplicateTracker::check("TN01AB1234", &seen, &store2).unwrap(), None);
    }

    #[test]
    fn test_header_is_not_a_plate() {
        let (_dir, store) = ledger_with(&[]);
        assert_eq!(
            DuplicateTracker::check("Vehicle_Number", &SeenPlates::new(), &store).unwrap(),
            None
        );
    }

    #[test]
    fn test_scan_sees_latest_append() {
        let (_dir, store) = ledger_with(&[]);
        let seen = SeenPlates::new();
        assert_eq!(DuplicateTracker::check("KA05MX4321", &seen, &store).unwrap(), None);

        store.append(&LedgerRow::new("01/01/2024", "08:00:01", "KA05MX4321")).unwrap();
        assert_eq!(
            DuplicateTracker::check("KA05MX4321", &seen, &store).unwrap(),
            Some(Duplicate::InLedger)
        );
    }

    #[test]
    fn test_missing_ledger_is_an_error() {
        let dir = tempdir().unwrap();
        let store = LedgerStore::new(dir.path().join("missing.csv"));
        assert!(DuplicateTracker::check("TN01AB1234", &SeenPlates::new(), &store).is_err());
    }
}
