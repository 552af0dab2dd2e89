//! Excel rendering of a ledger.

use std::path::Path;

use rust_xlsxwriter::{Format, Workbook};

use super::{LedgerRow, HEADER};
use crate::error::{PlateError, Result};

fn xlsx_err(e: rust_xlsxwriter::XlsxError) -> PlateError {
    PlateError::Workbook(e.to_string())
}

/// Writes `rows` under the ledger header into a single-sheet workbook.
pub fn export_workbook(rows: &[LedgerRow], output_path: &Path) -> Result<()> {
    let mut workbook = Workbook::new();
    let sheet = workbook.add_worksheet();
    sheet.set_name("Ledger").map_err(xlsx_err)?;

    let header_format = Format::new().set_bold();
    for (col, header) in HEADER.iter().enumerate() {
        sheet
            .write_string_with_format(0, col as u16, *header, &header_format)
            .map_err(xlsx_err)?;
    }

    for (idx, row) in rows.iter().enumerate() {
        let r = (idx + 1) as u32;
        sheet.write_string(r, 0, &row.date).map_err(xlsx_err)?;
        sheet.write_string(r, 1, &row.time).map_err(xlsx_err)?;
        sheet.write_string(r, 2, &row.plate_number).map_err(xlsx_err)?;
    }

    workbook.save(output_path).map_err(xlsx_err)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_export_writes_workbook() {
        let dir = tempdir().unwrap();
        let out = dir.path().join("7.3.2024.xlsx");
        let rows = vec![
            LedgerRow::new("07/03/2024", "10:00:00", "TN01AB1234"),
            LedgerRow::new("07/03/2024", "10:00:05", "KA05MX4321"),
        ];

        export_workbook(&rows, &out).unwrap();

        let bytes = std::fs::read(&out).unwrap();
        // xlsx is a zip container
        assert_eq!(&bytes[..2], b"PK");
    }
}
