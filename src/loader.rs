use std::io::Read;
use std::path::Path;

use csv::{ByteRecord, ReaderBuilder};
use tracing::{debug, info, warn};

use crate::error::{AuditError, AuditResult};
use crate::types::{ColumnLayout, ShipmentRecord, COLUMN_COUNT};

/// Diagnostics gathered while loading a delivery report.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct LoadReport {
    pub data_rows: usize,
    /// Labels from row 1. They are reported but never used for binding.
    pub discarded_header: Vec<String>,
    pub blank_couriers: usize,
    pub blank_postal_codes: usize,
    /// Rows whose cells were all blank. These are dropped, not loaded.
    pub blank_rows: usize,
    /// Rows holding bytes that are not valid UTF-8 (e.g. Windows-1252
    /// exports). Offending bytes are replaced with U+FFFD.
    pub lossy_rows: usize,
}

pub fn load_from_path(
    path: impl AsRef<Path>,
    layout: &ColumnLayout,
    delimiter: u8,
) -> AuditResult<(Vec<ShipmentRecord>, LoadReport)> {
    let path = path.as_ref();
    info!(path = %path.display(), "loading delivery report");
    let rdr = reader_builder(delimiter).from_path(path)?;
    load_records(rdr, layout)
}

pub fn load_from_reader<R: Read>(
    reader: R,
    layout: &ColumnLayout,
    delimiter: u8,
) -> AuditResult<(Vec<ShipmentRecord>, LoadReport)> {
    let rdr = reader_builder(delimiter).from_reader(reader);
    load_records(rdr, layout)
}

fn reader_builder(delimiter: u8) -> ReaderBuilder {
    let mut builder = ReaderBuilder::new();
    // Row widths are checked here so a mismatch surfaces as `SchemaMismatch`
    // instead of a generic CSV error.
    builder.has_headers(true).flexible(true).delimiter(delimiter);
    builder
}

fn load_records<R: Read>(
    mut rdr: csv::Reader<R>,
    layout: &ColumnLayout,
) -> AuditResult<(Vec<ShipmentRecord>, LoadReport)> {
    layout.validate()?;
    let header = rdr.byte_headers()?.clone();
    if header.is_empty() {
        return Err(AuditError::EmptyInput);
    }
    check_width(&header, 1)?;

    let (discarded_header, _) = decode_cells(&header);
    let mut report = LoadReport {
        discarded_header,
        ..LoadReport::default()
    };
    let mut records = Vec::new();

    for result in rdr.byte_records() {
        let row = result?;
        let line = row.position().map(|p| p.line()).unwrap_or(0);
        check_width(&row, line)?;

        let (cells, lossy) = decode_cells(&row);
        if lossy {
            report.lossy_rows += 1;
        }
        if cells.iter().all(|c| c.trim().is_empty()) {
            report.blank_rows += 1;
            continue;
        }

        let record = ShipmentRecord::from_cells(cells, layout);
        if record.courier.as_deref().is_some_and(str::is_empty) {
            report.blank_couriers += 1;
        }
        if record.postal_code.as_deref().is_some_and(str::is_empty) {
            report.blank_postal_codes += 1;
        }
        records.push(record);
    }

    if records.is_empty() {
        return Err(AuditError::EmptyInput);
    }
    if report.lossy_rows > 0 {
        warn!(
            rows = report.lossy_rows,
            "input is not valid UTF-8; undecodable bytes were replaced"
        );
    }

    report.data_rows = records.len();
    debug!(
        blank_couriers = report.blank_couriers,
        blank_postal_codes = report.blank_postal_codes,
        blank_rows = report.blank_rows,
        "header discarded: {:?}",
        report.discarded_header
    );
    info!(rows = report.data_rows, "delivery report loaded");
    Ok((records, report))
}

// Decode every field, returning whether any needed lossy replacement.
fn decode_cells(row: &ByteRecord) -> (Vec<String>, bool) {
    let mut lossy = false;
    let cells: Vec<String> = row
        .iter()
        .map(|field| match std::str::from_utf8(field) {
            Ok(s) => s.to_string(),
            Err(_) => {
                lossy = true;
                String::from_utf8_lossy(field).into_owned()
            }
        })
        .collect();
    (cells, lossy)
}

fn check_width(row: &ByteRecord, line: u64) -> AuditResult<()> {
    if row.len() != COLUMN_COUNT {
        return Err(AuditError::SchemaMismatch {
            line,
            expected: COLUMN_COUNT,
            found: row.len(),
        });
    }
    Ok(())
}
