use std::path::{Path, PathBuf};

use serde::Serialize;
use tabled::{settings::Style, Table, Tabled};
use tracing::info;

use crate::error::AuditResult;
use crate::types::AuditReport;

pub const COURIER_SUMMARY_FILE: &str = "courier_summary.csv";
pub const POSTAL_PROFILE_FILE: &str = "postal_profile.csv";
pub const MICRO_HUBS_FILE: &str = "micro_hubs.csv";
pub const INCIDENTS_FILE: &str = "incidents.csv";
pub const DELIVERY_RANKING_FILE: &str = "delivery_ranking.csv";
pub const SUMMARY_FILE: &str = "summary.json";

pub fn write_csv<T: Serialize>(path: impl AsRef<Path>, rows: &[T]) -> AuditResult<()> {
    let mut wtr = csv::Writer::from_path(path)?;
    for r in rows {
        wtr.serialize(r)?;
    }
    wtr.flush()?;
    Ok(())
}

pub fn write_json<T: Serialize>(path: impl AsRef<Path>, value: &T) -> AuditResult<()> {
    let s = serde_json::to_string_pretty(value)?;
    std::fs::write(path, s)?;
    Ok(())
}

/// Write every result set of `report` into `dir`, creating it if needed.
/// Returns the paths written, in a fixed order.
pub fn export_report(dir: impl AsRef<Path>, report: &AuditReport) -> AuditResult<Vec<PathBuf>> {
    let dir = dir.as_ref();
    std::fs::create_dir_all(dir)?;

    let written = vec![
        dir.join(COURIER_SUMMARY_FILE),
        dir.join(POSTAL_PROFILE_FILE),
        dir.join(MICRO_HUBS_FILE),
        dir.join(INCIDENTS_FILE),
        dir.join(DELIVERY_RANKING_FILE),
        dir.join(SUMMARY_FILE),
    ];
    write_csv(&written[0], &report.couriers)?;
    write_csv(&written[1], &report.postal_profile)?;
    write_csv(&written[2], &report.micro_hubs)?;
    write_csv(&written[3], &report.incidents)?;
    write_csv(&written[4], &report.ranking.rows())?;
    write_json(&written[5], &report.summary)?;

    info!(dir = %dir.display(), files = written.len(), "reports exported");
    Ok(written)
}

/// Render the first `max_rows` rows as a markdown table.
pub fn render_table<T>(rows: &[T], max_rows: usize) -> String
where
    T: Tabled + Clone,
{
    let slice: Vec<T> = rows.iter().take(max_rows).cloned().collect();
    if slice.is_empty() {
        return "(no rows)".to_string();
    }
    Table::new(slice).with(Style::markdown()).to_string()
}

pub fn preview_table<T>(title: &str, note: Option<&str>, rows: &[T], max_rows: usize)
where
    T: Tabled + Clone,
{
    println!("{}", title);
    if let Some(n) = note {
        println!("({})", n);
    }
    println!();
    println!("{}\n", render_table(rows, max_rows));
}
