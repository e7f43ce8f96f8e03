use std::path::PathBuf;

use courier_audit::config::{AuditConfig, MatchMode, ShortCodePolicy};
use courier_audit::types::{ColumnLayout, ShipmentRecord, COLUMN_COUNT};
use courier_audit::{load_from_path, load_from_reader, output, run_audit, AuditError};

fn fixture(name: &str) -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR"))
        .join("tests/data")
        .join(name)
}

fn load_fixture(name: &str) -> Vec<ShipmentRecord> {
    let (records, _) = load_from_path(fixture(name), &ColumnLayout::default(), b',')
        .unwrap_or_else(|err| panic!("failed to load fixture {name}: {err}"));
    records
}

#[test]
fn loads_fixture_with_diagnostics() {
    let (records, report) =
        load_from_path(fixture("deliveries.csv"), &ColumnLayout::default(), b',').unwrap();
    assert_eq!(records.len(), 16);
    assert_eq!(report.data_rows, 16);
    assert_eq!(report.discarded_header.len(), COLUMN_COUNT);
    assert_eq!(report.discarded_header[7], "Repartidor");
    assert_eq!(report.blank_couriers, 0);
    assert_eq!(report.blank_rows, 2);
    assert_eq!(report.lossy_rows, 0);
    assert_eq!(records[0].courier.as_deref(), Some("R-ALVAREZ"));
    assert_eq!(records[0].postal_code.as_deref(), Some("64000.0"));
}

#[test]
fn courier_summary_over_fixture() {
    let records = load_fixture("deliveries.csv");
    let report = run_audit(&records, &AuditConfig::default()).unwrap();

    let flat: Vec<(&str, usize, usize, f64)> = report
        .couriers
        .iter()
        .map(|r| (r.courier.as_str(), r.total, r.successful, r.effectiveness))
        .collect();
    assert_eq!(
        flat,
        vec![
            ("R-CRUZ", 4, 4, 100.0),
            ("R-ALVAREZ", 5, 4, 80.0),
            ("R-BRAVO", 4, 0, 0.0),
            ("R-DIAZ", 3, 0, 0.0),
        ]
    );
    let total: usize = report.couriers.iter().map(|r| r.total).sum();
    assert_eq!(total, records.len());
    assert_eq!(report.summary.overall_effectiveness, 50.0);
}

#[test]
fn exact_keyword_mode_narrows_matches() {
    let records = load_fixture("deliveries.csv");
    let mut config = AuditConfig::default();
    config.success.keywords = vec!["Entregado".to_string()];
    config.success.mode = MatchMode::Exact;
    let report = run_audit(&records, &config).unwrap();

    let successful = |name: &str| {
        report
            .couriers
            .iter()
            .find(|r| r.courier == name)
            .map(|r| r.successful)
    };
    assert_eq!(successful("R-ALVAREZ"), Some(3));
    assert_eq!(successful("R-CRUZ"), Some(3));
    assert_eq!(successful("R-BRAVO"), Some(0));
}

#[test]
fn postal_profile_and_micro_hubs_over_fixture() {
    let records = load_fixture("deliveries.csv");
    let report = run_audit(&records, &AuditConfig::default()).unwrap();

    let profile: Vec<(&str, usize, &str)> = report
        .postal_profile
        .iter()
        .map(|r| {
            (
                r.postal_code.as_str(),
                r.shipments,
                r.dominant_product.as_str(),
            )
        })
        .collect();
    assert_eq!(
        profile,
        vec![
            ("64000", 4, "Paquete"),
            ("64010", 4, "Sobre"),
            ("66450", 4, "Caja"),
            ("67100", 2, "Caja"),
            ("66460", 1, "Sobre"),
            ("99", 1, "Paquete"),
        ]
    );
    assert_eq!(report.postal_profile[0].share_pct, 25.0);
    let counted: usize = report.postal_profile.iter().map(|r| r.shipments).sum();
    assert_eq!(counted, records.len());

    let hubs: Vec<(&str, &str, usize)> = report
        .micro_hubs
        .iter()
        .map(|h| (h.prefix.as_str(), h.postal_code.as_str(), h.shipments))
        .collect();
    assert_eq!(
        hubs,
        vec![("640", "64000", 4), ("664", "66450", 4), ("671", "67100", 2)]
    );
}

#[test]
fn trailing_blank_rows_do_not_reach_reports() {
    let records = load_fixture("deliveries.csv");
    let report = run_audit(&records, &AuditConfig::default()).unwrap();

    let total: usize = report.couriers.iter().map(|r| r.total).sum();
    assert_eq!(total, 16);
    assert!(report.couriers.iter().all(|r| !r.courier.is_empty()));
    assert!(report.postal_profile.iter().all(|r| !r.postal_code.is_empty()));
    assert!(report.incidents.iter().all(|r| !r.courier.is_empty()));
}

#[test]
fn reject_policy_surfaces_short_code() {
    let records = load_fixture("deliveries.csv");
    let config = AuditConfig {
        short_code_policy: ShortCodePolicy::Reject,
        ..AuditConfig::default()
    };
    let err = run_audit(&records, &config).unwrap_err();
    assert!(matches!(err, AuditError::InvalidPostalCode { ref code } if code == "99"));
}

#[test]
fn incidents_and_ranking_over_fixture() {
    let records = load_fixture("deliveries.csv");
    let report = run_audit(&records, &AuditConfig::default()).unwrap();

    let top: Vec<(&str, &str, usize)> = report
        .incidents
        .iter()
        .take(4)
        .map(|r| (r.courier.as_str(), r.reason.as_str(), r.occurrences))
        .collect();
    assert_eq!(
        top,
        vec![
            ("R-ALVAREZ", "Entregado", 3),
            ("R-BRAVO", "Causa Ajena", 3),
            ("R-CRUZ", "Entregado", 2),
            ("R-DIAZ", "Causa Ajena", 2),
        ]
    );
    assert_eq!(report.incidents.len(), 10);

    let most: Vec<&str> = report.ranking.most.iter().map(|r| r.courier.as_str()).collect();
    let fewest: Vec<&str> = report
        .ranking
        .fewest
        .iter()
        .map(|r| r.courier.as_str())
        .collect();
    assert_eq!(most, vec!["R-ALVAREZ", "R-CRUZ", "R-BRAVO", "R-DIAZ"]);
    assert_eq!(fewest, vec!["R-BRAVO", "R-DIAZ", "R-ALVAREZ", "R-CRUZ"]);
    assert_eq!(report.ranking.most[0].share_pct, 25.0);
}

#[test]
fn schema_errors_from_fixtures() {
    let err = load_from_path(fixture("wrong_width.csv"), &ColumnLayout::default(), b',')
        .unwrap_err();
    assert!(matches!(
        err,
        AuditError::SchemaMismatch {
            line: 5,
            expected: 17,
            found: 15
        }
    ));

    let err = load_from_path(fixture("header_only.csv"), &ColumnLayout::default(), b',')
        .unwrap_err();
    assert!(matches!(err, AuditError::EmptyInput));
}

#[test]
fn missing_file_is_csv_error() {
    let err = load_from_path(fixture("nope.csv"), &ColumnLayout::default(), b',').unwrap_err();
    assert!(matches!(err, AuditError::Csv { .. }));
}

#[test]
fn raw_cells_round_trip() {
    let records = load_fixture("deliveries.csv");
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("roundtrip.csv");

    let mut wtr = csv::Writer::from_path(&path).unwrap();
    let header: Vec<String> = (b'A'..=b'Q').map(|c| (c as char).to_string()).collect();
    wtr.write_record(&header).unwrap();
    for r in &records {
        wtr.write_record(r.cells()).unwrap();
    }
    wtr.flush().unwrap();
    drop(wtr);

    let (again, _) = load_from_path(&path, &ColumnLayout::default(), b',').unwrap();
    assert_eq!(again, records);
}

#[test]
fn custom_layout_rebinds_columns() {
    let mut cells = vec![String::new(); COLUMN_COUNT];
    cells[0] = "R-ZETA".to_string();
    cells[1] = "Entregado".to_string();
    cells[2] = "Caja".to_string();
    cells[3] = "01234".to_string();
    let header = vec!["x"; COLUMN_COUNT].join(",");
    let text = format!("{}\n{}\n", header, cells.join(","));

    let layout = ColumnLayout {
        courier: "A".parse().unwrap(),
        status_text: "B".parse().unwrap(),
        product: "C".parse().unwrap(),
        postal_code: "D".parse().unwrap(),
    };
    let (records, _) = load_from_reader(text.as_bytes(), &layout, b',').unwrap();
    let report = run_audit(&records, &AuditConfig::default()).unwrap();
    assert_eq!(report.couriers[0].courier, "R-ZETA");
    assert_eq!(report.couriers[0].effectiveness, 100.0);
    assert_eq!(report.postal_profile[0].postal_code, "01234");
    assert_eq!(report.micro_hubs[0].prefix, "012");
}

#[test]
fn exports_all_report_files() {
    let records = load_fixture("deliveries.csv");
    let report = run_audit(&records, &AuditConfig::default()).unwrap();
    let dir = tempfile::tempdir().unwrap();
    let out = dir.path().join("reports");

    let written = output::export_report(&out, &report).unwrap();
    assert_eq!(written.len(), 6);
    for path in &written {
        assert!(path.exists(), "{} missing", path.display());
    }

    let couriers = std::fs::read_to_string(out.join(output::COURIER_SUMMARY_FILE)).unwrap();
    let mut lines = couriers.lines();
    assert_eq!(lines.next(), Some("Courier,Total,Successful,Effectiveness"));
    assert_eq!(lines.next(), Some("R-CRUZ,4,4,100.0"));

    let ranking = std::fs::read_to_string(out.join(output::DELIVERY_RANKING_FILE)).unwrap();
    assert!(ranking.starts_with("Ranking,Rank,Courier,Successful,SharePct"));
    assert!(ranking.contains("most,1,R-ALVAREZ,4,25.0"));
    assert!(ranking.contains("fewest,1,R-BRAVO,0,0.0"));

    let summary: serde_json::Value =
        serde_json::from_str(&std::fs::read_to_string(out.join(output::SUMMARY_FILE)).unwrap())
            .unwrap();
    assert_eq!(summary["total_shipments"], 16);
    assert_eq!(summary["total_couriers"], 4);
    assert_eq!(summary["micro_hubs"], 3);
    assert!(summary["generated_at"].is_string());
}

#[test]
fn sample_config_matches_defaults() {
    let path = PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("audit.toml");
    let config = AuditConfig::from_path(path).unwrap();
    assert_eq!(config, AuditConfig::default());
}
