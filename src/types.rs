use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tabled::Tabled;

use crate::error::{AuditError, AuditResult, Stage};
use crate::util::display_pct;

/// Width of the delivery report: columns A through Q.
pub const COLUMN_COUNT: usize = 17;

/// A positional column identifier, `A` (index 0) through `Q` (index 16).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Deserialize)]
#[serde(try_from = "String")]
pub struct ColumnId(u8);

impl ColumnId {
    pub fn from_letter(letter: char) -> Option<Self> {
        let upper = letter.to_ascii_uppercase();
        if !upper.is_ascii_uppercase() {
            return None;
        }
        let idx = upper as u8 - b'A';
        if (idx as usize) < COLUMN_COUNT {
            Some(ColumnId(idx))
        } else {
            None
        }
    }

    pub fn index(self) -> usize {
        self.0 as usize
    }

    pub fn letter(self) -> char {
        (b'A' + self.0) as char
    }
}

impl fmt::Display for ColumnId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.letter())
    }
}

impl FromStr for ColumnId {
    type Err = AuditError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let mut chars = s.trim().chars();
        match (chars.next(), chars.next()) {
            (Some(c), None) => ColumnId::from_letter(c).ok_or_else(|| AuditError::Config {
                message: format!("column {c:?} is outside A..Q"),
            }),
            _ => Err(AuditError::Config {
                message: format!("column {s:?} must be a single letter A..Q"),
            }),
        }
    }
}

impl TryFrom<String> for ColumnId {
    type Error = AuditError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

/// Semantic fields the pipeline reads from a shipment record.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Field {
    Courier,
    StatusText,
    Product,
    PostalCode,
}

impl fmt::Display for Field {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Field::Courier => "courier",
            Field::StatusText => "status_text",
            Field::Product => "product",
            Field::PostalCode => "postal_code",
        };
        f.write_str(name)
    }
}

/// Position-to-name mapping applied once at load time.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct ColumnLayout {
    pub courier: ColumnId,
    pub status_text: ColumnId,
    pub product: ColumnId,
    pub postal_code: ColumnId,
}

impl Default for ColumnLayout {
    fn default() -> Self {
        Self {
            courier: ColumnId(7),
            status_text: ColumnId(11),
            product: ColumnId(12),
            postal_code: ColumnId(14),
        }
    }
}

impl ColumnLayout {
    pub fn column_for(&self, field: Field) -> ColumnId {
        match field {
            Field::Courier => self.courier,
            Field::StatusText => self.status_text,
            Field::Product => self.product,
            Field::PostalCode => self.postal_code,
        }
    }

    /// Each semantic field must read its own column.
    pub fn validate(&self) -> AuditResult<()> {
        const FIELDS: [Field; 4] = [
            Field::Courier,
            Field::StatusText,
            Field::Product,
            Field::PostalCode,
        ];
        for (i, a) in FIELDS.iter().enumerate() {
            for b in &FIELDS[i + 1..] {
                let col = self.column_for(*a);
                if col == self.column_for(*b) {
                    return Err(AuditError::Config {
                        message: format!("`{a}` and `{b}` are both mapped to column {col}"),
                    });
                }
            }
        }
        Ok(())
    }
}

/// One row of the delivery report.
///
/// All 17 raw cells are retained so the table can be written back out
/// unchanged. The named fields are `None` only for records built by callers
/// that never bound them.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct ShipmentRecord {
    cells: Vec<String>,
    pub courier: Option<String>,
    pub status_text: Option<String>,
    pub product: Option<String>,
    pub postal_code: Option<String>,
}

impl ShipmentRecord {
    /// Build a record from raw cells, binding named fields through `layout`.
    pub fn from_cells(cells: Vec<String>, layout: &ColumnLayout) -> Self {
        let bind = |field: Field| {
            cells
                .get(layout.column_for(field).index())
                .map(|v| v.trim().to_string())
        };
        Self {
            courier: bind(Field::Courier),
            status_text: bind(Field::StatusText),
            product: bind(Field::Product),
            postal_code: bind(Field::PostalCode),
            cells,
        }
    }

    /// Build a record directly from the four semantic fields, laid out in the
    /// default column positions.
    pub fn new(
        courier: impl Into<String>,
        status_text: impl Into<String>,
        product: impl Into<String>,
        postal_code: impl Into<String>,
    ) -> Self {
        let layout = ColumnLayout::default();
        let mut cells = vec![String::new(); COLUMN_COUNT];
        cells[layout.courier.index()] = courier.into();
        cells[layout.status_text.index()] = status_text.into();
        cells[layout.product.index()] = product.into();
        cells[layout.postal_code.index()] = postal_code.into();
        Self::from_cells(cells, &layout)
    }

    pub fn cells(&self) -> &[String] {
        &self.cells
    }

    pub fn field(&self, field: Field) -> Option<&str> {
        match field {
            Field::Courier => self.courier.as_deref(),
            Field::StatusText => self.status_text.as_deref(),
            Field::Product => self.product.as_deref(),
            Field::PostalCode => self.postal_code.as_deref(),
        }
    }

    /// Fetch a field a stage depends on, failing with `MissingColumn`.
    pub fn require(&self, field: Field, stage: Stage, record: usize) -> AuditResult<&str> {
        self.field(field).ok_or(AuditError::MissingColumn {
            stage,
            field,
            record,
        })
    }
}

#[derive(Debug, Serialize, Tabled, Clone, PartialEq)]
pub struct CourierSummaryRow {
    #[serde(rename = "Courier")]
    #[tabled(rename = "Courier")]
    pub courier: String,
    #[serde(rename = "Total")]
    #[tabled(rename = "Total")]
    pub total: usize,
    #[serde(rename = "Successful")]
    #[tabled(rename = "Successful")]
    pub successful: usize,
    #[serde(rename = "Effectiveness")]
    #[tabled(rename = "Effectiveness (%)", display_with = "display_pct")]
    pub effectiveness: f64,
}

#[derive(Debug, Serialize, Tabled, Clone, PartialEq)]
pub struct PostalCodeProfileRow {
    #[serde(rename = "PostalCode")]
    #[tabled(rename = "PostalCode")]
    pub postal_code: String,
    #[serde(rename = "Shipments")]
    #[tabled(rename = "Shipments")]
    pub shipments: usize,
    #[serde(rename = "SharePct")]
    #[tabled(rename = "Share (%)", display_with = "display_pct")]
    pub share_pct: f64,
    #[serde(rename = "DominantProduct")]
    #[tabled(rename = "DominantProduct")]
    pub dominant_product: String,
}

#[derive(Debug, Serialize, Tabled, Clone, PartialEq)]
pub struct MicroHubCandidate {
    #[serde(rename = "Prefix")]
    #[tabled(rename = "Prefix")]
    pub prefix: String,
    #[serde(rename = "PostalCode")]
    #[tabled(rename = "PostalCode")]
    pub postal_code: String,
    #[serde(rename = "Shipments")]
    #[tabled(rename = "Shipments")]
    pub shipments: usize,
}

#[derive(Debug, Serialize, Tabled, Clone, PartialEq)]
pub struct IncidentRow {
    #[serde(rename = "Courier")]
    #[tabled(rename = "Courier")]
    pub courier: String,
    #[serde(rename = "Reason")]
    #[tabled(rename = "Reason")]
    pub reason: String,
    #[serde(rename = "Occurrences")]
    #[tabled(rename = "Occurrences")]
    pub occurrences: usize,
}

#[derive(Debug, Serialize, Clone, Copy, PartialEq, Eq)]
pub enum RankingKind {
    #[serde(rename = "most")]
    Most,
    #[serde(rename = "fewest")]
    Fewest,
}

impl fmt::Display for RankingKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RankingKind::Most => f.write_str("most"),
            RankingKind::Fewest => f.write_str("fewest"),
        }
    }
}

#[derive(Debug, Serialize, Tabled, Clone, PartialEq)]
pub struct DeliveryRankingRow {
    #[serde(rename = "Ranking")]
    #[tabled(rename = "Ranking")]
    pub kind: RankingKind,
    #[serde(rename = "Rank")]
    #[tabled(rename = "Rank")]
    pub rank: usize,
    #[serde(rename = "Courier")]
    #[tabled(rename = "Courier")]
    pub courier: String,
    #[serde(rename = "Successful")]
    #[tabled(rename = "Successful")]
    pub successful: usize,
    #[serde(rename = "SharePct")]
    #[tabled(rename = "Share (%)", display_with = "display_pct")]
    pub share_pct: f64,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct DeliveryRanking {
    pub most: Vec<DeliveryRankingRow>,
    pub fewest: Vec<DeliveryRankingRow>,
}

impl DeliveryRanking {
    /// Both rankings as one sequence, `most` first.
    pub fn rows(&self) -> Vec<DeliveryRankingRow> {
        self.most.iter().chain(self.fewest.iter()).cloned().collect()
    }
}

#[derive(Debug, Serialize, Clone, PartialEq)]
pub struct SummaryStats {
    pub total_shipments: usize,
    pub total_couriers: usize,
    pub total_postal_codes: usize,
    pub overall_effectiveness: f64,
    pub micro_hubs: usize,
    pub generated_at: DateTime<Utc>,
}

/// Everything one audit run produces.
#[derive(Debug, Clone)]
pub struct AuditReport {
    pub couriers: Vec<CourierSummaryRow>,
    pub postal_profile: Vec<PostalCodeProfileRow>,
    pub micro_hubs: Vec<MicroHubCandidate>,
    pub incidents: Vec<IncidentRow>,
    pub ranking: DeliveryRanking,
    pub summary: SummaryStats,
}
