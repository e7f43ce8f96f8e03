//! Delivery audit reporting.
//!
//! Loads a 17-column delivery report (columns A..Q) and derives per-courier
//! effectiveness, postal-code concentration, micro-hub candidates and
//! incident breakdowns. Every stage is a pure function of the loaded records
//! and an [`AuditConfig`]; rendering and file export live in [`output`].
pub mod config;
pub mod error;
pub mod loader;
pub mod output;
pub mod reports;
pub mod types;
pub mod util;

pub use config::{AuditConfig, MatchMode, ShortCodePolicy, SuccessMatcher, SuccessPredicate};
pub use error::{AuditError, AuditResult, Stage};
pub use loader::{load_from_path, load_from_reader, LoadReport};
pub use reports::run_audit;
pub use types::{AuditReport, ColumnLayout, ShipmentRecord};
