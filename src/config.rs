use std::path::Path;

use serde::Deserialize;

use crate::error::{AuditError, AuditResult};
use crate::types::ColumnLayout;

/// How a status value is compared against the success keywords.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MatchMode {
    /// Keyword appears anywhere in the status text.
    #[default]
    Substring,
    /// Whole trimmed status text equals a keyword.
    Exact,
}

/// Decides whether a status text counts as a successful delivery.
pub trait SuccessPredicate {
    fn is_success(&self, status: &str) -> bool;
}

impl<F> SuccessPredicate for F
where
    F: Fn(&str) -> bool,
{
    fn is_success(&self, status: &str) -> bool {
        self(status)
    }
}

/// Case-insensitive keyword matcher.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SuccessMatcher {
    keywords: Vec<String>,
    mode: MatchMode,
}

impl SuccessMatcher {
    pub fn new<I, S>(keywords: I, mode: MatchMode) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let keywords = keywords
            .into_iter()
            .map(|k| k.as_ref().trim().to_lowercase())
            .filter(|k| !k.is_empty())
            .collect();
        Self { keywords, mode }
    }

    pub fn keywords(&self) -> &[String] {
        &self.keywords
    }

    pub fn mode(&self) -> MatchMode {
        self.mode
    }
}

impl Default for SuccessMatcher {
    fn default() -> Self {
        SuccessConfig::default().matcher()
    }
}

impl SuccessPredicate for SuccessMatcher {
    fn is_success(&self, status: &str) -> bool {
        let status = status.trim().to_lowercase();
        match self.mode {
            MatchMode::Substring => self.keywords.iter().any(|k| status.contains(k.as_str())),
            MatchMode::Exact => self.keywords.iter().any(|k| status == *k),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct SuccessConfig {
    pub keywords: Vec<String>,
    pub mode: MatchMode,
}

impl Default for SuccessConfig {
    fn default() -> Self {
        Self {
            keywords: vec!["entregado".to_string(), "efectividad".to_string()],
            mode: MatchMode::Substring,
        }
    }
}

impl SuccessConfig {
    pub fn matcher(&self) -> SuccessMatcher {
        SuccessMatcher::new(&self.keywords, self.mode)
    }
}

/// What the micro-hub selector does with codes shorter than the prefix.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ShortCodePolicy {
    #[default]
    Skip,
    Reject,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct Limits {
    /// Number of top-volume postal codes considered for micro-hubs.
    pub hub_pool: usize,
    pub incidents_top: usize,
    pub ranking_size: usize,
    pub preview_rows: usize,
}

impl Default for Limits {
    fn default() -> Self {
        Self {
            hub_pool: 15,
            incidents_top: 10,
            ranking_size: 5,
            preview_rows: 5,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct InputConfig {
    pub delimiter: char,
}

impl Default for InputConfig {
    fn default() -> Self {
        Self { delimiter: ',' }
    }
}

impl InputConfig {
    pub fn delimiter_byte(&self) -> AuditResult<u8> {
        if self.delimiter.is_ascii() {
            Ok(self.delimiter as u8)
        } else {
            Err(AuditError::Config {
                message: format!("delimiter {:?} must be a single ASCII character", self.delimiter),
            })
        }
    }
}

/// Run configuration, usually read from a TOML file.
#[derive(Debug, Clone, PartialEq, Default, Deserialize)]
#[serde(default)]
pub struct AuditConfig {
    pub success: SuccessConfig,
    pub columns: ColumnLayout,
    pub limits: Limits,
    pub input: InputConfig,
    pub short_code_policy: ShortCodePolicy,
}

impl AuditConfig {
    pub fn from_toml_str(s: &str) -> AuditResult<Self> {
        let config: Self = toml::from_str(s).map_err(|e| AuditError::Config {
            message: e.to_string(),
        })?;
        config.columns.validate()?;
        Ok(config)
    }

    pub fn from_path(path: impl AsRef<Path>) -> AuditResult<Self> {
        let text = std::fs::read_to_string(path)?;
        Self::from_toml_str(&text)
    }
}
