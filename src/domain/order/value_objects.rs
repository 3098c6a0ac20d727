use std::fmt;
use std::fmt::Write as _;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

// ============================================================================
// Order Value Objects
// ============================================================================

/// Identifier as the order-history store hands it out.
///
/// Legacy rows carry numeric identifiers, newer ones carry uuid strings; both
/// are preserved verbatim so commands echo back exactly what was read.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Identifier {
    Numeric(u64),
    Text(String),
}

impl fmt::Display for Identifier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Identifier::Numeric(n) => write!(f, "{n}"),
            Identifier::Text(s) => f.write_str(s),
        }
    }
}

/// Order identifier (`uuid` / `previousOrderUuid`)
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct OrderUuid(pub Identifier);

impl From<u64> for OrderUuid {
    fn from(value: u64) -> Self {
        Self(Identifier::Numeric(value))
    }
}

impl From<&str> for OrderUuid {
    fn from(value: &str) -> Self {
        Self(Identifier::Text(value.to_string()))
    }
}

impl fmt::Display for OrderUuid {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

/// Human-facing order number shown in the table and the confirmation prompt
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct OrderNumber(pub Identifier);

impl From<u64> for OrderNumber {
    fn from(value: u64) -> Self {
        Self(Identifier::Numeric(value))
    }
}

impl From<&str> for OrderNumber {
    fn from(value: &str) -> Self {
        Self(Identifier::Text(value.to_string()))
    }
}

impl fmt::Display for OrderNumber {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

/// Concept or drug identifier
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ConceptUuid(pub String);

impl ConceptUuid {
    pub fn new(uuid: impl Into<String>) -> Self {
        Self(uuid.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ConceptUuid {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Clinical context of a test order (e.g. outpatient)
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CareSetting(pub String);

impl CareSetting {
    pub fn new(uuid: impl Into<String>) -> Self {
        Self(uuid.into())
    }
}

/// Classification of the clinical encounter
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct EncounterType(pub String);

impl EncounterType {
    pub fn new(uuid: impl Into<String>) -> Self {
        Self(uuid.into())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum OrderStatus {
    #[serde(alias = "ACTIVE")]
    Active,
    #[serde(alias = "DISCONTINUED")]
    Discontinued,
    #[serde(alias = "EXPIRED")]
    Expired,
}

impl OrderStatus {
    /// Discontinued and Expired orders accept no further commands.
    pub fn is_terminal(&self) -> bool {
        !matches!(self, OrderStatus::Active)
    }
}

impl fmt::Display for OrderStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            OrderStatus::Active => "Active",
            OrderStatus::Discontinued => "Discontinued",
            OrderStatus::Expired => "Expired",
        };
        f.write_str(label)
    }
}

/// Provider who placed the order
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Orderer {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub uuid: Option<String>,
    pub display: String,
}

impl Orderer {
    pub fn new(display: impl Into<String>) -> Self {
        Self {
            uuid: None,
            display: display.into(),
        }
    }
}

/// Period during which the order is in effect
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ActiveDates {
    pub start: NaiveDate,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub end: Option<NaiveDate>,
}

impl ActiveDates {
    pub fn new(start: NaiveDate, end: Option<NaiveDate>) -> Self {
        Self { start, end }
    }

    /// Render as `start - end` (or just `start` for open-ended orders).
    ///
    /// An unusable `pattern` falls back to ISO-8601 rather than failing the row.
    pub fn render(&self, pattern: &str) -> String {
        let start = format_date(self.start, pattern);
        match self.end {
            Some(end) => format!("{} - {}", start, format_date(end, pattern)),
            None => start,
        }
    }
}

fn format_date(date: NaiveDate, pattern: &str) -> String {
    let mut out = String::new();
    if write!(out, "{}", date.format(pattern)).is_err() {
        return date.to_string();
    }
    out
}

// ============================================================================
// Unit Tests
// ============================================================================
