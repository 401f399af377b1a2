//! Operator alert models

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// Alert severity, ordered INFO < WARNING < CRITICAL
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum AlertType {
    Info,
    Warning,
    Critical,
}

impl std::fmt::Display for AlertType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            AlertType::Info => write!(f, "INFO"),
            AlertType::Warning => write!(f, "WARNING"),
            AlertType::Critical => write!(f, "CRITICAL"),
        }
    }
}

/// Lifecycle position of an alert instance
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum AlertStatus {
    Raised,
    Acknowledged,
    Scheduled,
}

/// Numbers copied straight from the signals that produced the alert
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
pub struct AlertMetadata {
    pub infection_percentage: f64,
    pub affected_cells: usize,
    pub estimated_loss: Option<Decimal>,
    pub savings_potential: Option<Decimal>,
    pub roi_percentage: Option<Decimal>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Alert {
    /// `{rule_id}:{entity}`; identical across refresh ticks
    pub id: String,
    pub rule_id: String,
    #[serde(rename = "type")]
    pub alert_type: AlertType,
    pub title: String,
    pub message: String,
    pub action: String,
    pub metadata: AlertMetadata,
    /// Names of the signals that triggered the rule
    pub signals: Vec<String>,
    pub timestamp: DateTime<Utc>,
    pub acknowledged: bool,
    pub acknowledged_at: Option<DateTime<Utc>>,
    pub scheduled_for: Option<DateTime<Utc>>,
    /// Set once the alert leaves the active set
    pub expired_at: Option<DateTime<Utc>>,
}

impl Alert {
    pub fn status(&self) -> AlertStatus {
        if self.scheduled_for.is_some() {
            AlertStatus::Scheduled
        } else if self.acknowledged {
            AlertStatus::Acknowledged
        } else {
            AlertStatus::Raised
        }
    }
}
