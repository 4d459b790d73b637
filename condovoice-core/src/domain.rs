//! Domain types shared between the engine and the surrounding screens.
//!
//! User-facing labels stay Italian (`Bassa`, `Aperta`, …) because the
//! classifier and the product speak Italian; parsing accepts English
//! synonyms so classifier output in either language normalizes cleanly.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// A dashboard section the assistant can navigate to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Screen {
    #[default]
    Dashboard,
    Accounting,
    Assemblies,
    Residents,
    Suppliers,
    Documents,
    Maintenance,
    Emergency,
    Analytics,
    Legal,
    Condominiums,
}

/// Urgency of a maintenance ticket.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
pub enum Urgency {
    #[serde(rename = "Bassa")]
    Low,
    #[default]
    #[serde(rename = "Media")]
    Medium,
    #[serde(rename = "Alta")]
    High,
}

impl Urgency {
    /// Parse a free-form urgency label from the classifier.
    ///
    /// Returns `None` for anything outside the known vocabulary — callers
    /// fall back to [`Urgency::default`] rather than guessing.
    pub fn from_label(label: &str) -> Option<Self> {
        match label.trim().to_lowercase().as_str() {
            "bassa" | "low" => Some(Self::Low),
            "media" | "medium" => Some(Self::Medium),
            "alta" | "high" => Some(Self::High),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Low => "Bassa",
            Self::Medium => "Media",
            Self::High => "Alta",
        }
    }
}

impl std::fmt::Display for Urgency {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Workflow status of a maintenance ticket.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
pub enum TicketStatus {
    #[default]
    #[serde(rename = "Aperta")]
    Open,
    #[serde(rename = "In Lavorazione")]
    InProgress,
    #[serde(rename = "Chiusa")]
    Closed,
}

impl TicketStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Open => "Aperta",
            Self::InProgress => "In Lavorazione",
            Self::Closed => "Chiusa",
        }
    }
}

impl std::fmt::Display for TicketStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A maintenance ticket in the shared ticket collection.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MaintenanceTicket {
    pub id: String,
    pub subject: String,
    pub location: String,
    pub urgency: Urgency,
    pub status: TicketStatus,
    pub date: NaiveDate,
    pub description: String,
}

/// Which condominium the dashboard is currently filtered to.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(from = "String", into = "String")]
pub enum CondoSelection {
    /// Aggregate view across every managed condominium.
    #[default]
    All,
    /// A single condominium, by registry id.
    One(String),
}

impl From<String> for CondoSelection {
    fn from(value: String) -> Self {
        if value == "all" {
            Self::All
        } else {
            Self::One(value)
        }
    }
}

impl From<CondoSelection> for String {
    fn from(value: CondoSelection) -> Self {
        match value {
            CondoSelection::All => "all".to_string(),
            CondoSelection::One(id) => id,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn urgency_parses_italian_and_english_labels() {
        assert_eq!(Urgency::from_label("Alta"), Some(Urgency::High));
        assert_eq!(Urgency::from_label(" high "), Some(Urgency::High));
        assert_eq!(Urgency::from_label("media"), Some(Urgency::Medium));
        assert_eq!(Urgency::from_label("bassa"), Some(Urgency::Low));
        assert_eq!(Urgency::from_label("urgentissima"), None);
    }

    #[test]
    fn screen_serializes_with_screaming_snake_case() {
        let json = serde_json::to_value(Screen::Maintenance).expect("serialize screen");
        assert_eq!(json, "MAINTENANCE");
        let back: Screen = serde_json::from_value(json).expect("deserialize screen");
        assert_eq!(back, Screen::Maintenance);
    }

    #[test]
    fn condo_selection_round_trips_through_wire_strings() {
        let all: CondoSelection = serde_json::from_str(r#""all""#).expect("parse all");
        assert_eq!(all, CondoSelection::All);

        let one: CondoSelection = serde_json::from_str(r#""c-2""#).expect("parse id");
        assert_eq!(one, CondoSelection::One("c-2".into()));

        assert_eq!(
            serde_json::to_string(&CondoSelection::All).expect("serialize"),
            r#""all""#
        );
    }

    #[test]
    fn ticket_status_uses_italian_wire_labels() {
        let json = serde_json::to_value(TicketStatus::InProgress).expect("serialize status");
        assert_eq!(json, "In Lavorazione");
    }
}
