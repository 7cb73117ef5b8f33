//! Data models for the registry census.
//!
//! This module contains the internal schema for registry records
//! (countries, territories, districts, seats, citizens) and the derived
//! count records produced by an aggregation run.

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Parent label used for country-level cards.
pub const ROOT_LABEL: &str = "Root";

/// A level of the registry hierarchy.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Level {
    Country,
    Territory,
    District,
    Seat,
}

impl Level {
    /// All levels, top-down.
    pub const ALL: [Level; 4] = [Level::Country, Level::Territory, Level::District, Level::Seat];

    /// Plural heading used in reports.
    pub fn plural(&self) -> &'static str {
        match self {
            Level::Country => "Countries",
            Level::Territory => "Territories",
            Level::District => "Districts",
            Level::Seat => "Seats",
        }
    }
}

impl fmt::Display for Level {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Level::Country => write!(f, "Country"),
            Level::Territory => write!(f, "Territory"),
            Level::District => write!(f, "District"),
            Level::Seat => write!(f, "Seat"),
        }
    }
}

/// A country in the registry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Country {
    pub id: u64,
    pub name: String,
}

/// A territory, child of a country.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Territory {
    pub id: u64,
    pub name: String,
    pub country_id: u64,
}

/// A district, child of a territory.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct District {
    pub id: u64,
    pub name: String,
    pub territory_id: u64,
}

/// A seat, child of a district.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Seat {
    pub id: u64,
    /// Free-text description. May be absent in the registry.
    pub description: Option<String>,
    pub district_id: u64,
}

impl Seat {
    /// Display label: the description, or `Seat {id}` when it is missing or blank.
    pub fn label(&self) -> String {
        match self.description.as_deref().map(str::trim) {
            Some(desc) if !desc.is_empty() => desc.to_string(),
            _ => format!("Seat {}", self.id),
        }
    }
}

/// A registered citizen.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Citizen {
    pub id: u64,
    pub name: String,
    /// National identity card number.
    pub national_id: String,
    pub city: Option<String>,
    pub address_line1: Option<String>,
    pub address_line2: Option<String>,
    pub birth_date: Option<NaiveDate>,
    pub job: Option<String>,
    pub salary: Option<f64>,
    pub marital_status: Option<String>,
    pub district_id: Option<u64>,
    /// Only set when the citizen has been assigned a seat.
    pub seat_id: Option<u64>,
}

/// Citizen count for one node of the hierarchy.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CountCard {
    pub name: String,
    pub count: u64,
    /// Human-readable "child-of" path, e.g. `"T1, Testland"` for a district.
    pub parent_label: String,
}

impl CountCard {
    pub fn new(name: impl Into<String>, count: u64, parent_label: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            count,
            parent_label: parent_label.into(),
        }
    }
}

/// The registry operation a fetch was performing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Operation {
    ListCountries,
    ListTerritories,
    ListDistricts,
    ListCitizensByDistrict,
    ListSeats,
    ListCitizensBySeat,
}

impl Operation {
    /// REST path of this operation relative to the registry base URL.
    ///
    /// `parent_id` is ignored for [`Operation::ListCountries`].
    pub fn endpoint(&self, parent_id: u64) -> String {
        match self {
            Operation::ListCountries => "countries".to_string(),
            Operation::ListTerritories => format!("territories/{}", parent_id),
            Operation::ListDistricts => format!("districts/{}", parent_id),
            Operation::ListCitizensByDistrict => format!("citizens/district/{}", parent_id),
            Operation::ListSeats => format!("seats/{}", parent_id),
            Operation::ListCitizensBySeat => format!("citizens/seat/{}", parent_id),
        }
    }
}

impl fmt::Display for Operation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Operation::ListCountries => "list countries",
            Operation::ListTerritories => "list territories",
            Operation::ListDistricts => "list districts",
            Operation::ListCitizensByDistrict => "list citizens by district",
            Operation::ListSeats => "list seats",
            Operation::ListCitizensBySeat => "list citizens by seat",
        };
        write!(f, "{}", name)
    }
}

/// A fetch failure isolated to a single node during an aggregation run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NodeFailure {
    /// Level of the node whose children could not be fetched.
    pub level: Level,
    pub node_id: u64,
    pub node_name: String,
    pub operation: Operation,
    pub message: String,
}

/// Output of one aggregation run.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AggregationResult {
    pub country_counts: Vec<CountCard>,
    pub territory_counts: Vec<CountCard>,
    pub district_counts: Vec<CountCard>,
    pub seat_counts: Vec<CountCard>,
    pub total_citizens: u64,
    /// Partial failures recorded during the run. Empty on a clean run.
    #[serde(default)]
    pub failures: Vec<NodeFailure>,
}

impl AggregationResult {
    /// Cards for the given level.
    pub fn level(&self, level: Level) -> &[CountCard] {
        match level {
            Level::Country => &self.country_counts,
            Level::Territory => &self.territory_counts,
            Level::District => &self.district_counts,
            Level::Seat => &self.seat_counts,
        }
    }

    /// Whether every fetch below the country listing succeeded.
    pub fn is_complete(&self) -> bool {
        self.failures.is_empty()
    }

    /// Sorts every level by count, highest first. Ties keep traversal order.
    pub fn sort_by_count(&mut self) {
        for cards in [
            &mut self.country_counts,
            &mut self.territory_counts,
            &mut self.district_counts,
            &mut self.seat_counts,
        ] {
            cards.sort_by(|a, b| b.count.cmp(&a.count));
        }
    }
}

/// Metadata about a census report.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReportMetadata {
    /// Registry base URL or snapshot path.
    pub source: String,
    pub generated_at: DateTime<Utc>,
    /// Country the run was restricted to, if any.
    pub country_filter: Option<u64>,
    pub duration_seconds: f64,
    /// Sequence number of the run that produced this report.
    pub run_sequence: u64,
}

/// A complete census report.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CensusReport {
    pub metadata: ReportMetadata,
    pub result: AggregationResult,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_seat_label_fallback() {
        let seat = Seat {
            id: 1000,
            description: None,
            district_id: 100,
        };
        assert_eq!(seat.label(), "Seat 1000");

        let blank = Seat {
            description: Some("   ".to_string()),
            ..seat.clone()
        };
        assert_eq!(blank.label(), "Seat 1000");

        let named = Seat {
            description: Some("North Ward".to_string()),
            ..seat
        };
        assert_eq!(named.label(), "North Ward");
    }

    #[test]
    fn test_sort_by_count_is_stable() {
        let mut result = AggregationResult {
            district_counts: vec![
                CountCard::new("A", 1, "x"),
                CountCard::new("B", 5, "x"),
                CountCard::new("C", 1, "x"),
                CountCard::new("D", 5, "x"),
            ],
            ..Default::default()
        };

        result.sort_by_count();

        let names: Vec<_> = result
            .district_counts
            .iter()
            .map(|c| c.name.as_str())
            .collect();
        assert_eq!(names, vec!["B", "D", "A", "C"]);
    }

    #[test]
    fn test_operation_endpoints() {
        assert_eq!(Operation::ListCountries.endpoint(0), "countries");
        assert_eq!(Operation::ListTerritories.endpoint(1), "territories/1");
        assert_eq!(
            Operation::ListCitizensByDistrict.endpoint(100),
            "citizens/district/100"
        );
        assert_eq!(Operation::ListSeats.endpoint(100), "seats/100");
        assert_eq!(Operation::ListCitizensBySeat.endpoint(7), "citizens/seat/7");
    }

    #[test]
    fn test_count_card_serializes_camel_case() {
        let card = CountCard::new("D1", 3, "T1, Testland");
        let json = serde_json::to_string(&card).unwrap();
        assert!(json.contains("\"parentLabel\":\"T1, Testland\""));
    }
}
