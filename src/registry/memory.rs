//! In-memory registry.
//!
//! Backs offline runs from a JSON snapshot and serves as the fixture for
//! aggregator tests. Individual fetches can be made to fail to exercise
//! partial-failure handling.

use super::wire::WireSnapshot;
use super::Registry;
use crate::error::RegistryError;
use crate::models::{Citizen, Country, District, Operation, Seat, Territory};
use std::collections::HashSet;
use std::path::Path;
use std::sync::atomic::{AtomicUsize, Ordering};
use tracing::{debug, info};

/// Registry held entirely in memory.
#[derive(Debug, Default)]
pub struct InMemoryRegistry {
    countries: Vec<Country>,
    territories: Vec<Territory>,
    districts: Vec<District>,
    seats: Vec<Seat>,
    citizens: Vec<Citizen>,
    /// `(operation, parent id)` pairs that fail when fetched
    failures: HashSet<(Operation, u64)>,
    /// Number of list calls served, including failed ones
    calls: AtomicUsize,
    source: String,
}

impl InMemoryRegistry {
    /// Create an empty registry.
    pub fn new() -> Self {
        Self {
            source: "memory".to_string(),
            ..Default::default()
        }
    }

    /// Load a registry snapshot from a JSON file.
    pub fn load(path: &Path) -> Result<Self, RegistryError> {
        let content = std::fs::read_to_string(path).map_err(|e| {
            RegistryError::Snapshot(format!("Failed to read {}: {}", path.display(), e))
        })?;

        let mut registry = Self::from_json(&content)?;
        registry.source = path.display().to_string();
        info!(
            "Loaded snapshot {} ({} countries, {} citizens)",
            registry.source,
            registry.countries.len(),
            registry.citizens.len()
        );
        Ok(registry)
    }

    /// Parse a snapshot document.
    ///
    /// Records that omit their parent id are dropped, since they cannot
    /// be placed in the hierarchy.
    pub fn from_json(content: &str) -> Result<Self, RegistryError> {
        let snapshot: WireSnapshot = serde_json::from_str(content)
            .map_err(|e| RegistryError::Snapshot(format!("Invalid snapshot: {}", e)))?;

        let mut registry = Self::new();
        registry.countries = snapshot
            .countries
            .into_iter()
            .map(|c| c.into_model())
            .collect();
        registry.territories = snapshot
            .territories
            .into_iter()
            .filter_map(|t| t.parent_id().map(|country_id| t.into_model(country_id)))
            .collect();
        registry.districts = snapshot
            .districts
            .into_iter()
            .filter_map(|d| d.parent_id().map(|territory_id| d.into_model(territory_id)))
            .collect();
        registry.seats = snapshot
            .seats
            .into_iter()
            .filter_map(|s| s.parent_id().map(|district_id| s.into_model(district_id)))
            .collect();
        registry.citizens = snapshot
            .citizens
            .into_iter()
            .map(|c| c.into_model())
            .collect();

        Ok(registry)
    }

    fn check(&self, operation: Operation, parent_id: u64) -> Result<(), RegistryError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        debug!("{} ({})", operation, parent_id);

        if self.failures.contains(&(operation, parent_id)) {
            return Err(RegistryError::Unavailable(format!(
                "{} failed for {}",
                operation, parent_id
            )));
        }
        Ok(())
    }
}

/// Fixture builders for tests.
#[cfg(test)]
impl InMemoryRegistry {
    pub fn with_country(mut self, id: u64, name: &str) -> Self {
        self.countries.push(Country {
            id,
            name: name.to_string(),
        });
        self
    }

    pub fn with_territory(mut self, id: u64, name: &str, country_id: u64) -> Self {
        self.territories.push(Territory {
            id,
            name: name.to_string(),
            country_id,
        });
        self
    }

    pub fn with_district(mut self, id: u64, name: &str, territory_id: u64) -> Self {
        self.districts.push(District {
            id,
            name: name.to_string(),
            territory_id,
        });
        self
    }

    pub fn with_seat(mut self, id: u64, description: Option<&str>, district_id: u64) -> Self {
        self.seats.push(Seat {
            id,
            description: description.map(String::from),
            district_id,
        });
        self
    }

    /// Add `count` citizens to a district, optionally assigned to a seat.
    pub fn with_citizens(mut self, count: usize, district_id: u64, seat_id: Option<u64>) -> Self {
        for _ in 0..count {
            let id = self.citizens.len() as u64 + 1;
            self.citizens.push(Citizen {
                id,
                name: format!("Citizen {}", id),
                national_id: format!("{:09}V", id),
                city: None,
                address_line1: None,
                address_line2: None,
                birth_date: None,
                job: None,
                salary: None,
                marital_status: None,
                district_id: Some(district_id),
                seat_id,
            });
        }
        self
    }

    /// Make `operation` fail for the given parent id (use 0 for the country list).
    pub fn failing(mut self, operation: Operation, parent_id: u64) -> Self {
        self.failures.insert((operation, parent_id));
        self
    }

    /// Number of list calls served so far.
    pub fn call_count(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

impl Registry for InMemoryRegistry {
    async fn list_countries(&self) -> Result<Vec<Country>, RegistryError> {
        self.check(Operation::ListCountries, 0)?;
        Ok(self.countries.clone())
    }

    async fn list_territories(&self, country_id: u64) -> Result<Vec<Territory>, RegistryError> {
        self.check(Operation::ListTerritories, country_id)?;
        Ok(self
            .territories
            .iter()
            .filter(|t| t.country_id == country_id)
            .cloned()
            .collect())
    }

    async fn list_districts(&self, territory_id: u64) -> Result<Vec<District>, RegistryError> {
        self.check(Operation::ListDistricts, territory_id)?;
        Ok(self
            .districts
            .iter()
            .filter(|d| d.territory_id == territory_id)
            .cloned()
            .collect())
    }

    async fn list_citizens_by_district(
        &self,
        district_id: u64,
    ) -> Result<Vec<Citizen>, RegistryError> {
        self.check(Operation::ListCitizensByDistrict, district_id)?;
        Ok(self
            .citizens
            .iter()
            .filter(|c| c.district_id == Some(district_id))
            .cloned()
            .collect())
    }

    async fn list_seats(&self, district_id: u64) -> Result<Vec<Seat>, RegistryError> {
        self.check(Operation::ListSeats, district_id)?;
        Ok(self
            .seats
            .iter()
            .filter(|s| s.district_id == district_id)
            .cloned()
            .collect())
    }

    async fn list_citizens_by_seat(&self, seat_id: u64) -> Result<Vec<Citizen>, RegistryError> {
        self.check(Operation::ListCitizensBySeat, seat_id)?;
        Ok(self
            .citizens
            .iter()
            .filter(|c| c.seat_id == Some(seat_id))
            .cloned()
            .collect())
    }

    fn describe(&self) -> String {
        self.source.clone()
    }
}
