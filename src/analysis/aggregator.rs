//! Hierarchical citizen-count aggregation.
//!
//! Walks country → territory → district → seat one request at a time and
//! builds a [`CountCard`] for every node it visits. Only the country
//! listing is fatal; every deeper fetch failure is confined to its node.

use crate::error::{AggregateError, RegistryError};
use crate::models::{
    AggregationResult, CountCard, Country, District, Level, NodeFailure, Operation, Territory,
    ROOT_LABEL,
};
use crate::registry::Registry;
use tracing::{debug, info, warn};

/// Computes per-level citizen counts over a registry.
pub struct Aggregator<'a, R: Registry> {
    registry: &'a R,
}

impl<'a, R: Registry> Aggregator<'a, R> {
    pub fn new(registry: &'a R) -> Self {
        Self { registry }
    }

    /// Run one full traversal.
    ///
    /// With `country_filter` set, only that country's subtree is visited.
    /// An unknown country yields an empty result.
    pub async fn load(&self, country_filter: Option<u64>) -> Result<AggregationResult, AggregateError> {
        let countries = self
            .registry
            .list_countries()
            .await
            .map_err(|source| AggregateError::FatalFetch {
                operation: Operation::ListCountries,
                source,
            })?;
        debug!("Fetched {} countries", countries.len());

        let selected: Vec<&Country> = match country_filter {
            Some(id) => countries.iter().filter(|c| c.id == id).collect(),
            None => countries.iter().collect(),
        };

        if let Some(id) = country_filter {
            if selected.is_empty() {
                warn!("Country {} is not in the registry; nothing to count", id);
            }
        }

        let mut result = AggregationResult::default();
        for country in selected {
            self.visit_country(country, &mut result).await;
        }

        result.total_citizens = result.country_counts.iter().map(|c| c.count).sum();
        result.sort_by_count();

        info!(
            "Counted {} citizens across {} countries, {} territories, {} districts, {} seats",
            result.total_citizens,
            result.country_counts.len(),
            result.territory_counts.len(),
            result.district_counts.len(),
            result.seat_counts.len()
        );
        if !result.is_complete() {
            warn!(
                "{} fetches failed; counts may be incomplete",
                result.failures.len()
            );
        }

        Ok(result)
    }

    async fn visit_country(&self, country: &Country, result: &mut AggregationResult) -> u64 {
        let territories = match self.registry.list_territories(country.id).await {
            Ok(territories) => territories,
            Err(e) => {
                record_failure(
                    result,
                    Level::Country,
                    country.id,
                    &country.name,
                    Operation::ListTerritories,
                    e,
                );
                Vec::new()
            }
        };

        let mut total = 0;
        for territory in &territories {
            total += self.visit_territory(country, territory, result).await;
        }

        result
            .country_counts
            .push(CountCard::new(&country.name, total, ROOT_LABEL));
        total
    }

    async fn visit_territory(
        &self,
        country: &Country,
        territory: &Territory,
        result: &mut AggregationResult,
    ) -> u64 {
        let districts = match self.registry.list_districts(territory.id).await {
            Ok(districts) => districts,
            Err(e) => {
                record_failure(
                    result,
                    Level::Territory,
                    territory.id,
                    &territory.name,
                    Operation::ListDistricts,
                    e,
                );
                Vec::new()
            }
        };

        let mut total = 0;
        for district in &districts {
            total += self.visit_district(country, territory, district, result).await;
        }

        result
            .territory_counts
            .push(CountCard::new(&territory.name, total, &country.name));
        total
    }

    /// A district's count is its own citizen list; seat counts are fetched
    /// independently and never summed into it.
    async fn visit_district(
        &self,
        country: &Country,
        territory: &Territory,
        district: &District,
        result: &mut AggregationResult,
    ) -> u64 {
        let count = match self.registry.list_citizens_by_district(district.id).await {
            Ok(citizens) => citizens.len() as u64,
            Err(e) => {
                record_failure(
                    result,
                    Level::District,
                    district.id,
                    &district.name,
                    Operation::ListCitizensByDistrict,
                    e,
                );
                0
            }
        };

        result.district_counts.push(CountCard::new(
            &district.name,
            count,
            format!("{}, {}", territory.name, country.name),
        ));

        let seats = match self.registry.list_seats(district.id).await {
            Ok(seats) => seats,
            Err(e) => {
                record_failure(
                    result,
                    Level::District,
                    district.id,
                    &district.name,
                    Operation::ListSeats,
                    e,
                );
                Vec::new()
            }
        };

        let seat_parent = format!("{}, {}", district.name, territory.name);
        for seat in &seats {
            let label = seat.label();
            let seat_count = match self.registry.list_citizens_by_seat(seat.id).await {
                Ok(citizens) => citizens.len() as u64,
                Err(e) => {
                    record_failure(
                        result,
                        Level::Seat,
                        seat.id,
                        &label,
                        Operation::ListCitizensBySeat,
                        e,
                    );
                    0
                }
            };
            result
                .seat_counts
                .push(CountCard::new(label, seat_count, seat_parent.clone()));
        }

        count
    }
}

fn record_failure(
    result: &mut AggregationResult,
    level: Level,
    node_id: u64,
    node_name: &str,
    operation: Operation,
    error: RegistryError,
) {
    warn!(
        "Failed to {} for {} {} ({}): {}",
        operation, level, node_id, node_name, error
    );
    result.failures.push(NodeFailure {
        level,
        node_id,
        node_name: node_name.to_string(),
        operation,
        message: error.to_string(),
    });
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::registry::InMemoryRegistry;

    /// Testland / T1 / D1 (3 citizens, seat 1000 with 2) and D2 (empty).
    fn testland() -> InMemoryRegistry {
        InMemoryRegistry::new()
            .with_country(1, "Testland")
            .with_territory(10, "T1", 1)
            .with_district(100, "D1", 10)
            .with_district(101, "D2", 10)
            .with_seat(1000, None, 100)
            .with_citizens(2, 100, Some(1000))
            .with_citizens(1, 100, None)
    }

    /// Two countries, three territories, uneven districts.
    fn two_countries() -> InMemoryRegistry {
        InMemoryRegistry::new()
            .with_country(1, "Alpha")
            .with_country(2, "Beta")
            .with_territory(10, "A-North", 1)
            .with_territory(11, "A-South", 1)
            .with_territory(20, "B-East", 2)
            .with_district(100, "AN-1", 10)
            .with_district(101, "AN-2", 10)
            .with_district(110, "AS-1", 11)
            .with_district(200, "BE-1", 20)
            .with_citizens(4, 100, None)
            .with_citizens(1, 101, None)
            .with_citizens(2, 110, None)
            .with_citizens(7, 200, None)
    }

    fn card<'r>(cards: &'r [CountCard], name: &str) -> &'r CountCard {
        cards
            .iter()
            .find(|c| c.name == name)
            .unwrap_or_else(|| panic!("no card named {}", name))
    }

    #[tokio::test]
    async fn test_worked_example() {
        let registry = testland();
        let result = Aggregator::new(&registry).load(None).await.unwrap();

        assert_eq!(
            result.district_counts,
            vec![
                CountCard::new("D1", 3, "T1, Testland"),
                CountCard::new("D2", 0, "T1, Testland"),
            ]
        );
        assert_eq!(result.seat_counts, vec![CountCard::new("Seat 1000", 2, "D1, T1")]);
        assert_eq!(result.territory_counts, vec![CountCard::new("T1", 3, "Testland")]);
        assert_eq!(result.country_counts, vec![CountCard::new("Testland", 3, "Root")]);
        assert_eq!(result.total_citizens, 3);
        assert!(result.is_complete());
    }

    #[tokio::test]
    async fn test_counts_are_additive() {
        let registry = two_countries();
        let result = Aggregator::new(&registry).load(None).await.unwrap();

        for country in &result.country_counts {
            let territory_sum: u64 = result
                .territory_counts
                .iter()
                .filter(|t| t.parent_label == country.name)
                .map(|t| t.count)
                .sum();
            assert_eq!(country.count, territory_sum, "country {}", country.name);
        }

        for territory in &result.territory_counts {
            let suffix = format!("{}, {}", territory.name, territory.parent_label);
            let district_sum: u64 = result
                .district_counts
                .iter()
                .filter(|d| d.parent_label == suffix)
                .map(|d| d.count)
                .sum();
            assert_eq!(territory.count, district_sum, "territory {}", territory.name);
        }

        assert_eq!(result.total_citizens, 14);
        assert_eq!(
            result.total_citizens,
            result.district_counts.iter().map(|d| d.count).sum::<u64>()
        );
    }

    #[tokio::test]
    async fn test_levels_sorted_descending() {
        let registry = two_countries();
        let result = Aggregator::new(&registry).load(None).await.unwrap();

        for level in Level::ALL {
            let counts: Vec<u64> = result.level(level).iter().map(|c| c.count).collect();
            let mut sorted = counts.clone();
            sorted.sort_by(|a, b| b.cmp(a));
            assert_eq!(counts, sorted, "{} not sorted", level);
        }

        // Alpha and Beta both hold 7; Alpha was fetched first.
        let names: Vec<_> = result.country_counts.iter().map(|c| c.name.as_str()).collect();
        assert_eq!(names, vec!["Alpha", "Beta"]);
    }

    #[tokio::test]
    async fn test_ties_keep_traversal_order() {
        let registry = InMemoryRegistry::new()
            .with_country(1, "Testland")
            .with_territory(10, "T1", 1)
            .with_district(100, "First", 10)
            .with_district(101, "Second", 10)
            .with_district(102, "Third", 10)
            .with_citizens(1, 100, None)
            .with_citizens(2, 101, None)
            .with_citizens(1, 102, None);

        let result = Aggregator::new(&registry).load(None).await.unwrap();
        let names: Vec<_> = result.district_counts.iter().map(|c| c.name.as_str()).collect();
        assert_eq!(names, vec!["Second", "First", "Third"]);
    }

    #[tokio::test]
    async fn test_load_is_idempotent() {
        let registry = two_countries();
        let aggregator = Aggregator::new(&registry);

        let first = aggregator.load(None).await.unwrap();
        let second = aggregator.load(None).await.unwrap();
        assert_eq!(first, second);
    }

    #[tokio::test]
    async fn test_country_without_territories() {
        let registry = testland().with_country(2, "Emptyland");
        let result = Aggregator::new(&registry).load(None).await.unwrap();

        assert_eq!(card(&result.country_counts, "Emptyland").count, 0);
        assert_eq!(result.total_citizens, 3);
        assert!(result.is_complete());
    }

    #[tokio::test]
    async fn test_country_filter_restricts_traversal() {
        let registry = two_countries();
        let result = Aggregator::new(&registry).load(Some(2)).await.unwrap();

        assert_eq!(result.country_counts, vec![CountCard::new("Beta", 7, "Root")]);
        assert_eq!(result.territory_counts.len(), 1);
        assert_eq!(result.total_citizens, 7);
    }

    #[tokio::test]
    async fn test_unknown_country_filter_is_empty() {
        let registry = two_countries();
        let result = Aggregator::new(&registry).load(Some(99)).await.unwrap();

        assert!(result.country_counts.is_empty());
        assert_eq!(result.total_citizens, 0);
        assert_eq!(registry.call_count(), 1);
    }

    #[tokio::test]
    async fn test_district_failure_is_isolated() {
        let registry = two_countries().failing(Operation::ListDistricts, 11);
        let result = Aggregator::new(&registry).load(None).await.unwrap();

        assert_eq!(card(&result.territory_counts, "A-South").count, 0);
        assert_eq!(card(&result.territory_counts, "A-North").count, 5);
        assert_eq!(card(&result.country_counts, "Alpha").count, 5);
        assert_eq!(card(&result.country_counts, "Beta").count, 7);
        assert_eq!(result.total_citizens, 12);

        assert_eq!(result.failures.len(), 1);
        let failure = &result.failures[0];
        assert_eq!(failure.level, Level::Territory);
        assert_eq!(failure.node_id, 11);
        assert_eq!(failure.operation, Operation::ListDistricts);
        assert!(!result.is_complete());
    }

    #[tokio::test]
    async fn test_territory_failure_keeps_country_card() {
        let registry = two_countries().failing(Operation::ListTerritories, 1);
        let result = Aggregator::new(&registry).load(None).await.unwrap();

        assert_eq!(card(&result.country_counts, "Alpha").count, 0);
        assert_eq!(card(&result.country_counts, "Beta").count, 7);
        assert_eq!(result.territory_counts.len(), 1);
    }

    #[tokio::test]
    async fn test_citizen_failure_still_walks_seats() {
        let registry = testland().failing(Operation::ListCitizensByDistrict, 100);
        let result = Aggregator::new(&registry).load(None).await.unwrap();

        assert_eq!(card(&result.district_counts, "D1").count, 0);
        assert_eq!(card(&result.seat_counts, "Seat 1000").count, 2);
        assert_eq!(result.total_citizens, 0);
        assert_eq!(result.failures.len(), 1);
    }

    #[tokio::test]
    async fn test_seat_failures() {
        let registry = testland()
            .with_seat(1001, Some("Annex"), 100)
            .failing(Operation::ListCitizensBySeat, 1001)
            .failing(Operation::ListSeats, 101);
        let result = Aggregator::new(&registry).load(None).await.unwrap();

        assert_eq!(card(&result.seat_counts, "Annex").count, 0);
        assert_eq!(card(&result.seat_counts, "Seat 1000").count, 2);
        assert_eq!(card(&result.district_counts, "D1").count, 3);
        assert_eq!(result.total_citizens, 3);
        assert_eq!(result.failures.len(), 2);
    }

    #[tokio::test]
    async fn test_country_list_failure_is_fatal() {
        let registry = testland().failing(Operation::ListCountries, 0);
        let err = Aggregator::new(&registry).load(None).await.unwrap_err();

        let AggregateError::FatalFetch { operation, .. } = err;
        assert_eq!(operation, Operation::ListCountries);
        assert_eq!(registry.call_count(), 1);
    }

    #[tokio::test]
    async fn test_seat_counts_not_reconciled_with_district() {
        // Seat-assigned citizens registered under a different district still
        // count towards the seat but not towards the seat's district.
        let registry = testland().with_citizens(4, 101, Some(1000));
        let result = Aggregator::new(&registry).load(None).await.unwrap();

        assert_eq!(card(&result.seat_counts, "Seat 1000").count, 6);
        assert_eq!(card(&result.district_counts, "D1").count, 3);
        assert_eq!(card(&result.district_counts, "D2").count, 4);
        assert_eq!(result.total_citizens, 7);
    }

    #[tokio::test]
    async fn test_snapshot_fixture() {
        let path = std::path::Path::new(env!("CARGO_MANIFEST_DIR")).join("fixtures/registry.json");
        let registry = InMemoryRegistry::load(&path).unwrap();
        let result = Aggregator::new(&registry).load(None).await.unwrap();

        assert_eq!(result.total_citizens, 4);
        assert_eq!(
            result.country_counts,
            vec![
                CountCard::new("Testland", 3, "Root"),
                CountCard::new("Otherland", 1, "Root"),
            ]
        );
        assert_eq!(card(&result.district_counts, "D2").count, 0);
        assert_eq!(card(&result.seat_counts, "Seat 1000").count, 2);
        assert_eq!(
            card(&result.seat_counts, "Harbor Ward A").parent_label,
            "Harbor, North"
        );
    }
}
