//! Access to the external population registry.
//!
//! The registry is read-only from this crate's point of view. It is
//! reached either over its REST API ([`HttpRegistry`]) or through a JSON
//! snapshot loaded into memory ([`InMemoryRegistry`]).

pub mod http;
pub mod memory;
pub mod wire;

pub use http::HttpRegistry;
pub use memory::InMemoryRegistry;

use crate::error::RegistryError;
use crate::models::{Citizen, Country, District, Seat, Territory};
use std::future::Future;

/// The six list operations the registry exposes.
///
/// Each returns records in registry order. A missing sub-resource is an
/// empty list, never an error.
pub trait Registry: Send + Sync {
    fn list_countries(&self) -> impl Future<Output = Result<Vec<Country>, RegistryError>> + Send;

    fn list_territories(
        &self,
        country_id: u64,
    ) -> impl Future<Output = Result<Vec<Territory>, RegistryError>> + Send;

    fn list_districts(
        &self,
        territory_id: u64,
    ) -> impl Future<Output = Result<Vec<District>, RegistryError>> + Send;

    fn list_citizens_by_district(
        &self,
        district_id: u64,
    ) -> impl Future<Output = Result<Vec<Citizen>, RegistryError>> + Send;

    fn list_seats(
        &self,
        district_id: u64,
    ) -> impl Future<Output = Result<Vec<Seat>, RegistryError>> + Send;

    fn list_citizens_by_seat(
        &self,
        seat_id: u64,
    ) -> impl Future<Output = Result<Vec<Citizen>, RegistryError>> + Send;

    /// Human-readable description of where records come from.
    fn describe(&self) -> String;
}
