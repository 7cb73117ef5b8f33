//! Cascading country → territory → district → seat selection.
//!
//! Selecting a node at one level clears every level below it when the
//! choice changes. A child can only be selected once its parent is.

use crate::error::{RegistryError, SelectionError};
use crate::models::{Citizen, Level};
use crate::registry::Registry;
use tracing::debug;

/// Which citizens a listing should show.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CitizenScope {
    District(u64),
    Seat(u64),
}

impl CitizenScope {
    pub fn level(&self) -> Level {
        match self {
            CitizenScope::District(_) => Level::District,
            CitizenScope::Seat(_) => Level::Seat,
        }
    }

    pub fn id(&self) -> u64 {
        match self {
            CitizenScope::District(id) | CitizenScope::Seat(id) => *id,
        }
    }

    /// Fetch the citizens in scope.
    pub async fn fetch<R: Registry>(&self, registry: &R) -> Result<Vec<Citizen>, RegistryError> {
        match self {
            CitizenScope::District(id) => registry.list_citizens_by_district(*id).await,
            CitizenScope::Seat(id) => registry.list_citizens_by_seat(*id).await,
        }
    }
}

/// The current selection at each level.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Selection {
    country: Option<u64>,
    territory: Option<u64>,
    district: Option<u64>,
    seat: Option<u64>,
}

impl Selection {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a selection top-down from optional ids.
    pub fn from_ids(
        country: Option<u64>,
        territory: Option<u64>,
        district: Option<u64>,
        seat: Option<u64>,
    ) -> Result<Self, SelectionError> {
        let mut selection = Self::new();
        selection.select_country(country);
        selection.select_territory(territory)?;
        selection.select_district(district)?;
        selection.select_seat(seat)?;
        Ok(selection)
    }

    #[cfg(test)]
    pub fn country(&self) -> Option<u64> {
        self.country
    }

    #[cfg(test)]
    pub fn territory(&self) -> Option<u64> {
        self.territory
    }

    #[cfg(test)]
    pub fn district(&self) -> Option<u64> {
        self.district
    }

    #[cfg(test)]
    pub fn seat(&self) -> Option<u64> {
        self.seat
    }

    pub fn select_country(&mut self, id: Option<u64>) {
        if self.country != id {
            self.territory = None;
            self.district = None;
            self.seat = None;
        }
        self.country = id;
    }

    pub fn select_territory(&mut self, id: Option<u64>) -> Result<(), SelectionError> {
        if id.is_some() && self.country.is_none() {
            return Err(SelectionError::MissingParent {
                level: Level::Territory,
                parent: Level::Country,
            });
        }
        if self.territory != id {
            self.district = None;
            self.seat = None;
        }
        self.territory = id;
        Ok(())
    }

    pub fn select_district(&mut self, id: Option<u64>) -> Result<(), SelectionError> {
        if id.is_some() && self.territory.is_none() {
            return Err(SelectionError::MissingParent {
                level: Level::District,
                parent: Level::Territory,
            });
        }
        if self.district != id {
            self.seat = None;
        }
        self.district = id;
        Ok(())
    }

    pub fn select_seat(&mut self, id: Option<u64>) -> Result<(), SelectionError> {
        if id.is_some() && self.district.is_none() {
            return Err(SelectionError::MissingParent {
                level: Level::Seat,
                parent: Level::District,
            });
        }
        self.seat = id;
        Ok(())
    }

    /// All four levels chosen.
    pub fn is_complete(&self) -> bool {
        self.country.is_some()
            && self.territory.is_some()
            && self.district.is_some()
            && self.seat.is_some()
    }

    /// Seat when one is selected, otherwise the district.
    pub fn citizen_scope(&self) -> Option<CitizenScope> {
        match (self.seat, self.district) {
            (Some(seat), _) => Some(CitizenScope::Seat(seat)),
            (None, Some(district)) => Some(CitizenScope::District(district)),
            (None, None) => None,
        }
    }

    /// Check each selected node appears in its parent's listing.
    pub async fn verify<R: Registry>(&self, registry: &R) -> Result<(), SelectionError> {
        let Some(country) = self.country else {
            return Ok(());
        };
        let countries = registry.list_countries().await?;
        if !countries.iter().any(|c| c.id == country) {
            return Err(SelectionError::NotFound {
                level: Level::Country,
                id: country,
                parent_id: None,
            });
        }

        let Some(territory) = self.territory else {
            return Ok(());
        };
        let territories = registry.list_territories(country).await?;
        if !territories.iter().any(|t| t.id == territory) {
            return Err(SelectionError::NotFound {
                level: Level::Territory,
                id: territory,
                parent_id: Some(country),
            });
        }

        let Some(district) = self.district else {
            return Ok(());
        };
        let districts = registry.list_districts(territory).await?;
        if !districts.iter().any(|d| d.id == district) {
            return Err(SelectionError::NotFound {
                level: Level::District,
                id: district,
                parent_id: Some(territory),
            });
        }

        let Some(seat) = self.seat else {
            return Ok(());
        };
        let seats = registry.list_seats(district).await?;
        if !seats.iter().any(|s| s.id == seat) {
            return Err(SelectionError::NotFound {
                level: Level::Seat,
                id: seat,
                parent_id: Some(district),
            });
        }

        debug!("Selection verified: {:?}", self);
        Ok(())
    }
}
