//! Registry wire format.
//!
//! The registry's JSON uses PascalCase keys and is not consistent across
//! endpoints or revisions (`SeatDescption` vs `SeatDescription`,
//! `DistricID` vs `DistrictID`, `Districtname` vs `DistrictName`). Ids may
//! arrive as numbers or numeric strings. Everything is normalized here so
//! the rest of the crate only sees [`crate::models`] types.

use crate::models::{Citizen, Country, District, Seat, Territory};
use chrono::NaiveDate;
use serde::de::{DeserializeOwned, Error as _};
use serde::{Deserialize, Deserializer};

/// An id that may be encoded as a JSON number or a string.
#[derive(Deserialize)]
#[serde(untagged)]
enum IdRepr {
    Number(u64),
    Text(String),
}

fn id<'de, D: Deserializer<'de>>(deserializer: D) -> Result<u64, D::Error> {
    match IdRepr::deserialize(deserializer)? {
        IdRepr::Number(n) => Ok(n),
        IdRepr::Text(s) => s
            .trim()
            .parse()
            .map_err(|_| D::Error::custom(format!("invalid id: {:?}", s))),
    }
}

fn opt_id<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Option<u64>, D::Error> {
    match Option::<IdRepr>::deserialize(deserializer)? {
        None => Ok(None),
        Some(IdRepr::Number(n)) => Ok(Some(n)),
        Some(IdRepr::Text(s)) if s.trim().is_empty() => Ok(None),
        Some(IdRepr::Text(s)) => s
            .trim()
            .parse()
            .map(Some)
            .map_err(|_| D::Error::custom(format!("invalid id: {:?}", s))),
    }
}

#[derive(Deserialize)]
#[serde(untagged)]
enum NumberRepr {
    Number(f64),
    Text(String),
}

fn opt_number<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Option<f64>, D::Error> {
    Ok(match Option::<NumberRepr>::deserialize(deserializer)? {
        Some(NumberRepr::Number(n)) => Some(n),
        Some(NumberRepr::Text(s)) => s.trim().parse().ok(),
        None => None,
    })
}

/// Accepts `1990-04-01` as well as full timestamps like `1990-04-01T00:00:00.000Z`.
fn opt_date<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Option<NaiveDate>, D::Error> {
    let raw = Option::<String>::deserialize(deserializer)?;
    Ok(raw.and_then(|s| {
        let day = s.get(..10).unwrap_or(&s);
        NaiveDate::parse_from_str(day, "%Y-%m-%d").ok()
    }))
}

fn non_blank(value: Option<String>) -> Option<String> {
    value.filter(|s| !s.trim().is_empty())
}

#[derive(Debug, Deserialize)]
pub struct WireCountry {
    #[serde(rename = "ID", alias = "CountryID", deserialize_with = "id")]
    id: u64,
    #[serde(rename = "CountryName", alias = "Countryname", default)]
    name: String,
}

#[derive(Debug, Deserialize)]
pub struct WireTerritory {
    #[serde(rename = "ID", alias = "TerritoryID", deserialize_with = "id")]
    id: u64,
    #[serde(rename = "TerritoryName", alias = "Territoryname", default)]
    name: String,
    #[serde(rename = "CountryID", default, deserialize_with = "opt_id")]
    country_id: Option<u64>,
}

#[derive(Debug, Deserialize)]
pub struct WireDistrict {
    #[serde(rename = "ID", alias = "DistrictID", deserialize_with = "id")]
    id: u64,
    #[serde(rename = "DistrictName", alias = "Districtname", default)]
    name: String,
    #[serde(rename = "TerritoryID", default, deserialize_with = "opt_id")]
    territory_id: Option<u64>,
}

#[derive(Debug, Deserialize)]
pub struct WireSeat {
    #[serde(rename = "ID", alias = "SeatID", deserialize_with = "id")]
    id: u64,
    #[serde(
        rename = "SeatDescription",
        alias = "SeatDescption",
        alias = "Seatdescription",
        default
    )]
    description: Option<String>,
    #[serde(
        rename = "DistrictID",
        alias = "DistricID",
        default,
        deserialize_with = "opt_id"
    )]
    district_id: Option<u64>,
}

#[derive(Debug, Deserialize)]
pub struct WireCitizen {
    #[serde(rename = "ID", alias = "CitizenID", deserialize_with = "id")]
    id: u64,
    #[serde(rename = "CitizenName", alias = "Citizenname", default)]
    name: String,
    #[serde(rename = "NIC", default)]
    national_id: String,
    #[serde(rename = "City", default)]
    city: Option<String>,
    #[serde(rename = "Address1", default)]
    address_line1: Option<String>,
    #[serde(rename = "Address2", default)]
    address_line2: Option<String>,
    #[serde(rename = "DOB", default, deserialize_with = "opt_date")]
    birth_date: Option<NaiveDate>,
    #[serde(rename = "Job", default)]
    job: Option<String>,
    #[serde(rename = "Salary", default, deserialize_with = "opt_number")]
    salary: Option<f64>,
    #[serde(rename = "MaritalStatus", default)]
    marital_status: Option<String>,
    #[serde(
        rename = "DistrictID",
        alias = "DistricID",
        default,
        deserialize_with = "opt_id"
    )]
    district_id: Option<u64>,
    #[serde(rename = "SeatID", default, deserialize_with = "opt_id")]
    seat_id: Option<u64>,
}

impl WireCountry {
    pub fn into_model(self) -> Country {
        Country {
            id: self.id,
            name: self.name,
        }
    }
}

impl WireTerritory {
    /// Parent country id as carried by the record itself.
    pub fn parent_id(&self) -> Option<u64> {
        self.country_id
    }

    /// `country_id` is the id the listing was requested for, used when the
    /// record itself omits its parent.
    pub fn into_model(self, country_id: u64) -> Territory {
        Territory {
            id: self.id,
            name: self.name,
            country_id: self.country_id.unwrap_or(country_id),
        }
    }
}

impl WireDistrict {
    pub fn parent_id(&self) -> Option<u64> {
        self.territory_id
    }

    pub fn into_model(self, territory_id: u64) -> District {
        District {
            id: self.id,
            name: self.name,
            territory_id: self.territory_id.unwrap_or(territory_id),
        }
    }
}

impl WireSeat {
    pub fn parent_id(&self) -> Option<u64> {
        self.district_id
    }

    pub fn into_model(self, district_id: u64) -> Seat {
        Seat {
            id: self.id,
            description: non_blank(self.description),
            district_id: self.district_id.unwrap_or(district_id),
        }
    }
}

impl WireCitizen {
    pub fn into_model(self) -> Citizen {
        Citizen {
            id: self.id,
            name: self.name,
            national_id: self.national_id,
            city: non_blank(self.city),
            address_line1: non_blank(self.address_line1),
            address_line2: non_blank(self.address_line2),
            birth_date: self.birth_date,
            job: non_blank(self.job),
            salary: self.salary,
            marital_status: non_blank(self.marital_status),
            district_id: self.district_id,
            seat_id: self.seat_id,
        }
    }
}

/// Decode a list response. An empty body or `null` is an empty list.
pub fn decode_list<T: DeserializeOwned>(body: &str) -> Result<Vec<T>, serde_json::Error> {
    if body.trim().is_empty() {
        return Ok(Vec::new());
    }
    let list: Option<Vec<T>> = serde_json::from_str(body)?;
    Ok(list.unwrap_or_default())
}

/// A full registry dump in wire format.
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WireSnapshot {
    #[serde(default)]
    pub countries: Vec<WireCountry>,
    #[serde(default)]
    pub territories: Vec<WireTerritory>,
    #[serde(default)]
    pub districts: Vec<WireDistrict>,
    #[serde(default)]
    pub seats: Vec<WireSeat>,
    #[serde(default)]
    pub citizens: Vec<WireCitizen>,
}
