//! Error types for registry access and aggregation.

use crate::models::{Level, Operation};
use thiserror::Error;

/// Errors raised by a [`crate::registry::Registry`] implementation.
#[derive(Debug, Error)]
pub enum RegistryError {
    /// The HTTP client could not be constructed
    #[error("HTTP client error: {0}")]
    Client(String),

    /// The request did not complete within the per-request timeout
    #[error("Request to {url} timed out after {seconds}s")]
    Timeout { url: String, seconds: u64 },

    /// The registry host could not be reached
    #[error("Cannot connect to registry at {url}")]
    Connect { url: String },

    /// Any other transport failure
    #[error("Request to {url} failed: {message}")]
    Request { url: String, message: String },

    /// The registry answered with a non-success status
    #[error("Registry returned {status} for {url}: {body}")]
    Status { url: String, status: u16, body: String },

    /// The response body was not a list of the expected records
    #[error("Failed to decode response from {url}: {message}")]
    Decode { url: String, message: String },

    /// A snapshot file could not be read or parsed
    #[error("Snapshot error: {0}")]
    Snapshot(String),

    /// The registry refused the operation
    #[error("Registry unavailable: {0}")]
    Unavailable(String),
}

impl RegistryError {
    /// Map a reqwest error onto the registry taxonomy.
    pub fn from_reqwest(err: reqwest::Error, url: &str, timeout_seconds: u64) -> Self {
        if err.is_timeout() {
            Self::Timeout {
                url: url.to_string(),
                seconds: timeout_seconds,
            }
        } else if err.is_connect() {
            Self::Connect {
                url: url.to_string(),
            }
        } else if err.is_decode() {
            Self::Decode {
                url: url.to_string(),
                message: err.to_string(),
            }
        } else {
            Self::Request {
                url: url.to_string(),
                message: err.to_string(),
            }
        }
    }
}

/// Errors that abort an aggregation run.
#[derive(Debug, Error)]
pub enum AggregateError {
    /// The initial country listing failed; no counts can be computed
    #[error("Failed to {operation}: {source}")]
    FatalFetch {
        operation: Operation,
        #[source]
        source: RegistryError,
    },
}

/// Errors raised while building or verifying a cascading selection.
#[derive(Debug, Error)]
pub enum SelectionError {
    /// A child level was selected before its parent
    #[error("Cannot select a {level} without first selecting a {parent}")]
    MissingParent { level: Level, parent: Level },

    /// The selected node is not listed under its parent
    #[error("{level} {id} was not found{}", parent_suffix(.parent_id))]
    NotFound {
        level: Level,
        id: u64,
        parent_id: Option<u64>,
    },

    /// Nothing selected that citizens can be listed for
    #[error("Select a district or a seat to list citizens")]
    NoCitizenScope,

    #[error(transparent)]
    Registry(#[from] RegistryError),
}

fn parent_suffix(parent_id: &Option<u64>) -> String {
    match parent_id {
        Some(id) => format!(" under parent {}", id),
        None => String::new(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fatal_fetch_names_operation() {
        let err = AggregateError::FatalFetch {
            operation: Operation::ListCountries,
            source: RegistryError::Connect {
                url: "http://localhost:5000/countries".to_string(),
            },
        };
        let message = err.to_string();
        assert!(message.contains("list countries"));
        assert!(message.contains("localhost:5000"));
    }

    #[test]
    fn test_selection_error_messages() {
        let missing = SelectionError::MissingParent {
            level: Level::Seat,
            parent: Level::District,
        };
        assert_eq!(
            missing.to_string(),
            "Cannot select a Seat without first selecting a District"
        );

        let not_found = SelectionError::NotFound {
            level: Level::District,
            id: 7,
            parent_id: Some(10),
        };
        assert_eq!(not_found.to_string(), "District 7 was not found under parent 10");

        let top = SelectionError::NotFound {
            level: Level::Country,
            id: 3,
            parent_id: None,
        };
        assert_eq!(top.to_string(), "Country 3 was not found");
    }
}
