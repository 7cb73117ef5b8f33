//! REST client for the registry API.

use super::wire::{self, WireCitizen, WireCountry, WireDistrict, WireSeat, WireTerritory};
use super::Registry;
use crate::error::RegistryError;
use crate::models::{Citizen, Country, District, Operation, Seat, Territory};
use reqwest::StatusCode;
use serde::de::DeserializeOwned;
use std::time::Duration;
use tracing::debug;

/// Default registry deployment.
pub const DEFAULT_BASE_URL: &str = "https://citizens-backend-production.up.railway.app";

/// Registry reached over HTTP.
#[derive(Debug, Clone)]
pub struct HttpRegistry {
    client: reqwest::Client,
    base_url: String,
    timeout_seconds: u64,
}

impl HttpRegistry {
    /// Create a client for `base_url` with a per-request timeout.
    pub fn new(base_url: impl Into<String>, timeout_seconds: u64) -> Result<Self, RegistryError> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(timeout_seconds))
            .build()
            .map_err(|e| RegistryError::Client(e.to_string()))?;

        Ok(Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            timeout_seconds,
        })
    }

    /// Absolute URL for an operation.
    pub fn url_for(&self, operation: Operation, parent_id: u64) -> String {
        format!("{}/{}", self.base_url, operation.endpoint(parent_id))
    }

    async fn get_list<T: DeserializeOwned>(
        &self,
        operation: Operation,
        parent_id: u64,
    ) -> Result<Vec<T>, RegistryError> {
        let url = self.url_for(operation, parent_id);
        debug!("GET {}", url);

        let response = self
            .client
            .get(&url)
            .send()
            .await
            .map_err(|e| RegistryError::from_reqwest(e, &url, self.timeout_seconds))?;

        let status = response.status();
        if status == StatusCode::NOT_FOUND {
            debug!("{} returned 404, treating as empty", url);
            return Ok(Vec::new());
        }
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(RegistryError::Status {
                url,
                status: status.as_u16(),
                body,
            });
        }

        let body = response
            .text()
            .await
            .map_err(|e| RegistryError::from_reqwest(e, &url, self.timeout_seconds))?;

        wire::decode_list(&body).map_err(|e| RegistryError::Decode {
            url,
            message: e.to_string(),
        })
    }
}

impl Registry for HttpRegistry {
    async fn list_countries(&self) -> Result<Vec<Country>, RegistryError> {
        let records: Vec<WireCountry> = self.get_list(Operation::ListCountries, 0).await?;
        Ok(records.into_iter().map(WireCountry::into_model).collect())
    }

    async fn list_territories(&self, country_id: u64) -> Result<Vec<Territory>, RegistryError> {
        let records: Vec<WireTerritory> =
            self.get_list(Operation::ListTerritories, country_id).await?;
        Ok(records
            .into_iter()
            .map(|t| t.into_model(country_id))
            .collect())
    }

    async fn list_districts(&self, territory_id: u64) -> Result<Vec<District>, RegistryError> {
        let records: Vec<WireDistrict> =
            self.get_list(Operation::ListDistricts, territory_id).await?;
        Ok(records
            .into_iter()
            .map(|d| d.into_model(territory_id))
            .collect())
    }

    async fn list_citizens_by_district(
        &self,
        district_id: u64,
    ) -> Result<Vec<Citizen>, RegistryError> {
        let records: Vec<WireCitizen> = self
            .get_list(Operation::ListCitizensByDistrict, district_id)
            .await?;
        Ok(records.into_iter().map(WireCitizen::into_model).collect())
    }

    async fn list_seats(&self, district_id: u64) -> Result<Vec<Seat>, RegistryError> {
        let records: Vec<WireSeat> = self.get_list(Operation::ListSeats, district_id).await?;
        Ok(records
            .into_iter()
            .map(|s| s.into_model(district_id))
            .collect())
    }

    async fn list_citizens_by_seat(&self, seat_id: u64) -> Result<Vec<Citizen>, RegistryError> {
        let records: Vec<WireCitizen> =
            self.get_list(Operation::ListCitizensBySeat, seat_id).await?;
        Ok(records.into_iter().map(WireCitizen::into_model).collect())
    }

    fn describe(&self) -> String {
        self.base_url.clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analysis::Aggregator;
    use crate::models::Level;
    use tokio::io::{AsyncReadExt, AsyncWriteExt};
    use tokio::net::TcpListener;

    /// Canned response for one request path.
    #[derive(Clone)]
    struct Route {
        path: &'static str,
        status: u16,
        body: &'static str,
        delay_ms: u64,
    }

    impl Route {
        fn ok(path: &'static str, body: &'static str) -> Self {
            Self {
                path,
                status: 200,
                body,
                delay_ms: 0,
            }
        }
    }

    /// Serve `routes` on an ephemeral local port. Unknown paths get a 404.
    async fn serve(routes: Vec<Route>) -> String {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();

        tokio::spawn(async move {
            while let Ok((mut socket, _)) = listener.accept().await {
                let routes = routes.clone();
                tokio::spawn(async move {
                    let mut buf = vec![0u8; 4096];
                    let mut read = 0;
                    while read < buf.len() {
                        let n = socket.read(&mut buf[read..]).await.unwrap_or(0);
                        if n == 0 {
                            break;
                        }
                        read += n;
                        if buf[..read].windows(4).any(|w| w == b"\r\n\r\n") {
                            break;
                        }
                    }

                    let request = String::from_utf8_lossy(&buf[..read]).to_string();
                    let path = request.split_whitespace().nth(1).unwrap_or("/");
                    let route = routes.iter().find(|r| r.path == path);
                    let (status, body, delay_ms) = route
                        .map(|r| (r.status, r.body, r.delay_ms))
                        .unwrap_or((404, "", 0));

                    if delay_ms > 0 {
                        tokio::time::sleep(Duration::from_millis(delay_ms)).await;
                    }

                    let reason = match status {
                        200 => "OK",
                        404 => "Not Found",
                        _ => "Internal Server Error",
                    };
                    let response = format!(
                        "HTTP/1.1 {} {}\r\nContent-Type: application/json\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{}",
                        status,
                        reason,
                        body.len(),
                        body
                    );
                    let _ = socket.write_all(response.as_bytes()).await;
                    let _ = socket.shutdown().await;
                });
            }
        });

        format!("http://{}", addr)
    }

    #[test]
    fn test_url_building_strips_trailing_slash() {
        let registry = HttpRegistry::new("http://localhost:5000/", 5).unwrap();
        assert_eq!(
            registry.url_for(Operation::ListCountries, 0),
            "http://localhost:5000/countries"
        );
        assert_eq!(
            registry.url_for(Operation::ListCitizensBySeat, 12),
            "http://localhost:5000/citizens/seat/12"
        );
        assert_eq!(registry.describe(), "http://localhost:5000");
    }

    #[tokio::test]
    async fn test_unreachable_registry_is_an_error() {
        // Port 9 (discard) is not expected to have an HTTP listener.
        let registry = HttpRegistry::new("http://127.0.0.1:9", 2).unwrap();
        let result = registry.list_countries().await;
        assert!(result.is_err());
    }

    #[tokio::test]
    async fn test_not_found_is_empty_list() {
        let base_url = serve(Vec::new()).await;
        let registry = HttpRegistry::new(&base_url, 5).unwrap();

        let seats = registry.list_seats(7).await.unwrap();
        assert!(seats.is_empty());
    }

    #[tokio::test]
    async fn test_server_error_is_status_error() {
        let base_url = serve(vec![Route {
            path: "/territories/1",
            status: 500,
            body: "boom",
            delay_ms: 0,
        }])
        .await;
        let registry = HttpRegistry::new(&base_url, 5).unwrap();

        let err = registry.list_territories(1).await.unwrap_err();
        match err {
            RegistryError::Status { status, body, url } => {
                assert_eq!(status, 500);
                assert_eq!(body, "boom");
                assert!(url.ends_with("/territories/1"));
            }
            other => panic!("expected status error, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_success_body_is_normalized() {
        let base_url = serve(vec![
            Route::ok(
                "/seats/1",
                r#"[{"ID": "3", "SeatDescption": "X"}, {"ID": 4, "SeatDescription": " "}]"#,
            ),
            Route::ok("/citizens/seat/3", "null"),
        ])
        .await;
        let registry = HttpRegistry::new(&base_url, 5).unwrap();

        let seats = registry.list_seats(1).await.unwrap();
        assert_eq!(
            seats,
            vec![
                Seat {
                    id: 3,
                    description: Some("X".to_string()),
                    district_id: 1,
                },
                Seat {
                    id: 4,
                    description: None,
                    district_id: 1,
                },
            ]
        );
        assert!(registry.list_citizens_by_seat(3).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_undecodable_body_is_decode_error() {
        let base_url = serve(vec![Route::ok("/countries", "<html>")]).await;
        let registry = HttpRegistry::new(&base_url, 5).unwrap();

        let err = registry.list_countries().await.unwrap_err();
        assert!(matches!(err, RegistryError::Decode { .. }));
    }

    #[tokio::test]
    async fn test_district_timeout_is_node_failure() {
        let base_url = serve(vec![
            Route::ok("/countries", r#"[{"ID": 1, "CountryName": "Testland"}]"#),
            Route::ok(
                "/territories/1",
                r#"[{"ID": 10, "TerritoryName": "T1", "CountryID": 1}]"#,
            ),
            Route {
                path: "/districts/10",
                status: 200,
                body: "[]",
                delay_ms: 3_000,
            },
        ])
        .await;
        let registry = HttpRegistry::new(&base_url, 1).unwrap();

        let result = Aggregator::new(&registry).load(None).await.unwrap();

        assert_eq!(result.failures.len(), 1);
        let failure = &result.failures[0];
        assert_eq!(failure.level, Level::Territory);
        assert_eq!(failure.node_id, 10);
        assert_eq!(failure.operation, Operation::ListDistricts);
        assert_eq!(result.territory_counts.len(), 1);
        assert_eq!(result.territory_counts[0].count, 0);
        assert_eq!(result.total_citizens, 0);
        assert!(!result.is_complete());
    }
}
