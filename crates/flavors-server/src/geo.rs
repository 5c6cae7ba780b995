//! IP-based geolocation of the server host.
//!
//! Location is a nice-to-have on a recipe: every failure (transport, status,
//! decoding, provider-side "fail") is logged and reported as `None`.

use std::time::Duration;

use async_trait::async_trait;
use flavors_shared::Coordinates;
use reqwest::{Client, Url};
use serde::Deserialize;
use tracing::{debug, warn};

#[async_trait]
pub trait GeoLocator: Send + Sync {
    /// Approximate coordinates of the current public IP, if known.
    async fn lookup_current_location(&self) -> Option<Coordinates>;

    fn is_enabled(&self) -> bool {
        true
    }
}

/// Used when no lookup endpoint is configured.
pub struct DisabledGeoLocator;

#[async_trait]
impl GeoLocator for DisabledGeoLocator {
    async fn lookup_current_location(&self) -> Option<Coordinates> {
        None
    }

    fn is_enabled(&self) -> bool {
        false
    }
}

/// Looks up the caller's public IP with a JSON endpoint in the style of
/// `ip-api.com/json`.
pub struct IpGeoLocator {
    client: Client,
    endpoint: Url,
}

impl IpGeoLocator {
    pub fn new(endpoint: Url, timeout: Duration) -> Result<Self, reqwest::Error> {
        let client = Client::builder().timeout(timeout).build()?;
        Ok(Self { client, endpoint })
    }
}

#[async_trait]
impl GeoLocator for IpGeoLocator {
    async fn lookup_current_location(&self) -> Option<Coordinates> {
        let response = match self.client.get(self.endpoint.clone()).send().await {
            Ok(r) => r,
            Err(e) => {
                warn!(error = %e, "geolocation request failed");
                return None;
            }
        };

        let status = response.status();
        if !status.is_success() {
            warn!(%status, "geolocation service returned an error");
            return None;
        }

        let body = match response.bytes().await {
            Ok(b) => b,
            Err(e) => {
                warn!(error = %e, "geolocation response unreadable");
                return None;
            }
        };

        let location = parse_location(&body);
        match location {
            Some(c) => debug!(location = %c, "location detected"),
            None => warn!("Could not retrieve location"),
        }
        location
    }
}

#[derive(Deserialize)]
struct LocationDto {
    #[serde(default)]
    status: Option<String>,
    #[serde(alias = "latitude")]
    lat: Option<f64>,
    #[serde(alias = "longitude")]
    lon: Option<f64>,
}

fn parse_location(body: &[u8]) -> Option<Coordinates> {
    let dto: LocationDto = serde_json::from_slice(body).ok()?;
    if dto.status.as_deref().is_some_and(|s| s != "success") {
        return None;
    }
    let location = Coordinates::from_parts(dto.lat, dto.lon)?;
    let valid = (-90.0..=90.0).contains(&location.latitude)
        && (-180.0..=180.0).contains(&location.longitude);
    valid.then_some(location)
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::{routing::get, Json, Router};

    async fn serve(router: Router) -> Url {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, router).await.unwrap();
        });
        Url::parse(&format!("http://{addr}/json/")).unwrap()
    }

    #[test]
    fn parses_ip_api_success() {
        let body = br#"{"status":"success","country":"India","lat":18.5196,"lon":73.8554}"#;
        assert_eq!(parse_location(body), Some(Coordinates::new(18.5196, 73.8554)));
    }

    #[test]
    fn accepts_long_field_names() {
        let body = br#"{"latitude":12.97,"longitude":77.59}"#;
        assert_eq!(parse_location(body), Some(Coordinates::new(12.97, 77.59)));
    }

    #[test]
    fn rejects_fail_status_and_partial_answers() {
        assert_eq!(parse_location(br#"{"status":"fail","message":"reserved range"}"#), None);
        assert_eq!(parse_location(br#"{"lat":18.5}"#), None);
        assert_eq!(parse_location(br#"{"lat":918.5,"lon":1.0}"#), None);
        assert_eq!(parse_location(b"<html>"), None);
    }

    #[tokio::test]
    async fn looks_up_over_http() {
        let url = serve(Router::new().route(
            "/json/",
            get(|| async {
                Json(serde_json::json!({"status": "success", "lat": 9.93, "lon": 76.26}))
            }),
        ))
        .await;

        let locator = IpGeoLocator::new(url, Duration::from_secs(5)).unwrap();
        assert_eq!(
            locator.lookup_current_location().await,
            Some(Coordinates::new(9.93, 76.26))
        );
    }

    #[tokio::test]
    async fn server_error_is_unavailable() {
        let url = serve(Router::new().route(
            "/json/",
            get(|| async { axum::http::StatusCode::SERVICE_UNAVAILABLE }),
        ))
        .await;

        let locator = IpGeoLocator::new(url, Duration::from_secs(5)).unwrap();
        assert_eq!(locator.lookup_current_location().await, None);
    }

    #[tokio::test]
    async fn unreachable_endpoint_is_unavailable() {
        let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
        let addr = listener.local_addr().unwrap();
        drop(listener);

        let url = Url::parse(&format!("http://{addr}/json/")).unwrap();
        let locator = IpGeoLocator::new(url, Duration::from_secs(2)).unwrap();
        assert_eq!(locator.lookup_current_location().await, None);
    }

    #[tokio::test]
    async fn disabled_locator_finds_nothing() {
        assert_eq!(DisabledGeoLocator.lookup_current_location().await, None);
        assert!(!DisabledGeoLocator.is_enabled());
    }
}
