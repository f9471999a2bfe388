// src/routing/osrm.rs

use super::{RoutingError, RoutingService, Walk};
use crate::geos::Coordinate;
use reqwest::blocking::Client;
use serde::Deserialize;
use std::time::Duration;

const METERS_PER_MILE: f64 = 1609.344;

#[derive(Debug, Deserialize)]
struct OsrmResponse {
    code: String,
    message: Option<String>,
    #[serde(default)]
    routes: Vec<OsrmRoute>,
}

#[derive(Debug, Deserialize)]
struct OsrmRoute {
    /// meters
    distance: f64,
    /// seconds
    duration: f64,
}

/// Walking directions from an OSRM-compatible `/route/v1` endpoint.
pub struct OsrmRouter {
    client: Client,
    base_url: String,
    profile: String,
}

impl OsrmRouter {
    pub fn new(base_url: &str, profile: &str, timeout: Duration) -> Result<Self, RoutingError> {
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| RoutingError::Network(e.to_string()))?;

        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            profile: profile.to_string(),
        })
    }

    fn route_url(&self, from: Coordinate, to: Coordinate) -> String {
        // OSRM wants lon,lat
        format!(
            "{}/route/v1/{}/{},{};{},{}",
            self.base_url, self.profile, from.lon, from.lat, to.lon, to.lat
        )
    }
}

impl RoutingService for OsrmRouter {
    fn walk(&self, from: Coordinate, to: Coordinate) -> Result<Walk, RoutingError> {
        let resp = self
            .client
            .get(self.route_url(from, to))
            .query(&[("overview", "false")])
            .send()?;

        let status = resp.status();
        let text = resp.text()?;

        let parsed: OsrmResponse = match serde_json::from_str(&text) {
            Ok(p) => p,
            Err(_) if !status.is_success() => {
                return Err(RoutingError::Network(format!("HTTP {status}: {text}")));
            }
            Err(e) => return Err(RoutingError::InvalidResponse(e.to_string())),
        };

        match parsed.code.as_str() {
            "Ok" => {}
            "NoRoute" | "NoSegment" => return Err(RoutingError::NoRoute),
            other => {
                return Err(RoutingError::InvalidResponse(format!(
                    "{other}: {}",
                    parsed.message.unwrap_or_default()
                )))
            }
        }

        let route = parsed.routes.first().ok_or(RoutingError::NoRoute)?;

        Ok(Walk {
            miles: route.distance / METERS_PER_MILE,
            minutes: route.duration / 60.0,
        })
    }
}
