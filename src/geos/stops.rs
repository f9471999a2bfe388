use super::coordinate::Coordinate;
use super::distance::{haversine_miles, Distance};
use std::collections::HashSet;
use thiserror::Error;

#[derive(Debug, Error, PartialEq)]
#[error("duplicate stop name: {0}")]
pub struct DuplicateStop(pub String);

#[derive(Debug, Clone, PartialEq)]
pub struct Stop {
    pub name: String,
    pub coordinate: Coordinate,
}

impl Stop {
    pub fn new(name: impl Into<String>, coordinate: impl Into<Coordinate>) -> Self {
        Self {
            name: name.into(),
            coordinate: coordinate.into(),
        }
    }
}

/// Named, ordered set of fixed stop coordinates (transit stations, shuttle stops).
///
/// Order matters only for ties: the earlier stop wins.
#[derive(Debug, Clone, Default)]
pub struct StopRegistry {
    stops: Vec<Stop>,
}

impl StopRegistry {
    pub fn new(stops: Vec<Stop>) -> Result<Self, DuplicateStop> {
        let mut seen = HashSet::new();
        for stop in &stops {
            if !seen.insert(stop.name.as_str()) {
                return Err(DuplicateStop(stop.name.clone()));
            }
        }
        Ok(Self { stops })
    }

    pub fn is_empty(&self) -> bool {
        self.stops.is_empty()
    }

    pub fn len(&self) -> usize {
        self.stops.len()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Stop> {
        self.stops.iter()
    }

    pub fn nearest(&self, point: Coordinate) -> NearestStop {
        nearest_stop(point, self)
    }
}

/// Result of a nearest-stop lookup. An empty registry gives `NearestStop::not_found()`.
#[derive(Debug, Clone, PartialEq)]
pub struct NearestStop {
    pub name: String,
    pub coordinate: Option<Coordinate>,
    pub distance: Distance,
}

impl NearestStop {
    pub fn not_found() -> Self {
        Self {
            name: String::new(),
            coordinate: None,
            distance: Distance::Unknown,
        }
    }
}

/// Linear scan for the stop closest to `point` by great-circle distance.
pub fn nearest_stop(point: Coordinate, registry: &StopRegistry) -> NearestStop {
    let mut best: Option<(&Stop, f64)> = None;

    for stop in registry.iter() {
        let dist = haversine_miles(stop.coordinate, point);
        // strict `<` keeps the first of equally distant stops
        match best {
            Some((_, closest)) if dist >= closest => {}
            _ => best = Some((stop, dist)),
        }
    }

    match best {
        Some((stop, dist)) => NearestStop {
            name: stop.name.clone(),
            coordinate: Some(stop.coordinate),
            distance: Distance::Miles(dist),
        },
        None => NearestStop::not_found(),
    }
}
