// src/enrichment.rs

use crate::config::Settings;
use crate::domain::{Annotation, Listing};
use crate::errors::AppError;
use crate::geos::{
    BoxMatch, Coordinate, NameMatch, NearestStop, NeighborhoodClassifier, Stop, StopRegistry,
};
use crate::routing::{nearest_stop_with_walk, RoutingError, RoutingService, Walk};
use thiserror::Error;
use tracing::debug;

#[derive(Debug, Error)]
pub enum EnrichError {
    #[error("walking route to nearest {leg} stop failed: {source}")]
    Routing {
        leg: &'static str,
        #[source]
        source: RoutingError,
    },
}

impl EnrichError {
    pub fn is_retryable(&self) -> bool {
        match self {
            EnrichError::Routing { source, .. } => source.is_retryable(),
        }
    }
}

/// Read-only lookup tables, built once at startup.
pub struct PointsOfInterest {
    pub classifier: NeighborhoodClassifier,
    pub transit: StopRegistry,
    pub shuttle: StopRegistry,
}

impl PointsOfInterest {
    pub fn new(classifier: NeighborhoodClassifier, transit: StopRegistry, shuttle: StopRegistry) -> Self {
        Self {
            classifier,
            transit,
            shuttle,
        }
    }

    pub fn from_settings(settings: &Settings) -> Result<Self, AppError> {
        let names = NameMatch::new(&settings.neighborhoods.names);
        let boxes = BoxMatch::new(
            settings
                .neighborhoods
                .boxes
                .iter()
                .map(|b| (b.name.clone(), b.bounds()))
                .collect(),
        );

        let registry = |entries: &[crate::config::StopEntry]| {
            StopRegistry::new(
                entries
                    .iter()
                    .map(|s| Stop::new(s.name.clone(), (s.lat, s.lon)))
                    .collect(),
            )
            .map_err(|e| AppError::Config(e.to_string()))
        };

        Ok(Self::new(
            NeighborhoodClassifier::from_registries(names, boxes),
            registry(&settings.transit.stops)?,
            registry(&settings.shuttle.stops)?,
        ))
    }
}

/// Composes the classifier and both stop lookups into one `Annotation`.
///
/// With a router, each nearest stop also gets a walking distance and time.
pub struct Enricher<'a> {
    poi: &'a PointsOfInterest,
    router: Option<&'a dyn RoutingService>,
}

impl<'a> Enricher<'a> {
    pub fn new(poi: &'a PointsOfInterest, router: Option<&'a dyn RoutingService>) -> Self {
        Self { poi, router }
    }

    pub fn enrich_listing(&self, listing: &Listing) -> Result<Annotation, EnrichError> {
        self.enrich(listing.coordinate, &listing.location)
    }

    /// Total for a missing geotag: returns `Annotation::unlocated()` without touching the router.
    pub fn enrich(&self, point: Option<Coordinate>, location: &str) -> Result<Annotation, EnrichError> {
        let Some(point) = point else {
            return Ok(Annotation::unlocated());
        };

        let neighborhood = self.poi.classifier.classify(Some(point), location);
        let (transit, transit_walk) = self.resolve(point, &self.poi.transit, "transit")?;
        let (shuttle, shuttle_walk) = self.resolve(point, &self.poi.shuttle, "shuttle")?;

        Ok(Annotation {
            neighborhood,
            transit_stop: transit.name,
            transit_distance: transit.distance,
            transit_walk,
            shuttle_stop: shuttle.name,
            shuttle_distance: shuttle.distance,
            shuttle_walk,
        })
    }

    fn resolve(
        &self,
        point: Coordinate,
        registry: &StopRegistry,
        leg: &'static str,
    ) -> Result<(NearestStop, Option<Walk>), EnrichError> {
        match self.router {
            None => Ok((registry.nearest(point), None)),
            Some(router) => {
                let walked = nearest_stop_with_walk(point, registry, router)
                    .map_err(|source| EnrichError::Routing { leg, source })?;
                if let Some(walk) = walked.walk {
                    debug!(
                        leg,
                        stop = %walked.stop.name,
                        miles = walk.miles,
                        minutes = walk.minutes,
                        "walking route"
                    );
                }
                Ok((walked.stop, walked.walk))
            }
        }
    }
}
