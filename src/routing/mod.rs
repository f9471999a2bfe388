mod osrm;
mod routing_error;

pub use osrm::OsrmRouter;
pub use routing_error::RoutingError;

use crate::geos::{nearest_stop, Coordinate, NearestStop, StopRegistry};

/// Walking leg returned by a routing service.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Walk {
    pub miles: f64,
    pub minutes: f64,
}

/// External walking-directions provider.
pub trait RoutingService: Send + Sync {
    fn walk(&self, from: Coordinate, to: Coordinate) -> Result<Walk, RoutingError>;
}

#[derive(Debug, Clone, PartialEq)]
pub struct WalkedStop {
    pub stop: NearestStop,
    pub walk: Option<Walk>,
}

/// Nearest stop by straight-line distance, then one routing call to that stop.
///
/// Only the winning candidate is routed, so the walking-nearest stop can differ
/// from the one returned. Routing failures are returned as-is.
pub fn nearest_stop_with_walk(
    point: Coordinate,
    registry: &StopRegistry,
    router: &dyn RoutingService,
) -> Result<WalkedStop, RoutingError> {
    let stop = nearest_stop(point, registry);

    let walk = match stop.coordinate {
        Some(target) => Some(router.walk(point, target)?),
        None => None,
    };

    Ok(WalkedStop { stop, walk })
}
