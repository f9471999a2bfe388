use crate::geos::Distance;
use crate::routing::Walk;

/// Geographic context computed for one listing.
///
/// A listing without a geotag gets `Annotation::unlocated()`: every name
/// empty, every distance unknown, no walks.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Annotation {
    pub neighborhood: String,
    pub transit_stop: String,
    pub transit_distance: Distance,
    pub transit_walk: Option<Walk>,
    pub shuttle_stop: String,
    pub shuttle_distance: Distance,
    pub shuttle_walk: Option<Walk>,
}

impl Annotation {
    pub fn unlocated() -> Self {
        Self::default()
    }

    /// minutes
    pub fn transit_walk_time(&self) -> Option<f64> {
        self.transit_walk.map(|w| w.minutes)
    }

    /// minutes
    pub fn shuttle_walk_time(&self) -> Option<f64> {
        self.shuttle_walk.map(|w| w.minutes)
    }
}
