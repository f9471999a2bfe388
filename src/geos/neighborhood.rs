// src/geos/neighborhood.rs

use super::coordinate::{BoundingBox, Coordinate};

/// One way of putting an area label on a listing.
pub trait NeighborhoodStrategy: Send + Sync {
    /// `None` when this strategy has nothing to say about the listing.
    fn label(&self, point: Coordinate, location: &str) -> Option<String>;
}

/// Detects known neighborhood names inside the free-text location.
///
/// The label is the listing's own location text, not the configured name:
/// the list only decides whether the text is worth keeping.
#[derive(Debug, Clone, Default)]
pub struct NameMatch {
    names: Vec<String>,
}

impl NameMatch {
    pub fn new<I, S>(names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let names = names
            .into_iter()
            .map(|n| n.as_ref().trim().to_lowercase())
            .filter(|n| !n.is_empty())
            .collect();
        Self { names }
    }
}

impl NeighborhoodStrategy for NameMatch {
    fn label(&self, _point: Coordinate, location: &str) -> Option<String> {
        let haystack = location.to_lowercase();
        self.names
            .iter()
            .filter(|name| haystack.contains(name.as_str()))
            .last()
            .map(|_| location.to_string())
    }
}

/// Labels a point with the key of the box that contains it. Last matching box wins.
#[derive(Debug, Clone, Default)]
pub struct BoxMatch {
    boxes: Vec<(String, BoundingBox)>,
}

impl BoxMatch {
    pub fn new(boxes: Vec<(String, BoundingBox)>) -> Self {
        Self { boxes }
    }
}

impl NeighborhoodStrategy for BoxMatch {
    fn label(&self, point: Coordinate, _location: &str) -> Option<String> {
        self.boxes
            .iter()
            .filter(|(_, bbox)| bbox.contains(point))
            .last()
            .map(|(name, _)| name.clone())
    }
}

/// Ordered list of strategies; the first non-empty label wins.
pub struct NeighborhoodClassifier {
    strategies: Vec<Box<dyn NeighborhoodStrategy>>,
}

impl NeighborhoodClassifier {
    pub fn new(strategies: Vec<Box<dyn NeighborhoodStrategy>>) -> Self {
        Self { strategies }
    }

    /// Name match on the location text first, then box membership.
    pub fn from_registries(names: NameMatch, boxes: BoxMatch) -> Self {
        Self::new(vec![Box::new(names), Box::new(boxes)])
    }

    /// Area label for a listing, or the empty string.
    /// Listings without a geotag are never labeled.
    pub fn classify(&self, point: Option<Coordinate>, location: &str) -> String {
        let Some(point) = point else {
            return String::new();
        };

        self.strategies
            .iter()
            .filter_map(|s| s.label(point, location))
            .find(|label| !label.is_empty())
            .unwrap_or_default()
    }
}
