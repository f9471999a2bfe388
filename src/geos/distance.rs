use super::coordinate::{BoundingBox, Coordinate};
use std::cmp::Ordering;
use std::fmt;

/// Earth's radius in kilometers
const EARTH_RADIUS_KM: f64 = 6367.0;

const MILES_PER_KM: f64 = 0.621371;

/// Great-circle distance between two points, in miles.
///
/// Plain Haversine on a sphere. Inputs are not range checked.
#[inline]
pub fn haversine_miles(a: Coordinate, b: Coordinate) -> f64 {
    let lat1 = a.lat.to_radians();
    let lat2 = b.lat.to_radians();
    let delta_lat = lat2 - lat1;
    let delta_lon = (b.lon - a.lon).to_radians();

    let h = (delta_lat / 2.0).sin().powi(2)
        + lat1.cos() * lat2.cos() * (delta_lon / 2.0).sin().powi(2);
    let km = 2.0 * EARTH_RADIUS_KM * h.sqrt().asin();

    km * MILES_PER_KM
}

/// Open-interval box membership: points on any edge are outside.
///
/// A box whose corners are not (southwest, northeast) contains nothing.
#[inline]
pub fn in_box(point: Coordinate, bbox: &BoundingBox) -> bool {
    bbox.southwest.lat < point.lat
        && point.lat < bbox.northeast.lat
        && bbox.southwest.lon < point.lon
        && point.lon < bbox.northeast.lon
}

/// A distance in miles, or `Unknown` when nothing could be measured
/// (no geotag, or no stop to measure against).
///
/// `Unknown` orders after every known distance.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub enum Distance {
    Miles(f64),
    #[default]
    Unknown,
}

impl Distance {
    pub fn miles(self) -> Option<f64> {
        match self {
            Distance::Miles(d) => Some(d),
            Distance::Unknown => None,
        }
    }

    /// True only for a known distance no greater than `max`.
    pub fn within(self, max: f64) -> bool {
        matches!(self, Distance::Miles(d) if d <= max)
    }
}

impl PartialOrd for Distance {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        match (self, other) {
            (Distance::Miles(a), Distance::Miles(b)) => a.partial_cmp(b),
            (Distance::Miles(_), Distance::Unknown) => Some(Ordering::Less),
            (Distance::Unknown, Distance::Miles(_)) => Some(Ordering::Greater),
            (Distance::Unknown, Distance::Unknown) => Some(Ordering::Equal),
        }
    }
}

impl fmt::Display for Distance {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Distance::Miles(d) => write!(f, "{d:.2}"),
            Distance::Unknown => write!(f, "?"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sq() -> BoundingBox {
        BoundingBox::new(Coordinate::new(37.0, -123.0), Coordinate::new(38.0, -122.0))
    }

    #[test]
    fn distance_is_symmetric() {
        let pairs = [
            (Coordinate::new(37.7925, -122.4050), Coordinate::new(37.80, -122.42)),
            (Coordinate::new(-33.86, 151.21), Coordinate::new(51.5074, -0.1278)),
            (Coordinate::new(0.0, 179.9), Coordinate::new(0.0, -179.9)),
        ];
        for (a, b) in pairs {
            let ab = haversine_miles(a, b);
            let ba = haversine_miles(b, a);
            assert!((ab - ba).abs() < 1e-9, "{ab} != {ba}");
        }
    }

    #[test]
    fn distance_to_self_is_zero() {
        let p = Coordinate::new(37.7925, -122.4050);
        assert_eq!(haversine_miles(p, p), 0.0);
    }

    #[test]
    fn one_degree_of_latitude_near_equator() {
        let d = haversine_miles(Coordinate::new(0.0, 0.0), Coordinate::new(1.0, 0.0));
        assert!((d - 69.05).abs() < 0.1, "expected ~69 miles, got {d}");
    }

    #[test]
    fn london_to_paris() {
        let d = haversine_miles(
            Coordinate::new(51.5074, -0.1278),
            Coordinate::new(48.8566, 2.3522),
        );
        // ~213 miles
        assert!((d - 213.0).abs() < 5.0, "got {d}");
    }

    #[test]
    fn in_box_strictly_inside() {
        assert!(in_box(Coordinate::new(37.5, -122.5), &sq()));
    }

    #[test]
    fn in_box_excludes_all_four_edges() {
        let b = sq();
        assert!(!in_box(Coordinate::new(37.0, -122.5), &b));
        assert!(!in_box(Coordinate::new(38.0, -122.5), &b));
        assert!(!in_box(Coordinate::new(37.5, -123.0), &b));
        assert!(!in_box(Coordinate::new(37.5, -122.0), &b));
        assert!(!in_box(Coordinate::new(37.0, -123.0), &b));
    }

    #[test]
    fn in_box_outside() {
        let b = sq();
        assert!(!in_box(Coordinate::new(36.9, -122.5), &b));
        assert!(!in_box(Coordinate::new(37.5, -121.9), &b));
    }

    #[test]
    fn malformed_box_contains_nothing() {
        let flipped = BoundingBox::new(Coordinate::new(38.0, -122.0), Coordinate::new(37.0, -123.0));
        assert!(!flipped.is_well_formed());
        assert!(!flipped.contains(Coordinate::new(37.5, -122.5)));
    }

    #[test]
    fn unknown_distance_sorts_last_and_is_never_within() {
        assert!(Distance::Miles(1000.0) < Distance::Unknown);
        assert!(!Distance::Unknown.within(f64::MAX));
        assert!(Distance::Miles(0.5).within(0.5));
        assert_eq!(Distance::Unknown.to_string(), "?");
        assert_eq!(Distance::Miles(1.234).to_string(), "1.23");
    }
}
