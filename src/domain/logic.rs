// src/domain/logic.rs

use crate::config::PreferenceSettings;
use crate::domain::listing::Listing;
use std::fmt;

/// Why an enriched listing was not forwarded.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Rejection {
    NotAnnotated,
    NoNeighborhood,
    NoImage,
    TransitTooFar,
    ShuttleTooFar,
    /// The posting text mentions a disallowed phrase.
    Undesirable,
    /// The routing service has no walking route to the nearest stop.
    Unroutable,
    /// The posting page is gone or has no readable text.
    Unreadable,
}

impl fmt::Display for Rejection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Rejection::NotAnnotated => "not annotated",
            Rejection::NoNeighborhood => "outside known neighborhoods",
            Rejection::NoImage => "no image",
            Rejection::TransitTooFar => "too far from transit",
            Rejection::ShuttleTooFar => "too far from a shuttle stop",
            Rejection::Undesirable => "mentions a disallowed phrase",
            Rejection::Unroutable => "no walking route to the nearest stop",
            Rejection::Unreadable => "posting could not be read",
        };
        f.write_str(s)
    }
}

/// Thresholds a listing has to meet before the desirability check.
#[derive(Debug, Clone)]
pub struct Criteria {
    pub max_transit_dist: f64,
    pub max_shuttle_dist: f64,
    pub max_shuttle_walk_time: f64,
    pub require_image: bool,
    /// Off when no transit stops are configured.
    pub check_transit: bool,
    /// Off when no shuttle stops are configured.
    pub check_shuttle: bool,
}

impl Criteria {
    pub fn from_preferences(prefs: &PreferenceSettings, has_transit: bool, has_shuttle: bool) -> Self {
        Self {
            max_transit_dist: prefs.max_transit_dist,
            max_shuttle_dist: prefs.max_shuttle_dist,
            max_shuttle_walk_time: prefs.max_shuttle_walk_time,
            require_image: prefs.require_image,
            check_transit: has_transit,
            check_shuttle: has_shuttle,
        }
    }
}

/// Checks are applied in a fixed order and the first failure is reported.
///
/// A known shuttle walk time takes precedence over the straight-line distance.
pub fn evaluate(listing: &Listing, criteria: &Criteria) -> Result<(), Rejection> {
    let annotation = listing.annotation.as_ref().ok_or(Rejection::NotAnnotated)?;

    if annotation.neighborhood.is_empty() {
        return Err(Rejection::NoNeighborhood);
    }

    if criteria.require_image && !listing.has_image {
        return Err(Rejection::NoImage);
    }

    if criteria.check_transit && !annotation.transit_distance.within(criteria.max_transit_dist) {
        return Err(Rejection::TransitTooFar);
    }

    if criteria.check_shuttle {
        let close_enough = match annotation.shuttle_walk_time() {
            Some(minutes) => minutes < criteria.max_shuttle_walk_time,
            None => annotation.shuttle_distance.within(criteria.max_shuttle_dist),
        };
        if !close_enough {
            return Err(Rejection::ShuttleTooFar);
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::annotation::Annotation;
    use crate::geos::{Coordinate, Distance};
    use crate::routing::Walk;
    use chrono::NaiveDate;

    fn criteria() -> Criteria {
        Criteria {
            max_transit_dist: 1.5,
            max_shuttle_dist: 0.75,
            max_shuttle_walk_time: 15.0,
            require_image: true,
            check_transit: true,
            check_shuttle: true,
        }
    }

    fn listing(annotation: Annotation) -> Listing {
        Listing {
            id: 1,
            url: "https://example.org/1.html".into(),
            name: "flat".into(),
            price: 2000.0,
            location: "nob hill".into(),
            coordinate: Some(Coordinate::new(37.79, -122.41)),
            created: NaiveDate::from_ymd_opt(2024, 1, 1)
                .unwrap()
                .and_hms_opt(0, 0, 0)
                .unwrap(),
            has_image: true,
            annotation: Some(annotation),
        }
    }

    fn good() -> Annotation {
        Annotation {
            neighborhood: "nob hill".into(),
            transit_stop: "Powell St.".into(),
            transit_distance: Distance::Miles(0.4),
            transit_walk: None,
            shuttle_stop: "Van Ness".into(),
            shuttle_distance: Distance::Miles(0.3),
            shuttle_walk: None,
        }
    }

    #[test]
    fn accepts_close_listing() {
        assert_eq!(evaluate(&listing(good()), &criteria()), Ok(()));
    }

    #[test]
    fn unannotated_is_rejected() {
        let mut l = listing(good());
        l.annotation = None;
        assert_eq!(evaluate(&l, &criteria()), Err(Rejection::NotAnnotated));
    }

    #[test]
    fn requires_neighborhood_first() {
        let a = Annotation {
            neighborhood: String::new(),
            ..good()
        };
        assert_eq!(evaluate(&listing(a), &criteria()), Err(Rejection::NoNeighborhood));
    }

    #[test]
    fn image_requirement_can_be_disabled() {
        let mut l = listing(good());
        l.has_image = false;
        assert_eq!(evaluate(&l, &criteria()), Err(Rejection::NoImage));

        let relaxed = Criteria {
            require_image: false,
            ..criteria()
        };
        assert_eq!(evaluate(&l, &relaxed), Ok(()));
    }

    #[test]
    fn unknown_transit_distance_fails_when_checked() {
        let a = Annotation {
            transit_distance: Distance::Unknown,
            ..good()
        };
        assert_eq!(evaluate(&listing(a.clone()), &criteria()), Err(Rejection::TransitTooFar));

        let no_transit = Criteria {
            check_transit: false,
            ..criteria()
        };
        assert_eq!(evaluate(&listing(a), &no_transit), Ok(()));
    }

    #[test]
    fn walk_time_overrides_straight_line() {
        // close as the crow flies, but a long walk
        let a = Annotation {
            shuttle_walk: Some(Walk {
                miles: 1.2,
                minutes: 25.0,
            }),
            ..good()
        };
        assert_eq!(evaluate(&listing(a), &criteria()), Err(Rejection::ShuttleTooFar));

        // far as the crow flies, but a short walk
        let a = Annotation {
            shuttle_distance: Distance::Miles(0.9),
            shuttle_walk: Some(Walk {
                miles: 0.6,
                minutes: 12.0,
            }),
            ..good()
        };
        assert_eq!(evaluate(&listing(a), &criteria()), Ok(()));
    }

    #[test]
    fn walk_time_limit_is_exclusive() {
        let a = Annotation {
            shuttle_walk: Some(Walk {
                miles: 0.5,
                minutes: 15.0,
            }),
            ..good()
        };
        assert_eq!(evaluate(&listing(a), &criteria()), Err(Rejection::ShuttleTooFar));
    }
}
