// src/domain/listing.rs

use crate::domain::annotation::Annotation;
use crate::geos::Coordinate;
use crate::scraper::{RawListing, ScraperError};
use chrono::{DateTime, NaiveDateTime};

/// A listing normalised from the source, ready for enrichment.
#[derive(Debug, Clone, PartialEq)]
pub struct Listing {
    /// Source-assigned id, unique per site.
    pub id: i64,
    pub url: String,
    pub name: String,
    /// Zero when the source price could not be read.
    pub price: f64,
    /// Free-text "where" field; empty when the poster left it out.
    pub location: String,
    pub coordinate: Option<Coordinate>,
    pub created: NaiveDateTime,
    pub has_image: bool,
    pub annotation: Option<Annotation>,
}

impl Listing {
    /// Flattens a raw search row. Fails only when the posting time is unreadable.
    pub fn from_raw(raw: &RawListing) -> Result<Self, ScraperError> {
        let created = parse_datetime(&raw.datetime).ok_or_else(|| ScraperError::Deserialize {
            field: "datetime",
            value: raw.datetime.clone(),
        })?;

        Ok(Listing {
            id: raw.id,
            url: raw.url.clone(),
            name: raw.name.clone(),
            price: parse_price(raw.price.as_deref()),
            location: raw.location.clone().unwrap_or_default(),
            coordinate: raw.geotag,
            created,
            has_image: raw.has_image,
            annotation: None,
        })
    }

    pub fn with_annotation(mut self, annotation: Annotation) -> Self {
        self.annotation = Some(annotation);
        self
    }
}

/// "$2,450" -> 2450.0; anything unreadable or negative -> 0.0
pub fn parse_price(raw: Option<&str>) -> f64 {
    raw.map(|s| s.trim().replace(['$', ','], ""))
        .and_then(|s| s.parse::<f64>().ok())
        .filter(|p| p.is_finite() && *p >= 0.0)
        .unwrap_or(0.0)
}

fn parse_datetime(raw: &str) -> Option<NaiveDateTime> {
    let raw = raw.trim();
    NaiveDateTime::parse_from_str(raw, "%Y-%m-%d %H:%M")
        .ok()
        .or_else(|| {
            DateTime::parse_from_rfc3339(raw)
                .ok()
                .map(|dt| dt.naive_utc())
        })
}
