use crate::db::connection::Database;
use crate::domain::Listing;
use crate::errors::AppError;
use chrono::Utc;
use rusqlite::{params, OptionalExtension};

/// True if a listing with this source id has been stored before.
pub fn listing_exists(db: &Database, cl_id: i64) -> Result<bool, AppError> {
    db.with_conn(|conn| {
        let found = conn
            .query_row(
                "SELECT 1 FROM listings WHERE cl_id = ?1",
                params![cl_id],
                |_| Ok(()),
            )
            .optional()?;
        Ok(found.is_some())
    })
}

/// Store a listing once. Returns `false` when its id or link is already known,
/// which is not an error: some other worker or an earlier cycle got there first.
pub fn insert_listing(db: &Database, listing: &Listing) -> Result<bool, AppError> {
    let annotation = listing.annotation.clone().unwrap_or_default();
    let (lat, lon) = match listing.coordinate {
        Some(c) => (Some(c.lat), Some(c.lon)),
        None => (None, None),
    };
    let geotag = listing.coordinate.map(|c| format!("({}, {})", c.lat, c.lon));
    let now = Utc::now().naive_utc();

    db.with_conn(|conn| {
        let changed = conn.execute(
            r#"
            INSERT OR IGNORE INTO listings (
                cl_id, link, created, geotag, lat, lon,
                name, price, location,
                neighborhood,
                transit_stop, transit_dist, transit_walk_time,
                shuttle_stop, shuttle_dist, shuttle_walk_time,
                first_seen_at
            ) VALUES (
                ?1, ?2, ?3, ?4, ?5, ?6,
                ?7, ?8, ?9,
                ?10,
                ?11, ?12, ?13,
                ?14, ?15, ?16,
                ?17
            )
            "#,
            params![
                listing.id,
                listing.url,
                listing.created,
                geotag,
                lat,
                lon,
                listing.name,
                listing.price,
                listing.location,
                annotation.neighborhood,
                annotation.transit_stop,
                annotation.transit_distance.miles(),
                annotation.transit_walk_time(),
                annotation.shuttle_stop,
                annotation.shuttle_distance.miles(),
                annotation.shuttle_walk_time(),
                now,
            ],
        )?;
        Ok(changed == 1)
    })
}

pub fn count_listings(db: &Database) -> Result<i64, AppError> {
    db.with_conn(|conn| {
        Ok(conn.query_row("SELECT COUNT(*) FROM listings", [], |row| row.get(0))?)
    })
}

/// Stored neighborhood and stop columns.
#[cfg(test)]
#[derive(Debug, PartialEq)]
pub struct StoredAnnotation {
    pub neighborhood: String,
    pub transit_stop: String,
    pub transit_dist: Option<f64>,
    pub shuttle_stop: String,
    pub shuttle_dist: Option<f64>,
}

#[cfg(test)]
pub fn get_stored_annotation(db: &Database, cl_id: i64) -> Result<Option<StoredAnnotation>, AppError> {
    db.with_conn(|conn| {
        let row = conn
            .query_row(
                r#"
                SELECT neighborhood, transit_stop, transit_dist, shuttle_stop, shuttle_dist
                FROM listings WHERE cl_id = ?1
                "#,
                params![cl_id],
                |row| {
                    Ok(StoredAnnotation {
                        neighborhood: row.get(0)?,
                        transit_stop: row.get(1)?,
                        transit_dist: row.get(2)?,
                        shuttle_stop: row.get(3)?,
                        shuttle_dist: row.get(4)?,
                    })
                },
            )
            .optional()?;
        Ok(row)
    })
}
