use crate::domain::Listing;
use crate::routing::Walk;

/// Three-line message: where and how much, nearest stops, link.
pub fn format_listing(listing: &Listing) -> String {
    let annotation = listing.annotation.clone().unwrap_or_default();

    let header = format!(
        "{} | {} | {}",
        annotation.neighborhood, listing.price, listing.name
    );
    let stops = format!(
        "{} mi to {}{} | {} mi to {} shuttle{}",
        annotation.transit_distance,
        annotation.transit_stop,
        walk_suffix(annotation.transit_walk),
        annotation.shuttle_distance,
        annotation.shuttle_stop,
        walk_suffix(annotation.shuttle_walk),
    );

    format!("{header}\n{stops}\n<{}>", listing.url)
}

fn walk_suffix(walk: Option<Walk>) -> String {
    match walk {
        Some(w) => format!(" ({:.0} min walk)", w.minutes),
        None => String::new(),
    }
}
