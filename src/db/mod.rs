pub mod connection;
pub mod listings;
pub mod scrapes;

pub use connection::{init_db, Database};
pub use listings::{count_listings, insert_listing, listing_exists};
