pub mod models;
mod scraper;
mod scraper_error;

pub use models::{RawListing, SearchQuery};
pub use self::scraper::{CraigslistSource, ListingSource};
pub use scraper_error::ScraperError;
