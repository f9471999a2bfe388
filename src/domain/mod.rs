pub mod annotation;
pub mod listing;
pub mod logic;

pub use annotation::Annotation;
pub use listing::Listing;
pub use logic::{evaluate, Criteria, Rejection};
