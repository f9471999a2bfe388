pub mod coordinate;
pub mod distance;
pub mod neighborhood;
pub mod stops;

pub use coordinate::{BoundingBox, Coordinate};
pub use distance::Distance;
pub use neighborhood::{BoxMatch, NameMatch, NeighborhoodClassifier};
pub use stops::{nearest_stop, NearestStop, Stop, StopRegistry};
