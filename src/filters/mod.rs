pub mod desirability;

pub use desirability::{DesirabilityCheck, PostingFilter};
