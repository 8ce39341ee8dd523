//! Route lookup.

mod router;

pub use router::{Router, HEALTH_PATH, INFO_PATH};
