//! Database record structures matching table schemas.
//!
//! These models are distinct from the API models in [`crate::api::models`]:
//! database representations carry storage-level details (nano-USD costs,
//! TEXT-encoded prices) that the API layer converts at the boundary.

pub mod analytics;
pub mod events;
pub mod pricing;
pub mod projects;
