//! API request and response data models.
//!
//! These models define the public API contract and are distinct from the
//! database models, allowing the storage representation (nano-USD costs,
//! TEXT prices) to evolve independently of the wire format.

pub mod analytics;
pub mod events;
pub mod optimizations;
pub mod pricing;
pub mod projects;
