//! Optimization API types.
//!
//! The suggestion and summary payloads themselves live in
//! [`crate::optimizer`]; this module only adds the query surface.

use serde::Deserialize;
use utoipa::IntoParams;

fn default_days() -> i64 {
    30
}

/// Query parameters for optimization endpoints
#[derive(Debug, Clone, Deserialize, IntoParams)]
pub struct OptimizationQuery {
    /// Days of history to analyze (1-90, default 30)
    #[serde(default = "default_days")]
    pub days: i64,
}
