//! Common type definitions.
//!
//! All entity IDs are UUIDs wrapped in type aliases for better type safety:
//!
//! - [`ProjectId`]: Tenant/billing boundary identifier
//! - [`ApiKeyId`]: API key identifier
//! - [`EventId`]: Usage event identifier
//! - [`PriceQuoteId`]: Price quote identifier

use uuid::Uuid;

// Type aliases for IDs
pub type ProjectId = Uuid;
pub type ApiKeyId = Uuid;
pub type EventId = Uuid;
pub type PriceQuoteId = Uuid;

/// Abbreviate a UUID to its first 8 characters for more readable logs and traces
/// Example: "550e8400-e29b-41d4-a716-446655440000" -> "550e8400"
pub fn abbrev_uuid(uuid: &Uuid) -> String {
    uuid.to_string().chars().take(8).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn abbrev_takes_first_eight_chars() {
        let id = Uuid::parse_str("550e8400-e29b-41d4-a716-446655440000").unwrap();
        assert_eq!(abbrev_uuid(&id), "550e8400");
    }
}
