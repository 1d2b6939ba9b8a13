//! Cache key construction
//!
//! Central place for Redis key formats so producers and consumers cannot
//! drift apart.

/// Key for the public scenario catalog
pub fn scenario_catalog() -> String {
    "belgrap:scenarios:public".to_string()
}

/// Key for the last-seen status of a live call
pub fn call_status(call_id: &str) -> String {
    format!("belgrap:call:{}:status", call_id)
}

/// TTL for the scenario catalog in seconds
pub const SCENARIO_CATALOG_TTL: u64 = 300;

/// TTL for live call status entries in seconds
pub const CALL_STATUS_TTL: u64 = 60;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_key_formats() {
        assert_eq!(scenario_catalog(), "belgrap:scenarios:public");
        assert_eq!(call_status("abc-123"), "belgrap:call:abc-123:status");
    }
}
