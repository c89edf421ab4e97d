//! BattleMetrics server directory response types.

use serde::Deserialize;

/// `GET /servers` search response (JSON:API).
#[derive(Debug, Clone, Deserialize)]
pub struct SearchResponse {
    #[serde(default)]
    pub data: Vec<Listing>,
}

/// One server listing.
#[derive(Debug, Clone, Deserialize)]
pub struct Listing {
    pub id: String,
    #[serde(default)]
    pub attributes: ListingAttributes,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct ListingAttributes {
    pub ip: Option<String>,
    pub port: Option<u32>,
    pub details: Option<ListingDetails>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct ListingDetails {
    pub rust_maps: Option<RustMapsDetails>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct RustMapsDetails {
    pub url: Option<String>,
}

impl Listing {
    /// True when the listing reports exactly this IP and port.
    pub fn matches(&self, host: &str, port: u16) -> bool {
        self.attributes.ip.as_deref() == Some(host) && self.attributes.port == Some(port as u32)
    }

    /// Map link carried by the listing itself, if any.
    pub fn map_url(&self) -> Option<&str> {
        self.attributes
            .details
            .as_ref()?
            .rust_maps
            .as_ref()?
            .url
            .as_deref()
            .map(str::trim)
            .filter(|url| !url.is_empty())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_deserialize_listing_with_map_details() {
        let json = r#"{
            "data": [{
                "type": "server",
                "id": "1234567",
                "attributes": {
                    "name": "Test Rust",
                    "ip": "203.0.113.7",
                    "port": 28015,
                    "players": 50,
                    "details": {
                        "rust_type": "community",
                        "rust_maps": { "seed": 1337, "size": 4000, "url": "https://rustmaps.com/map/4000_1337" }
                    }
                }
            }]
        }"#;

        let response: SearchResponse = serde_json::from_str(json).unwrap();
        let listing = &response.data[0];
        assert_eq!(listing.id, "1234567");
        assert!(listing.matches("203.0.113.7", 28015));
        assert!(!listing.matches("203.0.113.7", 28016));
        assert_eq!(listing.map_url(), Some("https://rustmaps.com/map/4000_1337"));
    }

    #[test]
    fn test_listing_without_details_or_port() {
        let json = r#"{ "data": [{ "id": "1", "attributes": { "ip": "203.0.113.7" } }] }"#;
        let response: SearchResponse = serde_json::from_str(json).unwrap();
        let listing = &response.data[0];
        assert_eq!(listing.map_url(), None);
        assert!(!listing.matches("203.0.113.7", 28015));
    }

    #[test]
    fn test_blank_map_url_is_ignored() {
        let json = r#"{ "data": [{ "id": "1", "attributes": { "details": { "rust_maps": { "url": "  " } } } }] }"#;
        let response: SearchResponse = serde_json::from_str(json).unwrap();
        assert_eq!(response.data[0].map_url(), None);
    }

    #[test]
    fn test_missing_data_is_empty() {
        let response: SearchResponse = serde_json::from_str("{}").unwrap();
        assert!(response.data.is_empty());
    }
}
