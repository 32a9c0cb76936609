//! External map links for "view on map"

/// Build a map-search URL for a coordinate pair. Shown on the result screen
/// so the player can open the real place in a browser.
pub fn search_url(lat: f64, lng: f64) -> String {
    format!("https://www.google.com/maps/search/?api=1&query={lat:.6},{lng:.6}")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn url_embeds_coordinates_with_fixed_precision() {
        let url = search_url(48.8584, 2.2945);
        assert_eq!(
            url,
            "https://www.google.com/maps/search/?api=1&query=48.858400,2.294500"
        );
    }

    #[test]
    fn negative_coordinates_survive() {
        let url = search_url(-33.856784, 151.215297);
        assert!(url.ends_with("query=-33.856784,151.215297"));
    }
}
