use gather_shared::config::SETTINGS;
use gather_shared::models::GeocodeResult;
use log::{debug, error};
use reqwest::Client;
use serde::Deserialize;

/// One place from a Nominatim-compatible `/search` response
#[derive(Debug, Deserialize)]
struct Place {
    lat: String,
    lon: String,
    display_name: String,
}

/// Address lookup proxied through the service so clients never hold a
/// geocoder key
#[derive(Clone)]
pub struct GeocodeClient {
    base_url: String,
    user_agent: String,
    client: Client,
}

impl GeocodeClient {
    pub fn new(base_url: impl Into<String>, user_agent: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into().trim_end_matches('/').to_string(),
            user_agent: user_agent.into(),
            client: Client::new(),
        }
    }

    pub fn from_env() -> Self {
        Self::new(
            SETTINGS.geocoder_url.clone(),
            SETTINGS.geocoder_user_agent.clone(),
        )
    }

    pub async fn lookup(&self, address: &str) -> Result<Option<GeocodeResult>, String> {
        let url = format!("{}/search", self.base_url);
        debug!("Geocoding '{}' via {}", address, url);

        let response = self
            .client
            .get(&url)
            .query(&[("q", address), ("format", "json"), ("limit", "1")])
            .header("User-Agent", &self.user_agent)
            .send()
            .await
            .map_err(|e| {
                error!("Geocoder request failed: {}", e);
                format!("Geocoder unavailable: {}", e)
            })?;

        let status = response.status();
        if !status.is_success() {
            error!("Geocoder returned status {}", status);
            return Err(format!("Geocoder returned status {}", status.as_u16()));
        }

        let places: Vec<Place> = response
            .json()
            .await
            .map_err(|e| format!("Failed to parse geocoder response: {}", e))?;

        let place = match places.into_iter().next() {
            Some(place) => place,
            None => return Ok(None),
        };

        let lat = place
            .lat
            .parse::<f64>()
            .map_err(|e| format!("Invalid latitude '{}': {}", place.lat, e))?;
        let lng = place
            .lon
            .parse::<f64>()
            .map_err(|e| format!("Invalid longitude '{}': {}", place.lon, e))?;

        Ok(Some(GeocodeResult {
            lat,
            lng,
            display_name: place.display_name,
        }))
    }
}
