use axum::{
    extract::{Query, State},
    Json,
};
use gather_shared::models::GeocodeResult;
use log::info;
use std::sync::Arc;

use crate::error::{AppError, Result};
use crate::geocode::GeocodeClient;
use crate::models::GeocodeQuery;

// GET /geocode?address=
pub async fn geocode(
    State(geocoder): State<Arc<GeocodeClient>>,
    Query(query): Query<GeocodeQuery>,
) -> Result<Json<GeocodeResult>> {
    let address = query.address.trim();
    if address.is_empty() {
        return Err(AppError::bad_request("Address is required".into()));
    }

    let result = geocoder
        .lookup(address)
        .await
        .map_err(AppError::BadGateway)?
        .ok_or_else(|| AppError::not_found(format!("No location found for '{}'", address)))?;

    info!("Geocoded '{}' to {}, {}", address, result.lat, result.lng);
    Ok(Json(result))
}
