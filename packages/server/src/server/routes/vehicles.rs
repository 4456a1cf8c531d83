use axum::{
    extract::{rejection::JsonRejection, Extension},
    Json,
};

use crate::domains::scraper_jobs::actions::{add_single_vehicle, AddVehicleRequest, AddedVehicle};
use crate::server::app::AxumAppState;
use crate::server::response::{ApiResponse, ApiResult};

/// POST /admin/vehicles/add-single
///
/// Blocks until the single vehicle scraper exits (bounded by the configured timeout).
pub async fn add_single_vehicle_handler(
    Extension(state): Extension<AxumAppState>,
    payload: Result<Json<AddVehicleRequest>, JsonRejection>,
) -> ApiResult<AddedVehicle> {
    let Json(request) = payload?;
    let vehicle = add_single_vehicle(request, &state.server_deps).await?;
    Ok(ApiResponse::ok(vehicle))
}
