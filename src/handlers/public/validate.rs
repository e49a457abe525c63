use axum::extract::State;
use serde::Deserialize;

use crate::db::{AppState, queries};
use crate::error::Result;
use crate::extractors::Json;
use crate::keys;
use crate::models::ActivationMeta;

use super::{LicenseLookup, LicenseStatusResponse, load_license_for_request};

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ValidateRequest {
    pub license_key: Option<String>,
    pub machine_id: Option<String>,
    pub product_id: Option<String>,
    pub platform: Option<String>,
    pub arch: Option<String>,
    pub app_version: Option<String>,
}

/// Confirm a license is still good for a previously activated machine.
/// Never creates an activation; an unknown machine is rejected.
pub async fn validate(
    State(state): State<AppState>,
    Json(req): Json<ValidateRequest>,
) -> Result<Json<LicenseStatusResponse>> {
    let grace = state.offline_grace_hours;
    let product_id = req
        .product_id
        .as_deref()
        .map(str::trim)
        .filter(|p| !p.is_empty())
        .unwrap_or(&state.default_product_id)
        .to_string();

    let Some(machine_id) = req.machine_id.as_deref().and_then(keys::normalize_machine_id)
    else {
        return Ok(Json(LicenseStatusResponse::rejected(
            "machineId is required.",
            grace,
        )));
    };

    let conn = state.db.get()?;

    let license = match load_license_for_request(
        &conn,
        &state,
        req.license_key.as_deref(),
        &product_id,
    )? {
        LicenseLookup::Rejected(payload) => return Ok(Json(payload)),
        LicenseLookup::Usable(license) => license,
    };

    let meta = ActivationMeta::new(
        req.platform.as_deref(),
        req.arch.as_deref(),
        req.app_version.as_deref(),
    );

    let payload = match queries::touch_activation(&conn, &license.id, &machine_id, &meta)? {
        Some(_) => LicenseStatusResponse::for_license(
            &license,
            grace,
            true,
            "License validated.".to_string(),
        ),
        None => LicenseStatusResponse::for_license(
            &license,
            grace,
            false,
            "License is not activated on this device.".to_string(),
        ),
    };

    Ok(Json(payload))
}
