use axum::extract::State;
use serde::Deserialize;

use crate::db::{AppState, queries};
use crate::db::queries::ActivationOutcome;
use crate::error::Result;
use crate::extractors::Json;
use crate::keys;
use crate::models::ActivationMeta;

use super::{LicenseLookup, LicenseStatusResponse, load_license_for_request};

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ActivateRequest {
    pub license_key: Option<String>,
    pub machine_id: Option<String>,
    pub product_id: Option<String>,
    pub platform: Option<String>,
    pub arch: Option<String>,
    pub app_version: Option<String>,
}

/// Bind a machine to a license. Idempotent per machine: re-activating
/// an already-bound machine refreshes its metadata and succeeds without
/// consuming an activation slot.
pub async fn activate(
    State(state): State<AppState>,
    Json(req): Json<ActivateRequest>,
) -> Result<Json<LicenseStatusResponse>> {
    let grace = state.offline_grace_hours;
    let product_id = req
        .product_id
        .as_deref()
        .map(str::trim)
        .filter(|p| !p.is_empty())
        .unwrap_or(&state.default_product_id)
        .to_string();

    // Checked before the key is even looked at, so a bad key with a
    // missing machineId does not leak anything about the key.
    let Some(machine_id) = req.machine_id.as_deref().and_then(keys::normalize_machine_id)
    else {
        return Ok(Json(LicenseStatusResponse::rejected(
            "machineId is required.",
            grace,
        )));
    };

    let mut conn = state.db.get()?;

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

    let outcome = queries::acquire_activation_atomic(
        &mut conn,
        &license.id,
        license.max_activations,
        &machine_id,
        &meta,
    )?;

    let payload = match outcome {
        ActivationOutcome::Existing(_) => {
            tracing::debug!(license_id = %license.id, machine_id = %machine_id, "re-activation");
            LicenseStatusResponse::for_license(
                &license,
                grace,
                true,
                "License already active on this device.".to_string(),
            )
        }
        ActivationOutcome::Created(_) => {
            tracing::info!(license_id = %license.id, machine_id = %machine_id, "activation created");
            LicenseStatusResponse::for_license(
                &license,
                grace,
                true,
                "License activated.".to_string(),
            )
        }
        ActivationOutcome::LimitReached { count, max } => {
            tracing::info!(
                license_id = %license.id,
                machine_id = %machine_id,
                count,
                max,
                "activation limit reached"
            );
            LicenseStatusResponse::for_license(
                &license,
                grace,
                false,
                format!("Activation limit reached ({} devices).", max),
            )
        }
    };

    Ok(Json(payload))
}
