//! Public license endpoints: health, activation, and validation.
//!
//! Business rejections (bad key, limit reached, revoked) are HTTP 200
//! with `valid: false`; non-2xx is reserved for transport and server
//! faults.

mod activate;
mod validate;

use axum::{Router, extract::State, routing::get, routing::post};
use chrono::Utc;
use serde::Serialize;

use crate::db::{AppState, queries};
use crate::error::Result;
use crate::extractors::Json;
use crate::keys;
use crate::models::{License, LicenseStatus};

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/health", get(health))
        .route("/v1/licenses/activate", post(activate::activate))
        .route("/v1/licenses/validate", post(validate::validate))
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct HealthResponse {
    ok: bool,
    service: &'static str,
    product_id: String,
    timestamp: i64,
}

async fn health(State(state): State<AppState>) -> Json<HealthResponse> {
    Json(HealthResponse {
        ok: true,
        service: "ariakey-license-server",
        product_id: state.default_product_id.clone(),
        timestamp: Utc::now().timestamp(),
    })
}

/// Wire payload for activate and validate. The `status` field speaks a
/// three-word vocabulary: revoked and unknown licenses both read as
/// `invalid` so clients cannot distinguish them.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LicenseStatusResponse {
    pub valid: bool,
    pub status: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub plan: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub expires_at: Option<i64>,
    pub offline_grace_hours: i64,
    pub message: String,
}

impl LicenseStatusResponse {
    /// Rejection with no license context attached.
    pub fn rejected(message: &str, offline_grace_hours: i64) -> Self {
        LicenseStatusResponse {
            valid: false,
            status: "invalid",
            plan: None,
            expires_at: None,
            offline_grace_hours,
            message: message.to_string(),
        }
    }

    /// Build a payload from a loaded license. `valid` only survives
    /// when the license status is active.
    pub fn for_license(
        license: &License,
        offline_grace_hours: i64,
        valid: bool,
        message: String,
    ) -> Self {
        // A past expiry wins over the stored status, so a revoked
        // license whose term has also lapsed reads as expired.
        let status = if license.status == LicenseStatus::Expired
            || license.is_expired(Utc::now().timestamp())
        {
            "expired"
        } else if license.status == LicenseStatus::Active {
            "active"
        } else {
            "invalid"
        };
        LicenseStatusResponse {
            valid: valid && status == "active",
            status,
            plan: Some(license.plan.clone()),
            expires_at: license.expires_at,
            offline_grace_hours,
            message,
        }
    }
}

/// Outcome of the shared key-to-license resolution path.
pub enum LicenseLookup {
    /// Request cannot proceed; respond with this payload.
    Rejected(LicenseStatusResponse),
    /// License exists and is active (expiry already refreshed).
    Usable(License),
}

/// Resolve a raw license key to a usable license, producing the
/// rejection payload early for every non-usable state. Runs the lazy
/// expiry transition before judging the status.
pub fn load_license_for_request(
    conn: &rusqlite::Connection,
    state: &AppState,
    raw_key: Option<&str>,
    product_id: &str,
) -> Result<LicenseLookup> {
    let grace = state.offline_grace_hours;

    let key = raw_key.map(keys::normalize).unwrap_or_default();
    if key.is_empty() {
        return Ok(LicenseLookup::Rejected(LicenseStatusResponse::rejected(
            "licenseKey is required.",
            grace,
        )));
    }

    let Some(license) = queries::find_license(conn, &state.pepper, &key, product_id)? else {
        return Ok(LicenseLookup::Rejected(LicenseStatusResponse::rejected(
            "License key is invalid for this product.",
            grace,
        )));
    };

    if license.status == LicenseStatus::Revoked {
        return Ok(LicenseLookup::Rejected(LicenseStatusResponse::for_license(
            &license,
            grace,
            false,
            "License has been revoked. Contact support.".to_string(),
        )));
    }

    let license = queries::refresh_expiry(conn, license)?;

    if license.status == LicenseStatus::Expired {
        return Ok(LicenseLookup::Rejected(LicenseStatusResponse::for_license(
            &license,
            grace,
            false,
            "License has expired.".to_string(),
        )));
    }

    if license.status != LicenseStatus::Active {
        return Ok(LicenseLookup::Rejected(LicenseStatusResponse::for_license(
            &license,
            grace,
            false,
            "License is not active.".to_string(),
        )));
    }

    Ok(LicenseLookup::Usable(license))
}
