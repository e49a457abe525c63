use axum::extract::State;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde::{Deserialize, Serialize};

use crate::db::{AppState, queries};
use crate::error::Result;
use crate::extractors::{Json, Query};
use crate::keys;
use crate::models::{IssueLicense, IssuedLicense, LicenseDetails, LicenseSummary};

#[derive(Serialize)]
struct IssueResponse {
    success: bool,
    license: IssuedLicense,
}

/// Issue a new license. The response carries the plaintext key; it is
/// never retrievable again.
pub async fn issue(
    State(state): State<AppState>,
    Json(input): Json<IssueLicense>,
) -> Result<Response> {
    let conn = state.db.get()?;
    let issued = queries::issue_license(&conn, &state.pepper, &state.default_product_id, &input)?;

    tracing::info!(license_id = %issued.id, key_hint = %issued.key_hint, "license issued");

    Ok((
        StatusCode::CREATED,
        Json(IssueResponse {
            success: true,
            license: issued,
        }),
    )
        .into_response())
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RevokeRequest {
    pub license_key: Option<String>,
    pub product_id: Option<String>,
    pub reason: Option<String>,
}

#[derive(Serialize)]
pub struct RevokeResponse {
    success: bool,
    updated: bool,
    message: String,
}

pub async fn revoke(
    State(state): State<AppState>,
    Json(req): Json<RevokeRequest>,
) -> Result<Json<RevokeResponse>> {
    let product_id = req
        .product_id
        .as_deref()
        .map(str::trim)
        .filter(|p| !p.is_empty())
        .unwrap_or(&state.default_product_id)
        .to_string();
    let key = req.license_key.as_deref().map(keys::normalize).unwrap_or_default();

    let conn = state.db.get()?;
    let outcome = queries::revoke_license(
        &conn,
        &state.pepper,
        &key,
        &product_id,
        req.reason.as_deref(),
    )?;

    if outcome.updated {
        tracing::info!(key_hint = %keys::mask(&key), "license revoked");
    }

    Ok(Json(RevokeResponse {
        success: outcome.updated,
        updated: outcome.updated,
        message: outcome.message,
    }))
}

#[derive(Debug, Deserialize)]
pub struct ListParams {
    pub limit: Option<i64>,
}

#[derive(Serialize)]
pub struct ListResponse {
    success: bool,
    items: Vec<LicenseSummary>,
}

pub async fn list(
    State(state): State<AppState>,
    Query(params): Query<ListParams>,
) -> Result<Json<ListResponse>> {
    let conn = state.db.get()?;
    let items = queries::list_licenses(&conn, params.limit)?;
    Ok(Json(ListResponse {
        success: true,
        items,
    }))
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InspectParams {
    pub license_key: Option<String>,
    pub product_id: Option<String>,
}

#[derive(Serialize)]
struct InspectResponse {
    success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    item: Option<LicenseDetails>,
    #[serde(skip_serializing_if = "Option::is_none")]
    message: Option<String>,
}

/// Full view of one license by key, activations included.
pub async fn inspect(
    State(state): State<AppState>,
    Query(params): Query<InspectParams>,
) -> Result<Response> {
    let product_id = params
        .product_id
        .as_deref()
        .map(str::trim)
        .filter(|p| !p.is_empty())
        .unwrap_or(&state.default_product_id)
        .to_string();
    let key = params
        .license_key
        .as_deref()
        .map(keys::normalize)
        .unwrap_or_default();

    let conn = state.db.get()?;
    let details = queries::license_details(&conn, &state.pepper, &key, &product_id)?;

    let status = if details.is_some() {
        StatusCode::OK
    } else {
        StatusCode::NOT_FOUND
    };
    let message = details.is_none().then(|| "License not found.".to_string());

    Ok((
        status,
        Json(InspectResponse {
            success: details.is_some(),
            item: details,
            message,
        }),
    )
        .into_response())
}
