use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LicenseStatus {
    Active,
    Revoked,
    Expired,
}

impl LicenseStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            LicenseStatus::Active => "active",
            LicenseStatus::Revoked => "revoked",
            LicenseStatus::Expired => "expired",
        }
    }
}

impl std::str::FromStr for LicenseStatus {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "active" => Ok(LicenseStatus::Active),
            "revoked" => Ok(LicenseStatus::Revoked),
            "expired" => Ok(LicenseStatus::Expired),
            _ => Err(()),
        }
    }
}

#[derive(Debug, Clone)]
pub struct License {
    pub id: String,
    /// HMAC-SHA256 of the plaintext key and the server pepper. Unique.
    /// The plaintext is never stored.
    pub key_hash: String,
    /// Masked display form (first 4 ... last 4).
    pub key_hint: String,
    pub product_id: String,
    pub plan: String,
    pub status: LicenseStatus,
    pub max_activations: i64,
    pub expires_at: Option<i64>,
    pub customer_email: Option<String>,
    pub order_ref: Option<String>,
    pub notes: Option<String>,
    pub created_at: i64,
    pub updated_at: i64,
}

impl License {
    pub fn is_expired(&self, now: i64) -> bool {
        matches!(self.expires_at, Some(t) if t <= now)
    }

    /// Lazy expiry transition. Returns the possibly-updated license and
    /// whether anything changed; the caller decides when to persist.
    /// `revoked` is terminal and is never rewritten here.
    pub fn expire_if_due(mut self, now: i64) -> (License, bool) {
        if self.status == LicenseStatus::Active && self.is_expired(now) {
            self.status = LicenseStatus::Expired;
            self.updated_at = now;
            (self, true)
        } else {
            (self, false)
        }
    }
}

/// Admin input for issuing a license. Everything is optional; the store
/// fills in generated keys and configured defaults.
#[derive(Debug, Default, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct IssueLicense {
    /// Caller-supplied plaintext key. Generated when absent.
    pub license_key: Option<String>,
    pub product_id: Option<String>,
    pub plan: Option<String>,
    pub status: Option<String>,
    pub max_activations: Option<i64>,
    /// Absolute expiry as unix seconds. Wins over `days`.
    pub expires_at: Option<i64>,
    /// Relative expiry in days from now.
    pub days: Option<i64>,
    pub customer_email: Option<String>,
    pub order_ref: Option<String>,
    pub notes: Option<String>,
}

/// Issuance result. The only place a plaintext key ever leaves the store.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct IssuedLicense {
    pub id: String,
    pub license_key: String,
    pub key_hint: String,
    pub product_id: String,
    pub plan: String,
    pub status: LicenseStatus,
    pub max_activations: i64,
    pub expires_at: Option<i64>,
    pub customer_email: Option<String>,
    pub order_ref: Option<String>,
}

/// Listing row: license fields plus a computed activation count.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LicenseSummary {
    pub id: String,
    pub key_hint: String,
    pub product_id: String,
    pub plan: String,
    pub status: LicenseStatus,
    pub max_activations: i64,
    pub activation_count: i64,
    pub expires_at: Option<i64>,
    pub customer_email: Option<String>,
    pub order_ref: Option<String>,
    pub created_at: i64,
    pub updated_at: i64,
}

/// Full admin view: one license with its activations, first-activated first.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LicenseDetails {
    pub id: String,
    pub key_hint: String,
    pub product_id: String,
    pub plan: String,
    pub status: LicenseStatus,
    pub max_activations: i64,
    pub expires_at: Option<i64>,
    pub customer_email: Option<String>,
    pub order_ref: Option<String>,
    pub notes: Option<String>,
    pub created_at: i64,
    pub updated_at: i64,
    pub activations: Vec<super::ActivationInfo>,
}
