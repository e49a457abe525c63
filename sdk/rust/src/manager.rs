//! The license manager: talks to the server, caches the result, and
//! keeps working through an offline grace window.

use std::sync::Arc;
use std::time::Duration;

use reqwest::Client as HttpClient;
use serde::Serialize;

use crate::error::{LicenseError, LicenseErrorCode, Result};
use crate::machine::machine_fingerprint;
use crate::storage::{MemoryStore, StateStore};
use crate::types::{ClientLicenseState, ClientStatus, LicenseReport, ServerStatusPayload};

/// Whole-request timeout, connection through body.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_millis(8000);
pub const DEFAULT_OFFLINE_GRACE_HOURS: i64 = 168;
pub const DEFAULT_PRODUCT_ID: &str = "ariakey-pro";

/// Keys with this prefix activate locally when dev keys are allowed.
const DEV_KEY_PREFIX: &str = "DEV-";

/// Configuration for [`LicenseManager`].
#[derive(Clone, Default)]
pub struct ManagerOptions {
    /// License server URL. Without one, only dev keys can activate.
    pub base_url: Option<String>,
    /// Product id sent with every request (default: "ariakey-pro").
    pub product_id: Option<String>,
    /// Optional bearer token attached to requests.
    pub api_token: Option<String>,
    /// Whole-request timeout (default: 8s).
    pub timeout: Option<Duration>,
    /// Fallback grace window when the server does not advertise one.
    pub offline_grace_hours: Option<i64>,
    /// Accept `DEV-` keys without a server. Off by default; turn on
    /// explicitly in development builds only.
    pub allow_dev_keys: bool,
    /// Where cached state lives (default: in-memory).
    pub storage: Option<Arc<dyn StateStore>>,
    /// Override the machine fingerprint.
    pub machine_id: Option<String>,
    /// Application version reported to the server.
    pub app_version: Option<String>,
}

impl std::fmt::Debug for ManagerOptions {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ManagerOptions")
            .field("base_url", &self.base_url)
            .field("product_id", &self.product_id)
            .field("api_token", &self.api_token.as_ref().map(|_| "<redacted>"))
            .field("timeout", &self.timeout)
            .field("offline_grace_hours", &self.offline_grace_hours)
            .field("allow_dev_keys", &self.allow_dev_keys)
            .field("storage", &"<storage>")
            .field("machine_id", &self.machine_id)
            .field("app_version", &self.app_version)
            .finish()
    }
}

/// Outcome of interpreting a server payload.
struct ParsedStatus {
    valid: bool,
    status: ClientStatus,
    plan: Option<String>,
    expires_at: Option<i64>,
    grace_hours: i64,
    message: Option<String>,
}

fn now() -> i64 {
    chrono::Utc::now().timestamp()
}

pub struct LicenseManager {
    base_url: Option<String>,
    product_id: String,
    api_token: Option<String>,
    offline_grace_hours: i64,
    allow_dev_keys: bool,
    storage: Arc<dyn StateStore>,
    machine_id: String,
    app_version: Option<String>,
    http: HttpClient,
}

impl LicenseManager {
    pub fn new(options: ManagerOptions) -> Result<Self> {
        let base_url = options
            .base_url
            .map(|u| u.trim().trim_end_matches('/').to_string())
            .filter(|u| !u.is_empty());

        let storage: Arc<dyn StateStore> = options
            .storage
            .unwrap_or_else(|| Arc::new(MemoryStore::new()));

        let http = HttpClient::builder()
            .user_agent(concat!("ariakey-sdk-rust/", env!("CARGO_PKG_VERSION")))
            .timeout(options.timeout.unwrap_or(DEFAULT_TIMEOUT))
            .build()
            .map_err(|e| LicenseError::new(LicenseErrorCode::Network, e.to_string()))?;

        Ok(Self {
            base_url,
            product_id: options
                .product_id
                .filter(|p| !p.trim().is_empty())
                .unwrap_or_else(|| DEFAULT_PRODUCT_ID.to_string()),
            api_token: options.api_token.filter(|t| !t.is_empty()),
            offline_grace_hours: options
                .offline_grace_hours
                .filter(|h| *h > 0)
                .unwrap_or(DEFAULT_OFFLINE_GRACE_HOURS),
            allow_dev_keys: options.allow_dev_keys,
            storage,
            machine_id: options.machine_id.unwrap_or_else(machine_fingerprint),
            app_version: options.app_version,
            http,
        })
    }

    pub fn is_configured(&self) -> bool {
        self.base_url.is_some()
    }

    pub fn machine_id(&self) -> &str {
        &self.machine_id
    }

    /// Report the cached state without touching the network.
    pub fn status(&self) -> LicenseReport {
        let state = self.read_state();
        self.report(&state, true, None)
    }

    /// Whether the cached license currently grants access.
    pub fn is_active(&self) -> bool {
        self.read_state().is_active(now())
    }

    /// Activate a license key for this machine. Server rejections are
    /// cached and reported with `success: false`; transport failures
    /// are errors and leave the cache untouched.
    pub async fn activate(&self, raw_license_key: &str) -> Result<LicenseReport> {
        let license_key = raw_license_key.trim().to_string();
        if license_key.is_empty() {
            return Err(LicenseError::new(
                LicenseErrorCode::MissingKey,
                "License key is required.",
            ));
        }

        if !self.is_configured() {
            if !self.allow_dev_keys || !license_key.starts_with(DEV_KEY_PREFIX) {
                return Err(LicenseError::new(
                    LicenseErrorCode::ServerNotConfigured,
                    "Set a license server base URL before activation. DEV- keys are only accepted when dev keys are allowed.",
                ));
            }
            return Ok(self.activate_dev_key(license_key));
        }

        let payload = self.post_status("/v1/licenses/activate", &license_key).await?;
        let parsed = self.parse_payload(payload);

        let ts = now();
        let state = ClientLicenseState {
            license_key: Some(license_key),
            status: parsed.status,
            plan: parsed.plan,
            expires_at: parsed.expires_at,
            last_validated_at: Some(ts),
            offline_grace_until: Some(ts + parsed.grace_hours * 3600),
            last_message: parsed.message.clone(),
        };
        self.storage.store(&state);

        let message = parsed.message.or_else(|| {
            Some(if parsed.valid {
                "License activated.".to_string()
            } else {
                "License key is invalid.".to_string()
            })
        });
        Ok(self.report(&state, parsed.valid, message))
    }

    /// Confirm the cached license with the server. When the server is
    /// unreachable and the grace window is still open, the license
    /// degrades to `offline_grace` instead of failing. A lapsed window
    /// surfaces the transport error but preserves the cached state, so
    /// the next successful contact recovers without re-activation.
    pub async fn validate(&self) -> Result<LicenseReport> {
        let state = self.read_state();
        let Some(license_key) = state.license_key.clone() else {
            return Err(LicenseError::new(
                LicenseErrorCode::NoCachedState,
                "No license key is currently stored.",
            ));
        };

        if !self.is_configured() {
            let success = state.is_active(now());
            return Ok(self.report(
                &state,
                success,
                Some("License server is not configured. Running in cached/offline mode.".to_string()),
            ));
        }

        match self.post_status("/v1/licenses/validate", &license_key).await {
            Ok(payload) => {
                let parsed = self.parse_payload(payload);
                let ts = now();
                let next = ClientLicenseState {
                    license_key: Some(license_key),
                    status: parsed.status,
                    plan: parsed.plan.or(state.plan),
                    expires_at: parsed.expires_at.or(state.expires_at),
                    last_validated_at: Some(ts),
                    offline_grace_until: Some(ts + parsed.grace_hours * 3600),
                    last_message: parsed.message.clone(),
                };
                self.storage.store(&next);

                let message = parsed
                    .message
                    .or_else(|| Some("License validated.".to_string()));
                Ok(self.report(&next, parsed.valid, message))
            }
            Err(e) if e.is_transport() => {
                let ts = now();
                let status = state.effective_status(ts);
                let can_coast = state.grace_valid(ts)
                    && matches!(status, ClientStatus::Active | ClientStatus::OfflineGrace);
                if !can_coast {
                    return Err(e);
                }

                let message = "License server unavailable. Using offline grace period.";
                let next = ClientLicenseState {
                    status: ClientStatus::OfflineGrace,
                    last_message: Some(message.to_string()),
                    ..state
                };
                self.storage.store(&next);
                Ok(self.report(&next, true, Some(message.to_string())))
            }
            Err(e) => Err(e),
        }
    }

    /// Drop the cached license. Safe to call when nothing is stored.
    pub fn clear(&self) -> LicenseReport {
        self.storage.clear();
        LicenseReport {
            success: true,
            configured: self.is_configured(),
            status: ClientStatus::Unlicensed,
            is_active: false,
            key_present: false,
            plan: None,
            expires_at: None,
            last_validated_at: None,
            offline_grace_until: None,
            message: Some("License removed.".to_string()),
        }
    }

    fn activate_dev_key(&self, license_key: String) -> LicenseReport {
        let ts = now();
        let state = ClientLicenseState {
            license_key: Some(license_key),
            status: ClientStatus::Active,
            plan: Some("dev".to_string()),
            expires_at: None,
            last_validated_at: Some(ts),
            offline_grace_until: Some(ts + self.offline_grace_hours * 3600),
            last_message: Some("Activated in local development mode.".to_string()),
        };
        self.storage.store(&state);
        self.report(&state, true, state.last_message.clone())
    }

    fn read_state(&self) -> ClientLicenseState {
        self.storage.load().unwrap_or_default()
    }

    fn report(
        &self,
        state: &ClientLicenseState,
        success: bool,
        message: Option<String>,
    ) -> LicenseReport {
        let ts = now();
        LicenseReport {
            success,
            configured: self.is_configured(),
            status: state.effective_status(ts),
            is_active: state.is_active(ts),
            key_present: state.license_key.is_some(),
            plan: state.plan.clone(),
            expires_at: state.expires_at,
            last_validated_at: state.last_validated_at,
            offline_grace_until: state.offline_grace_until,
            message: message.or_else(|| state.last_message.clone()),
        }
    }

    fn parse_payload(&self, payload: ServerStatusPayload) -> ParsedStatus {
        let status = payload
            .status
            .as_deref()
            .and_then(ClientStatus::parse)
            .unwrap_or(if payload.valid {
                ClientStatus::Active
            } else {
                ClientStatus::Invalid
            });

        ParsedStatus {
            valid: matches!(status, ClientStatus::Active | ClientStatus::OfflineGrace),
            status,
            plan: payload.plan,
            expires_at: payload.expires_at,
            grace_hours: payload
                .offline_grace_hours
                .filter(|h| *h > 0)
                .unwrap_or(self.offline_grace_hours),
            message: payload.message.filter(|m| !m.is_empty()),
        }
    }

    async fn post_status(&self, endpoint: &str, license_key: &str) -> Result<ServerStatusPayload> {
        #[derive(Serialize)]
        #[serde(rename_all = "camelCase")]
        struct StatusRequest<'a> {
            license_key: &'a str,
            product_id: &'a str,
            machine_id: &'a str,
            platform: &'static str,
            arch: &'static str,
            #[serde(skip_serializing_if = "Option::is_none")]
            app_version: Option<&'a str>,
        }

        let base = self.base_url.as_deref().ok_or_else(|| {
            LicenseError::new(
                LicenseErrorCode::ServerNotConfigured,
                "License server base URL is not configured.",
            )
        })?;

        let body = StatusRequest {
            license_key,
            product_id: &self.product_id,
            machine_id: &self.machine_id,
            platform: std::env::consts::OS,
            arch: std::env::consts::ARCH,
            app_version: self.app_version.as_deref(),
        };

        let mut request = self.http.post(format!("{}{}", base, endpoint)).json(&body);
        if let Some(token) = &self.api_token {
            request = request.bearer_auth(token);
        }

        let response = request.send().await.map_err(|e| {
            if e.is_timeout() {
                LicenseError::new(LicenseErrorCode::Timeout, "License server request timed out.")
            } else {
                LicenseError::new(
                    LicenseErrorCode::Network,
                    format!("License server unreachable: {}", e),
                )
            }
        })?;

        let status = response.status();
        if !status.is_success() {
            let payload: ServerStatusPayload = response.json().await.unwrap_or_default();
            let message = payload
                .message
                .unwrap_or_else(|| format!("License server returned {}", status));
            return Err(LicenseError::http(status.as_u16(), message));
        }

        response.json().await.map_err(|e| {
            LicenseError::new(
                LicenseErrorCode::Network,
                format!("Invalid response from license server: {}", e),
            )
        })
    }
}
