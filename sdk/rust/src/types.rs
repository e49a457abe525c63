//! Client-side license state and report types.

use serde::{Deserialize, Serialize};

/// Client-side license status. A superset of the server's vocabulary:
/// `unlicensed` and `offline_grace` only exist on the client.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ClientStatus {
    #[default]
    Unlicensed,
    Active,
    Expired,
    OfflineGrace,
    Invalid,
}

impl ClientStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            ClientStatus::Unlicensed => "unlicensed",
            ClientStatus::Active => "active",
            ClientStatus::Expired => "expired",
            ClientStatus::OfflineGrace => "offline_grace",
            ClientStatus::Invalid => "invalid",
        }
    }

    /// Parse a server status string; anything unrecognized is `None`.
    pub fn parse(raw: &str) -> Option<Self> {
        match raw.trim().to_ascii_lowercase().as_str() {
            "unlicensed" => Some(ClientStatus::Unlicensed),
            "active" => Some(ClientStatus::Active),
            "expired" => Some(ClientStatus::Expired),
            "offline_grace" => Some(ClientStatus::OfflineGrace),
            "invalid" => Some(ClientStatus::Invalid),
            _ => None,
        }
    }
}

impl std::fmt::Display for ClientStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Persisted license state, one JSON document on disk.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ClientLicenseState {
    pub license_key: Option<String>,
    pub status: ClientStatus,
    pub plan: Option<String>,
    /// Unix seconds.
    pub expires_at: Option<i64>,
    pub last_validated_at: Option<i64>,
    /// End of the offline grace window, unix seconds.
    pub offline_grace_until: Option<i64>,
    pub last_message: Option<String>,
}

impl ClientLicenseState {
    /// Status after applying local expiry: a cached `active` whose
    /// expiry has passed reads as `expired` without a server round trip.
    pub fn effective_status(&self, now: i64) -> ClientStatus {
        if self.status == ClientStatus::Active
            && let Some(expires_at) = self.expires_at
            && expires_at <= now
        {
            return ClientStatus::Expired;
        }
        self.status
    }

    pub fn grace_valid(&self, now: i64) -> bool {
        self.offline_grace_until.is_some_and(|until| until > now)
    }

    pub fn is_active(&self, now: i64) -> bool {
        match self.effective_status(now) {
            ClientStatus::Active => true,
            ClientStatus::OfflineGrace => self.grace_valid(now),
            _ => false,
        }
    }
}

/// What a manager call reports back to the application.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LicenseReport {
    /// Whether the operation achieved what it set out to do. A cached
    /// server rejection still produces a report, with this false.
    pub success: bool,
    /// Whether a server base URL is configured.
    pub configured: bool,
    pub status: ClientStatus,
    pub is_active: bool,
    pub key_present: bool,
    pub plan: Option<String>,
    pub expires_at: Option<i64>,
    pub last_validated_at: Option<i64>,
    pub offline_grace_until: Option<i64>,
    pub message: Option<String>,
}

/// Wire payload from the server's activate and validate endpoints.
/// Every field is optional so older and newer servers both parse.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ServerStatusPayload {
    pub valid: bool,
    pub status: Option<String>,
    pub plan: Option<String>,
    pub expires_at: Option<i64>,
    pub offline_grace_hours: Option<i64>,
    pub message: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn now() -> i64 {
        chrono::Utc::now().timestamp()
    }

    #[test]
    fn active_with_past_expiry_reads_expired() {
        let state = ClientLicenseState {
            status: ClientStatus::Active,
            expires_at: Some(now() - 60),
            ..Default::default()
        };
        assert_eq!(state.effective_status(now()), ClientStatus::Expired);
        assert!(!state.is_active(now()));
    }

    #[test]
    fn offline_grace_needs_a_live_window() {
        let mut state = ClientLicenseState {
            status: ClientStatus::OfflineGrace,
            offline_grace_until: Some(now() + 3600),
            ..Default::default()
        };
        assert!(state.is_active(now()));

        state.offline_grace_until = Some(now() - 1);
        assert!(!state.is_active(now()));
    }

    #[test]
    fn unknown_status_strings_do_not_parse() {
        assert_eq!(ClientStatus::parse("ACTIVE"), Some(ClientStatus::Active));
        assert_eq!(ClientStatus::parse("weird"), None);
    }
}
