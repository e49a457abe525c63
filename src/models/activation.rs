use serde::Serialize;

/// A persistent binding between one license and one machine.
/// Created at most once per (license, machine); only metadata and the
/// last-validated timestamp are refreshed afterwards.
#[derive(Debug, Clone)]
pub struct Activation {
    pub id: String,
    pub license_id: String,
    pub machine_id: String,
    pub platform: Option<String>,
    pub arch: Option<String>,
    pub app_version: Option<String>,
    pub first_activated_at: i64,
    pub last_validated_at: i64,
}

/// Wire view of an activation for admin inspection.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ActivationInfo {
    pub machine_id: String,
    pub platform: Option<String>,
    pub arch: Option<String>,
    pub app_version: Option<String>,
    pub first_activated_at: i64,
    pub last_validated_at: i64,
}

impl From<Activation> for ActivationInfo {
    fn from(a: Activation) -> Self {
        ActivationInfo {
            machine_id: a.machine_id,
            platform: a.platform,
            arch: a.arch,
            app_version: a.app_version,
            first_activated_at: a.first_activated_at,
            last_validated_at: a.last_validated_at,
        }
    }
}

/// Client-reported device metadata, trimmed and capped before storage.
#[derive(Debug, Clone, Default)]
pub struct ActivationMeta {
    pub platform: Option<String>,
    pub arch: Option<String>,
    pub app_version: Option<String>,
}

impl ActivationMeta {
    const MAX_LEN: usize = 32;

    pub fn new(
        platform: Option<&str>,
        arch: Option<&str>,
        app_version: Option<&str>,
    ) -> Self {
        Self {
            platform: Self::clean(platform),
            arch: Self::clean(arch),
            app_version: Self::clean(app_version),
        }
    }

    fn clean(value: Option<&str>) -> Option<String> {
        let text = value?.trim();
        if text.is_empty() {
            return None;
        }
        Some(text.chars().take(Self::MAX_LEN).collect())
    }
}
