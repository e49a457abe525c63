//! Manager behavior without a reachable server: configuration guards,
//! dev keys, and the offline grace window.

use std::sync::Arc;
use std::time::Duration;

use ariakey_sdk::{
    ClientLicenseState, ClientStatus, FileStore, LicenseErrorCode, LicenseManager, ManagerOptions,
    MemoryStore, StateStore,
};

/// A base URL nothing listens on. Port 9 (discard) refuses connections
/// quickly instead of hanging.
const DEAD_SERVER: &str = "http://127.0.0.1:9";

fn now() -> i64 {
    chrono::Utc::now().timestamp()
}

fn dead_server_manager(storage: Arc<dyn StateStore>) -> LicenseManager {
    LicenseManager::new(ManagerOptions {
        base_url: Some(DEAD_SERVER.to_string()),
        timeout: Some(Duration::from_millis(500)),
        storage: Some(storage),
        machine_id: Some("test-machine".to_string()),
        ..Default::default()
    })
    .unwrap()
}

#[tokio::test]
async fn activate_rejects_empty_key() {
    let manager = LicenseManager::new(ManagerOptions::default()).unwrap();
    let err = manager.activate("   ").await.unwrap_err();
    assert_eq!(err.code, LicenseErrorCode::MissingKey);
}

#[tokio::test]
async fn activate_without_server_requires_dev_key_opt_in() {
    let manager = LicenseManager::new(ManagerOptions::default()).unwrap();

    // Real keys never work without a server.
    let err = manager.activate("AK-AAAA-BBBB-CCCC-DDDD").await.unwrap_err();
    assert_eq!(err.code, LicenseErrorCode::ServerNotConfigured);

    // Dev keys do not work without the explicit flag either.
    let err = manager.activate("DEV-LOCAL").await.unwrap_err();
    assert_eq!(err.code, LicenseErrorCode::ServerNotConfigured);
}

#[tokio::test]
async fn dev_key_activates_locally_when_allowed() {
    let storage = Arc::new(MemoryStore::new());
    let manager = LicenseManager::new(ManagerOptions {
        allow_dev_keys: true,
        storage: Some(storage),
        ..Default::default()
    })
    .unwrap();

    let report = manager.activate("DEV-LOCAL").await.unwrap();
    assert!(report.success);
    assert!(report.is_active);
    assert_eq!(report.status, ClientStatus::Active);
    assert_eq!(report.plan.as_deref(), Some("dev"));
    assert!(manager.is_active());
}

#[tokio::test]
async fn validate_without_stored_key_is_an_error() {
    let manager = dead_server_manager(Arc::new(MemoryStore::new()));
    let err = manager.validate().await.unwrap_err();
    assert_eq!(err.code, LicenseErrorCode::NoCachedState);
}

#[tokio::test]
async fn unreachable_server_degrades_to_offline_grace() {
    let storage = Arc::new(MemoryStore::new());
    storage.store(&ClientLicenseState {
        license_key: Some("AK-AAAA-BBBB-CCCC-DDDD".to_string()),
        status: ClientStatus::Active,
        plan: Some("pro".to_string()),
        offline_grace_until: Some(now() + 3600),
        ..Default::default()
    });

    let manager = dead_server_manager(storage.clone());
    let report = manager.validate().await.unwrap();

    assert!(report.success);
    assert!(report.is_active);
    assert_eq!(report.status, ClientStatus::OfflineGrace);
    assert_eq!(
        report.message.as_deref(),
        Some("License server unavailable. Using offline grace period.")
    );

    // The degradation is persisted; a second offline validation keeps
    // coasting.
    let report = manager.validate().await.unwrap();
    assert_eq!(report.status, ClientStatus::OfflineGrace);
}

#[tokio::test]
async fn lapsed_grace_window_fails_but_preserves_state() {
    let storage = Arc::new(MemoryStore::new());
    storage.store(&ClientLicenseState {
        license_key: Some("AK-AAAA-BBBB-CCCC-DDDD".to_string()),
        status: ClientStatus::Active,
        offline_grace_until: Some(now() - 60),
        ..Default::default()
    });

    let manager = dead_server_manager(storage.clone());
    let err = manager.validate().await.unwrap_err();
    assert!(err.is_transport());

    // The cached key survives so a later online validation can recover.
    let state = storage.load().unwrap();
    assert_eq!(state.license_key.as_deref(), Some("AK-AAAA-BBBB-CCCC-DDDD"));
    assert_eq!(state.status, ClientStatus::Active);
}

#[tokio::test]
async fn rejected_state_does_not_enter_grace() {
    let storage = Arc::new(MemoryStore::new());
    storage.store(&ClientLicenseState {
        license_key: Some("AK-AAAA-BBBB-CCCC-DDDD".to_string()),
        status: ClientStatus::Invalid,
        offline_grace_until: Some(now() + 3600),
        ..Default::default()
    });

    let manager = dead_server_manager(storage);
    let err = manager.validate().await.unwrap_err();
    assert!(err.is_transport());
}

#[tokio::test]
async fn clear_is_idempotent() {
    let dir = tempfile::tempdir().unwrap();
    let storage = Arc::new(FileStore::new(dir.path()).unwrap());
    storage.store(&ClientLicenseState {
        license_key: Some("AK-AAAA-BBBB-CCCC-DDDD".to_string()),
        status: ClientStatus::Active,
        ..Default::default()
    });

    let manager = LicenseManager::new(ManagerOptions {
        storage: Some(storage.clone()),
        ..Default::default()
    })
    .unwrap();

    let report = manager.clear();
    assert!(report.success);
    assert_eq!(report.status, ClientStatus::Unlicensed);
    assert!(!report.key_present);

    // Nothing stored, clearing again still succeeds.
    let report = manager.clear();
    assert!(report.success);
    assert!(storage.load().is_none());
}

#[tokio::test]
async fn status_applies_local_expiry_without_network() {
    let storage = Arc::new(MemoryStore::new());
    storage.store(&ClientLicenseState {
        license_key: Some("AK-AAAA-BBBB-CCCC-DDDD".to_string()),
        status: ClientStatus::Active,
        expires_at: Some(now() - 60),
        ..Default::default()
    });

    let manager = LicenseManager::new(ManagerOptions {
        storage: Some(storage),
        ..Default::default()
    })
    .unwrap();

    let report = manager.status();
    assert_eq!(report.status, ClientStatus::Expired);
    assert!(!report.is_active);
    assert!(report.key_present);
}
