//! # Ariakey SDK
//!
//! Client SDK for the Ariakey license server. Handles activation and
//! validation against the server, caches the resulting license state
//! locally, and degrades to an offline grace window when the server is
//! unreachable.
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use ariakey_sdk::{LicenseManager, ManagerOptions};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let manager = LicenseManager::new(ManagerOptions {
//!         base_url: Some("https://licenses.myapp.com".into()),
//!         app_version: Some(env!("CARGO_PKG_VERSION").into()),
//!         ..Default::default()
//!     })?;
//!
//!     let report = manager.activate("AK-XXXX-XXXX-XXXX-XXXX").await?;
//!     println!("activated: {} ({})", report.is_active, report.status);
//!
//!     // Later, on startup:
//!     let report = manager.validate().await?;
//!     if report.is_active {
//!         println!("licensed, plan: {:?}", report.plan);
//!     }
//!     Ok(())
//! }
//! ```
//!
//! ## Offline behavior
//!
//! Every successful server contact extends an offline grace window.
//! When a later validation cannot reach the server and the window has
//! not lapsed, the cached license keeps working with status
//! `offline_grace`. Once the window lapses, validation fails but the
//! cached state is preserved so the next successful contact recovers
//! without re-activation.

pub mod error;
pub mod machine;
pub mod manager;
pub mod storage;
pub mod types;

pub use error::{LicenseError, LicenseErrorCode, Result};
pub use machine::machine_fingerprint;
pub use manager::{LicenseManager, ManagerOptions};
pub use storage::{FileStore, MemoryStore, StateStore};
pub use types::{ClientLicenseState, ClientStatus, LicenseReport};
