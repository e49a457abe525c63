mod from_row;
mod schema;
pub mod queries;

pub use schema::init_db;

use r2d2::Pool;
use r2d2_sqlite::SqliteConnectionManager;

use crate::keys::KeyPepper;

pub type DbPool = Pool<SqliteConnectionManager>;

/// Application state passed to every handler. There is no module-level
/// configuration or connection singleton; everything flows through here.
#[derive(Clone)]
pub struct AppState {
    pub db: DbPool,
    pub pepper: KeyPepper,
    pub default_product_id: String,
    pub offline_grace_hours: i64,
    pub admin_token: Option<String>,
}

pub fn create_pool(database_path: &str) -> Result<DbPool, r2d2::Error> {
    let manager = SqliteConnectionManager::file(database_path).with_init(|conn| {
        conn.pragma_update(None, "foreign_keys", "ON")?;
        conn.busy_timeout(std::time::Duration::from_secs(5))?;
        // journal_mode returns the resulting mode as a row
        conn.query_row("PRAGMA journal_mode=WAL", [], |_| Ok(()))
    });
    Pool::builder().max_size(10).build(manager)
}
